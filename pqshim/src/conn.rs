//! Connection handles.

use std::ffi::{c_char, c_int, CString};
use std::ptr::{self, NonNull};
use std::rc::Rc;

use pq_sys::PGconn;

use crate::cancel::Cancel;
use crate::conninfo::{self, Conninfo};
use crate::constants::{ContextVisibility, ExecStatus, Verbosity};
use crate::error::{PqError, PqResult};
use crate::ffi;
use crate::mem::{self, PqBuf};
use crate::notice::{Notice, NoticeHandler, NoticeHooks};
use crate::notify::Notification;
use crate::params::{Param, TextParams};
use crate::result::PgResult;
use crate::trace::TraceFile;

/// Outcome of an operation that may need to be retried once the socket is
/// ready again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Done,
    WouldBlock,
}

/// One step of reading a `COPY TO STDOUT` stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyData {
    /// One data row.
    Row(Vec<u8>),
    /// Nothing buffered yet (async mode only).
    Pending,
    /// The copy is complete; collect the final result with `get_result`.
    Done,
}

/// A `PGconn` handle.
pub struct Connection {
    raw: Option<NonNull<PGconn>>,
    hooks: Rc<NoticeHooks>,
    trace: Option<TraceFile>,
}

impl Connection {
    /// Open a connection. With `nonblock` the connection is only started and
    /// must be driven with [`connect_poll`](Self::connect_poll).
    ///
    /// A connection that failed is still returned; check
    /// [`status`](Self::status) and [`error_message`](Self::error_message).
    pub fn connect(conninfo: &str, nonblock: bool) -> PqResult<Self> {
        let conninfo = CString::new(conninfo)?;
        let raw = unsafe {
            if nonblock {
                pq_sys::PQconnectStart(conninfo.as_ptr())
            } else {
                pq_sys::PQconnectdb(conninfo.as_ptr())
            }
        };
        let raw = NonNull::new(raw).ok_or_else(|| PqError::last_os_error("connect"))?;
        log::debug!("connection {:p} opened (nonblock: {nonblock})", raw);
        Ok(Self {
            raw: Some(raw),
            hooks: Rc::default(),
            trace: None,
        })
    }

    /// The native pointer, or NULL once finished.
    pub fn as_ptr(&self) -> *mut PGconn {
        self.raw.map_or(ptr::null_mut(), NonNull::as_ptr)
    }

    pub fn is_finished(&self) -> bool {
        self.raw.is_none()
    }

    /// Close the connection and drop both notice handlers and the trace
    /// sink. Safe to call more than once.
    pub fn finish(&mut self) {
        if let Some(raw) = self.raw.take() {
            unsafe { pq_sys::PQfinish(raw.as_ptr()) }
            log::debug!("connection {:p} finished", raw);
        }
        self.hooks.release_handlers();
        self.trace = None;
    }

    fn conn(&self) -> PqResult<*mut PGconn> {
        self.raw.map(NonNull::as_ptr).ok_or(PqError::Freed)
    }

    /// The connection's current error, or `errno` when libpq left none.
    fn last_error(&self, context: &'static str) -> PqError {
        match self.error_message() {
            Ok(Some(msg)) => PqError::Native(msg),
            _ => PqError::last_os_error(context),
        }
    }

    fn check(&self, ok: bool, context: &'static str) -> PqResult<()> {
        if ok {
            Ok(())
        } else {
            Err(self.last_error(context))
        }
    }

    fn wrap_result(&self, raw: *mut pq_sys::PGresult, context: &'static str) -> PqResult<PgResult> {
        unsafe { PgResult::owned(raw, Some(self.hooks.clone())) }
            .ok_or_else(|| self.last_error(context))
    }

    fn string(
        &self,
        f: unsafe extern "C" fn(*const PGconn) -> *mut c_char,
    ) -> PqResult<Option<String>> {
        let conn = self.conn()?;
        Ok(unsafe { mem::opt_string(f(conn)) })
    }

    // Connection setup

    /// Advance a non-blocking connect; returns a `PGRES_POLLING_*` code.
    pub fn connect_poll(&self) -> PqResult<i32> {
        let conn = self.conn()?;
        Ok(unsafe { pq_sys::PQconnectPoll(conn) } as i32)
    }

    /// Close and reopen the connection with the same parameters.
    pub fn reset(&self) -> PqResult<()> {
        let conn = self.conn()?;
        unsafe { pq_sys::PQreset(conn) };
        Ok(())
    }

    pub fn reset_start(&self) -> PqResult<()> {
        let conn = self.conn()?;
        let ok = unsafe { pq_sys::PQresetStart(conn) } != 0;
        self.check(ok, "reset_start")
    }

    pub fn reset_poll(&self) -> PqResult<i32> {
        let conn = self.conn()?;
        Ok(unsafe { pq_sys::PQresetPoll(conn) } as i32)
    }

    /// Options in effect on this connection.
    pub fn conninfo(&self) -> PqResult<Conninfo> {
        let conn = self.conn()?;
        unsafe { conninfo::connection_conninfo(conn) }
    }

    pub fn get_cancel(&self) -> PqResult<Cancel> {
        let conn = self.conn()?;
        unsafe { Cancel::from_raw(pq_sys::PQgetCancel(conn)) }
            .ok_or_else(|| PqError::last_os_error("get_cancel"))
    }

    pub fn request_cancel(&self) -> PqResult<()> {
        let conn = self.conn()?;
        let ok = unsafe { pq_sys::PQrequestCancel(conn) } != 0;
        self.check(ok, "request_cancel")
    }

    // Status accessors

    pub fn db(&self) -> PqResult<Option<String>> {
        self.string(pq_sys::PQdb)
    }

    pub fn user(&self) -> PqResult<Option<String>> {
        self.string(pq_sys::PQuser)
    }

    pub fn pass(&self) -> PqResult<Option<String>> {
        self.string(pq_sys::PQpass)
    }

    pub fn host(&self) -> PqResult<Option<String>> {
        self.string(pq_sys::PQhost)
    }

    pub fn hostaddr(&self) -> PqResult<Option<String>> {
        self.string(pq_sys::PQhostaddr)
    }

    pub fn port(&self) -> PqResult<Option<String>> {
        self.string(pq_sys::PQport)
    }

    pub fn options(&self) -> PqResult<Option<String>> {
        self.string(pq_sys::PQoptions)
    }

    /// Raw `ConnStatusType` value.
    pub fn status(&self) -> PqResult<i32> {
        let conn = self.conn()?;
        Ok(unsafe { pq_sys::PQstatus(conn) } as i32)
    }

    pub fn transaction_status(&self) -> PqResult<i32> {
        let conn = self.conn()?;
        Ok(unsafe { pq_sys::PQtransactionStatus(conn) } as i32)
    }

    /// A server parameter reported at startup or on change.
    pub fn parameter_status(&self, name: &str) -> PqResult<Option<String>> {
        let conn = self.conn()?;
        let name = CString::new(name)?;
        Ok(unsafe { mem::opt_string(pq_sys::PQparameterStatus(conn, name.as_ptr())) })
    }

    pub fn protocol_version(&self) -> PqResult<i32> {
        let conn = self.conn()?;
        Ok(unsafe { pq_sys::PQprotocolVersion(conn) })
    }

    pub fn server_version(&self) -> PqResult<i32> {
        let conn = self.conn()?;
        Ok(unsafe { pq_sys::PQserverVersion(conn) })
    }

    /// The most recent error, or `None` when there is none.
    pub fn error_message(&self) -> PqResult<Option<String>> {
        let msg = self.string(pq_sys::PQerrorMessage)?;
        Ok(msg.filter(|m| !m.is_empty()))
    }

    pub fn socket(&self) -> PqResult<i32> {
        let conn = self.conn()?;
        Ok(unsafe { pq_sys::PQsocket(conn) })
    }

    pub fn backend_pid(&self) -> PqResult<i32> {
        let conn = self.conn()?;
        Ok(unsafe { pq_sys::PQbackendPID(conn) })
    }

    pub fn pipeline_status(&self) -> PqResult<i32> {
        let conn = self.conn()?;
        Ok(unsafe { pq_sys::PQpipelineStatus(conn) } as i32)
    }

    pub fn connection_needs_password(&self) -> PqResult<bool> {
        let conn = self.conn()?;
        Ok(unsafe { pq_sys::PQconnectionNeedsPassword(conn) } != 0)
    }

    pub fn connection_used_password(&self) -> PqResult<bool> {
        let conn = self.conn()?;
        Ok(unsafe { pq_sys::PQconnectionUsedPassword(conn) } != 0)
    }

    /// Name of the client encoding, e.g. `UTF8`.
    pub fn client_encoding(&self) -> PqResult<String> {
        let conn = self.conn()?;
        let name = unsafe { ffi::pg_encoding_to_char(pq_sys::PQclientEncoding(conn)) };
        Ok(unsafe { mem::string(name) })
    }

    pub fn set_client_encoding(&self, encoding: &str) -> PqResult<()> {
        let conn = self.conn()?;
        let encoding = CString::new(encoding)?;
        let ok = unsafe { pq_sys::PQsetClientEncoding(conn, encoding.as_ptr()) } == 0;
        self.check(ok, "set_client_encoding")
    }

    pub fn ssl_in_use(&self) -> PqResult<bool> {
        let conn = self.conn()?;
        Ok(unsafe { pq_sys::PQsslInUse(conn) } != 0)
    }

    pub fn ssl_attribute(&self, name: &str) -> PqResult<Option<String>> {
        let conn = self.conn()?;
        let name = CString::new(name)?;
        Ok(unsafe { mem::opt_string(pq_sys::PQsslAttribute(conn, name.as_ptr())) })
    }

    pub fn ssl_attribute_names(&self) -> PqResult<Vec<String>> {
        let conn = self.conn()?;
        let mut names = Vec::new();
        unsafe {
            let mut cur = pq_sys::PQsslAttributeNames(conn);
            if cur.is_null() {
                return Ok(names);
            }
            while !(*cur).is_null() {
                names.push(mem::string(*cur));
                cur = cur.add(1);
            }
        }
        Ok(names)
    }

    /// Returns the previous verbosity.
    pub fn set_error_verbosity(&self, verbosity: Verbosity) -> PqResult<i32> {
        let conn = self.conn()?;
        Ok(unsafe { pq_sys::PQsetErrorVerbosity(conn, verbosity.to_native()) } as i32)
    }

    /// Returns the previous visibility.
    pub fn set_error_context_visibility(&self, visibility: ContextVisibility) -> PqResult<i32> {
        let conn = self.conn()?;
        Ok(unsafe { pq_sys::PQsetErrorContextVisibility(conn, visibility.to_native()) } as i32)
    }

    // Notices

    /// Register (or with `None`, remove) the handler for notice messages.
    pub fn set_notice_processor(&self, handler: Option<Rc<dyn NoticeHandler>>) -> PqResult<()> {
        let conn = self.conn()?;
        unsafe { self.hooks.set_processor(conn, handler) };
        Ok(())
    }

    /// Register (or with `None`, remove) the handler for notice results.
    pub fn set_notice_receiver(&self, handler: Option<Rc<dyn NoticeHandler>>) -> PqResult<()> {
        let conn = self.conn()?;
        unsafe { self.hooks.set_receiver(conn, handler) };
        Ok(())
    }

    /// Call the registered processor directly. Returns whether one was
    /// registered.
    pub fn call_notice_processor(&self, message: &str) -> PqResult<bool> {
        self.conn()?;
        Ok(match self.hooks.processor() {
            Some(handler) => {
                handler.invoke(Notice::Message(message));
                true
            }
            None => false,
        })
    }

    /// Call the registered receiver directly with `result`.
    pub fn call_notice_receiver(&self, result: &PgResult) -> PqResult<bool> {
        self.conn()?;
        if result.is_cleared() {
            return Err(PqError::Freed);
        }
        Ok(match self.hooks.receiver() {
            Some(handler) => {
                handler.invoke(Notice::Result(result));
                true
            }
            None => false,
        })
    }

    // Tracing

    /// Start writing protocol traffic to `sink`, replacing any earlier sink.
    pub fn trace(&mut self, sink: TraceFile) -> PqResult<()> {
        let conn = self.conn()?;
        self.untrace()?;
        unsafe { pq_sys::PQtrace(conn, sink.as_ptr()) };
        log::debug!("tracing connection {:p} to {:?}", conn, sink);
        self.trace = Some(sink);
        Ok(())
    }

    /// Stop tracing. Returns whether a sink was set.
    pub fn untrace(&mut self) -> PqResult<bool> {
        let conn = self.conn()?;
        unsafe { pq_sys::PQuntrace(conn) };
        Ok(self.trace.take().is_some())
    }

    pub fn set_trace_flags(&self, flags: i32) -> PqResult<()> {
        let conn = self.conn()?;
        unsafe { pq_sys::PQsetTraceFlags(conn, flags) };
        Ok(())
    }

    // Queries

    pub fn exec(&self, query: &str) -> PqResult<PgResult> {
        let conn = self.conn()?;
        let query = CString::new(query)?;
        log::trace!("exec: {:?}", query);
        self.wrap_result(unsafe { pq_sys::PQexec(conn, query.as_ptr()) }, "exec")
    }

    pub fn exec_params(&self, query: &str, params: &[Param]) -> PqResult<PgResult> {
        let conn = self.conn()?;
        let query = CString::new(query)?;
        let params = TextParams::new(params)?;
        log::trace!("exec_params: {:?} ({} params)", query, params.count());
        let raw = unsafe {
            pq_sys::PQexecParams(
                conn,
                query.as_ptr(),
                params.count(),
                ptr::null(),
                params.values(),
                ptr::null(),
                ptr::null(),
                0,
            )
        };
        self.wrap_result(raw, "exec_params")
    }

    pub fn send_query(&self, query: &str) -> PqResult<()> {
        let conn = self.conn()?;
        let query = CString::new(query)?;
        log::trace!("send_query: {:?}", query);
        let ok = unsafe { pq_sys::PQsendQuery(conn, query.as_ptr()) } != 0;
        self.check(ok, "send_query")
    }

    pub fn send_query_params(&self, query: &str, params: &[Param]) -> PqResult<()> {
        let conn = self.conn()?;
        let query = CString::new(query)?;
        let params = TextParams::new(params)?;
        log::trace!("send_query_params: {:?} ({} params)", query, params.count());
        let ok = unsafe {
            pq_sys::PQsendQueryParams(
                conn,
                query.as_ptr(),
                params.count(),
                ptr::null(),
                params.values(),
                ptr::null(),
                ptr::null(),
                0,
            )
        } != 0;
        self.check(ok, "send_query_params")
    }

    /// Create a prepared statement. Parameter types are left to the server.
    pub fn prepare(&self, name: &str, query: &str, nparams: i32) -> PqResult<PgResult> {
        let conn = self.conn()?;
        let name = CString::new(name)?;
        let query = CString::new(query)?;
        log::trace!("prepare {:?}: {:?}", name, query);
        let raw = unsafe {
            pq_sys::PQprepare(conn, name.as_ptr(), query.as_ptr(), nparams, ptr::null())
        };
        self.wrap_result(raw, "prepare")
    }

    pub fn exec_prepared(&self, name: &str, params: &[Param]) -> PqResult<PgResult> {
        let conn = self.conn()?;
        let name = CString::new(name)?;
        let params = TextParams::new(params)?;
        log::trace!("exec_prepared {:?} ({} params)", name, params.count());
        let raw = unsafe {
            pq_sys::PQexecPrepared(
                conn,
                name.as_ptr(),
                params.count(),
                params.values(),
                ptr::null(),
                ptr::null(),
                0,
            )
        };
        self.wrap_result(raw, "exec_prepared")
    }

    pub fn send_prepare(&self, name: &str, query: &str, nparams: i32) -> PqResult<()> {
        let conn = self.conn()?;
        let name = CString::new(name)?;
        let query = CString::new(query)?;
        log::trace!("send_prepare {:?}: {:?}", name, query);
        let ok = unsafe {
            pq_sys::PQsendPrepare(conn, name.as_ptr(), query.as_ptr(), nparams, ptr::null())
        } != 0;
        self.check(ok, "send_prepare")
    }

    pub fn send_query_prepared(&self, name: &str, params: &[Param]) -> PqResult<()> {
        let conn = self.conn()?;
        let name = CString::new(name)?;
        let params = TextParams::new(params)?;
        log::trace!("send_query_prepared {:?} ({} params)", name, params.count());
        let ok = unsafe {
            pq_sys::PQsendQueryPrepared(
                conn,
                name.as_ptr(),
                params.count(),
                params.values(),
                ptr::null(),
                ptr::null(),
                0,
            )
        } != 0;
        self.check(ok, "send_query_prepared")
    }

    pub fn describe_prepared(&self, name: &str) -> PqResult<PgResult> {
        let conn = self.conn()?;
        let name = CString::new(name)?;
        let raw = unsafe { pq_sys::PQdescribePrepared(conn, name.as_ptr()) };
        self.wrap_result(raw, "describe_prepared")
    }

    pub fn describe_portal(&self, name: &str) -> PqResult<PgResult> {
        let conn = self.conn()?;
        let name = CString::new(name)?;
        let raw = unsafe { pq_sys::PQdescribePortal(conn, name.as_ptr()) };
        self.wrap_result(raw, "describe_portal")
    }

    pub fn send_describe_prepared(&self, name: &str) -> PqResult<()> {
        let conn = self.conn()?;
        let name = CString::new(name)?;
        let ok = unsafe { pq_sys::PQsendDescribePrepared(conn, name.as_ptr()) } != 0;
        self.check(ok, "send_describe_prepared")
    }

    pub fn send_describe_portal(&self, name: &str) -> PqResult<()> {
        let conn = self.conn()?;
        let name = CString::new(name)?;
        let ok = unsafe { pq_sys::PQsendDescribePortal(conn, name.as_ptr()) } != 0;
        self.check(ok, "send_describe_portal")
    }

    /// Must be called right after a send; returns whether libpq accepted it.
    pub fn set_single_row_mode(&self) -> PqResult<bool> {
        let conn = self.conn()?;
        Ok(unsafe { pq_sys::PQsetSingleRowMode(conn) } != 0)
    }

    /// Next result of an asynchronous query. `Ok(None)` once the connection
    /// has no more results and no error to report.
    pub fn get_result(&self) -> PqResult<Option<PgResult>> {
        let conn = self.conn()?;
        let raw = unsafe { pq_sys::PQgetResult(conn) };
        if let Some(res) = unsafe { PgResult::owned(raw, Some(self.hooks.clone())) } {
            return Ok(Some(res));
        }
        match self.error_message()? {
            Some(msg) => Err(PqError::Native(msg)),
            None => Ok(None),
        }
    }

    pub fn consume_input(&self) -> PqResult<()> {
        let conn = self.conn()?;
        let ok = unsafe { pq_sys::PQconsumeInput(conn) } != 0;
        self.check(ok, "consume_input")
    }

    /// Whether `get_result` would block. Reads pending input first.
    pub fn is_busy(&self) -> PqResult<bool> {
        self.consume_input()?;
        Ok(unsafe { pq_sys::PQisBusy(self.conn()?) } != 0)
    }

    // Pipeline mode

    pub fn enter_pipeline_mode(&self) -> PqResult<()> {
        let conn = self.conn()?;
        let ok = unsafe { pq_sys::PQenterPipelineMode(conn) } != 0;
        self.check(ok, "enter_pipeline_mode")
    }

    pub fn exit_pipeline_mode(&self) -> PqResult<()> {
        let conn = self.conn()?;
        let ok = unsafe { pq_sys::PQexitPipelineMode(conn) } != 0;
        self.check(ok, "exit_pipeline_mode")
    }

    pub fn pipeline_sync(&self) -> PqResult<()> {
        let conn = self.conn()?;
        let ok = unsafe { pq_sys::PQpipelineSync(conn) } != 0;
        self.check(ok, "pipeline_sync")
    }

    pub fn send_flush_request(&self) -> PqResult<()> {
        let conn = self.conn()?;
        let ok = unsafe { pq_sys::PQsendFlushRequest(conn) } != 0;
        self.check(ok, "send_flush_request")
    }

    /// Next queued `NOTIFY`, after reading pending input.
    pub fn notifies(&self) -> PqResult<Option<Notification>> {
        self.consume_input()?;
        Ok(unsafe { Notification::from_raw(pq_sys::PQnotifies(self.conn()?)) })
    }

    // COPY

    pub fn put_copy_data(&self, data: &[u8]) -> PqResult<Progress> {
        let conn = self.conn()?;
        let len = c_int::try_from(data.len()).map_err(|_| PqError::TooLarge {
            what: "copy data",
            len: data.len(),
        })?;
        match unsafe { pq_sys::PQputCopyData(conn, data.as_ptr().cast(), len) } {
            1 => Ok(Progress::Done),
            0 => Ok(Progress::WouldBlock),
            _ => Err(self.last_error("put_copy_data")),
        }
    }

    /// End the copy; with `errormsg` the copy is aborted with that message.
    pub fn put_copy_end(&self, errormsg: Option<&str>) -> PqResult<Progress> {
        let conn = self.conn()?;
        let errormsg = errormsg.map(CString::new).transpose()?;
        let errormsg = errormsg.as_ref().map_or(ptr::null(), |m| m.as_ptr());
        match unsafe { pq_sys::PQputCopyEnd(conn, errormsg) } {
            1 => Ok(Progress::Done),
            0 => Ok(Progress::WouldBlock),
            _ => Err(self.last_error("put_copy_end")),
        }
    }

    pub fn get_copy_data(&self, nonblock: bool) -> PqResult<CopyData> {
        let conn = self.conn()?;
        let mut buf: *mut c_char = ptr::null_mut();
        let n = unsafe { pq_sys::PQgetCopyData(conn, &mut buf, c_int::from(nonblock)) };
        match n {
            0 => Ok(CopyData::Pending),
            -1 => Ok(CopyData::Done),
            n if n > 0 => {
                let buf = unsafe { PqBuf::from_raw(buf.cast::<u8>()) }
                    .ok_or_else(|| PqError::last_os_error("get_copy_data"))?;
                Ok(CopyData::Row(unsafe { buf.to_vec(n as usize) }))
            }
            _ => Err(self.last_error("get_copy_data")),
        }
    }

    // Non-blocking mode

    pub fn set_nonblocking(&self, enabled: bool) -> PqResult<()> {
        let conn = self.conn()?;
        let ok = unsafe { pq_sys::PQsetnonblocking(conn, c_int::from(enabled)) } != -1;
        self.check(ok, "set_nonblocking")
    }

    pub fn is_nonblocking(&self) -> PqResult<bool> {
        let conn = self.conn()?;
        Ok(unsafe { pq_sys::PQisnonblocking(conn) } != 0)
    }

    pub fn flush(&self) -> PqResult<Progress> {
        let conn = self.conn()?;
        match unsafe { pq_sys::PQflush(conn) } {
            0 => Ok(Progress::Done),
            1 => Ok(Progress::WouldBlock),
            _ => Err(self.last_error("flush")),
        }
    }

    // Misc

    /// An empty result carrying this connection's notice hooks.
    pub fn make_empty_result(&self, status: ExecStatus) -> PqResult<PgResult> {
        let conn = self.conn()?;
        let raw = unsafe { pq_sys::PQmakeEmptyPGresult(conn, status.to_native()) };
        unsafe { PgResult::owned(raw, Some(self.hooks.clone())) }
            .ok_or_else(|| PqError::last_os_error("make_empty_result"))
    }

    pub fn escape_string_conn(&self, from: &str) -> PqResult<String> {
        let conn = self.conn()?;
        let mut to = vec![0u8; from.len() * 2 + 1];
        let mut error: c_int = 0;
        let len = unsafe {
            pq_sys::PQescapeStringConn(
                conn,
                to.as_mut_ptr().cast(),
                from.as_ptr().cast(),
                from.len(),
                &mut error,
            )
        };
        if error != 0 {
            return Err(self.last_error("escape_string_conn"));
        }
        to.truncate(len);
        Ok(String::from_utf8_lossy(&to).into_owned())
    }

    pub fn escape_literal(&self, s: &str) -> PqResult<String> {
        let conn = self.conn()?;
        let buf =
            unsafe { PqBuf::from_raw(pq_sys::PQescapeLiteral(conn, s.as_ptr().cast(), s.len())) };
        buf.map(|b| b.to_string_lossy())
            .ok_or_else(|| self.last_error("escape_literal"))
    }

    pub fn escape_identifier(&self, s: &str) -> PqResult<String> {
        let conn = self.conn()?;
        let buf = unsafe {
            PqBuf::from_raw(pq_sys::PQescapeIdentifier(conn, s.as_ptr().cast(), s.len()))
        };
        buf.map(|b| b.to_string_lossy())
            .ok_or_else(|| self.last_error("escape_identifier"))
    }

    /// Escaped `bytea` text, without the terminating NUL.
    pub fn escape_bytea_conn(&self, from: &[u8]) -> PqResult<Vec<u8>> {
        let conn = self.conn()?;
        let mut len = 0usize;
        let buf = unsafe {
            PqBuf::from_raw(pq_sys::PQescapeByteaConn(conn, from.as_ptr(), from.len(), &mut len))
        }
        .ok_or_else(|| self.last_error("escape_bytea_conn"))?;
        // the reported length counts the trailing NUL
        Ok(unsafe { buf.to_vec(len.saturating_sub(1)) })
    }

    /// Encrypt a password for `ALTER ROLE ... PASSWORD`. Without an
    /// algorithm the server's `password_encryption` setting decides.
    pub fn encrypt_password_conn(
        &self,
        passwd: &str,
        user: &str,
        algorithm: Option<&str>,
    ) -> PqResult<String> {
        let conn = self.conn()?;
        let passwd = CString::new(passwd)?;
        let user = CString::new(user)?;
        let algorithm = algorithm.map(CString::new).transpose()?;
        let buf = unsafe {
            PqBuf::from_raw(pq_sys::PQencryptPasswordConn(
                conn,
                passwd.as_ptr(),
                user.as_ptr(),
                algorithm.as_ref().map_or(ptr::null(), |a| a.as_ptr()),
            ))
        };
        buf.map(|b| b.to_string_lossy())
            .ok_or_else(|| self.last_error("encrypt_password_conn"))
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.finish();
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("raw", &self.as_ptr())
            .field("trace", &self.trace)
            .finish()
    }
}
