//! The `Connection` class.

use std::rc::Rc;

use pyo3::exceptions::PyTypeError;
use pyo3::prelude::*;
use pyo3::types::{PyBytes, PyString, PyTuple};
use pqshim::{
    ContextVisibility, ExecStatus, NoticeHandler, Outcome, PgResult, TraceFile, Verbosity,
};

use crate::cancel::Cancel;
use crate::error::Result;
use crate::notice::PyNoticeHandler;
use crate::notify::Notify;
use crate::params::extract_params;
use crate::reply;
use crate::result::QueryResult;
use crate::unlocked::without_gil;

/// A libpq connection.
#[pyclass(unsendable, module = "libpq", name = "Connection")]
pub struct Connection {
    inner: pqshim::Connection,
    processor: Option<Rc<PyNoticeHandler>>,
    receiver: Option<Rc<PyNoticeHandler>>,
    /// The Python file given to `trace`, returned by `untrace`.
    trace_file: Option<PyObject>,
}

impl Connection {
    pub(crate) fn new(inner: pqshim::Connection) -> Self {
        Self {
            inner,
            processor: None,
            receiver: None,
            trace_file: None,
        }
    }
}

/// Wrap a result produced by `slf`, keeping the connection alive with it.
fn attach(slf: &Bound<'_, Connection>, res: PgResult) -> QueryResult {
    QueryResult::new(res, Some(slf.clone().unbind()))
}

fn handler(
    func: Option<&Bound<'_, PyAny>>,
    args: &Bound<'_, PyTuple>,
) -> PyResult<Option<Rc<PyNoticeHandler>>> {
    match func {
        Some(func) if !func.is_none() => Ok(Some(PyNoticeHandler::new(func, args)?)),
        _ => Ok(None),
    }
}

fn as_dyn(handler: &Option<Rc<PyNoticeHandler>>) -> Option<Rc<dyn NoticeHandler>> {
    handler.clone().map(|h| h as Rc<dyn NoticeHandler>)
}

fn copy_bytes<'a>(data: &'a Bound<'_, PyAny>) -> PyResult<&'a [u8]> {
    if let Ok(text) = data.downcast::<PyString>() {
        return Ok(text.to_str()?.as_bytes());
    }
    match data.downcast::<PyBytes>() {
        Ok(bytes) => Ok(bytes.as_bytes()),
        Err(_) => Err(PyTypeError::new_err(format!(
            "copy data must be str or bytes, not {}",
            data.get_type().name()?
        ))),
    }
}

#[pymethods]
impl Connection {
    /// Close the connection. Safe to call more than once.
    fn finish(&mut self) {
        self.inner.finish();
        self.processor = None;
        self.receiver = None;
        self.trace_file = None;
    }

    fn conninfo(&self, py: Python<'_>) -> Result<PyObject> {
        let info = match self.inner.conninfo() {
            Ok(info) => Ok(pythonize::pythonize(py, &info)?),
            Err(err) => Err(err),
        };
        reply::value(py, info)
    }

    fn connect_poll(&self) -> Result<i32> {
        Ok(self.inner.connect_poll()?)
    }

    fn reset(&self, py: Python<'_>) -> Result<()> {
        Ok(without_gil(py, || self.inner.reset())?)
    }

    fn reset_start(&self, py: Python<'_>) -> Result<PyObject> {
        reply::status(py, self.inner.reset_start())
    }

    fn reset_poll(&self) -> Result<i32> {
        Ok(self.inner.reset_poll()?)
    }

    fn get_cancel(&self, py: Python<'_>) -> Result<PyObject> {
        reply::value(py, self.inner.get_cancel().map(Cancel::new))
    }

    fn request_cancel(&self, py: Python<'_>) -> Result<PyObject> {
        reply::status(py, self.inner.request_cancel())
    }

    // Status accessors

    fn db(&self) -> Result<Option<String>> {
        Ok(self.inner.db()?)
    }

    fn user(&self) -> Result<Option<String>> {
        Ok(self.inner.user()?)
    }

    fn pass_(&self) -> Result<Option<String>> {
        Ok(self.inner.pass()?)
    }

    fn host(&self) -> Result<Option<String>> {
        Ok(self.inner.host()?)
    }

    fn hostaddr(&self) -> Result<Option<String>> {
        Ok(self.inner.hostaddr()?)
    }

    fn port(&self) -> Result<Option<String>> {
        Ok(self.inner.port()?)
    }

    fn options(&self) -> Result<Option<String>> {
        Ok(self.inner.options()?)
    }

    fn status(&self) -> Result<i32> {
        Ok(self.inner.status()?)
    }

    fn transaction_status(&self) -> Result<i32> {
        Ok(self.inner.transaction_status()?)
    }

    fn parameter_status(&self, name: &str) -> Result<Option<String>> {
        Ok(self.inner.parameter_status(name)?)
    }

    fn protocol_version(&self) -> Result<i32> {
        Ok(self.inner.protocol_version()?)
    }

    fn server_version(&self) -> Result<i32> {
        Ok(self.inner.server_version()?)
    }

    fn error_message(&self) -> Result<Option<String>> {
        Ok(self.inner.error_message()?)
    }

    fn socket(&self) -> Result<i32> {
        Ok(self.inner.socket()?)
    }

    fn backend_pid(&self) -> Result<i32> {
        Ok(self.inner.backend_pid()?)
    }

    fn pipeline_status(&self) -> Result<i32> {
        Ok(self.inner.pipeline_status()?)
    }

    fn connection_needs_password(&self) -> Result<bool> {
        Ok(self.inner.connection_needs_password()?)
    }

    fn connection_used_password(&self) -> Result<bool> {
        Ok(self.inner.connection_used_password()?)
    }

    fn client_encoding(&self) -> Result<String> {
        Ok(self.inner.client_encoding()?)
    }

    fn set_client_encoding(&self, py: Python<'_>, encoding: &str) -> Result<PyObject> {
        reply::status(py, self.inner.set_client_encoding(encoding))
    }

    fn ssl_in_use(&self) -> Result<bool> {
        Ok(self.inner.ssl_in_use()?)
    }

    fn ssl_attribute(&self, name: &str) -> Result<Option<String>> {
        Ok(self.inner.ssl_attribute(name)?)
    }

    fn ssl_attribute_names(&self) -> Result<Vec<String>> {
        Ok(self.inner.ssl_attribute_names()?)
    }

    /// Returns the previous verbosity.
    fn set_error_verbosity(&self, verbosity: i32) -> Result<i32> {
        Ok(self.inner.set_error_verbosity(Verbosity::try_from(verbosity)?)?)
    }

    /// Returns the previous visibility.
    fn set_error_context_visibility(&self, visibility: i32) -> Result<i32> {
        Ok(self
            .inner
            .set_error_context_visibility(ContextVisibility::try_from(visibility)?)?)
    }

    // Notices

    /// Register `func` to receive notice messages as `func(*args, message)`.
    /// Without `func` the libpq default is restored.
    #[pyo3(signature = (func=None, *args))]
    fn set_notice_processor(
        &mut self,
        func: Option<&Bound<'_, PyAny>>,
        args: &Bound<'_, PyTuple>,
    ) -> Result<()> {
        let handler = handler(func, args)?;
        self.inner.set_notice_processor(as_dyn(&handler))?;
        self.processor = handler;
        Ok(())
    }

    /// Register `func` to receive notice results as `func(*args, result)`.
    /// The result is only valid during the call.
    #[pyo3(signature = (func=None, *args))]
    fn set_notice_receiver(
        &mut self,
        func: Option<&Bound<'_, PyAny>>,
        args: &Bound<'_, PyTuple>,
    ) -> Result<()> {
        let handler = handler(func, args)?;
        self.inner.set_notice_receiver(as_dyn(&handler))?;
        self.receiver = handler;
        Ok(())
    }

    /// Call the registered processor with `message`. Returns whether one is
    /// registered; exceptions propagate.
    fn call_notice_processor(&self, message: &Bound<'_, PyString>) -> Result<bool> {
        self.inner.status()?;
        match &self.processor {
            Some(handler) => {
                handler.call(message.py(), message.clone().into_any())?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn call_notice_receiver(&self, result: &Bound<'_, QueryResult>) -> Result<bool> {
        self.inner.status()?;
        result.borrow().inner().status()?;
        match &self.receiver {
            Some(handler) => {
                handler.call(result.py(), result.clone().into_any())?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // Tracing

    /// Write protocol traffic to `file` (any object with `fileno()`).
    fn trace(&mut self, py: Python<'_>, file: &Bound<'_, PyAny>) -> Result<PyObject> {
        file.call_method0("flush")?;
        let fd: i32 = file.call_method0("fileno")?.extract()?;
        let traced = TraceFile::from_fd(fd).and_then(|sink| self.inner.trace(sink));
        if traced.is_ok() {
            self.trace_file = Some(file.clone().unbind());
        }
        reply::status(py, traced)
    }

    /// Stop tracing; returns the file given to `trace`, if any.
    fn untrace(&mut self) -> Result<Option<PyObject>> {
        self.inner.untrace()?;
        Ok(self.trace_file.take())
    }

    #[pyo3(signature = (flags=0))]
    fn set_trace_flags(&self, flags: i32) -> Result<()> {
        Ok(self.inner.set_trace_flags(flags)?)
    }

    // Queries

    fn exec(slf: &Bound<'_, Self>, query: &str) -> Result<PyObject> {
        let this = slf.borrow();
        let res = without_gil(slf.py(), || this.inner.exec(query));
        reply::value(slf.py(), res.map(|r| attach(slf, r)))
    }

    #[pyo3(signature = (query, *params))]
    fn exec_params(
        slf: &Bound<'_, Self>,
        query: &str,
        params: &Bound<'_, PyTuple>,
    ) -> Result<PyObject> {
        let params = extract_params(params)?;
        let this = slf.borrow();
        let res = without_gil(slf.py(), || this.inner.exec_params(query, &params));
        reply::value(slf.py(), res.map(|r| attach(slf, r)))
    }

    fn send_query(&self, py: Python<'_>, query: &str) -> Result<PyObject> {
        reply::status(py, self.inner.send_query(query))
    }

    #[pyo3(signature = (query, *params))]
    fn send_query_params(
        &self,
        py: Python<'_>,
        query: &str,
        params: &Bound<'_, PyTuple>,
    ) -> Result<PyObject> {
        let params = extract_params(params)?;
        reply::status(py, self.inner.send_query_params(query, &params))
    }

    #[pyo3(signature = (name, query, nparams=0))]
    fn prepare(
        slf: &Bound<'_, Self>,
        name: &str,
        query: &str,
        nparams: i32,
    ) -> Result<PyObject> {
        let this = slf.borrow();
        let res = without_gil(slf.py(), || this.inner.prepare(name, query, nparams));
        reply::value(slf.py(), res.map(|r| attach(slf, r)))
    }

    #[pyo3(signature = (name, *params))]
    fn exec_prepared(
        slf: &Bound<'_, Self>,
        name: &str,
        params: &Bound<'_, PyTuple>,
    ) -> Result<PyObject> {
        let params = extract_params(params)?;
        let this = slf.borrow();
        let res = without_gil(slf.py(), || this.inner.exec_prepared(name, &params));
        reply::value(slf.py(), res.map(|r| attach(slf, r)))
    }

    #[pyo3(signature = (name, query, nparams=0))]
    fn send_prepare(
        &self,
        py: Python<'_>,
        name: &str,
        query: &str,
        nparams: i32,
    ) -> Result<PyObject> {
        reply::status(py, self.inner.send_prepare(name, query, nparams))
    }

    #[pyo3(signature = (name, *params))]
    fn send_query_prepared(
        &self,
        py: Python<'_>,
        name: &str,
        params: &Bound<'_, PyTuple>,
    ) -> Result<PyObject> {
        let params = extract_params(params)?;
        reply::status(py, self.inner.send_query_prepared(name, &params))
    }

    fn describe_prepared(slf: &Bound<'_, Self>, name: &str) -> Result<PyObject> {
        let this = slf.borrow();
        let res = without_gil(slf.py(), || this.inner.describe_prepared(name));
        reply::value(slf.py(), res.map(|r| attach(slf, r)))
    }

    fn describe_portal(slf: &Bound<'_, Self>, name: &str) -> Result<PyObject> {
        let this = slf.borrow();
        let res = without_gil(slf.py(), || this.inner.describe_portal(name));
        reply::value(slf.py(), res.map(|r| attach(slf, r)))
    }

    fn send_describe_prepared(&self, py: Python<'_>, name: &str) -> Result<PyObject> {
        reply::status(py, self.inner.send_describe_prepared(name))
    }

    fn send_describe_portal(&self, py: Python<'_>, name: &str) -> Result<PyObject> {
        reply::status(py, self.inner.send_describe_portal(name))
    }

    fn set_single_row_mode(&self) -> Result<bool> {
        Ok(self.inner.set_single_row_mode()?)
    }

    /// `(result, None)`, `(None, message)`, or `(None, None)` once there
    /// are no more results.
    fn get_result(slf: &Bound<'_, Self>) -> Result<PyObject> {
        let this = slf.borrow();
        let res = without_gil(slf.py(), || this.inner.get_result());
        reply::value(slf.py(), res.map(|r| r.map(|r| attach(slf, r))))
    }

    fn consume_input(&self, py: Python<'_>) -> Result<PyObject> {
        reply::status(py, self.inner.consume_input())
    }

    fn is_busy(&self, py: Python<'_>) -> Result<PyObject> {
        reply::flag(py, self.inner.is_busy())
    }

    // Pipeline mode

    fn enter_pipeline_mode(&self, py: Python<'_>) -> Result<PyObject> {
        reply::status(py, self.inner.enter_pipeline_mode())
    }

    fn exit_pipeline_mode(&self, py: Python<'_>) -> Result<PyObject> {
        reply::status(py, self.inner.exit_pipeline_mode())
    }

    fn pipeline_sync(&self, py: Python<'_>) -> Result<PyObject> {
        reply::status(py, self.inner.pipeline_sync())
    }

    fn send_flush_request(&self, py: Python<'_>) -> Result<PyObject> {
        reply::status(py, self.inner.send_flush_request())
    }

    /// `(Notify, None)`, `(None, None)` when nothing is queued, or
    /// `(None, message)`.
    fn notifies(&self, py: Python<'_>) -> Result<PyObject> {
        reply::value(py, self.inner.notifies().map(|n| n.map(Notify::new)))
    }

    // COPY

    fn put_copy_data(&self, py: Python<'_>, data: &Bound<'_, PyAny>) -> Result<PyObject> {
        let data = copy_bytes(data)?;
        reply::progress(py, without_gil(py, || self.inner.put_copy_data(data)))
    }

    #[pyo3(signature = (errormsg=None))]
    fn put_copy_end(&self, py: Python<'_>, errormsg: Option<&str>) -> Result<PyObject> {
        reply::progress(py, without_gil(py, || self.inner.put_copy_end(errormsg)))
    }

    /// `(row, None, False)`, `(None, None, True)` when no row is ready yet,
    /// `(None, None, False)` when the copy is done, or `(None, err, False)`.
    #[pyo3(signature = (async_=false))]
    fn get_copy_data(&self, py: Python<'_>, async_: bool) -> Result<PyObject> {
        let data = if async_ {
            self.inner.get_copy_data(true)
        } else {
            without_gil(py, || self.inner.get_copy_data(false))
        };
        let outcome = Outcome::copy_data(data)?;
        reply::tuple(py, outcome.map(|row| PyBytes::new(py, &row)))
    }

    // Non-blocking mode

    fn set_nonblocking(&self, py: Python<'_>, enabled: bool) -> Result<PyObject> {
        reply::status(py, self.inner.set_nonblocking(enabled))
    }

    fn is_nonblocking(&self) -> Result<bool> {
        Ok(self.inner.is_nonblocking()?)
    }

    fn flush(&self, py: Python<'_>) -> Result<PyObject> {
        reply::progress(py, without_gil(py, || self.inner.flush()))
    }

    // Misc

    #[pyo3(signature = (status=ExecStatus::CommandOk.code()))]
    fn make_empty_result(slf: &Bound<'_, Self>, status: i32) -> Result<PyObject> {
        let status = ExecStatus::try_from(status)?;
        let res = slf.borrow().inner.make_empty_result(status);
        reply::value(slf.py(), res.map(|r| attach(slf, r)))
    }

    fn escape_string_conn(&self, py: Python<'_>, s: &str) -> Result<PyObject> {
        reply::value(py, self.inner.escape_string_conn(s))
    }

    fn escape_literal(&self, py: Python<'_>, s: &str) -> Result<PyObject> {
        reply::value(py, self.inner.escape_literal(s))
    }

    fn escape_identifier(&self, py: Python<'_>, s: &str) -> Result<PyObject> {
        reply::value(py, self.inner.escape_identifier(s))
    }

    fn escape_bytea_conn(&self, py: Python<'_>, data: &[u8]) -> Result<PyObject> {
        let escaped = self.inner.escape_bytea_conn(data);
        reply::value(py, escaped.map(|b| PyBytes::new(py, &b)))
    }

    #[pyo3(signature = (passwd, user, algorithm=None))]
    fn encrypt_password_conn(
        &self,
        py: Python<'_>,
        passwd: &str,
        user: &str,
        algorithm: Option<&str>,
    ) -> Result<PyObject> {
        // without an algorithm libpq asks the server for password_encryption
        let encrypted =
            without_gil(py, || self.inner.encrypt_password_conn(passwd, user, algorithm));
        reply::value(py, encrypted)
    }

    fn __repr__(&self) -> String {
        match self.inner.status() {
            Ok(status) => format!("<Connection status={status}>"),
            Err(_) => "<Connection finished>".to_string(),
        }
    }
}
