//! Result handles.
//!
//! Row, column and parameter indexes are 1-based everywhere in this module
//! and converted to libpq's 0-based numbering with [`native_index`] before
//! any native call.

use std::ffi::{c_int, CString};
use std::marker::PhantomData;
use std::ptr::{self, NonNull};
use std::rc::Rc;

use pq_sys::PGresult;

use crate::constants::{ContextVisibility, ExecStatus, Verbosity};
use crate::error::{PqError, PqResult};
use crate::mem::{self, PqBuf};
use crate::notice::NoticeHooks;
use crate::stat::{self, FieldStat, ResultView, StatSummary};

/// Convert a caller's 1-based index into libpq's 0-based one.
///
/// Zero, negative and out-of-`int` values are rejected here so they never
/// reach libpq.
pub fn native_index(what: &'static str, value: i64) -> PqResult<c_int> {
    if value < 1 || value > i64::from(c_int::MAX) {
        return Err(PqError::Index { what, value });
    }
    Ok((value - 1) as c_int)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ownership {
    /// Freed with `PQclear` on release.
    Owned,
    /// Lifetime managed by libpq (notice receiver results); release only
    /// detaches.
    Observed,
}

/// A `PGresult` handle.
pub struct PgResult {
    raw: Option<NonNull<PGresult>>,
    ownership: Ownership,
    // Keeps the notice trampoline argument alive; libpq copied it into this
    // result when the result was created.
    _hooks: Option<Rc<NoticeHooks>>,
}

impl PgResult {
    /// # Safety
    /// `raw` must be NULL or a result nobody else will `PQclear`.
    pub(crate) unsafe fn owned(raw: *mut PGresult, hooks: Option<Rc<NoticeHooks>>) -> Option<Self> {
        NonNull::new(raw).map(|raw| Self {
            raw: Some(raw),
            ownership: Ownership::Owned,
            _hooks: hooks,
        })
    }

    /// Wrap a result owned by libpq without taking ownership.
    ///
    /// # Safety
    /// The caller must [`clear`](Self::clear) this handle (or drop it)
    /// before libpq frees `raw`.
    pub unsafe fn observe(raw: *mut PGresult) -> Self {
        Self {
            raw: NonNull::new(raw),
            ownership: Ownership::Observed,
            _hooks: None,
        }
    }

    /// Take ownership of a raw result produced outside this crate.
    ///
    /// # Safety
    /// `raw` must be NULL or a result nobody else will `PQclear`.
    pub unsafe fn from_raw(raw: *mut PGresult) -> Option<Self> {
        Self::owned(raw, None)
    }

    /// The native pointer, or NULL once cleared.
    pub fn as_ptr(&self) -> *mut PGresult {
        self.raw.map_or(ptr::null_mut(), NonNull::as_ptr)
    }

    pub fn is_observed(&self) -> bool {
        self.ownership == Ownership::Observed
    }

    pub fn is_cleared(&self) -> bool {
        self.raw.is_none()
    }

    /// Release the result. Safe to call more than once.
    pub fn clear(&mut self) {
        if let Some(raw) = self.raw.take() {
            if self.ownership == Ownership::Owned {
                unsafe { pq_sys::PQclear(raw.as_ptr()) }
            }
        }
        self._hooks = None;
    }

    fn raw(&self) -> PqResult<*mut PGresult> {
        self.raw.map(NonNull::as_ptr).ok_or(PqError::Freed)
    }

    fn view(&self) -> PqResult<NativeView<'_>> {
        let raw = self.raw.ok_or(PqError::Freed)?;
        Ok(NativeView {
            raw,
            _result: PhantomData,
        })
    }

    /// Raw `ExecStatusType` value.
    pub fn status(&self) -> PqResult<i32> {
        Ok(self.view()?.status())
    }

    /// `PQresStatus` text for the result's status.
    pub fn status_text(&self) -> PqResult<String> {
        Ok(self.view()?.status_text())
    }

    pub fn exec_status(&self) -> PqResult<Option<ExecStatus>> {
        Ok(ExecStatus::try_from(self.status()?).ok())
    }

    /// The error message, or `None` when the result carries none.
    pub fn error_message(&self) -> PqResult<Option<String>> {
        let msg = self.view()?.error_message();
        Ok((!msg.is_empty()).then_some(msg))
    }

    pub fn verbose_error_message(
        &self,
        verbosity: Verbosity,
        show_context: ContextVisibility,
    ) -> PqResult<String> {
        let raw = self.raw()?;
        let msg = unsafe {
            PqBuf::from_raw(pq_sys::PQresultVerboseErrorMessage(
                raw,
                verbosity.to_native(),
                show_context.to_native(),
            ))
        };
        msg.map(|m| m.to_string_lossy())
            .ok_or_else(|| PqError::last_os_error("verbose_error_message"))
    }

    /// A single diagnostic field, by its `PG_DIAG_*` code.
    pub fn error_field(&self, code: i32) -> PqResult<Option<String>> {
        let raw = self.raw()?;
        Ok(unsafe { mem::opt_string(pq_sys::PQresultErrorField(raw, code)) })
    }

    pub fn ntuples(&self) -> PqResult<i32> {
        Ok(self.view()?.ntuples())
    }

    pub fn nfields(&self) -> PqResult<i32> {
        Ok(self.view()?.nfields())
    }

    pub fn binary_tuples(&self) -> PqResult<bool> {
        Ok(self.view()?.binary_tuples())
    }

    pub fn fname(&self, col: i64) -> PqResult<Option<String>> {
        let raw = self.raw()?;
        let col = native_index("column", col)?;
        Ok(unsafe { mem::opt_string(pq_sys::PQfname(raw, col)) })
    }

    /// 1-based column number of `name`, or -1 when there is no such column.
    pub fn fnumber(&self, name: &str) -> PqResult<i32> {
        let raw = self.raw()?;
        let name = CString::new(name)?;
        let col = unsafe { pq_sys::PQfnumber(raw, name.as_ptr()) };
        Ok(if col < 0 { -1 } else { col + 1 })
    }

    pub fn ftable(&self, col: i64) -> PqResult<u32> {
        let raw = self.raw()?;
        let col = native_index("column", col)?;
        Ok(unsafe { pq_sys::PQftable(raw, col) })
    }

    pub fn ftablecol(&self, col: i64) -> PqResult<i32> {
        let raw = self.raw()?;
        let col = native_index("column", col)?;
        Ok(unsafe { pq_sys::PQftablecol(raw, col) })
    }

    pub fn fformat(&self, col: i64) -> PqResult<i32> {
        let raw = self.raw()?;
        let col = native_index("column", col)?;
        Ok(unsafe { pq_sys::PQfformat(raw, col) })
    }

    pub fn ftype(&self, col: i64) -> PqResult<u32> {
        let raw = self.raw()?;
        let col = native_index("column", col)?;
        Ok(unsafe { pq_sys::PQftype(raw, col) })
    }

    pub fn fsize(&self, col: i64) -> PqResult<i32> {
        let raw = self.raw()?;
        let col = native_index("column", col)?;
        Ok(unsafe { pq_sys::PQfsize(raw, col) })
    }

    pub fn fmod(&self, col: i64) -> PqResult<i32> {
        let raw = self.raw()?;
        let col = native_index("column", col)?;
        Ok(unsafe { pq_sys::PQfmod(raw, col) })
    }

    pub fn cmd_status(&self) -> PqResult<String> {
        Ok(self.view()?.cmd_status())
    }

    pub fn oid_value(&self) -> PqResult<u32> {
        Ok(self.view()?.oid_value())
    }

    /// Rows affected by the command, when libpq reports a count.
    pub fn cmd_tuples(&self) -> PqResult<Option<u64>> {
        Ok(stat::parse_cmd_tuples(&self.view()?.cmd_tuples_text()))
    }

    /// Raw cell bytes. `None` when libpq rejects the position; SQL NULL is
    /// an empty slice (see [`get_is_null`](Self::get_is_null)).
    pub fn get_value(&self, row: i64, col: i64) -> PqResult<Option<&[u8]>> {
        let raw = self.raw()?;
        let row = native_index("row", row)?;
        let col = native_index("column", col)?;
        unsafe {
            let value = pq_sys::PQgetvalue(raw, row, col);
            if value.is_null() {
                return Ok(None);
            }
            let len = pq_sys::PQgetlength(raw, row, col).max(0) as usize;
            Ok(Some(std::slice::from_raw_parts(value.cast::<u8>(), len)))
        }
    }

    pub fn get_length(&self, row: i64, col: i64) -> PqResult<i32> {
        let raw = self.raw()?;
        let row = native_index("row", row)?;
        let col = native_index("column", col)?;
        Ok(unsafe { pq_sys::PQgetlength(raw, row, col) })
    }

    pub fn get_is_null(&self, row: i64, col: i64) -> PqResult<bool> {
        let raw = self.raw()?;
        let row = native_index("row", row)?;
        let col = native_index("column", col)?;
        Ok(unsafe { pq_sys::PQgetisnull(raw, row, col) } != 0)
    }

    pub fn nparams(&self) -> PqResult<i32> {
        Ok(self.view()?.nparams())
    }

    /// Type OID of the 1-based parameter `param`.
    pub fn param_type(&self, param: i64) -> PqResult<u32> {
        let raw = self.raw()?;
        let param = native_index("parameter", param)?;
        Ok(unsafe { pq_sys::PQparamtype(raw, param) })
    }

    /// Summary of the result, see [`stat::summarize`].
    pub fn stat(&self) -> PqResult<StatSummary> {
        Ok(stat::summarize(&self.view()?))
    }
}

impl Drop for PgResult {
    fn drop(&mut self) {
        self.clear();
    }
}

impl std::fmt::Debug for PgResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgResult")
            .field("raw", &self.as_ptr())
            .field("ownership", &self.ownership)
            .finish()
    }
}

/// A live result, borrowed for the duration of a read.
struct NativeView<'a> {
    raw: NonNull<PGresult>,
    _result: PhantomData<&'a PgResult>,
}

impl NativeView<'_> {
    #[inline]
    fn ptr(&self) -> *mut PGresult {
        self.raw.as_ptr()
    }
}

impl ResultView for NativeView<'_> {
    fn status(&self) -> i32 {
        unsafe { pq_sys::PQresultStatus(self.ptr()) as i32 }
    }

    fn status_text(&self) -> String {
        unsafe { mem::string(pq_sys::PQresStatus(pq_sys::PQresultStatus(self.ptr()))) }
    }

    fn cmd_status(&self) -> String {
        unsafe { mem::string(pq_sys::PQcmdStatus(self.ptr())) }
    }

    fn ntuples(&self) -> i32 {
        unsafe { pq_sys::PQntuples(self.ptr()) }
    }

    fn nfields(&self) -> i32 {
        unsafe { pq_sys::PQnfields(self.ptr()) }
    }

    fn binary_tuples(&self) -> bool {
        unsafe { pq_sys::PQbinaryTuples(self.ptr()) != 0 }
    }

    fn field(&self, col: i32) -> FieldStat {
        let res = self.ptr();
        unsafe {
            FieldStat {
                name: mem::string(pq_sys::PQfname(res, col)),
                table: pq_sys::PQftable(res, col),
                tablecol: pq_sys::PQftablecol(res, col),
                format: pq_sys::PQfformat(res, col),
                type_oid: pq_sys::PQftype(res, col),
                size: pq_sys::PQfsize(res, col),
                modifier: pq_sys::PQfmod(res, col),
            }
        }
    }

    fn cmd_tuples_text(&self) -> String {
        unsafe { mem::string(pq_sys::PQcmdTuples(self.ptr())) }
    }

    fn oid_value(&self) -> u32 {
        unsafe { pq_sys::PQoidValue(self.ptr()) }
    }

    fn nparams(&self) -> i32 {
        unsafe { pq_sys::PQnparams(self.ptr()) }
    }

    fn param_type(&self, param: i32) -> u32 {
        unsafe { pq_sys::PQparamtype(self.ptr(), param) }
    }

    fn error_message(&self) -> String {
        unsafe { mem::string(pq_sys::PQresultErrorMessage(self.ptr())) }
    }
}
