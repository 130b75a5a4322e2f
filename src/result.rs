//! The `Result` class.

use pyo3::prelude::*;
use pyo3::types::{PyBytes, PyString};
use pyo3::IntoPyObjectExt;
use pqshim::{ContextVisibility, PgResult, Verbosity};

use crate::connection::Connection;
use crate::error::Result;

const DEFAULT_VERBOSITY: i32 = Verbosity::Default.code();
const DEFAULT_CONTEXT: i32 = ContextVisibility::Errors.code();

/// A query result.
///
/// Row, column and parameter numbers are 1-based.
#[pyclass(unsendable, module = "libpq", name = "Result")]
pub struct QueryResult {
    inner: PgResult,
    /// The connection that produced this result; `None` for results handed
    /// to a notice receiver.
    connection: Option<Py<Connection>>,
}

impl QueryResult {
    pub(crate) fn new(inner: PgResult, connection: Option<Py<Connection>>) -> Self {
        Self { inner, connection }
    }

    pub(crate) fn inner(&self) -> &PgResult {
        &self.inner
    }

    /// Drop the native result (or detach an observed one).
    pub(crate) fn detach(&mut self) {
        self.inner.clear();
    }
}

#[pymethods]
impl QueryResult {
    fn clear(&mut self) {
        self.inner.clear();
        self.connection = None;
    }

    fn connection(&self, py: Python<'_>) -> Option<Py<Connection>> {
        self.connection.as_ref().map(|c| c.clone_ref(py))
    }

    /// `(code, text)`
    fn status(&self) -> Result<(i32, String)> {
        Ok((self.inner.status()?, self.inner.status_text()?))
    }

    fn error_message(&self) -> Result<Option<String>> {
        Ok(self.inner.error_message()?)
    }

    #[pyo3(signature = (verbosity=DEFAULT_VERBOSITY, show_context=DEFAULT_CONTEXT))]
    fn verbose_error_message(&self, verbosity: i32, show_context: i32) -> Result<String> {
        Ok(self.inner.verbose_error_message(
            Verbosity::try_from(verbosity)?,
            ContextVisibility::try_from(show_context)?,
        )?)
    }

    fn error_field(&self, code: i32) -> Result<Option<String>> {
        Ok(self.inner.error_field(code)?)
    }

    fn ntuples(&self) -> Result<i32> {
        Ok(self.inner.ntuples()?)
    }

    fn nfields(&self) -> Result<i32> {
        Ok(self.inner.nfields()?)
    }

    fn binary_tuples(&self) -> Result<bool> {
        Ok(self.inner.binary_tuples()?)
    }

    fn fname(&self, col: i64) -> Result<Option<String>> {
        Ok(self.inner.fname(col)?)
    }

    /// 1-based column number, or -1.
    fn fnumber(&self, name: &str) -> Result<i32> {
        Ok(self.inner.fnumber(name)?)
    }

    fn ftable(&self, col: i64) -> Result<u32> {
        Ok(self.inner.ftable(col)?)
    }

    fn ftablecol(&self, col: i64) -> Result<i32> {
        Ok(self.inner.ftablecol(col)?)
    }

    fn fformat(&self, col: i64) -> Result<i32> {
        Ok(self.inner.fformat(col)?)
    }

    fn ftype(&self, col: i64) -> Result<u32> {
        Ok(self.inner.ftype(col)?)
    }

    fn fsize(&self, col: i64) -> Result<i32> {
        Ok(self.inner.fsize(col)?)
    }

    fn fmod(&self, col: i64) -> Result<i32> {
        Ok(self.inner.fmod(col)?)
    }

    fn cmd_status(&self) -> Result<String> {
        Ok(self.inner.cmd_status()?)
    }

    fn oid_value(&self) -> Result<u32> {
        Ok(self.inner.oid_value()?)
    }

    fn cmd_tuples(&self) -> Result<Option<u64>> {
        Ok(self.inner.cmd_tuples()?)
    }

    /// Cell value: `str` for text columns (`bytes` if not valid UTF-8),
    /// `bytes` for binary columns, `None` for SQL NULL or a position outside
    /// the result.
    fn get_value(&self, py: Python<'_>, row: i64, col: i64) -> Result<PyObject> {
        let Some(value) = self.inner.get_value(row, col)? else {
            return Ok(py.None());
        };
        if self.inner.get_is_null(row, col)? {
            return Ok(py.None());
        }
        if self.inner.fformat(col)? == 0 {
            if let Ok(text) = std::str::from_utf8(value) {
                return Ok(PyString::new(py, text).into_any().unbind());
            }
        }
        Ok(PyBytes::new(py, value).into_py_any(py)?)
    }

    fn get_length(&self, row: i64, col: i64) -> Result<i32> {
        Ok(self.inner.get_length(row, col)?)
    }

    fn get_is_null(&self, row: i64, col: i64) -> Result<bool> {
        Ok(self.inner.get_is_null(row, col)?)
    }

    fn nparams(&self) -> Result<i32> {
        Ok(self.inner.nparams()?)
    }

    fn param_type(&self, param: i64) -> Result<u32> {
        Ok(self.inner.param_type(param)?)
    }

    /// Summary dict; keys depend on the status.
    fn stat<'py>(&self, py: Python<'py>) -> Result<Bound<'py, PyAny>> {
        Ok(pythonize::pythonize(py, &self.inner.stat()?)?)
    }

    fn __repr__(&self) -> String {
        match (self.inner.status_text(), self.inner.ntuples()) {
            (Ok(status), Ok(n)) => format!("<Result {status} ntuples={n}>"),
            _ => "<Result cleared>".to_string(),
        }
    }
}
