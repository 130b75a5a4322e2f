use pyo3::prelude::*;

use crate::error::Result;

/// A `NOTIFY` delivered on a listening connection.
#[pyclass(unsendable, module = "libpq", name = "Notify")]
pub struct Notify {
    inner: pqshim::Notification,
}

impl Notify {
    pub(crate) fn new(inner: pqshim::Notification) -> Self {
        Self { inner }
    }
}

#[pymethods]
impl Notify {
    #[getter]
    fn relname(&self) -> Result<String> {
        Ok(self.inner.relname()?)
    }

    #[getter]
    fn extra(&self) -> Result<String> {
        Ok(self.inner.extra()?)
    }

    #[getter]
    fn be_pid(&self) -> Result<i32> {
        Ok(self.inner.be_pid()?)
    }

    fn free(&mut self) {
        self.inner.free();
    }

    fn __repr__(&self) -> String {
        match (self.inner.relname(), self.inner.be_pid()) {
            (Ok(relname), Ok(pid)) => format!("<Notify relname={relname:?} be_pid={pid}>"),
            _ => "<Notify freed>".to_string(),
        }
    }
}
