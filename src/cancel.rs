use pyo3::prelude::*;

use crate::error::Result;
use crate::reply;

/// A cancel token; usable from any thread.
#[pyclass(module = "libpq", name = "Cancel")]
pub struct Cancel {
    inner: pqshim::Cancel,
}

impl Cancel {
    pub(crate) fn new(inner: pqshim::Cancel) -> Self {
        Self { inner }
    }
}

#[pymethods]
impl Cancel {
    fn free(&mut self) {
        self.inner.free();
    }

    /// Ask the server to abandon the running command. Returns
    /// `(True, None)` or `(False, message)`.
    fn cancel(&self, py: Python<'_>) -> Result<PyObject> {
        let inner = &self.inner;
        // PQcancel blocks on a fresh socket
        let sent = py.allow_threads(|| inner.cancel());
        reply::status(py, sent)
    }

    fn __repr__(&self) -> &'static str {
        if self.inner.is_freed() {
            "<Cancel freed>"
        } else {
            "<Cancel>"
        }
    }
}
