//! Error conversion for the Python surface.
//!
//! Handle-layer failures split into outcomes (returned to the caller as a
//! value, see `reply`) and programming errors, which are raised here.

use pyo3::create_exception;
use pyo3::exceptions::{PyOSError, PyRuntimeError, PyTypeError, PyValueError};
use pyo3::PyErr;
use pqshim::PqError;
use thiserror::Error;

create_exception!(
    libpq,
    FreedObjectError,
    PyRuntimeError,
    "Raised when a connection, result, cancel or notify object is used after release."
);

#[derive(Error, Debug)]
pub enum BindingError {
    #[error(transparent)]
    Pq(#[from] PqError),

    #[error(transparent)]
    Python(#[from] PyErr),

    #[error("Conversion error: {0}")]
    Pythonize(#[from] pythonize::PythonizeError),
}

impl From<BindingError> for PyErr {
    fn from(err: BindingError) -> PyErr {
        match err {
            BindingError::Pq(err) => pq_to_py(err),
            BindingError::Python(err) => err,
            BindingError::Pythonize(err) => PyValueError::new_err(err.to_string()),
        }
    }
}

fn pq_to_py(err: PqError) -> PyErr {
    match err {
        PqError::Freed => FreedObjectError::new_err(err.to_string()),
        PqError::Param { .. } => PyTypeError::new_err(err.to_string()),
        PqError::Index { .. }
        | PqError::Enum { .. }
        | PqError::Nul(_)
        | PqError::TooManyParams { .. }
        | PqError::TooLarge { .. } => PyValueError::new_err(err.to_string()),
        PqError::Os { context, source } => os_error(context, &source),
        PqError::Native(msg) => PyRuntimeError::new_err(msg),
    }
}

/// An `OSError` (or the matching subclass) for `errno`.
pub(crate) fn os_error(context: &str, source: &std::io::Error) -> PyErr {
    let errno = source.raw_os_error().unwrap_or(0);
    PyOSError::new_err((errno, format!("{context}: {source}")))
}

pub type Result<T> = std::result::Result<T, BindingError>;
