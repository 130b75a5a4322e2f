//! Outcome tuples.
//!
//! Fallible operations hand libpq failures back as values instead of
//! raising. The tuple shapes come from [`pqshim::Outcome`]:
//!
//! - value: `(value, None)` or `(None, err)`
//! - status: `(True, None)` or `(False, err)`
//! - progress: `(True, None, False)`, `(False, err, False)`, or
//!   `(False, None, True)` when the call should be retried
//!
//! `err` is a `str` for libpq errors and an `OSError` for environment
//! errors. Any other `PqError` is raised.

use pyo3::prelude::*;
use pyo3::types::PyTuple;
use pyo3::IntoPyObjectExt;
use pqshim::{Outcome, PqError, PqResult, Progress};

use crate::error::{self, Result};

/// The Python value of an outcome error, or the error itself when it must
/// be raised.
fn error_value(py: Python<'_>, err: PqError) -> Result<PyObject> {
    match err {
        PqError::Native(msg) => Ok(msg.into_py_any(py)?),
        PqError::Os { context, source } => {
            Ok(error::os_error(context, &source).into_value(py).into_any())
        }
        other => Err(other.into()),
    }
}

/// Render an outcome as a two- or three-element tuple.
pub(crate) fn tuple<'py, T>(py: Python<'py>, outcome: Outcome<T>) -> Result<PyObject>
where
    T: IntoPyObject<'py>,
{
    let value = outcome.value.into_py_any(py)?;
    let error = match outcome.error {
        Some(err) => error_value(py, err)?,
        None => py.None(),
    };
    let items = match outcome.retry {
        Some(retry) => vec![value, error, retry.into_py_any(py)?],
        None => vec![value, error],
    };
    Ok(PyTuple::new(py, items)?.into_any().unbind())
}

pub(crate) fn value<'py, T>(py: Python<'py>, result: PqResult<T>) -> Result<PyObject>
where
    T: IntoPyObject<'py>,
{
    tuple(py, Outcome::value(result)?)
}

pub(crate) fn status(py: Python<'_>, result: PqResult<()>) -> Result<PyObject> {
    tuple(py, Outcome::status(result)?)
}

/// Like [`status`], but the success value is the operation's own boolean.
pub(crate) fn flag(py: Python<'_>, result: PqResult<bool>) -> Result<PyObject> {
    tuple(py, Outcome::flag(result)?)
}

pub(crate) fn progress(py: Python<'_>, result: PqResult<Progress>) -> Result<PyObject> {
    tuple(py, Outcome::progress(result)?)
}
