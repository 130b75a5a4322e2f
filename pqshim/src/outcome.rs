//! Return shapes for operations that report libpq failures as values.
//!
//! A binding renders an [`Outcome`] as a tuple: `(value, error)` for the
//! two-slot kinds, `(value, error, retry)` when `retry` is set. Errors that
//! are not outcomes ([`PqError::is_outcome`]) never land in an `Outcome`;
//! the constructors return them as `Err` so the binding can raise them.

use crate::conn::{CopyData, Progress};
use crate::error::{PqError, PqResult};

#[derive(Debug)]
pub struct Outcome<T> {
    /// First slot; `None` renders as the host's null.
    pub value: Option<T>,
    pub error: Option<PqError>,
    /// Third slot, present only for progress-style operations.
    pub retry: Option<bool>,
}

/// Split `err` into an outcome error, or hand it back to be raised.
fn failure(err: PqError) -> PqResult<PqError> {
    if err.is_outcome() {
        Ok(err)
    } else {
        Err(err)
    }
}

impl<T> Outcome<T> {
    fn new(value: Option<T>, error: Option<PqError>, retry: Option<bool>) -> Self {
        Self {
            value,
            error,
            retry,
        }
    }

    /// `(value, None)` or `(None, err)`.
    pub fn value(result: PqResult<T>) -> PqResult<Self> {
        Ok(match result {
            Ok(v) => Self::new(Some(v), None, None),
            Err(err) => Self::new(None, Some(failure(err)?), None),
        })
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome {
            value: self.value.map(f),
            error: self.error,
            retry: self.retry,
        }
    }
}

impl Outcome<bool> {
    /// `(True, None)` or `(False, err)`.
    pub fn status(result: PqResult<()>) -> PqResult<Self> {
        Self::flag(result.map(|()| true))
    }

    /// `(flag, None)` or `(False, err)`.
    pub fn flag(result: PqResult<bool>) -> PqResult<Self> {
        Ok(match result {
            Ok(b) => Self::new(Some(b), None, None),
            Err(err) => Self::new(Some(false), Some(failure(err)?), None),
        })
    }

    /// `(True, None, False)`, `(False, None, True)` when the call should be
    /// retried, or `(False, err, False)`.
    pub fn progress(result: PqResult<Progress>) -> PqResult<Self> {
        Ok(match result {
            Ok(Progress::Done) => Self::new(Some(true), None, Some(false)),
            Ok(Progress::WouldBlock) => Self::new(Some(false), None, Some(true)),
            Err(err) => Self::new(Some(false), Some(failure(err)?), Some(false)),
        })
    }
}

impl Outcome<Vec<u8>> {
    /// `(row, None, False)`, `(None, None, True)` while no row is ready,
    /// `(None, None, False)` once the copy is over, or `(None, err, False)`.
    pub fn copy_data(result: PqResult<CopyData>) -> PqResult<Self> {
        Ok(match result {
            Ok(CopyData::Row(row)) => Self::new(Some(row), None, Some(false)),
            Ok(CopyData::Pending) => Self::new(None, None, Some(true)),
            Ok(CopyData::Done) => Self::new(None, None, Some(false)),
            Err(err) => Self::new(None, Some(failure(err)?), Some(false)),
        })
    }
}
