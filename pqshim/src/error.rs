//! Error types for the libpq handle layer.
//!
//! Two kinds of failure come out of this crate. `Native` and `Os` are
//! ordinary outcomes that a binding hands back to its caller as a value.
//! Everything else is a programming error (a freed handle, a bad index, an
//! unsupported parameter) that a binding should raise.

use std::ffi::NulError;
use std::io;

use thiserror::Error;

/// Result type for libpq handle operations.
pub type PqResult<T> = Result<T, PqError>;

#[derive(Error, Debug)]
pub enum PqError {
    /// The handle was already released.
    #[error("attempt to use a freed object")]
    Freed,

    /// libpq reported a failure; the text comes from `PQerrorMessage` or
    /// `PQresultErrorMessage`.
    #[error("{0}")]
    Native(String),

    /// The failure originates from the process environment (usually an
    /// allocation failure inside libpq), so only `errno` is meaningful.
    #[error("{context}: {source}")]
    Os {
        context: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("{what} must be a positive integer, got {value}")]
    Index { what: &'static str, value: i64 },

    #[error("bad argument #{position} (<{type_name}> param is not supported)")]
    Param { position: usize, type_name: String },

    #[error("too many query parameters: {count} (limit {limit})")]
    TooManyParams { count: usize, limit: usize },

    #[error("{what} of {len} bytes exceeds the libpq limit")]
    TooLarge { what: &'static str, len: usize },

    #[error("string contains an interior NUL byte")]
    Nul(#[from] NulError),

    #[error("{value} is not a valid {kind} value")]
    Enum { kind: &'static str, value: i32 },
}

impl PqError {
    /// Capture `errno` right after a libpq call returned NULL.
    pub(crate) fn last_os_error(context: &'static str) -> Self {
        PqError::Os {
            context,
            source: io::Error::last_os_error(),
        }
    }

    /// Whether this error is an outcome to return rather than raise.
    pub fn is_outcome(&self) -> bool {
        matches!(self, PqError::Native(_) | PqError::Os { .. })
    }
}
