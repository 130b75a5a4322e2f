//! Lifecycle-managed handles over libpq.
//!
//! This crate wraps the libpq client library for embedding in a scripting
//! language. It implements none of the PostgreSQL protocol itself; every
//! operation is a call into libpq.
//!
//! Architecture:
//! - `conn`: connection handle, queries, COPY, pipeline and non-blocking I/O
//! - `result`: result handle and its 1-based accessors
//! - `stat`: status-dependent summary of a result
//! - `notice`: notice processor / receiver trampolines
//! - `params`: text-format query parameters
//! - `cancel`, `notify`, `trace`, `conninfo`: the smaller libpq objects
//! - `util`: free functions that need no connection
//! - `outcome`: value-or-error shapes handed to the host language
//!
//! Every handle keeps its native pointer in an `Option`. Releasing a handle
//! sets it to `None`; any later use fails with [`PqError::Freed`].

pub mod cancel;
pub mod conn;
pub mod conninfo;
pub mod constants;
pub mod error;
mod ffi;
mod mem;
pub mod notice;
pub mod notify;
pub mod outcome;
pub mod params;
pub mod result;
pub mod stat;
pub mod trace;
pub mod util;

#[cfg(test)]
mod tests;

pub use cancel::Cancel;
pub use conn::{Connection, CopyData, Progress};
pub use conninfo::{default_conninfo, parse_conninfo, Conninfo, ConninfoOption};
pub use constants::{
    ConnStatus, ContextVisibility, DiagField, ExecStatus, PipelineStatus, PollingStatus,
    TransactionStatus, Verbosity,
};
pub use error::{PqError, PqResult};
pub use notice::{Notice, NoticeHandler};
pub use notify::Notification;
pub use outcome::Outcome;
pub use params::Param;
pub use result::{native_index, PgResult};
pub use stat::{summarize, FieldStat, ResultView, StatSummary};
pub use trace::TraceFile;
