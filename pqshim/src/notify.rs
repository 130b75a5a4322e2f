//! Asynchronous notifications (`LISTEN` / `NOTIFY`).

use pq_sys::PGnotify;

use crate::error::{PqError, PqResult};
use crate::mem::{self, PqBuf};

/// A `PGnotify` returned by `PQnotifies`, released with `PQfreemem`.
pub struct Notification {
    raw: Option<PqBuf<PGnotify>>,
}

impl Notification {
    /// # Safety
    /// `raw` must be NULL or a value returned by `PQnotifies`.
    pub(crate) unsafe fn from_raw(raw: *mut PGnotify) -> Option<Self> {
        PqBuf::from_raw(raw).map(|raw| Self { raw: Some(raw) })
    }

    fn get(&self) -> PqResult<&PGnotify> {
        let buf = self.raw.as_ref().ok_or(PqError::Freed)?;
        Ok(unsafe { &*buf.as_ptr() })
    }

    /// Channel name.
    pub fn relname(&self) -> PqResult<String> {
        Ok(unsafe { mem::string(self.get()?.relname) })
    }

    /// Payload string.
    pub fn extra(&self) -> PqResult<String> {
        Ok(unsafe { mem::string(self.get()?.extra) })
    }

    /// Process ID of the notifying backend.
    pub fn be_pid(&self) -> PqResult<i32> {
        Ok(self.get()?.be_pid)
    }

    pub fn is_freed(&self) -> bool {
        self.raw.is_none()
    }

    /// Safe to call more than once.
    pub fn free(&mut self) {
        self.raw = None;
    }
}
