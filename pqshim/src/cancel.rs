//! Cancel tokens.

use std::ffi::{c_char, c_int, CStr};
use std::ptr::NonNull;

use pq_sys::PGcancel;

use crate::error::{PqError, PqResult};

const ERRBUF_LEN: usize = 256;

/// A `PGcancel` obtained from a live connection.
///
/// libpq documents `PQcancel` as safe to call from a thread other than the
/// one running the query, which is the point of having a separate token.
pub struct Cancel {
    raw: Option<NonNull<PGcancel>>,
}

// SAFETY: a PGcancel is an immutable copy of the connection's address and
// secret key; PQcancel only reads it and uses a caller-supplied error buffer.
unsafe impl Send for Cancel {}
unsafe impl Sync for Cancel {}

impl Cancel {
    /// # Safety
    /// `raw` must be NULL or a token from `PQgetCancel` nobody else frees.
    pub(crate) unsafe fn from_raw(raw: *mut PGcancel) -> Option<Self> {
        NonNull::new(raw).map(|raw| Self { raw: Some(raw) })
    }

    pub fn is_freed(&self) -> bool {
        self.raw.is_none()
    }

    /// Ask the server to abandon the current command.
    pub fn cancel(&self) -> PqResult<()> {
        let raw = self.raw.ok_or(PqError::Freed)?;
        let mut errbuf = [0 as c_char; ERRBUF_LEN];
        let sent = unsafe {
            pq_sys::PQcancel(raw.as_ptr(), errbuf.as_mut_ptr(), ERRBUF_LEN as c_int)
        };
        if sent != 0 {
            return Ok(());
        }
        // PQcancel always NUL-terminates within errbufsize
        let msg = unsafe { CStr::from_ptr(errbuf.as_ptr()) };
        Err(PqError::Native(msg.to_string_lossy().into_owned()))
    }

    /// Release the token. Safe to call more than once.
    pub fn free(&mut self) {
        if let Some(raw) = self.raw.take() {
            unsafe { pq_sys::PQfreeCancel(raw.as_ptr()) }
        }
    }
}

impl Drop for Cancel {
    fn drop(&mut self) {
        self.free();
    }
}
