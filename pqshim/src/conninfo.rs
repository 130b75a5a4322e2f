//! Connection-info option tables (`PQconninfoOption` arrays).

use std::collections::BTreeMap;
use std::ffi::{c_char, CString};
use std::ptr::{self, NonNull};

use pq_sys::PQconninfoOption;
use serde::Serialize;

use crate::error::{PqError, PqResult};
use crate::mem::{self, PqBuf};

/// One connection option as libpq describes it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConninfoOption {
    /// Fallback environment variable name.
    pub envvar: Option<String>,
    /// Fallback compiled-in default value.
    pub compiled: Option<String>,
    /// Current value, if set.
    pub val: Option<String>,
    /// Label for the field in a connect dialog.
    pub label: Option<String>,
    /// `""` show as is, `"*"` password (hide), `"D"` debug option.
    pub dispchar: Option<String>,
    /// Field size in characters for a dialog.
    pub dispsize: i32,
}

/// Option keyword to its description.
pub type Conninfo = BTreeMap<String, ConninfoOption>;

/// Owned option array, released with `PQconninfoFree`.
struct OptionArray(NonNull<PQconninfoOption>);

impl OptionArray {
    fn new(raw: *mut PQconninfoOption) -> Option<Self> {
        NonNull::new(raw).map(OptionArray)
    }

    fn collect(&self) -> Conninfo {
        let mut options = Conninfo::new();
        let mut opt = self.0.as_ptr();
        unsafe {
            // the array ends with an entry whose keyword is NULL
            while !(*opt).keyword.is_null() {
                let o = &*opt;
                options.insert(
                    mem::string(o.keyword),
                    ConninfoOption {
                        envvar: mem::opt_string(o.envvar),
                        compiled: mem::opt_string(o.compiled),
                        val: mem::opt_string(o.val),
                        label: mem::opt_string(o.label),
                        dispchar: mem::opt_string(o.dispchar),
                        dispsize: o.dispsize,
                    },
                );
                opt = opt.add(1);
            }
        }
        options
    }
}

impl Drop for OptionArray {
    fn drop(&mut self) {
        unsafe { pq_sys::PQconninfoFree(self.0.as_ptr()) }
    }
}

/// Parse a conninfo string (keyword/value or URI form).
pub fn parse_conninfo(conninfo: &str) -> PqResult<Conninfo> {
    let conninfo = CString::new(conninfo)?;
    let mut errmsg: *mut c_char = ptr::null_mut();
    let options =
        OptionArray::new(unsafe { pq_sys::PQconninfoParse(conninfo.as_ptr(), &mut errmsg) });
    let errmsg = unsafe { PqBuf::from_raw(errmsg) };

    match (options, errmsg) {
        (Some(options), _) => Ok(options.collect()),
        (None, Some(msg)) => Err(PqError::Native(msg.to_string_lossy())),
        // libpq leaves errmsg NULL only when it ran out of memory
        (None, None) => Err(PqError::last_os_error("parse_conninfo")),
    }
}

/// Compiled-in defaults, with environment overrides applied.
pub fn default_conninfo() -> PqResult<Conninfo> {
    OptionArray::new(unsafe { pq_sys::PQconndefaults() })
        .map(|options| options.collect())
        .ok_or_else(|| PqError::last_os_error("default_conninfo"))
}

/// Options in effect on a connection.
///
/// # Safety
/// `conn` must be a live connection.
pub(crate) unsafe fn connection_conninfo(conn: *mut pq_sys::PGconn) -> PqResult<Conninfo> {
    OptionArray::new(pq_sys::PQconninfo(conn))
        .map(|options| options.collect())
        .ok_or_else(|| PqError::last_os_error("conninfo"))
}
