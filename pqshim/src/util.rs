//! Free functions that need no connection.

use std::ffi::{c_int, CStr, CString};

use crate::error::{PqError, PqResult};
use crate::ffi;
use crate::mem::PqBuf;

/// libpq version as `MMmmpp` (e.g. 160004 for 16.4).
pub fn lib_version() -> i32 {
    unsafe { pq_sys::PQlibVersion() }
}

pub fn is_threadsafe() -> bool {
    unsafe { pq_sys::PQisthreadsafe() != 0 }
}

/// Probe a server without opening a session; returns a `PQPING_*` code.
pub fn ping(conninfo: &str) -> PqResult<i32> {
    let conninfo = CString::new(conninfo)?;
    Ok(unsafe { pq_sys::PQping(conninfo.as_ptr()) } as i32)
}

/// Decode the text representation of a `bytea` value.
pub fn unescape_bytea(text: &str) -> PqResult<Vec<u8>> {
    let text = CString::new(text)?;
    let mut len = 0usize;
    let buf = unsafe { PqBuf::from_raw(pq_sys::PQunescapeBytea(text.as_ptr().cast(), &mut len)) };
    buf.map(|b| unsafe { b.to_vec(len) })
        .ok_or_else(|| PqError::last_os_error("unescape_bytea"))
}

/// MD5-encrypt a password the way pre-SCRAM servers store it.
pub fn encrypt_password(passwd: &str, user: &str) -> PqResult<String> {
    let passwd = CString::new(passwd)?;
    let user = CString::new(user)?;
    let buf = unsafe { PqBuf::from_raw(pq_sys::PQencryptPassword(passwd.as_ptr(), user.as_ptr())) };
    buf.map(|b| b.to_string_lossy())
        .ok_or_else(|| PqError::last_os_error("encrypt_password"))
}

/// Encoding id named by `PGCLIENTENCODING`.
pub fn env2encoding() -> i32 {
    unsafe { pq_sys::PQenv2encoding() }
}

/// Byte length of the multibyte character at the start of `s`.
pub fn mblen(s: &str, encoding: i32) -> PqResult<i32> {
    let s = CString::new(s)?;
    Ok(unsafe { pq_sys::PQmblen(s.as_ptr(), encoding) })
}

/// Like [`mblen`] but never past the end of `s`.
pub fn mblen_bounded(s: &str, encoding: i32) -> PqResult<i32> {
    let s = CString::new(s)?;
    Ok(unsafe { pq_sys::PQmblenBounded(s.as_ptr(), encoding) })
}

/// Display width of the multibyte character at the start of `s`.
pub fn dsplen(s: &str, encoding: i32) -> PqResult<i32> {
    let s = CString::new(s)?;
    Ok(unsafe { pq_sys::PQdsplen(s.as_ptr(), encoding) })
}

/// Encoding id for an encoding name, or -1.
pub fn char_to_encoding(name: &str) -> PqResult<i32> {
    let name = CString::new(name)?;
    Ok(unsafe { ffi::pg_char_to_encoding(name.as_ptr()) })
}

/// Encoding name for an id; empty for unknown ids.
pub fn encoding_to_char(encoding: i32) -> String {
    let name = unsafe { ffi::pg_encoding_to_char(encoding as c_int) };
    if name.is_null() {
        return String::new();
    }
    unsafe { CStr::from_ptr(name) }.to_string_lossy().into_owned()
}

pub fn valid_server_encoding_id(encoding: i32) -> bool {
    unsafe { ffi::pg_valid_server_encoding_id(encoding as c_int) != 0 }
}
