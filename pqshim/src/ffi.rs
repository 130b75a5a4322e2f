//! libpq exports that `libpq-fe.h` does not declare.
//!
//! The encoding-name helpers live in libpq's shared `encnames.c`; they are
//! exported from the library but only prototyped in the server's
//! `mb/pg_wchar.h`, so `pq-sys` has no bindings for them.

use std::ffi::{c_char, c_int};

extern "C" {
    pub fn pg_encoding_to_char(encoding: c_int) -> *const c_char;
    pub fn pg_char_to_encoding(name: *const c_char) -> c_int;
    pub fn pg_valid_server_encoding_id(encoding: c_int) -> c_int;
}
