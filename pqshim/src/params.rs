//! Query parameter marshaling.
//!
//! Every parameter is sent to libpq in text format with no explicit type
//! OID; the server infers types from the statement. There is no binary
//! parameter path.

use std::borrow::Cow;
use std::ffi::{c_char, c_int, CString};
use std::ptr;

use smallvec::SmallVec;

use crate::constants::PQ_QUERY_PARAM_MAX_LIMIT;
use crate::error::{PqError, PqResult};

/// A single query parameter, before conversion to its text form.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    /// SQL NULL.
    Null,
    Text(String),
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl Param {
    /// The text libpq receives, or `None` for SQL NULL.
    pub fn to_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Param::Null => None,
            Param::Text(s) => Some(Cow::Borrowed(s)),
            Param::Bool(true) => Some(Cow::Borrowed("TRUE")),
            Param::Bool(false) => Some(Cow::Borrowed("FALSE")),
            Param::Int(i) => Some(Cow::Owned(i.to_string())),
            Param::Float(f) => Some(float_text(*f)),
        }
    }
}

fn float_text(f: f64) -> Cow<'static, str> {
    if f.is_nan() {
        Cow::Borrowed("NaN")
    } else if f.is_infinite() {
        Cow::Borrowed(if f > 0.0 { "Infinity" } else { "-Infinity" })
    } else {
        Cow::Owned(f.to_string())
    }
}

/// NUL-terminated parameter values plus the pointer array libpq reads.
pub(crate) struct TextParams {
    // Owns the buffers `ptrs` points into.
    _values: Vec<Option<CString>>,
    ptrs: SmallVec<[*const c_char; 8]>,
}

impl TextParams {
    pub(crate) fn new(params: &[Param]) -> PqResult<Self> {
        if params.len() > PQ_QUERY_PARAM_MAX_LIMIT {
            return Err(PqError::TooManyParams {
                count: params.len(),
                limit: PQ_QUERY_PARAM_MAX_LIMIT,
            });
        }

        let values = params
            .iter()
            .map(|p| p.to_text().map(|t| CString::new(t.into_owned())).transpose())
            .collect::<Result<Vec<_>, _>>()?;

        let ptrs = values
            .iter()
            .map(|v| v.as_ref().map_or(ptr::null(), |s| s.as_ptr()))
            .collect();

        Ok(Self {
            _values: values,
            ptrs,
        })
    }

    #[inline]
    pub(crate) fn count(&self) -> c_int {
        // bounded by PQ_QUERY_PARAM_MAX_LIMIT
        self.ptrs.len() as c_int
    }

    #[inline]
    pub(crate) fn values(&self) -> *const *const c_char {
        if self.ptrs.is_empty() {
            ptr::null()
        } else {
            self.ptrs.as_ptr()
        }
    }
}
