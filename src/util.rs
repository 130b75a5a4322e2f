//! Module-level functions.

use pyo3::prelude::*;
use pyo3::types::PyBytes;
use pqshim::util;

use crate::connection::Connection;
use crate::error::Result;
use crate::reply;
use crate::result::QueryResult;
use crate::unlocked::without_gil;

/// Open a connection: `(conn, None)` or `(None, OSError)`.
///
/// A connection that could not be established is still returned; check
/// `conn.status()`. With `nonblock` the connection is only started and must
/// be driven with `conn.connect_poll()`.
#[pyfunction]
#[pyo3(signature = (conninfo="", nonblock=false))]
pub fn connect(py: Python<'_>, conninfo: &str, nonblock: bool) -> Result<PyObject> {
    let conn = without_gil(py, || pqshim::Connection::connect(conninfo, nonblock));
    reply::value(py, conn.map(Connection::new))
}

/// Probe a server; returns a `PQPING_*` code.
#[pyfunction]
#[pyo3(signature = (conninfo=""))]
pub fn ping(py: Python<'_>, conninfo: &str) -> Result<i32> {
    Ok(without_gil(py, || util::ping(conninfo))?)
}

#[pyfunction]
pub fn parse_conninfo(py: Python<'_>, conninfo: &str) -> Result<PyObject> {
    let info = match pqshim::parse_conninfo(conninfo) {
        Ok(info) => Ok(pythonize::pythonize(py, &info)?),
        Err(err) => Err(err),
    };
    reply::value(py, info)
}

#[pyfunction]
pub fn default_conninfo(py: Python<'_>) -> Result<PyObject> {
    let info = match pqshim::default_conninfo() {
        Ok(info) => Ok(pythonize::pythonize(py, &info)?),
        Err(err) => Err(err),
    };
    reply::value(py, info)
}

#[pyfunction]
pub fn lib_version() -> i32 {
    util::lib_version()
}

#[pyfunction]
pub fn is_threadsafe() -> bool {
    util::is_threadsafe()
}

#[pyfunction]
pub fn unescape_bytea(py: Python<'_>, text: &str) -> Result<PyObject> {
    reply::value(py, util::unescape_bytea(text).map(|b| PyBytes::new(py, &b)))
}

#[pyfunction]
pub fn encrypt_password(py: Python<'_>, passwd: &str, user: &str) -> Result<PyObject> {
    reply::value(py, util::encrypt_password(passwd, user))
}

#[pyfunction]
pub fn env2encoding() -> i32 {
    util::env2encoding()
}

#[pyfunction]
pub fn mblen(s: &str, encoding: i32) -> Result<i32> {
    Ok(util::mblen(s, encoding)?)
}

#[pyfunction]
pub fn mblen_bounded(s: &str, encoding: i32) -> Result<i32> {
    Ok(util::mblen_bounded(s, encoding)?)
}

#[pyfunction]
pub fn dsplen(s: &str, encoding: i32) -> Result<i32> {
    Ok(util::dsplen(s, encoding)?)
}

#[pyfunction]
pub fn char_to_encoding(name: &str) -> Result<i32> {
    Ok(util::char_to_encoding(name)?)
}

#[pyfunction]
pub fn encoding_to_char(encoding: i32) -> String {
    util::encoding_to_char(encoding)
}

#[pyfunction]
pub fn valid_server_encoding_id(encoding: i32) -> bool {
    util::valid_server_encoding_id(encoding)
}

/// Status-dependent summary of a result, as a dict.
#[pyfunction]
pub fn get_result_stat<'py>(
    py: Python<'py>,
    res: &Bound<'py, QueryResult>,
) -> Result<Bound<'py, PyAny>> {
    Ok(pythonize::pythonize(py, &res.borrow().inner().stat()?)?)
}
