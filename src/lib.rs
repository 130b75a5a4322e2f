use pyo3::prelude::*;

mod cancel;
mod connection;
mod constants;
mod error;
mod notice;
mod notify;
mod params;
mod reply;
mod result;
mod unlocked;
mod util;

use cancel::Cancel;
use connection::Connection;
use error::FreedObjectError;
use notify::Notify;
use result::QueryResult;

/// libpq bindings: connections, results and the helpers around them.
#[pymodule]
fn libpq(m: &Bound<'_, PyModule>) -> PyResult<()> {
    let py = m.py();

    m.add_class::<Connection>()?;
    m.add_class::<QueryResult>()?;
    m.add_class::<Cancel>()?;
    m.add_class::<Notify>()?;
    m.add("FreedObjectError", py.get_type::<FreedObjectError>())?;

    m.add_function(wrap_pyfunction!(util::connect, m)?)?;
    m.add_function(wrap_pyfunction!(util::ping, m)?)?;
    m.add_function(wrap_pyfunction!(util::parse_conninfo, m)?)?;
    m.add_function(wrap_pyfunction!(util::default_conninfo, m)?)?;
    m.add_function(wrap_pyfunction!(util::lib_version, m)?)?;
    m.add_function(wrap_pyfunction!(util::is_threadsafe, m)?)?;
    m.add_function(wrap_pyfunction!(util::unescape_bytea, m)?)?;
    m.add_function(wrap_pyfunction!(util::encrypt_password, m)?)?;
    m.add_function(wrap_pyfunction!(util::env2encoding, m)?)?;
    m.add_function(wrap_pyfunction!(util::mblen, m)?)?;
    m.add_function(wrap_pyfunction!(util::mblen_bounded, m)?)?;
    m.add_function(wrap_pyfunction!(util::dsplen, m)?)?;
    m.add_function(wrap_pyfunction!(util::char_to_encoding, m)?)?;
    m.add_function(wrap_pyfunction!(util::encoding_to_char, m)?)?;
    m.add_function(wrap_pyfunction!(util::valid_server_encoding_id, m)?)?;

    constants::register(m)?;

    // libpq.util
    let util_mod = PyModule::new(py, "util")?;
    util_mod.add_function(wrap_pyfunction!(util::get_result_stat, &util_mod)?)?;
    m.add_submodule(&util_mod)?;
    py.import("sys")?
        .getattr("modules")?
        .set_item("libpq.util", &util_mod)?;

    Ok(())
}
