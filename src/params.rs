//! Python values to query parameters.

use pyo3::prelude::*;
use pyo3::types::{PyBool, PyFloat, PyInt, PyString, PyTuple};
use pqshim::{Param, PqError};

use crate::error::Result;

/// Convert positional Python arguments to text-format parameters.
///
/// `None` is SQL NULL. Integers that do not fit an `i64` are sent as their
/// decimal text, which the server parses as `numeric`.
pub(crate) fn extract_params(params: &Bound<'_, PyTuple>) -> Result<Vec<Param>> {
    let mut result = Vec::with_capacity(params.len());

    for (i, param) in params.iter().enumerate() {
        if param.is_none() {
            result.push(Param::Null);
            continue;
        }

        // bool is a subclass of int, so it has to be checked first
        if param.is_instance_of::<PyBool>() {
            result.push(Param::Bool(param.extract()?));
        } else if param.is_instance_of::<PyInt>() {
            match param.extract::<i64>() {
                Ok(v) => result.push(Param::Int(v)),
                Err(_) => result.push(Param::Text(param.str()?.to_string())),
            }
        } else if param.is_instance_of::<PyFloat>() {
            result.push(Param::Float(param.extract()?));
        } else if param.is_instance_of::<PyString>() {
            result.push(Param::Text(param.extract()?));
        } else {
            return Err(PqError::Param {
                position: i + 1,
                type_name: param.get_type().name()?.to_string(),
            }
            .into());
        }
    }

    Ok(result)
}
