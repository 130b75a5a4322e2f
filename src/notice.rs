//! Python notice handlers.

use std::rc::Rc;

use pyo3::exceptions::PyTypeError;
use pyo3::prelude::*;
use pyo3::types::{PyString, PyTuple};
use pqshim::{Notice, NoticeHandler, PgResult};

use crate::result::QueryResult;

/// A Python callable plus the extra arguments captured at registration.
/// It is called as `func(*args, payload)`.
pub(crate) struct PyNoticeHandler {
    func: PyObject,
    args: Py<PyTuple>,
}

impl PyNoticeHandler {
    pub(crate) fn new(func: &Bound<'_, PyAny>, args: &Bound<'_, PyTuple>) -> PyResult<Rc<Self>> {
        if !func.is_callable() {
            return Err(PyTypeError::new_err(format!(
                "notice handler must be callable, not {}",
                func.get_type().name()?
            )));
        }
        Ok(Rc::new(Self {
            func: func.clone().unbind(),
            args: args.clone().unbind(),
        }))
    }

    pub(crate) fn call(&self, py: Python<'_>, payload: Bound<'_, PyAny>) -> PyResult<()> {
        let mut args: Vec<Bound<'_, PyAny>> = self.args.bind(py).iter().collect();
        args.push(payload);
        self.func.bind(py).call1(PyTuple::new(py, args)?)?;
        Ok(())
    }

    fn deliver(&self, py: Python<'_>, notice: Notice<'_>) -> PyResult<()> {
        match notice {
            Notice::Message(msg) => self.call(py, PyString::new(py, msg).into_any()),
            Notice::Result(res) => {
                let observed = unsafe { PgResult::observe(res.as_ptr()) };
                let wrapper = Bound::new(py, QueryResult::new(observed, None))?;
                let called = self.call(py, wrapper.clone().into_any());
                // libpq frees the result once we return
                match wrapper.try_borrow_mut() {
                    Ok(mut res) => res.detach(),
                    Err(err) => log::error!("notice result still borrowed: {err}"),
                }
                called
            }
        }
    }
}

impl NoticeHandler for PyNoticeHandler {
    fn invoke(&self, notice: Notice<'_>) {
        Python::with_gil(|py| {
            if let Err(err) = self.deliver(py, notice) {
                log::warn!("notice handler raised: {err}");
                err.write_unraisable(py, Some(self.func.bind(py)));
            }
        });
    }
}
