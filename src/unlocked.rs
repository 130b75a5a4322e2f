//! Releasing the GIL around blocking libpq calls.
//!
//! Connection handles are thread-confined (`Rc` notice hooks, raw
//! `PGconn`), so they are not `Send` and cannot cross `allow_threads`
//! directly. `allow_threads` runs its closure on the calling thread, though;
//! [`Confined`] only carries the closure and its result past the `Send`
//! bound and never leaves that thread. Notice handlers fired meanwhile take
//! the GIL back through `Python::with_gil`.

use pyo3::Python;

struct Confined<T>(T);

// SAFETY: values are created, used and dropped on the thread that called
// `without_gil`; `allow_threads` does not move its closure elsewhere.
unsafe impl<T> Send for Confined<T> {}

impl<T> Confined<T> {
    fn into_inner(self) -> T {
        self.0
    }
}

/// Run `f` with the GIL released so other Python threads (a canceller, for
/// one) keep running while libpq blocks.
///
/// `f` must not touch Python objects.
pub(crate) fn without_gil<F, R>(py: Python<'_>, f: F) -> R
where
    F: FnOnce() -> R,
{
    let job = Confined(f);
    py.allow_threads(move || Confined(job.into_inner()()))
        .into_inner()
}
