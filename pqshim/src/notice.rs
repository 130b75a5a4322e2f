//! Notice processor and notice receiver registration.
//!
//! libpq calls a plain C function pointer with an opaque `void *` argument.
//! Each connection owns one [`NoticeHooks`] block; its address is the
//! argument handed to libpq, and the two trampolines below turn the call
//! back into a [`NoticeHandler::invoke`].
//!
//! libpq copies the connection's hooks into every result it creates, so a
//! result can emit a notice long after the handler was swapped or the
//! connection finished. The block is reference-counted and every result
//! created by a connection holds a reference, which keeps the address valid
//! for as long as any copy of it may be used.

use std::cell::{Cell, RefCell};
use std::ffi::{c_char, c_void, CStr};
use std::panic::{self, AssertUnwindSafe};
use std::ptr;
use std::rc::Rc;

use pq_sys::{PGconn, PGresult, PQnoticeProcessor, PQnoticeReceiver};

use crate::result::PgResult;

/// What libpq delivered.
pub enum Notice<'a> {
    /// A formatted message, as passed to a notice processor.
    Message(&'a str),
    /// A `PGRES_NONFATAL_ERROR` result, as passed to a notice receiver. The
    /// result is owned by libpq and only valid during the call.
    Result(&'a PgResult),
}

/// A callback registered on a connection.
///
/// Bindings capture whatever extra arguments the caller supplied at
/// registration time inside the implementing type.
pub trait NoticeHandler {
    fn invoke(&self, notice: Notice<'_>);
}

impl<F> NoticeHandler for F
where
    F: Fn(Notice<'_>),
{
    fn invoke(&self, notice: Notice<'_>) {
        self(notice)
    }
}

/// Per-connection callback state.
#[derive(Default)]
pub(crate) struct NoticeHooks {
    processor: RefCell<Option<Rc<dyn NoticeHandler>>>,
    receiver: RefCell<Option<Rc<dyn NoticeHandler>>>,
    // Whether our trampolines are currently installed on the connection.
    processor_installed: Cell<bool>,
    receiver_installed: Cell<bool>,
    // The handlers libpq had before the first install. Results created while
    // a trampoline was installed keep calling it, so these stay around as the
    // fallback even after the trampoline is removed from the connection.
    default_processor: Cell<PQnoticeProcessor>,
    default_receiver: Cell<PQnoticeReceiver>,
}

impl NoticeHooks {
    fn arg(self: &Rc<Self>) -> *mut c_void {
        Rc::as_ptr(self) as *mut c_void
    }

    /// Swap the processor handler, installing or removing the trampoline.
    ///
    /// # Safety
    /// `conn` must be a live connection whose hooks are `self`.
    pub(crate) unsafe fn set_processor(
        self: &Rc<Self>,
        conn: *mut PGconn,
        handler: Option<Rc<dyn NoticeHandler>>,
    ) {
        // Drop the old handler before anything else so it can be collected.
        drop(self.processor.replace(None));

        match handler {
            Some(handler) => {
                *self.processor.borrow_mut() = Some(handler);
                if !self.processor_installed.replace(true) {
                    let previous =
                        pq_sys::PQsetNoticeProcessor(conn, Some(process_notice), self.arg());
                    self.default_processor.set(previous);
                    log::debug!("notice processor trampoline installed");
                }
            }
            None => {
                if self.processor_installed.replace(false) {
                    let default = self.default_processor.get();
                    pq_sys::PQsetNoticeProcessor(conn, default, ptr::null_mut());
                    log::debug!("notice processor restored to libpq default");
                }
            }
        }
    }

    /// Receiver counterpart of [`NoticeHooks::set_processor`].
    ///
    /// # Safety
    /// Same as [`NoticeHooks::set_processor`].
    pub(crate) unsafe fn set_receiver(
        self: &Rc<Self>,
        conn: *mut PGconn,
        handler: Option<Rc<dyn NoticeHandler>>,
    ) {
        drop(self.receiver.replace(None));

        match handler {
            Some(handler) => {
                *self.receiver.borrow_mut() = Some(handler);
                if !self.receiver_installed.replace(true) {
                    let previous =
                        pq_sys::PQsetNoticeReceiver(conn, Some(receive_notice), self.arg());
                    self.default_receiver.set(previous);
                    log::debug!("notice receiver trampoline installed");
                }
            }
            None => {
                if self.receiver_installed.replace(false) {
                    pq_sys::PQsetNoticeReceiver(conn, self.default_receiver.get(), ptr::null_mut());
                    log::debug!("notice receiver restored to libpq default");
                }
            }
        }
    }

    pub(crate) fn processor(&self) -> Option<Rc<dyn NoticeHandler>> {
        self.processor.borrow().clone()
    }

    pub(crate) fn receiver(&self) -> Option<Rc<dyn NoticeHandler>> {
        self.receiver.borrow().clone()
    }

    /// Forget both handlers. Results that still carry the trampolines fall
    /// through to the libpq defaults.
    pub(crate) fn release_handlers(&self) {
        drop(self.processor.replace(None));
        drop(self.receiver.replace(None));
    }

    fn dispatch_message(&self, message: *const c_char) {
        match self.processor() {
            Some(handler) => {
                // SAFETY: libpq passes a NUL-terminated message
                let text = unsafe { CStr::from_ptr(message) }.to_string_lossy();
                guarded("notice processor", || handler.invoke(Notice::Message(&text)));
            }
            None => {
                if let Some(previous) = self.default_processor.get() {
                    unsafe { previous(ptr::null_mut(), message) }
                }
            }
        }
    }

    fn dispatch_result(&self, res: *const PGresult) {
        match self.receiver() {
            Some(handler) => {
                // libpq frees the result as soon as we return
                let result = unsafe { PgResult::observe(res as *mut PGresult) };
                guarded("notice receiver", || handler.invoke(Notice::Result(&result)));
            }
            None => {
                if let Some(previous) = self.default_receiver.get() {
                    unsafe { previous(ptr::null_mut(), res) }
                }
            }
        }
    }
}

// Unwinding into libpq is undefined behaviour.
fn guarded(what: &str, f: impl FnOnce()) {
    if panic::catch_unwind(AssertUnwindSafe(f)).is_err() {
        log::error!("{what} panicked; notice dropped");
    }
}

unsafe extern "C" fn process_notice(arg: *mut c_void, message: *const c_char) {
    if let Some(hooks) = (arg as *const NoticeHooks).as_ref() {
        hooks.dispatch_message(message);
    }
}

unsafe extern "C" fn receive_notice(arg: *mut c_void, res: *const PGresult) {
    if let Some(hooks) = (arg as *const NoticeHooks).as_ref() {
        hooks.dispatch_result(res);
    }
}
