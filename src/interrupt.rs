//! Turning Ctrl+C into a [`CancelToken`] cancellation.
//!
//! The platform handler can only touch statics, so the armed token's flag
//! is parked in [`ARMED`] for as long as an [`InterruptGuard`] lives. Only
//! one guard can exist at a time.

use std::fmt;
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicPtr, AtomicUsize, Ordering};
use std::sync::Arc;

use log::debug;

use crate::cycle::CancelToken;
use crate::sys;
use crate::{Error, Result};

static ARMED: AtomicPtr<AtomicBool> = AtomicPtr::new(ptr::null_mut());

/// Handlers currently between loading [`ARMED`] and being done with it.
static IN_HANDLER: AtomicUsize = AtomicUsize::new(0);

/// Called from the platform handler. Must stay async-signal-safe.
pub(crate) fn notify() -> bool {
    IN_HANDLER.fetch_add(1, Ordering::SeqCst);
    let flag = ARMED.load(Ordering::SeqCst);
    let armed = !flag.is_null();
    if armed {
        // SAFETY: the guard that stored the pointer clears it and waits for
        // `IN_HANDLER` to drop to zero before releasing the flag.
        unsafe { (*flag).store(true, Ordering::SeqCst) };
    }
    IN_HANDLER.fetch_sub(1, Ordering::SeqCst);
    armed
}

/// Keeps Ctrl+C wired to a token. Dropping it restores the previous
/// handler.
pub struct InterruptGuard {
    handler: Option<sys::PreviousHandler>,
    flag: *mut AtomicBool,
}

impl fmt::Debug for InterruptGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterruptGuard")
            .field("armed", &self.handler.is_some())
            .finish()
    }
}

/// Cancel `cancel` when the user presses Ctrl+C, until the guard is dropped.
///
/// The process keeps running after Ctrl+C; the rate cycle notices the
/// cancellation and returns normally. Fails with
/// [`Error::InterruptsAlreadyCaught`] while another guard is alive.
pub fn catch_interrupts(cancel: &CancelToken) -> Result<InterruptGuard> {
    let flag = Arc::into_raw(cancel.shared_flag()) as *mut AtomicBool;
    if ARMED
        .compare_exchange(ptr::null_mut(), flag, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        // SAFETY: `flag` came from `Arc::into_raw` above and was never
        // published.
        unsafe { drop(Arc::from_raw(flag as *const AtomicBool)) };
        return Err(Error::InterruptsAlreadyCaught);
    }
    let armed = scopeguard::guard(flag, disarm);

    let handler = sys::install()?;
    let flag = scopeguard::ScopeGuard::into_inner(armed);
    debug!("interrupt handler installed");

    Ok(InterruptGuard {
        handler: Some(handler),
        flag,
    })
}

/// Unpublish `flag` and release it once no handler can still be using it.
///
/// A Ctrl+C arriving after this and before the platform handler is removed
/// is swallowed.
fn disarm(flag: *mut AtomicBool) {
    ARMED.store(ptr::null_mut(), Ordering::SeqCst);
    while IN_HANDLER.load(Ordering::SeqCst) != 0 {
        std::hint::spin_loop();
    }
    // SAFETY: created by `Arc::into_raw` in `catch_interrupts`, no longer
    // reachable through `ARMED` and no handler holds it.
    unsafe { drop(Arc::from_raw(flag as *const AtomicBool)) };
}

impl Drop for InterruptGuard {
    fn drop(&mut self) {
        disarm(self.flag);
        drop(self.handler.take());
        debug!("interrupt handler removed");
    }
}
