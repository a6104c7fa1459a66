use std::io;

use nix::libc::c_int;
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};

extern "C" fn on_sigint(_: c_int) {
    crate::interrupt::notify();
}

/// The SIGINT disposition that was in place before [`install`].
pub(crate) struct PreviousHandler(SigAction);

/// Route SIGINT to [`crate::interrupt::notify`].
///
/// Installed without `SA_RESTART`: a blocking poll on the port returns with
/// `EINTR` instead of sitting out its timeout.
pub(crate) fn install() -> io::Result<PreviousHandler> {
    let action = SigAction::new(
        SigHandler::Handler(on_sigint),
        SaFlags::empty(),
        SigSet::empty(),
    );
    // SAFETY: the handler only performs atomic loads and stores.
    let previous = unsafe { signal::sigaction(Signal::SIGINT, &action) }?;
    Ok(PreviousHandler(previous))
}

impl Drop for PreviousHandler {
    fn drop(&mut self) {
        // SAFETY: restores whatever was installed before, which was valid then.
        if let Err(e) = unsafe { signal::sigaction(Signal::SIGINT, &self.0) } {
            log::warn!("could not restore the SIGINT handler: {}", e);
        }
    }
}

