use std::io;

use windows_sys::Win32::Foundation::{BOOL, FALSE, TRUE};
use windows_sys::Win32::System::Console::{SetConsoleCtrlHandler, CTRL_C_EVENT};

unsafe extern "system" fn on_ctrl(ctrl_type: u32) -> BOOL {
    // Anything but Ctrl+C (Ctrl+Break, console close) keeps its default.
    if ctrl_type == CTRL_C_EVENT && crate::interrupt::notify() {
        TRUE
    } else {
        FALSE
    }
}

/// Registration of [`on_ctrl`]; removed again on drop.
pub(crate) struct PreviousHandler(());

/// Add [`on_ctrl`] to the console's handler list.
pub(crate) fn install() -> io::Result<PreviousHandler> {
    if unsafe { SetConsoleCtrlHandler(Some(on_ctrl), TRUE) } == 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(PreviousHandler(()))
}

impl Drop for PreviousHandler {
    fn drop(&mut self) {
        if unsafe { SetConsoleCtrlHandler(Some(on_ctrl), FALSE) } == 0 {
            log::warn!(
                "could not remove the console control handler: {}",
                io::Error::last_os_error()
            );
        }
    }
}
