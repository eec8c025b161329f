//! Process-wide interrupt policy.
//!
//! The first SIGINT or SIGTERM only sets a flag that targets poll, so the run
//! can wind down and still write its outputs. A repeat of either signal, or
//! any SIGABRT, ends the process on the spot.

use std::{
    io,
    sync::atomic::{AtomicBool, Ordering},
};

use log::debug;

static EXIT_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Whether an interrupt or termination signal has been received.
pub fn exit_requested() -> bool {
    EXIT_REQUESTED.load(Ordering::SeqCst)
}

extern "C" fn handle_signal(sig: libc::c_int) {
    if sig == libc::SIGABRT || EXIT_REQUESTED.load(Ordering::SeqCst) {
        // SAFETY: `_exit` is async-signal-safe and never returns.
        unsafe { libc::_exit(-1) };
    }
    EXIT_REQUESTED.store(true, Ordering::SeqCst);
    // SAFETY: `signal` is async-signal-safe; re-arms for handlers reset to
    // SIG_DFL on delivery.
    unsafe { libc::signal(sig, handler()) };
}

fn handler() -> libc::sighandler_t {
    handle_signal as extern "C" fn(libc::c_int) as libc::sighandler_t
}

/// Install the handlers for SIGINT, SIGTERM and SIGABRT.
pub fn install() -> io::Result<()> {
    for sig in [libc::SIGINT, libc::SIGTERM, libc::SIGABRT] {
        // SAFETY: the handler only touches an atomic and calls
        // async-signal-safe functions.
        let previous = unsafe { libc::signal(sig, handler()) };
        if previous == libc::SIG_ERR {
            return Err(io::Error::last_os_error());
        }
    }
    debug!("Installed interrupt handlers");
    Ok(())
}
