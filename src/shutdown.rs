use std::sync::atomic::{AtomicBool, Ordering};

/// Set from the `SIGINT`/`SIGTERM` handler, polled once per event loop
/// iteration. A `sig_atomic_t`-style flag would do in C; `AtomicBool` is the
/// Rust equivalent a signal handler can touch without locking anything.
static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

extern "C" fn handle_signal(_sig: libc::c_int) {
    SHUTDOWN_REQUESTED.store(true, Ordering::SeqCst);
}

/// Installs the `SIGINT`/`SIGTERM` handler. Safe to call once at startup;
/// calling it again just re-registers the same handler.
pub fn install() {
    unsafe {
        libc::signal(libc::SIGINT, handle_signal as libc::sighandler_t);
        libc::signal(libc::SIGTERM, handle_signal as libc::sighandler_t);
    }
}

pub fn requested() -> bool {
    SHUTDOWN_REQUESTED.load(Ordering::SeqCst)
}
