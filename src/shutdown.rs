//! Cooperative shutdown honored at cycle boundaries.
//!
//! SIGINT/SIGTERM only raise a flag; loops check it between frame
//! exchanges so no peer is left blocked on a half-written frame.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::Result;

static SIGNALLED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_signal(_signum: libc::c_int) {
    SIGNALLED.store(true, Ordering::SeqCst);
}

/// Stop request shared between a loop and whoever may end it.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// True after `request_stop` or once SIGINT/SIGTERM arrived
    pub fn should_stop(&self) -> bool {
        self.0.load(Ordering::SeqCst) || SIGNALLED.load(Ordering::SeqCst)
    }
}

/// Route SIGINT and SIGTERM to the process-wide stop flag
pub fn install_signal_handlers() -> Result<()> {
    let handler = on_signal as extern "C" fn(libc::c_int) as libc::sighandler_t;
    for signum in [libc::SIGINT, libc::SIGTERM] {
        // SAFETY: the handler only stores to an atomic, which is
        // async-signal-safe.
        let previous = unsafe { libc::signal(signum, handler) };
        if previous == libc::SIG_ERR {
            return Err(std::io::Error::last_os_error().into());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_flag_is_shared() {
        let flag = StopFlag::new();
        let other = flag.clone();
        assert!(!other.should_stop());
        flag.request_stop();
        assert!(other.should_stop());
    }
}
