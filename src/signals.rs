//! SIGINT/SIGTERM handling for service mode

use anyhow::Result;
use cronkit::ShutdownFlag;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

static SHUTDOWN: OnceLock<Arc<AtomicBool>> = OnceLock::new();

/// Route SIGINT and SIGTERM to `flag`
///
/// Only the first flag installed in a process is used.
#[cfg(unix)]
pub fn install(flag: &ShutdownFlag) -> Result<()> {
    let _ = SHUTDOWN.set(flag.handle());

    for signal in [libc::SIGINT, libc::SIGTERM] {
        // SAFETY: the handler only performs an atomic store, which is
        // async-signal-safe. We check the return value for failure.
        let previous = unsafe { libc::signal(signal, on_signal as extern "C" fn(libc::c_int) as libc::sighandler_t) };
        if previous == libc::SIG_ERR {
            anyhow::bail!("could not install handler for signal {signal}");
        }
    }

    Ok(())
}

#[cfg(not(unix))]
pub fn install(flag: &ShutdownFlag) -> Result<()> {
    let _ = SHUTDOWN.set(flag.handle());
    Ok(())
}

#[cfg(unix)]
extern "C" fn on_signal(_signal: libc::c_int) {
    if let Some(flag) = SHUTDOWN.get() {
        flag.store(true, Ordering::SeqCst);
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_sigterm_requests_shutdown() {
        let flag = ShutdownFlag::new();
        install(&flag).unwrap();
        assert!(!flag.is_requested());

        // SAFETY: raising a signal we just installed a handler for
        unsafe {
            libc::raise(libc::SIGTERM);
        }

        assert!(flag.is_requested());
    }
}
