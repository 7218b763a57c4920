//! Interrupt is the process-wide cancellation token: a signal handler
//! raises it on SIGINT/SIGTERM, the apply loop checks it between items,
//! and the shell-out adapter polls it mid-call so an in-flight subprocess
//! is terminated instead of orphaned.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::warn;

/// Interrupt is a cheaply-clonable cancellation token shared between the
/// signal handler, the apply driver, and the platform adapter.
#[derive(Clone, Debug, Default)]
pub struct Interrupt {
    raised: Arc<AtomicBool>,
}

impl Interrupt {
    /// New builds a token no signal handler flips; callers raise it
    /// themselves. Used by tests and by code paths that never shell out.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install builds a token and registers SIGINT/SIGTERM handlers that
    /// raise it. Call once, early in `main`.
    pub fn install() -> Self {
        let token = Self::default();
        for sig in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
            if let Err(e) = signal_hook::flag::register(sig, token.raised.clone()) {
                warn!("could not install interrupt handler for signal {sig}: {e}");
            }
        }
        token
    }

    /// Raised reports whether an interrupt has been delivered.
    pub fn raised(&self) -> bool {
        self.raised.load(Ordering::Relaxed)
    }

    /// Raise flips the token by hand, as the signal handler would.
    pub fn raise(&self) {
        self.raised.store(true, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_lowered_and_latches_once_raised() {
        let token = Interrupt::new();
        assert!(!token.raised());
        let clone = token.clone();
        clone.raise();
        assert!(token.raised());
    }
}
