//! Host-side control over running scripts.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Flag a host raises to stop the running script.
///
/// Clones share the flag and may be moved to other threads. The interpreter
/// polls it before every action and clears it once observed.
#[derive(Debug, Clone, Default)]
pub struct InterruptHandle(Arc<AtomicBool>);

impl InterruptHandle {
    /// Creates a lowered flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests that the running script stop.
    pub fn interrupt(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether an interrupt is pending.
    pub fn is_interrupted(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Lowers the flag, returning whether it was raised.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_flag() {
        let handle = InterruptHandle::new();
        let remote = handle.clone();
        assert!(!handle.is_interrupted());
        remote.interrupt();
        assert!(handle.is_interrupted());
        assert!(handle.take());
        assert!(!remote.is_interrupted());
        assert!(!handle.take());
    }

    #[test]
    fn test_interrupt_from_another_thread() {
        let handle = InterruptHandle::new();
        let remote = handle.clone();
        std::thread::spawn(move || remote.interrupt())
            .join()
            .unwrap();
        assert!(handle.is_interrupted());
    }
}
