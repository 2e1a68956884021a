use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Shared cancellation flag for one pipeline invocation.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Sleeps in short steps; returns `false` if cancelled before `total` elapsed.
    pub fn sleep_unless_cancelled(&self, total: Duration) -> bool {
        let mut remaining = total;
        while remaining > Duration::from_millis(0) {
            if self.is_cancelled() {
                return false;
            }
            let step = remaining.min(Duration::from_millis(50));
            thread::sleep(step);
            remaining = remaining.saturating_sub(step);
        }
        !self.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn clones_share_the_flag_and_interrupt_sleep() {
        let token = CancelToken::new();
        let observer = token.clone();
        token.cancel();

        let started = Instant::now();
        assert!(!observer.sleep_unless_cancelled(Duration::from_secs(5)));
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
