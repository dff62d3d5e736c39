//! Watchdog timers for connect and heartbeat supervision.

use std::pin::Pin;
use std::time::Duration;

use tokio::time::{sleep, Sleep};
use tracing::trace;

/// A single restartable watchdog timer.
///
/// Designed to live inside an actor's `tokio::select!` loop:
/// [`expired`](Watchdog::expired) is cancel-safe and stays pending forever
/// while the watchdog is disarmed, so the branch needs no guard. Arming
/// replaces (and thereby cancels) any prior sleep, and disarming drops it,
/// so a stale expiry can never reach a handler. Each arm/disarm bumps a
/// generation counter; `expired` reports the generation it fired for, which
/// ties fires back to arms in trace logs.
#[derive(Debug)]
pub struct Watchdog {
    name: &'static str,
    sleep: Option<Pin<Box<Sleep>>>,
    generation: u64,
}

impl Watchdog {
    /// Create a disarmed watchdog. The name only appears in logs.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            sleep: None,
            generation: 0,
        }
    }

    /// Arm (or rearm) the watchdog to fire after `timeout`.
    ///
    /// Any previously armed sleep is cancelled. Returns the new generation.
    pub fn arm(&mut self, timeout: Duration) -> u64 {
        self.generation += 1;
        self.sleep = Some(Box::pin(sleep(timeout)));
        trace!(
            "{} watchdog armed for {:?} (gen {})",
            self.name,
            timeout,
            self.generation
        );
        self.generation
    }

    /// Disarm the watchdog. A no-op when not armed.
    pub fn disarm(&mut self) {
        if self.sleep.take().is_some() {
            self.generation += 1;
            trace!("{} watchdog disarmed (gen {})", self.name, self.generation);
        }
    }

    /// Whether the watchdog is currently armed.
    pub fn is_armed(&self) -> bool {
        self.sleep.is_some()
    }

    /// Wait until the watchdog fires, returning the firing generation.
    ///
    /// Pending forever while disarmed. Cancel-safe: if the surrounding
    /// `select!` picks another branch, the armed sleep is left in place and
    /// resumes from where it was.
    pub async fn expired(&mut self) -> u64 {
        match self.sleep.as_mut() {
            Some(timer) => timer.as_mut().await,
            None => return std::future::pending().await,
        }
        self.sleep = None;
        trace!("{} watchdog fired (gen {})", self.name, self.generation);
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::timeout;

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_timeout() {
        let mut dog = Watchdog::new("test");
        let gen = dog.arm(Duration::from_secs(5));
        let fired = dog.expired().await;
        assert_eq!(fired, gen);
        assert!(!dog.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disarmed_never_fires() {
        let mut dog = Watchdog::new("test");
        dog.arm(Duration::from_secs(1));
        dog.disarm();
        assert!(!dog.is_armed());

        let result = timeout(Duration::from_secs(10), dog.expired()).await;
        assert!(result.is_err(), "disarmed watchdog must stay pending");
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_replaces_prior_sleep() {
        let mut dog = Watchdog::new("test");
        let first = dog.arm(Duration::from_secs(1));
        tokio::time::sleep(Duration::from_millis(500)).await;

        // Rearm pushes the deadline out; the original 1s deadline must not fire.
        let second = dog.arm(Duration::from_secs(5));
        assert!(second > first);

        let early = timeout(Duration::from_secs(2), dog.expired()).await;
        assert!(early.is_err(), "rearmed watchdog fired on the stale deadline");

        let fired = timeout(Duration::from_secs(4), dog.expired()).await.unwrap();
        assert_eq!(fired, second);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_safe_across_select() {
        let mut dog = Watchdog::new("test");
        dog.arm(Duration::from_secs(3));

        // Lose the race once; the watchdog must stay armed with its
        // original deadline.
        tokio::select! {
            _ = dog.expired() => panic!("fired too early"),
            _ = tokio::time::sleep(Duration::from_secs(1)) => {}
        }
        assert!(dog.is_armed());

        let fired = timeout(Duration::from_secs(3), dog.expired()).await;
        assert!(fired.is_ok());
    }
}
