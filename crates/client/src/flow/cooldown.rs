//! Resend cooldown timer.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use super::FlowEvent;

/// Counts down from [`ResendCooldown::SECONDS`] once per second.
///
/// At most one countdown task runs at a time. Starting again, cancelling or
/// dropping the cooldown aborts the running task.
#[derive(Debug, Default)]
pub struct ResendCooldown {
    remaining: Arc<AtomicU32>,
    task: Option<JoinHandle<()>>,
}

impl ResendCooldown {
    /// Length of the cooldown.
    pub const SECONDS: u32 = 60;

    /// Create an inactive cooldown.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// (Re)start the countdown, emitting a tick each second and
    /// [`FlowEvent::ResendAvailable`] at zero. Must be called within a tokio runtime.
    pub fn start(&mut self, events: broadcast::Sender<FlowEvent>) {
        self.cancel();
        self.remaining.store(Self::SECONDS, Ordering::SeqCst);

        let remaining = Arc::clone(&self.remaining);
        self.task = Some(tokio::spawn(async move {
            let period = Duration::from_secs(1);
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);

            loop {
                interval.tick().await;
                let left = remaining
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| Some(n.saturating_sub(1)))
                    .map_or(0, |previous| previous.saturating_sub(1));

                let _ = events.send(FlowEvent::CooldownTick(left));
                if left == 0 {
                    let _ = events.send(FlowEvent::ResendAvailable);
                    break;
                }
            }
        }));
    }

    /// Stop the countdown and allow resending immediately.
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.remaining.store(0, Ordering::SeqCst);
    }

    /// Seconds left before a resend is allowed.
    #[must_use]
    pub fn remaining(&self) -> u32 {
        self.remaining.load(Ordering::SeqCst)
    }

    /// Whether a resend is currently blocked.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.remaining() > 0
    }
}

impl Drop for ResendCooldown {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_counts_down_to_zero() {
        let (tx, mut rx) = broadcast::channel(128);
        let mut cooldown = ResendCooldown::new();
        cooldown.start(tx);
        assert_eq!(cooldown.remaining(), 60);

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(rx.recv().await.unwrap(), FlowEvent::CooldownTick(59));
        assert_eq!(cooldown.remaining(), 59);

        tokio::time::sleep(Duration::from_secs(60)).await;
        let mut last = None;
        while let Ok(event) = rx.try_recv() {
            last = Some(event);
        }
        assert_eq!(last, Some(FlowEvent::ResendAvailable));
        assert!(!cooldown.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_ticks() {
        let (tx, mut rx) = broadcast::channel(128);
        let mut cooldown = ResendCooldown::new();
        cooldown.start(tx);
        cooldown.cancel();
        assert!(!cooldown.is_active());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_resets_remaining() {
        let (tx, _rx) = broadcast::channel(128);
        let mut cooldown = ResendCooldown::new();
        cooldown.start(tx.clone());

        tokio::time::sleep(Duration::from_millis(10_500)).await;
        assert_eq!(cooldown.remaining(), 50);

        cooldown.start(tx);
        assert_eq!(cooldown.remaining(), 60);
    }
}
