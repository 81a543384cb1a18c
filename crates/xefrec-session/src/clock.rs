//! Heartbeat source for running captures.
//!
//! While armed, a dedicated ticker task sends one message per interval
//! into the controller's command channel. The ticker only holds a weak
//! sender, so it never keeps a shut-down controller alive.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Fixed-interval tick source with two states, armed and disarmed.
#[derive(Debug, Default)]
pub struct ProgressClock {
    /// Present exactly while armed; cancelling it stops the ticker task.
    ticker: Option<CancellationToken>,
}

impl ProgressClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts ticking every `period` into `sink`, building each message
    /// with `tick`. The first tick arrives one period after arming.
    ///
    /// Arming an armed clock replaces the running ticker.
    ///
    /// Must be called from within a tokio runtime.
    pub fn arm<T, F>(&mut self, period: Duration, sink: mpsc::WeakSender<T>, tick: F)
    where
        T: Send + 'static,
        F: Fn() -> T + Send + 'static,
    {
        self.disarm();

        let token = CancellationToken::new();
        let cancelled = token.clone();

        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;

                    _ = cancelled.cancelled() => {
                        trace!("Ticker disarmed");
                        break;
                    }

                    _ = ticker.tick() => {
                        let Some(sink) = sink.upgrade() else {
                            debug!("Ticker stopping: receiver gone");
                            break;
                        };
                        if sink.send(tick()).await.is_err() {
                            debug!("Ticker stopping: channel closed");
                            break;
                        }
                    }
                }
            }
        });

        self.ticker = Some(token);
    }

    /// Stops ticking. Idempotent.
    ///
    /// A tick that was already queued before disarming may still be
    /// delivered; receivers must check `is_armed` before acting on it.
    pub fn disarm(&mut self) {
        if let Some(token) = self.ticker.take() {
            token.cancel();
        }
    }

    pub fn is_armed(&self) -> bool {
        self.ticker.is_some()
    }
}

impl Drop for ProgressClock {
    fn drop(&mut self) {
        self.disarm();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::timeout;

    const PERIOD: Duration = Duration::from_millis(1000);

    #[tokio::test(start_paused = true)]
    async fn test_ticks_on_fixed_cadence() {
        let (tx, mut rx) = mpsc::channel::<u32>(8);
        let mut clock = ProgressClock::new();
        assert!(!clock.is_armed());

        let start = Instant::now();
        clock.arm(PERIOD, tx.downgrade(), || 7);
        assert!(clock.is_armed());

        assert_eq!(rx.recv().await, Some(7));
        assert!(start.elapsed() >= PERIOD, "first tick is one period after arming");

        assert_eq!(rx.recv().await, Some(7));
        assert!(start.elapsed() >= PERIOD * 2);

        clock.disarm();
    }

    #[tokio::test(start_paused = true)]
    async fn test_disarm_stops_ticks() {
        let (tx, mut rx) = mpsc::channel::<()>(8);
        let mut clock = ProgressClock::new();

        clock.arm(PERIOD, tx.downgrade(), || ());
        assert!(rx.recv().await.is_some());

        clock.disarm();
        assert!(!clock.is_armed());

        let next = timeout(PERIOD * 5, rx.recv()).await;
        assert!(next.is_err(), "no tick may arrive after disarm");
    }

    #[tokio::test]
    async fn test_disarm_is_idempotent() {
        let (tx, _rx) = mpsc::channel::<()>(8);
        let mut clock = ProgressClock::new();

        clock.disarm();
        clock.arm(PERIOD, tx.downgrade(), || ());
        clock.disarm();
        clock.disarm();
        assert!(!clock.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_replaces_ticker() {
        let (tx, mut rx) = mpsc::channel::<&'static str>(8);
        let mut clock = ProgressClock::new();

        clock.arm(PERIOD, tx.downgrade(), || "old");
        clock.arm(PERIOD, tx.downgrade(), || "new");

        assert_eq!(rx.recv().await, Some("new"));
        assert_eq!(rx.recv().await, Some("new"));
        clock.disarm();
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticker_stops_when_receiver_dropped() {
        let (tx, rx) = mpsc::channel::<()>(8);
        let mut clock = ProgressClock::new();
        clock.arm(PERIOD, tx.downgrade(), || ());
        drop(rx);

        tokio::time::sleep(PERIOD * 3).await;
        // Still reports armed: only disarm changes the state.
        assert!(clock.is_armed());
        clock.disarm();
    }
}
