//! Heartbeat tracking for the live connection.
//!
//! Any inbound frame counts as liveness. When the link has been quiet for
//! `interval`, a ping is due; if nothing at all arrives within `timeout` of
//! that ping, the session is considered dead.

use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug)]
pub struct Heartbeat {
    interval: Duration,
    timeout: Duration,
    last_frame: Instant,
    ping_sent_at: Option<Instant>,
}

impl Heartbeat {
    /// A zero `interval` disables heartbeating.
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval,
            timeout,
            last_frame: Instant::now(),
            ping_sent_at: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.interval.is_zero()
    }

    /// How often the session loop should evaluate the heartbeat.
    pub fn check_period(&self) -> Duration {
        let shortest = if self.is_enabled() {
            self.interval.min(self.timeout)
        } else {
            Duration::from_secs(60)
        };
        (shortest / 2).max(Duration::from_millis(10))
    }

    /// Record any inbound frame.
    pub fn record_frame(&mut self) {
        self.last_frame = Instant::now();
        if let Some(sent) = self.ping_sent_at.take() {
            debug!(rtt_ms = sent.elapsed().as_millis() as u64, "Link alive after ping");
        }
    }

    pub fn record_ping(&mut self, now: Instant) {
        self.ping_sent_at = Some(now);
    }

    pub fn should_ping(&self, now: Instant) -> bool {
        self.is_enabled()
            && self.ping_sent_at.is_none()
            && now.saturating_duration_since(self.last_frame) >= self.interval
    }

    pub fn is_timed_out(&self, now: Instant) -> bool {
        self.ping_sent_at
            .is_some_and(|sent| now.saturating_duration_since(sent) >= self.timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_ping_due_after_quiet_interval() {
        let mut hb = Heartbeat::new(Duration::from_secs(30), Duration::from_secs(10));
        assert!(!hb.should_ping(Instant::now()));

        tokio::time::advance(Duration::from_secs(30)).await;
        let now = Instant::now();
        assert!(hb.should_ping(now));

        hb.record_ping(now);
        assert!(!hb.should_ping(now));
        assert!(!hb.is_timed_out(now));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_without_any_frame() {
        let mut hb = Heartbeat::new(Duration::from_secs(30), Duration::from_secs(10));
        tokio::time::advance(Duration::from_secs(30)).await;
        hb.record_ping(Instant::now());

        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(hb.is_timed_out(Instant::now()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_frame_clears_pending_ping() {
        let mut hb = Heartbeat::new(Duration::from_secs(30), Duration::from_secs(10));
        tokio::time::advance(Duration::from_secs(30)).await;
        hb.record_ping(Instant::now());

        tokio::time::advance(Duration::from_secs(5)).await;
        hb.record_frame();

        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(!hb.is_timed_out(Instant::now()));
    }

    #[test]
    fn test_disabled_heartbeat() {
        let hb = Heartbeat::new(Duration::ZERO, Duration::from_secs(10));
        assert!(!hb.is_enabled());
        assert!(!hb.should_ping(Instant::now()));
        assert!(hb.check_period() > Duration::ZERO);
    }
}
