use std::collections::HashMap;
use tokio::time::{Duration, Instant};

// Last dispatch per endpoint ("METHOD url")
#[derive(Default)]
pub struct ThrottleTracker {
    last_dispatch: HashMap<String, Instant>,
}

impl ThrottleTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// How long a call to `endpoint` has to wait at `now` to keep
    /// `min_interval` between dispatches.
    pub fn delay_for(&self, endpoint: &str, now: Instant, min_interval: Duration) -> Duration {
        match self.last_dispatch.get(endpoint) {
            Some(last) => (*last + min_interval).saturating_duration_since(now),
            None => Duration::ZERO,
        }
    }

    pub fn record_dispatch(&mut self, endpoint: String, at: Instant) {
        self.last_dispatch.insert(endpoint, at);
    }

    /// Books the endpoint's next free slot: returns the instant the call may
    /// go out and records it as the endpoint's last dispatch.
    pub fn reserve(&mut self, endpoint: String, now: Instant, min_interval: Duration) -> Instant {
        let at = now + self.delay_for(&endpoint, now, min_interval);
        self.record_dispatch(endpoint, at);
        at
    }

    // Records that can no longer delay anyone
    pub fn prune(&mut self, now: Instant, min_interval: Duration) {
        self.last_dispatch
            .retain(|_, last| *last + min_interval > now);
    }

    pub(crate) fn len(&self) -> usize {
        self.last_dispatch.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVAL: Duration = Duration::from_millis(100);

    #[test]
    fn unknown_endpoint_has_no_delay() {
        let tracker = ThrottleTracker::new();
        assert_eq!(tracker.delay_for("GET /foo", Instant::now(), INTERVAL), Duration::ZERO);
    }

    #[test]
    fn delay_counts_down_from_last_dispatch() {
        let start = Instant::now();
        let mut tracker = ThrottleTracker::new();
        tracker.record_dispatch("GET /foo".into(), start);

        let at_50 = start + Duration::from_millis(50);
        assert_eq!(tracker.delay_for("GET /foo", at_50, INTERVAL), Duration::from_millis(50));
        assert_eq!(tracker.delay_for("GET /foo", start + INTERVAL, INTERVAL), Duration::ZERO);
        assert_eq!(tracker.delay_for("GET /foo", start + Duration::from_secs(3), INTERVAL), Duration::ZERO);
        // other endpoints are independent
        assert_eq!(tracker.delay_for("POST /foo", at_50, INTERVAL), Duration::ZERO);
    }

    #[test]
    fn back_to_back_reservations_are_spaced() {
        let now = Instant::now();
        let mut tracker = ThrottleTracker::new();

        let first = tracker.reserve("GET /foo".into(), now, INTERVAL);
        let second = tracker.reserve("GET /foo".into(), now, INTERVAL);
        let third = tracker.reserve("GET /foo".into(), now, INTERVAL);
        assert_eq!(first, now);
        assert_eq!(second, now + INTERVAL);
        assert_eq!(third, now + INTERVAL * 2);
    }

    #[test]
    fn prune_forgets_idle_endpoints() {
        let start = Instant::now();
        let mut tracker = ThrottleTracker::new();
        tracker.record_dispatch("GET /a".into(), start);
        tracker.record_dispatch("GET /b".into(), start + Duration::from_millis(80));

        tracker.prune(start + Duration::from_millis(120), INTERVAL);
        assert_eq!(tracker.len(), 1);
        assert!(tracker.delay_for("GET /b", start + Duration::from_millis(120), INTERVAL) > Duration::ZERO);
    }
}
