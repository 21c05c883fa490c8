//! Per-connection rate limit for feedback events.

use std::collections::HashMap;
use std::time::Duration;

use pulsecheck_transport::ConnectionId;
use tokio::time::Instant;

/// Admits at most one feedback event per connection per interval.
///
/// Only admitted events move the window; a rejected event does not
/// extend it. Rejections are silent: the caller just drops the event.
#[derive(Debug)]
pub struct FeedbackThrottle {
    interval: Duration,
    last_accepted: HashMap<ConnectionId, Instant>,
}

impl FeedbackThrottle {
    /// Creates a throttle with the given minimum spacing.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_accepted: HashMap::new(),
        }
    }

    /// Returns `true` and records `now` if `conn` may send feedback.
    pub fn admit(&mut self, conn: ConnectionId, now: Instant) -> bool {
        if let Some(last) = self.last_accepted.get(&conn) {
            if now.saturating_duration_since(*last) < self.interval {
                return false;
            }
        }
        self.last_accepted.insert(conn, now);
        true
    }

    /// Drops the history for a connection that went away.
    pub fn forget(&mut self, conn: ConnectionId) {
        self.last_accepted.remove(&conn);
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.last_accepted.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HALF_SECOND: Duration = Duration::from_millis(500);

    fn cid(id: u64) -> ConnectionId {
        ConnectionId::new(id)
    }

    #[test]
    fn test_admit_first_event_is_accepted() {
        let mut throttle = FeedbackThrottle::new(HALF_SECOND);
        assert!(throttle.admit(cid(1), Instant::now()));
    }

    #[test]
    fn test_admit_within_interval_is_rejected() {
        let mut throttle = FeedbackThrottle::new(HALF_SECOND);
        let t0 = Instant::now();
        throttle.admit(cid(1), t0);

        assert!(!throttle.admit(cid(1), t0 + Duration::from_millis(499)));
    }

    #[test]
    fn test_admit_at_interval_boundary_is_accepted() {
        let mut throttle = FeedbackThrottle::new(HALF_SECOND);
        let t0 = Instant::now();
        throttle.admit(cid(1), t0);

        assert!(throttle.admit(cid(1), t0 + HALF_SECOND));
    }

    #[test]
    fn test_admit_rejection_does_not_extend_window() {
        let mut throttle = FeedbackThrottle::new(HALF_SECOND);
        let t0 = Instant::now();
        throttle.admit(cid(1), t0);
        throttle.admit(cid(1), t0 + Duration::from_millis(400));

        assert!(throttle.admit(cid(1), t0 + Duration::from_millis(500)));
    }

    #[test]
    fn test_admit_connections_are_independent() {
        let mut throttle = FeedbackThrottle::new(HALF_SECOND);
        let t0 = Instant::now();
        throttle.admit(cid(1), t0);

        assert!(throttle.admit(cid(2), t0 + Duration::from_millis(10)));
    }

    #[test]
    fn test_forget_resets_connection() {
        let mut throttle = FeedbackThrottle::new(HALF_SECOND);
        let t0 = Instant::now();
        throttle.admit(cid(1), t0);

        throttle.forget(cid(1));

        assert_eq!(throttle.tracked(), 0);
        assert!(throttle.admit(cid(1), t0 + Duration::from_millis(1)));
    }
}
