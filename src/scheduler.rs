use std::time::{Duration, Instant};

pub const INTERVAL_STEP: Duration = Duration::from_secs(10);
pub const MIN_INTERVAL: Duration = Duration::from_secs(10);

/// Decides on each tick whether an automatic full refresh is due.
#[derive(Debug, Clone)]
pub struct RefreshScheduler {
    interval: Duration,
    enabled: bool,
    last_refresh: Option<Instant>,
}

impl RefreshScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            enabled: true,
            last_refresh: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Due when enabled and a full interval has passed since the last
    /// completed refresh. With no refresh completed yet it is due at once;
    /// the caller decides whether one is already in flight.
    pub fn is_due(&self, now: Instant) -> bool {
        if !self.enabled {
            return false;
        }
        match self.last_refresh {
            Some(last) => now.saturating_duration_since(last) >= self.interval,
            None => true,
        }
    }

    /// Record a completed refresh, successful or not.
    pub fn mark_refreshed(&mut self, at: Instant) {
        self.last_refresh = Some(at);
    }

    pub fn toggle(&mut self) -> bool {
        self.enabled = !self.enabled;
        self.enabled
    }

    pub fn increase(&mut self) -> Duration {
        self.interval += INTERVAL_STEP;
        self.interval
    }

    /// Never goes below the floor, and leaves a configured interval that is
    /// already shorter alone.
    pub fn decrease(&mut self) -> Duration {
        if self.interval > MIN_INTERVAL {
            self.interval = self.interval.saturating_sub(INTERVAL_STEP).max(MIN_INTERVAL);
        }
        self.interval
    }
}
