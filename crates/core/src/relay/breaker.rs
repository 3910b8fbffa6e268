use std::time::{Duration, Instant};

/// Breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerStatus {
    /// Calls pass through.
    Closed,
    /// Calls short-circuit to the fallback.
    Open,
    /// A single probe call is in flight.
    HalfOpen,
}

impl BreakerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half-open",
        }
    }
}

/// Circuit breaker guarding the AI backend.
///
/// Open: N consecutive failures.
/// Probe: one call admitted after the cool-down elapses.
/// Close: probe succeeds. Probe failure re-opens with a fresh cool-down.
///
/// One shared instance per backend, owned by the relay engine; the
/// engine's `&mut` access is the serialization point for transitions.
#[derive(Debug)]
pub struct CircuitBreaker {
    status: BreakerStatus,
    consecutive_failures: u32,
    threshold: u32,
    cooldown: Duration,
    opened_at: Option<Instant>,
}

impl CircuitBreaker {
    pub fn new() -> Self {
        Self::with_params(5, 300)
    }

    pub fn with_params(threshold: u32, cooldown_secs: u64) -> Self {
        Self {
            status: BreakerStatus::Closed,
            consecutive_failures: 0,
            threshold: threshold.max(1),
            cooldown: Duration::from_secs(cooldown_secs),
            opened_at: None,
        }
    }

    /// Ask permission for one backend call. While open, flips to
    /// half-open once the cool-down has elapsed and admits exactly that
    /// one probe; further requests are denied until the probe resolves.
    pub fn try_acquire(&mut self) -> bool {
        match self.status {
            BreakerStatus::Closed => true,
            BreakerStatus::Open => {
                let elapsed = self.opened_at.map(|t| t.elapsed() >= self.cooldown).unwrap_or(true);
                if elapsed {
                    self.status = BreakerStatus::HalfOpen;
                    tracing::info!("circuit cool-down elapsed, admitting probe call");
                    true
                } else {
                    false
                }
            }
            BreakerStatus::HalfOpen => false,
        }
    }

    /// Record a successful call: failures reset, circuit closes.
    pub fn record_success(&mut self) {
        if self.status == BreakerStatus::HalfOpen {
            tracing::info!("probe succeeded, circuit closed");
        }
        self.status = BreakerStatus::Closed;
        self.consecutive_failures = 0;
        self.opened_at = None;
    }

    /// Record a failed, timed-out or empty call.
    pub fn record_failure(&mut self) {
        match self.status {
            BreakerStatus::HalfOpen => {
                self.status = BreakerStatus::Open;
                self.opened_at = Some(Instant::now());
                tracing::warn!("probe failed, circuit re-opened");
            }
            _ => {
                self.consecutive_failures += 1;
                if self.status == BreakerStatus::Closed
                    && self.consecutive_failures >= self.threshold
                {
                    self.status = BreakerStatus::Open;
                    self.opened_at = Some(Instant::now());
                    tracing::warn!(
                        failures = self.consecutive_failures,
                        "circuit opened after repeated backend failures"
                    );
                }
            }
        }
    }

    pub fn status(&self) -> BreakerStatus {
        self.status
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// For testing: open with a custom timestamp.
    #[cfg(test)]
    fn open_at(&mut self, at: Instant) {
        self.status = BreakerStatus::Open;
        self.opened_at = Some(at);
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_by_default_and_admits_calls() {
        let mut cb = CircuitBreaker::new();
        assert_eq!(cb.status(), BreakerStatus::Closed);
        assert!(cb.try_acquire());
    }

    #[test]
    fn opens_after_threshold_consecutive_failures() {
        let mut cb = CircuitBreaker::with_params(3, 60);
        cb.record_failure();
        cb.record_failure();
        assert_eq!(cb.status(), BreakerStatus::Closed);
        cb.record_failure();
        assert_eq!(cb.status(), BreakerStatus::Open);
    }

    #[test]
    fn success_resets_the_failure_count() {
        let mut cb = CircuitBreaker::with_params(3, 60);
        cb.record_failure();
        cb.record_failure();
        cb.record_success();
        assert_eq!(cb.consecutive_failures(), 0);
        cb.record_failure();
        cb.record_failure();
        assert_eq!(cb.status(), BreakerStatus::Closed);
    }

    #[test]
    fn open_denies_calls_within_cooldown() {
        let mut cb = CircuitBreaker::with_params(3, 60);
        for _ in 0..3 {
            cb.record_failure();
        }
        assert!(!cb.try_acquire());
        assert_eq!(cb.status(), BreakerStatus::Open);
    }

    #[test]
    fn cooldown_admits_exactly_one_probe() {
        let mut cb = CircuitBreaker::with_params(3, 60);
        // Opened 61 seconds ago, past the cool-down
        cb.open_at(Instant::now() - Duration::from_secs(61));
        assert!(cb.try_acquire());
        assert_eq!(cb.status(), BreakerStatus::HalfOpen);
        // Second caller is denied while the probe is in flight
        assert!(!cb.try_acquire());
    }

    #[test]
    fn probe_success_closes_the_circuit() {
        let mut cb = CircuitBreaker::with_params(3, 60);
        cb.open_at(Instant::now() - Duration::from_secs(61));
        assert!(cb.try_acquire());
        cb.record_success();
        assert_eq!(cb.status(), BreakerStatus::Closed);
        assert_eq!(cb.consecutive_failures(), 0);
        assert!(cb.try_acquire());
    }

    #[test]
    fn probe_failure_reopens_with_fresh_cooldown() {
        let mut cb = CircuitBreaker::with_params(3, 60);
        cb.open_at(Instant::now() - Duration::from_secs(61));
        assert!(cb.try_acquire());
        cb.record_failure();
        assert_eq!(cb.status(), BreakerStatus::Open);
        // Fresh cool-down: still denied immediately after the failed probe
        assert!(!cb.try_acquire());
    }
}
