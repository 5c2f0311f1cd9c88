//! Wait times between attempts and between items.
//!
//! A single-run adaptive policy: the inter-call delay grows on every
//! rate-limit failure and is never shrunk again until the controller is
//! rebuilt (i.e. process restart). The penalty counter resets on success.

use std::time::Duration;

use rand::Rng;

use crate::config::RunConfig;
use crate::error::FailureClass;

/// Lower bound for any retry wait, in seconds.
pub const MIN_DELAY_SECS: f64 = 0.5;
/// Added to a server `Retry-After` hint.
pub const HINT_MARGIN_SECS: f64 = 1.0;
/// Cooldown seconds per consecutive rate-limit penalty.
pub const COOLDOWN_PER_PENALTY_SECS: f64 = 5.0;

#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    /// Seconds for attempt 0 before doubling.
    pub base: f64,
    /// Upper bound for retry waits and cooldowns.
    pub cap: f64,
    /// Symmetric jitter as a fraction of the computed delay.
    pub jitter: f64,
    /// Multiplier applied to the inter-call delay per rate-limit failure.
    pub growth: f64,
}

impl From<&RunConfig> for BackoffPolicy {
    fn from(config: &RunConfig) -> Self {
        Self {
            base: config.backoff_base,
            cap: config.max_backoff,
            jitter: config.jitter,
            growth: config.delay_increase_factor,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BackoffController {
    policy: BackoffPolicy,
    inter_call_secs: f64,
    penalty: u32,
}

impl BackoffController {
    pub fn new(policy: BackoffPolicy, inter_call_secs: f64) -> Self {
        Self {
            policy,
            inter_call_secs,
            penalty: 0,
        }
    }

    /// `base * 2^attempt`, before jitter and clamping. Non-decreasing in `attempt`.
    pub fn raw_delay(&self, attempt: u32) -> f64 {
        self.policy.base * 2f64.powi(attempt.min(1023) as i32)
    }

    fn clamp(&self, secs: f64) -> f64 {
        secs.max(MIN_DELAY_SECS).min(self.policy.cap)
    }

    /// Seconds to wait before retrying after the 0-based `attempt` failed.
    pub fn next_delay(&self, attempt: u32, retry_after: Option<f64>) -> f64 {
        self.next_delay_with(&mut rand::thread_rng(), attempt, retry_after)
    }

    pub fn next_delay_with<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        attempt: u32,
        retry_after: Option<f64>,
    ) -> f64 {
        if let Some(hint) = retry_after {
            return self.clamp(hint + HINT_MARGIN_SECS);
        }
        let expo = self.raw_delay(attempt);
        let spread = (expo * self.policy.jitter).abs();
        let jittered = if spread.is_finite() && spread > 0.0 {
            expo + rng.gen_range(-spread..=spread)
        } else {
            expo
        };
        self.clamp(jittered)
    }

    /// Feed a failed attempt. Only rate-limit failures change state.
    pub fn record_failure(&mut self, class: &FailureClass) {
        if class.is_rate_limited() {
            self.penalty += 1;
            self.inter_call_secs *= self.policy.growth;
        }
    }

    pub fn record_success(&mut self) {
        self.penalty = 0;
    }

    pub fn penalty(&self) -> u32 {
        self.penalty
    }

    pub fn inter_call_secs(&self) -> f64 {
        self.inter_call_secs
    }

    /// Polite pause after a successful item.
    pub fn inter_call_delay(&self) -> Duration {
        secs_to_duration(self.inter_call_secs)
    }

    /// Extra pause before the next item while rate-limit penalties are outstanding.
    pub fn cooldown(&self) -> Option<Duration> {
        if self.penalty == 0 {
            return None;
        }
        let secs = (COOLDOWN_PER_PENALTY_SECS * self.penalty as f64).min(self.policy.cap);
        Some(secs_to_duration(secs))
    }
}

/// Non-positive and NaN map to zero; values too large for a `Duration` saturate.
pub fn secs_to_duration(secs: f64) -> Duration {
    if secs.is_nan() || secs <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn policy() -> BackoffPolicy {
        BackoffPolicy {
            base: 2.0,
            cap: 60.0,
            jitter: 0.3,
            growth: 1.5,
        }
    }

    #[test]
    fn raw_delay_doubles() {
        let c = BackoffController::new(policy(), 1.0);
        assert_eq!(c.raw_delay(0), 2.0);
        assert_eq!(c.raw_delay(1), 4.0);
        assert_eq!(c.raw_delay(3), 16.0);
    }

    #[test]
    fn raw_delay_is_monotonic() {
        let c = BackoffController::new(policy(), 1.0);
        for attempt in 0..2000u32 {
            assert!(c.raw_delay(attempt + 1) >= c.raw_delay(attempt));
        }
    }

    #[test]
    fn jittered_delay_stays_in_bounds() {
        let c = BackoffController::new(policy(), 1.0);
        let mut rng = StdRng::seed_from_u64(7);
        for attempt in 0..64u32 {
            for _ in 0..50 {
                let d = c.next_delay_with(&mut rng, attempt, None);
                assert!((MIN_DELAY_SECS..=60.0).contains(&d), "attempt {attempt}: {d}");
            }
        }
    }

    #[test]
    fn jitter_is_symmetric_around_expo() {
        let c = BackoffController::new(policy(), 1.0);
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let d = c.next_delay_with(&mut rng, 2, None);
            assert!((5.6..=10.4).contains(&d), "{d}");
        }
    }

    #[test]
    fn tiny_base_is_floored() {
        let mut p = policy();
        p.base = 0.01;
        p.jitter = 0.0;
        let c = BackoffController::new(p, 1.0);
        assert_eq!(c.next_delay(0, None), MIN_DELAY_SECS);
    }

    #[test]
    fn retry_after_hint_overrides_and_is_capped() {
        let c = BackoffController::new(policy(), 1.0);
        assert_eq!(c.next_delay(0, Some(3.0)), 4.0);
        assert_eq!(c.next_delay(5, Some(120.0)), 60.0);
    }

    #[test]
    fn rate_limits_grow_delay_and_penalty() {
        let mut c = BackoffController::new(policy(), 2.0);
        c.record_failure(&FailureClass::RateLimited { retry_after: None });
        c.record_failure(&FailureClass::RateLimited { retry_after: None });
        assert_eq!(c.penalty(), 2);
        assert_eq!(c.inter_call_secs(), 4.5);
        assert_eq!(c.cooldown(), Some(Duration::from_secs(10)));
    }

    #[test]
    fn transient_failures_leave_state_alone() {
        let mut c = BackoffController::new(policy(), 2.0);
        c.record_failure(&FailureClass::Transient { retry_after: Some(1.0) });
        c.record_failure(&FailureClass::Fatal);
        assert_eq!(c.penalty(), 0);
        assert_eq!(c.inter_call_secs(), 2.0);
        assert_eq!(c.cooldown(), None);
    }

    #[test]
    fn success_resets_penalty_but_not_delay() {
        let mut c = BackoffController::new(policy(), 2.0);
        c.record_failure(&FailureClass::RateLimited { retry_after: None });
        c.record_success();
        assert_eq!(c.penalty(), 0);
        assert_eq!(c.inter_call_secs(), 3.0);
        assert_eq!(c.cooldown(), None);
    }

    #[test]
    fn duration_conversion_saturates() {
        assert_eq!(secs_to_duration(-1.0), Duration::ZERO);
        assert_eq!(secs_to_duration(f64::NAN), Duration::ZERO);
        assert_eq!(secs_to_duration(1.5), Duration::from_millis(1500));
        assert_eq!(secs_to_duration(1e30), Duration::MAX);
        assert_eq!(secs_to_duration(f64::INFINITY), Duration::MAX);
    }

    #[test]
    fn long_rate_limit_streak_does_not_overflow_delay() {
        let mut c = BackoffController::new(policy(), 1.0);
        for _ in 0..120 {
            c.record_failure(&FailureClass::RateLimited { retry_after: None });
        }
        assert!(c.inter_call_secs() > 1e19);
        assert_eq!(c.inter_call_delay(), Duration::MAX);
        assert_eq!(c.cooldown(), Some(Duration::from_secs(60)));
    }

    #[test]
    fn cooldown_is_capped() {
        let mut p = policy();
        p.cap = 12.0;
        let mut c = BackoffController::new(p, 1.0);
        for _ in 0..5 {
            c.record_failure(&FailureClass::RateLimited { retry_after: None });
        }
        assert_eq!(c.cooldown(), Some(Duration::from_secs(12)));
    }
}
