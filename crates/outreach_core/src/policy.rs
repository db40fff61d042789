//! crates/outreach_core/src/policy.rs
//!
//! The fixed table mapping a speed tier to inter-message delays, retry
//! behavior and operation timeouts.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeedTier {
    Slow,
    #[default]
    Normal,
    Fast,
}

impl SpeedTier {
    pub const ALL: [SpeedTier; 3] = [SpeedTier::Slow, SpeedTier::Normal, SpeedTier::Fast];

    /// The label shown to the operator.
    pub fn label(self) -> &'static str {
        match self {
            Self::Slow => "Lenta (5-8s)",
            Self::Normal => "Normal (3-5s)",
            Self::Fast => "Rápida (2-3s)",
        }
    }

    /// Matches an operator label leniently. Returns `None` for anything
    /// that names no tier.
    pub fn from_label(label: &str) -> Option<Self> {
        let trimmed = label.trim();
        if let Some(tier) = Self::ALL.into_iter().find(|tier| tier.label() == trimmed) {
            return Some(tier);
        }

        let folded: String = trimmed
            .to_lowercase()
            .chars()
            .map(|c| match c {
                'á' => 'a',
                'é' => 'e',
                'í' => 'i',
                'ó' => 'o',
                'ú' => 'u',
                other => other,
            })
            .collect();
        let first_word = folded
            .split(|c: char| !c.is_alphanumeric())
            .find(|word| !word.is_empty())
            .unwrap_or_default();

        match first_word {
            "lenta" | "lento" | "slow" => Some(Self::Slow),
            "normal" | "medium" => Some(Self::Normal),
            "rapida" | "rapido" | "fast" => Some(Self::Fast),
            _ => None,
        }
    }
}

/// Operator-facing hint about how likely a tier is to trip the messaging
/// service's abuse heuristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Inclusive bounds, in seconds, for the pause between two messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min_secs: u64,
    pub max_secs: u64,
}

impl DelayRange {
    /// Draws a uniformly distributed delay within the bounds.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let min = self.min_secs as f64;
        let max = self.max_secs.max(self.min_secs) as f64;
        if max <= min {
            return Duration::from_secs(self.min_secs);
        }
        Duration::from_secs_f64(rng.gen_range(min..=max))
    }

    pub fn contains(&self, delay: Duration) -> bool {
        delay >= Duration::from_secs(self.min_secs) && delay <= Duration::from_secs(self.max_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub retry_delay_secs: u64,
    pub exponential_backoff: bool,
}

impl RetryPolicy {
    /// The wait before retry number `retry` (0-based).
    pub fn delay_before_retry(&self, retry: u32) -> Duration {
        let base = Duration::from_secs(self.retry_delay_secs);
        if !self.exponential_backoff {
            return base;
        }
        base.saturating_mul(2u32.saturating_pow(retry))
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// Upper bounds, in seconds, for each phase of a generated program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeouts {
    pub initialization_secs: u64,
    pub client_ready_secs: u64,
    pub ready_poll_secs: u64,
    pub page_load_secs: u64,
    pub page_settle_secs: u64,
    pub message_send_secs: u64,
    pub element_search_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub tier: SpeedTier,
    pub delay: DelayRange,
    pub retry: RetryPolicy,
    pub timeouts: Timeouts,
    pub risk: RiskLevel,
}

const RETRY: RetryPolicy = RetryPolicy {
    max_retries: 3,
    retry_delay_secs: 5,
    exponential_backoff: true,
};

const TIMEOUTS: Timeouts = Timeouts {
    initialization_secs: 60,
    client_ready_secs: 180,
    ready_poll_secs: 10,
    page_load_secs: 45,
    page_settle_secs: 5,
    message_send_secs: 15,
    element_search_secs: 10,
};

/// The table entry for a tier.
pub const fn policy_for(tier: SpeedTier) -> Policy {
    let (delay, risk) = match tier {
        SpeedTier::Slow => (DelayRange { min_secs: 5, max_secs: 8 }, RiskLevel::Low),
        SpeedTier::Normal => (DelayRange { min_secs: 3, max_secs: 5 }, RiskLevel::Medium),
        SpeedTier::Fast => (DelayRange { min_secs: 2, max_secs: 3 }, RiskLevel::High),
    };
    Policy {
        tier,
        delay,
        retry: RETRY,
        timeouts: TIMEOUTS,
        risk,
    }
}

/// Looks up the policy for an operator label, falling back to `Normal`.
pub fn resolve_policy(label: &str) -> Policy {
    policy_for(SpeedTier::from_label(label).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_resolve_policy_exact_labels() {
        let slow = resolve_policy("Lenta (5-8s)");
        assert_eq!(slow.tier, SpeedTier::Slow);
        assert_eq!(slow.delay, DelayRange { min_secs: 5, max_secs: 8 });
        assert_eq!(slow.risk, RiskLevel::Low);

        let fast = resolve_policy("Rápida (2-3s)");
        assert_eq!(fast.delay, DelayRange { min_secs: 2, max_secs: 3 });
        assert_eq!(fast.risk, RiskLevel::High);
    }

    #[test]
    fn test_resolve_policy_loose_labels() {
        assert_eq!(resolve_policy("rapida").tier, SpeedTier::Fast);
        assert_eq!(resolve_policy("  FAST ").tier, SpeedTier::Fast);
        assert_eq!(resolve_policy("slow please").tier, SpeedTier::Slow);
    }

    #[test]
    fn test_unknown_label_is_normal() {
        assert_eq!(resolve_policy("Turbo"), resolve_policy("Normal (3-5s)"));
        assert_eq!(resolve_policy(""), policy_for(SpeedTier::Normal));
    }

    #[test]
    fn test_tiers_share_retry_and_timeouts() {
        for tier in SpeedTier::ALL {
            let policy = policy_for(tier);
            assert_eq!(policy.retry.max_retries, 3);
            assert_eq!(policy.retry.retry_delay_secs, 5);
            assert_eq!(policy.timeouts.client_ready_secs, 180);
            assert_eq!(policy.timeouts.message_send_secs, 15);
        }
    }

    #[test]
    fn test_exponential_backoff() {
        let retry = policy_for(SpeedTier::Normal).retry;
        assert_eq!(retry.delay_before_retry(0), Duration::from_secs(5));
        assert_eq!(retry.delay_before_retry(1), Duration::from_secs(10));
        assert_eq!(retry.delay_before_retry(2), Duration::from_secs(20));
        assert_eq!(retry.max_attempts(), 4);

        let flat = RetryPolicy { exponential_backoff: false, ..retry };
        assert_eq!(flat.delay_before_retry(2), Duration::from_secs(5));
    }

    #[test]
    fn test_sampled_delay_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for tier in SpeedTier::ALL {
            let delay = policy_for(tier).delay;
            for _ in 0..200 {
                assert!(delay.contains(delay.sample(&mut rng)), "{tier:?} sampled out of range");
            }
        }
    }
}
