//! Per-actor vote admission control
//!
//! Each actor may cast at most `max_votes` votes in any trailing window of
//! `window` length. The count is always derived from the vote ledger rather
//! than a separate counter. The check is best-effort: it performs no writes,
//! so a check racing a concurrent record can let one extra vote through.
//!
//! A vote counts until exactly `window` after it was cast, so a denied actor
//! who waits the full window is admitted again.
//!
//! If the ledger cannot be read the check fails open and admits the vote;
//! voting availability wins over strict enforcement.

use crate::error::ArenaError;
use crate::ledger::VoteLedger;
use crate::types::Admission;
use crate::utils::to_chrono;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Default number of votes allowed per window
pub const DEFAULT_MAX_VOTES: usize = 15;

/// Default window length in hours
pub const DEFAULT_WINDOW_HOURS: u64 = 12;

/// Configuration for the vote limiter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitConfig {
    /// Votes allowed per actor inside one window
    pub max_votes: usize,
    /// Trailing window length
    pub window: Duration,
    /// Disable to admit every vote
    pub enabled: bool,
    /// Report the time until the oldest in-window vote expires instead of
    /// the full window length
    pub precise_retry_after: bool,
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            max_votes: DEFAULT_MAX_VOTES,
            window: Duration::from_secs(DEFAULT_WINDOW_HOURS * 3600),
            enabled: true,
            precise_retry_after: false,
        }
    }
}

/// Detailed result of an admission check
#[derive(Debug, Clone, PartialEq)]
pub enum AdmissionDecision {
    /// Under the limit
    Allowed { used: usize },
    /// At or over the limit
    Denied { used: usize, retry_after: Duration },
    /// Ledger unreadable; admitted anyway
    FailedOpen { error: ArenaError },
    /// Limiting switched off
    Disabled,
}

impl AdmissionDecision {
    pub fn is_allowed(&self) -> bool {
        !matches!(self, AdmissionDecision::Denied { .. })
    }
}

impl From<&AdmissionDecision> for Admission {
    fn from(decision: &AdmissionDecision) -> Self {
        match decision {
            AdmissionDecision::Denied { retry_after, .. } => Admission::denied(*retry_after),
            _ => Admission::allowed(),
        }
    }
}

/// Sliding-window vote limiter backed by the ledger
pub struct RateLimiter {
    ledger: Arc<VoteLedger>,
    config: LimitConfig,
}

impl RateLimiter {
    pub fn new(ledger: Arc<VoteLedger>, config: LimitConfig) -> Self {
        Self { ledger, config }
    }

    pub fn config(&self) -> &LimitConfig {
        &self.config
    }

    /// May `actor_id` vote now?
    pub async fn check_admission(&self, actor_id: &str) -> Admission {
        Admission::from(&self.evaluate(actor_id).await)
    }

    /// Admission check with the reason behind the answer
    pub async fn evaluate(&self, actor_id: &str) -> AdmissionDecision {
        if !self.config.enabled {
            return AdmissionDecision::Disabled;
        }

        let now = self.ledger.clock().now();
        // A window reaching past the start of representable time covers all history
        let window_start = now
            .checked_sub_signed(to_chrono(self.config.window))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        let used = match self.ledger.count_since(actor_id, window_start).await {
            Ok(used) => used,
            Err(error) => {
                warn!(
                    "Vote limit check failed for actor '{}', failing open: {}",
                    actor_id, error
                );
                return AdmissionDecision::FailedOpen { error };
            }
        };

        if used < self.config.max_votes {
            debug!(
                "Actor '{}' admitted ({}/{} votes in window)",
                actor_id, used, self.config.max_votes
            );
            return AdmissionDecision::Allowed { used };
        }

        let retry_after = self.retry_after(actor_id, window_start, now).await;
        debug!(
            "Actor '{}' over vote limit ({}/{}), retry in {}s",
            actor_id,
            used,
            self.config.max_votes,
            retry_after.as_secs()
        );

        AdmissionDecision::Denied { used, retry_after }
    }

    async fn retry_after(
        &self,
        actor_id: &str,
        window_start: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Duration {
        if !self.config.precise_retry_after {
            return self.config.window;
        }

        // The oldest vote leaves the window exactly one window after it was cast
        match self.ledger.oldest_since(actor_id, window_start).await {
            Ok(Some(oldest)) => oldest
                .checked_add_signed(to_chrono(self.config.window))
                .and_then(|expiry| (expiry - now).to_std().ok())
                .map(round_up_to_seconds)
                .unwrap_or(self.config.window)
                .max(Duration::from_secs(1)),
            Ok(None) => self.config.window,
            Err(e) => {
                debug!("Falling back to full window retry hint: {}", e);
                self.config.window
            }
        }
    }
}

/// Whole seconds, never shorter than `d`
fn round_up_to_seconds(d: Duration) -> Duration {
    let secs = d.as_secs() + u64::from(d.subsec_nanos() > 0);
    Duration::from_secs(secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rating::EloRatingEngine;
    use crate::store::vote::MockVoteStore;
    use crate::store::{InMemoryEntityStore, InMemoryVoteStore};
    use crate::types::Entity;
    use crate::utils::ManualClock;

    const HOUR: Duration = Duration::from_secs(3600);

    fn ledger_with(votes: Arc<dyn crate::store::VoteStore>, clock: Arc<ManualClock>) -> Arc<VoteLedger> {
        let entities = Arc::new(
            InMemoryEntityStore::with_entities(vec![
                Entity::new("a", "Alpha", "female"),
                Entity::new("b", "Beta", "female"),
            ])
            .unwrap(),
        );
        Arc::new(VoteLedger::with_clock(
            entities,
            votes,
            Arc::new(EloRatingEngine::default()),
            clock,
        ))
    }

    #[tokio::test]
    async fn test_limit_then_window_expiry() {
        let clock = Arc::new(ManualClock::default());
        let ledger = ledger_with(Arc::new(InMemoryVoteStore::new()), clock.clone());
        let limiter = RateLimiter::new(ledger.clone(), LimitConfig::default());

        for i in 0..DEFAULT_MAX_VOTES {
            let admission = limiter.check_admission("alice").await;
            assert!(admission.allowed, "vote {} should be admitted", i + 1);
            ledger.record("a", "b", "alice").await.unwrap();
            clock.advance(Duration::from_secs(60));
        }

        let denied = limiter.check_admission("alice").await;
        assert!(!denied.allowed);
        assert_eq!(denied.retry_after, Some(12 * HOUR));

        // Other actors are unaffected
        assert!(limiter.check_admission("bob").await.allowed);

        // First vote was cast 15 minutes ago; it still counts one second
        // before its window closes and stops counting exactly at the close
        clock.advance(12 * HOUR - Duration::from_secs(15 * 60 + 1));
        assert!(!limiter.check_admission("alice").await.allowed);
        clock.advance(Duration::from_secs(1));
        assert!(limiter.check_admission("alice").await.allowed);
    }

    #[tokio::test]
    async fn test_waiting_full_window_hint_is_enough() {
        let clock = Arc::new(ManualClock::default());
        let ledger = ledger_with(Arc::new(InMemoryVoteStore::new()), clock.clone());
        let limiter = RateLimiter::new(
            ledger.clone(),
            LimitConfig {
                max_votes: 1,
                ..LimitConfig::default()
            },
        );

        ledger.record("a", "b", "alice").await.unwrap();
        let denied = limiter.check_admission("alice").await;
        let retry_after = denied.retry_after.unwrap();
        assert_eq!(retry_after, 12 * HOUR);

        clock.advance(retry_after);
        assert!(limiter.check_admission("alice").await.allowed);
    }

    #[tokio::test]
    async fn test_precise_retry_after() {
        let clock = Arc::new(ManualClock::default());
        let ledger = ledger_with(Arc::new(InMemoryVoteStore::new()), clock.clone());
        let limiter = RateLimiter::new(
            ledger.clone(),
            LimitConfig {
                max_votes: 2,
                window: 12 * HOUR,
                enabled: true,
                precise_retry_after: true,
            },
        );

        ledger.record("a", "b", "alice").await.unwrap();
        clock.advance(HOUR);
        ledger.record("b", "a", "alice").await.unwrap();
        clock.advance(HOUR);

        match limiter.evaluate("alice").await {
            AdmissionDecision::Denied { used, retry_after } => {
                assert_eq!(used, 2);
                assert_eq!(retry_after, 10 * HOUR);
            }
            other => panic!("expected denial, got {:?}", other),
        }

        clock.advance(10 * HOUR - Duration::from_secs(1));
        assert!(!limiter.check_admission("alice").await.allowed);
        clock.advance(Duration::from_secs(1));
        assert!(limiter.check_admission("alice").await.allowed);
    }

    #[test]
    fn test_round_up_to_seconds() {
        assert_eq!(round_up_to_seconds(Duration::from_secs(5)), Duration::from_secs(5));
        assert_eq!(
            round_up_to_seconds(Duration::from_millis(4001)),
            Duration::from_secs(5)
        );
        assert_eq!(round_up_to_seconds(Duration::ZERO), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_oversized_window_covers_all_history() {
        let clock = Arc::new(ManualClock::default());
        let ledger = ledger_with(Arc::new(InMemoryVoteStore::new()), clock.clone());
        let window = Duration::from_secs(u64::MAX / 2);

        for precise_retry_after in [false, true] {
            let limiter = RateLimiter::new(
                ledger.clone(),
                LimitConfig {
                    max_votes: 1,
                    window,
                    enabled: true,
                    precise_retry_after,
                },
            );
            assert!(limiter.check_admission("alice").await.allowed);
        }

        ledger.record("a", "b", "alice").await.unwrap();

        for precise_retry_after in [false, true] {
            let limiter = RateLimiter::new(
                ledger.clone(),
                LimitConfig {
                    max_votes: 1,
                    window,
                    enabled: true,
                    precise_retry_after,
                },
            );
            assert_eq!(
                limiter.evaluate("alice").await,
                AdmissionDecision::Denied {
                    used: 1,
                    retry_after: window
                }
            );
        }
    }

    #[tokio::test]
    async fn test_fails_open_when_ledger_unreadable() {
        let mut store = MockVoteStore::new();
        store
            .expect_count_since()
            .returning(|_, _| Err(ArenaError::store("connection refused")));

        let ledger = ledger_with(Arc::new(store), Arc::new(ManualClock::default()));
        let limiter = RateLimiter::new(ledger, LimitConfig::default());

        let decision = limiter.evaluate("alice").await;
        assert!(matches!(decision, AdmissionDecision::FailedOpen { .. }));
        assert!(decision.is_allowed());
        assert_eq!(limiter.check_admission("alice").await, Admission::allowed());
    }

    #[tokio::test]
    async fn test_check_is_read_only() {
        let mut store = MockVoteStore::new();
        store.expect_count_since().times(3).returning(|_, _| Ok(0));
        store.expect_append().never();

        let ledger = ledger_with(Arc::new(store), Arc::new(ManualClock::default()));
        let limiter = RateLimiter::new(ledger, LimitConfig::default());

        for _ in 0..3 {
            assert!(limiter.check_admission("alice").await.allowed);
        }
    }

    #[tokio::test]
    async fn test_disabled_limiter_never_reads_ledger() {
        let mut store = MockVoteStore::new();
        store.expect_count_since().never();

        let ledger = ledger_with(Arc::new(store), Arc::new(ManualClock::default()));
        let limiter = RateLimiter::new(
            ledger,
            LimitConfig {
                enabled: false,
                ..LimitConfig::default()
            },
        );

        assert_eq!(limiter.evaluate("alice").await, AdmissionDecision::Disabled);
    }
}
