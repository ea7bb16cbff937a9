// service/rate_limiter.rs
//
// Per-actor daily quotas on decisions and undos. Counting happens in the
// database with an atomic increment-and-check upsert keyed by (actor, day);
// nothing is tallied in process memory, so concurrent requests from the same
// actor resolve correctly on any number of instances.
use chrono::{DateTime, Days, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{db::DBClient, decisiondb::DecisionExt};
use crate::models::actormodel::ActorRole;
use crate::service::error::ServiceError;

pub const PERFORMER_DAILY_DECISIONS: i32 = 100;
pub const VENUE_DAILY_DECISIONS: i32 = 200;
pub const PERFORMER_DAILY_UNDOS: i32 = 10;
pub const VENUE_DAILY_UNDOS: i32 = 20;

#[derive(Debug, Clone)]
pub struct RateLimiter {
    db_client: Arc<DBClient>,
}

impl RateLimiter {
    pub fn new(db_client: Arc<DBClient>) -> Self {
        Self { db_client }
    }

    pub fn decision_quota(role: ActorRole) -> i32 {
        match role {
            ActorRole::Performer => PERFORMER_DAILY_DECISIONS,
            ActorRole::Venue => VENUE_DAILY_DECISIONS,
        }
    }

    pub fn undo_quota(role: ActorRole) -> i32 {
        match role {
            ActorRole::Performer => PERFORMER_DAILY_UNDOS,
            ActorRole::Venue => VENUE_DAILY_UNDOS,
        }
    }

    /// Next UTC midnight; the accounting day is UTC.
    pub fn next_reset(now: DateTime<Utc>) -> DateTime<Utc> {
        (now.date_naive() + Days::new(1))
            .and_hms_opt(0, 0, 0)
            .expect("midnight is always a valid time")
            .and_utc()
    }

    pub async fn consume_decision(
        &self,
        actor_id: Uuid,
        role: ActorRole,
    ) -> Result<(), ServiceError> {
        let now = Utc::now();
        let taken = self
            .db_client
            .increment_decision_count(actor_id, now.date_naive(), Self::decision_quota(role))
            .await?;

        match taken {
            Some(_) => Ok(()),
            None => Err(ServiceError::ResourceExhausted {
                resets_at: Self::next_reset(now),
            }),
        }
    }

    pub async fn consume_undo(&self, actor_id: Uuid, role: ActorRole) -> Result<(), ServiceError> {
        let now = Utc::now();
        let taken = self
            .db_client
            .increment_undo_count(actor_id, now.date_naive(), Self::undo_quota(role))
            .await?;

        match taken {
            Some(_) => Ok(()),
            None => Err(ServiceError::ResourceExhausted {
                resets_at: Self::next_reset(now),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn performer_decision_quota_is_one_hundred() {
        assert_eq!(RateLimiter::decision_quota(ActorRole::Performer), 100);
    }

    #[test]
    fn performers_have_tighter_quotas_than_venues() {
        assert!(
            RateLimiter::decision_quota(ActorRole::Performer)
                < RateLimiter::decision_quota(ActorRole::Venue)
        );
        assert!(
            RateLimiter::undo_quota(ActorRole::Performer)
                < RateLimiter::undo_quota(ActorRole::Venue)
        );
        // Undo quotas are a fraction of decision quotas.
        assert!(
            RateLimiter::undo_quota(ActorRole::Performer)
                < RateLimiter::decision_quota(ActorRole::Performer)
        );
    }

    #[test]
    fn reset_is_next_utc_midnight() {
        let now = Utc.with_ymd_and_hms(2026, 3, 14, 15, 9, 26).unwrap();
        let reset = RateLimiter::next_reset(now);
        assert_eq!(reset, Utc.with_ymd_and_hms(2026, 3, 15, 0, 0, 0).unwrap());
        assert_eq!(reset.hour(), 0);
        assert!(reset > now);
    }

    #[test]
    fn reset_rolls_over_month_boundaries() {
        let now = Utc.with_ymd_and_hms(2026, 1, 31, 23, 59, 59).unwrap();
        assert_eq!(
            RateLimiter::next_reset(now),
            Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap()
        );
    }
}
