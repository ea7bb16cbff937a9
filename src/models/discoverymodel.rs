use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::actormodel::ActorRole;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "swipe_direction", rename_all = "snake_case")]
pub enum SwipeDirection {
    Like,
    Pass,
    Superlike,
}

impl SwipeDirection {
    /// Likes and superlikes count towards reciprocity; passes never do.
    pub fn is_positive(&self) -> bool {
        matches!(self, SwipeDirection::Like | SwipeDirection::Superlike)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "decision_outcome", rename_all = "snake_case")]
pub enum DecisionOutcome {
    NoMatch,
    Liked,
    Matched,
    Expired,
}

/// One directional swipe by an actor about a target. At most one row per
/// (actor, target) pair, enforced by a unique constraint.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Decision {
    pub id: Uuid,
    pub actor_id: Uuid,
    pub actor_role: ActorRole,
    pub target_id: Uuid,
    pub target_role: ActorRole,
    pub direction: SwipeDirection,
    pub outcome: DecisionOutcome,
    pub gig_id: Option<Uuid>, // originating opportunity, if swiped from a gig card
    pub undo_expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Decision {
    pub fn undo_window_open(&self, now: DateTime<Utc>) -> bool {
        now < self.undo_expires_at
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "match_status", rename_all = "snake_case")]
pub enum MatchStatus {
    Active,
    Archived,
    Blocked,
    ConvertedToBooking,
}

/// Materialized mutual interest. The performer/venue column split is the pair
/// normalization: roles are disjoint, so the unordered pair always lands in
/// the same two columns regardless of who swiped first.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct MatchRecord {
    pub id: Uuid,
    pub performer_id: Uuid,
    pub venue_id: Uuid,
    pub status: MatchStatus,
    pub performer_unread: i32,
    pub venue_unread: i32,
    pub last_activity_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl MatchRecord {
    pub fn involves(&self, actor_id: Uuid) -> bool {
        self.performer_id == actor_id || self.venue_id == actor_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_are_not_positive() {
        assert!(SwipeDirection::Like.is_positive());
        assert!(SwipeDirection::Superlike.is_positive());
        assert!(!SwipeDirection::Pass.is_positive());
    }

    #[test]
    fn undo_window_closes_at_deadline() {
        let now = Utc::now();
        let decision = Decision {
            id: Uuid::new_v4(),
            actor_id: Uuid::new_v4(),
            actor_role: ActorRole::Performer,
            target_id: Uuid::new_v4(),
            target_role: ActorRole::Venue,
            direction: SwipeDirection::Like,
            outcome: DecisionOutcome::Liked,
            gig_id: None,
            undo_expires_at: now + chrono::Duration::minutes(5),
            created_at: now,
        };
        assert!(decision.undo_window_open(now + chrono::Duration::minutes(2)));
        assert!(!decision.undo_window_open(now + chrono::Duration::minutes(5)));
        assert!(!decision.undo_window_open(now + chrono::Duration::minutes(6)));
    }
}
