// db/decisiondb.rs
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::actormodel::ActorRole;
use crate::models::discoverymodel::{Decision, DecisionOutcome, SwipeDirection};

#[async_trait]
pub trait DecisionExt {
    /// Insert a decision for the (actor, target) pair. Returns `None` when a
    /// decision already exists: the unique constraint is the duplicate guard,
    /// there is no read-then-write window.
    async fn create_decision(
        &self,
        actor_id: Uuid,
        actor_role: ActorRole,
        target_id: Uuid,
        target_role: ActorRole,
        direction: SwipeDirection,
        outcome: DecisionOutcome,
        gig_id: Option<Uuid>,
        undo_expires_at: DateTime<Utc>,
    ) -> Result<Option<Decision>, Error>;

    async fn get_decision_by_id(&self, decision_id: Uuid) -> Result<Option<Decision>, Error>;

    /// Symmetric reciprocity lookup: a still-pending positive decision the
    /// target recorded about the actor.
    async fn find_reciprocal(
        &self,
        actor_id: Uuid,
        target_id: Uuid,
    ) -> Result<Option<Decision>, Error>;

    /// Delete a decision and expire any reciprocal pending like in one
    /// transaction, so the counterpart's like does not silently wait for a
    /// match that can no longer happen.
    async fn delete_decision_and_expire_reciprocal(
        &self,
        decision_id: Uuid,
        actor_id: Uuid,
        target_id: Uuid,
    ) -> Result<(), Error>;

    /// Atomic increment-and-check on the daily decision counter. Returns the
    /// new count, or `None` when the quota is already spent.
    async fn increment_decision_count(
        &self,
        actor_id: Uuid,
        day: NaiveDate,
        limit: i32,
    ) -> Result<Option<i32>, Error>;

    /// Same as `increment_decision_count` for undo operations.
    async fn increment_undo_count(
        &self,
        actor_id: Uuid,
        day: NaiveDate,
        limit: i32,
    ) -> Result<Option<i32>, Error>;
}

#[async_trait]
impl DecisionExt for DBClient {
    async fn create_decision(
        &self,
        actor_id: Uuid,
        actor_role: ActorRole,
        target_id: Uuid,
        target_role: ActorRole,
        direction: SwipeDirection,
        outcome: DecisionOutcome,
        gig_id: Option<Uuid>,
        undo_expires_at: DateTime<Utc>,
    ) -> Result<Option<Decision>, Error> {
        sqlx::query_as::<_, Decision>(
            r#"
            INSERT INTO decisions
            (actor_id, actor_role, target_id, target_role, direction, outcome, gig_id, undo_expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (actor_id, target_id) DO NOTHING
            RETURNING id, actor_id, actor_role, target_id, target_role, direction, outcome,
                      gig_id, undo_expires_at, created_at
            "#,
        )
        .bind(actor_id)
        .bind(actor_role)
        .bind(target_id)
        .bind(target_role)
        .bind(direction)
        .bind(outcome)
        .bind(gig_id)
        .bind(undo_expires_at)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_decision_by_id(&self, decision_id: Uuid) -> Result<Option<Decision>, Error> {
        sqlx::query_as::<_, Decision>(
            r#"
            SELECT id, actor_id, actor_role, target_id, target_role, direction, outcome,
                   gig_id, undo_expires_at, created_at
            FROM decisions
            WHERE id = $1
            "#,
        )
        .bind(decision_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn find_reciprocal(
        &self,
        actor_id: Uuid,
        target_id: Uuid,
    ) -> Result<Option<Decision>, Error> {
        sqlx::query_as::<_, Decision>(
            r#"
            SELECT id, actor_id, actor_role, target_id, target_role, direction, outcome,
                   gig_id, undo_expires_at, created_at
            FROM decisions
            WHERE actor_id = $1
              AND target_id = $2
              AND direction IN ('like', 'superlike')
              AND outcome = 'liked'
            "#,
        )
        .bind(target_id)
        .bind(actor_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_decision_and_expire_reciprocal(
        &self,
        decision_id: Uuid,
        actor_id: Uuid,
        target_id: Uuid,
    ) -> Result<(), Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM decisions WHERE id = $1")
            .bind(decision_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            UPDATE decisions
            SET outcome = 'expired'
            WHERE actor_id = $1 AND target_id = $2 AND outcome = 'liked'
            "#,
        )
        .bind(target_id)
        .bind(actor_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await
    }

    async fn increment_decision_count(
        &self,
        actor_id: Uuid,
        day: NaiveDate,
        limit: i32,
    ) -> Result<Option<i32>, Error> {
        // The WHERE on the conflict arm makes this an atomic
        // increment-and-check: a row only comes back while under quota.
        let row: Option<(i32,)> = sqlx::query_as(
            r#"
            INSERT INTO swipe_quotas (actor_id, quota_date, decision_count, undo_count)
            VALUES ($1, $2, 1, 0)
            ON CONFLICT (actor_id, quota_date) DO UPDATE
            SET decision_count = swipe_quotas.decision_count + 1
            WHERE swipe_quotas.decision_count < $3
            RETURNING decision_count
            "#,
        )
        .bind(actor_id)
        .bind(day)
        .bind(limit)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(count,)| count))
    }

    async fn increment_undo_count(
        &self,
        actor_id: Uuid,
        day: NaiveDate,
        limit: i32,
    ) -> Result<Option<i32>, Error> {
        let row: Option<(i32,)> = sqlx::query_as(
            r#"
            INSERT INTO swipe_quotas (actor_id, quota_date, decision_count, undo_count)
            VALUES ($1, $2, 0, 1)
            ON CONFLICT (actor_id, quota_date) DO UPDATE
            SET undo_count = swipe_quotas.undo_count + 1
            WHERE swipe_quotas.undo_count < $3
            RETURNING undo_count
            "#,
        )
        .bind(actor_id)
        .bind(day)
        .bind(limit)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(count,)| count))
    }
}
