// db/matchdb.rs
use async_trait::async_trait;
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::discoverymodel::MatchRecord;

#[async_trait]
pub trait MatchExt {
    /// Atomically materialize a match for the pair and mark both decisions
    /// matched. The insert is guarded by the (performer, venue) unique
    /// constraint rather than an existence pre-check; losing the race to a
    /// concurrent identical attempt returns the pre-existing row with
    /// `created = false`. Exactly one match row can ever exist for the pair.
    async fn create_match_for_pair(
        &self,
        performer_id: Uuid,
        venue_id: Uuid,
    ) -> Result<(MatchRecord, bool), Error>;

    async fn get_match_by_id(&self, match_id: Uuid) -> Result<Option<MatchRecord>, Error>;

    async fn get_match_by_pair(
        &self,
        performer_id: Uuid,
        venue_id: Uuid,
    ) -> Result<Option<MatchRecord>, Error>;

    async fn list_matches_for_actor(
        &self,
        actor_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<MatchRecord>, Error>;
}

#[async_trait]
impl MatchExt for DBClient {
    async fn create_match_for_pair(
        &self,
        performer_id: Uuid,
        venue_id: Uuid,
    ) -> Result<(MatchRecord, bool), Error> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query_as::<_, MatchRecord>(
            r#"
            INSERT INTO matches (performer_id, venue_id)
            VALUES ($1, $2)
            ON CONFLICT (performer_id, venue_id) DO NOTHING
            RETURNING id, performer_id, venue_id, status, performer_unread, venue_unread,
                      last_activity_at, created_at
            "#,
        )
        .bind(performer_id)
        .bind(venue_id)
        .fetch_optional(&mut *tx)
        .await?;

        let (record, created) = match inserted {
            Some(record) => (record, true),
            None => {
                // Lost the race to the opposing swipe; the existing row wins.
                let existing = sqlx::query_as::<_, MatchRecord>(
                    r#"
                    SELECT id, performer_id, venue_id, status, performer_unread, venue_unread,
                           last_activity_at, created_at
                    FROM matches
                    WHERE performer_id = $1 AND venue_id = $2
                    "#,
                )
                .bind(performer_id)
                .bind(venue_id)
                .fetch_one(&mut *tx)
                .await?;
                (existing, false)
            }
        };

        sqlx::query(
            r#"
            UPDATE decisions
            SET outcome = 'matched'
            WHERE (actor_id = $1 AND target_id = $2) OR (actor_id = $2 AND target_id = $1)
            "#,
        )
        .bind(performer_id)
        .bind(venue_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((record, created))
    }

    async fn get_match_by_id(&self, match_id: Uuid) -> Result<Option<MatchRecord>, Error> {
        sqlx::query_as::<_, MatchRecord>(
            r#"
            SELECT id, performer_id, venue_id, status, performer_unread, venue_unread,
                   last_activity_at, created_at
            FROM matches
            WHERE id = $1
            "#,
        )
        .bind(match_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_match_by_pair(
        &self,
        performer_id: Uuid,
        venue_id: Uuid,
    ) -> Result<Option<MatchRecord>, Error> {
        sqlx::query_as::<_, MatchRecord>(
            r#"
            SELECT id, performer_id, venue_id, status, performer_unread, venue_unread,
                   last_activity_at, created_at
            FROM matches
            WHERE performer_id = $1 AND venue_id = $2
            "#,
        )
        .bind(performer_id)
        .bind(venue_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn list_matches_for_actor(
        &self,
        actor_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<MatchRecord>, Error> {
        sqlx::query_as::<_, MatchRecord>(
            r#"
            SELECT id, performer_id, venue_id, status, performer_unread, venue_unread,
                   last_activity_at, created_at
            FROM matches
            WHERE performer_id = $1 OR venue_id = $1
            ORDER BY last_activity_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(actor_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }
}
