// db/discoverydb.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::BigDecimal;
use sqlx::{Error, Row};
use uuid::Uuid;

use super::db::DBClient;
use crate::models::actormodel::{ActorProfile, ActorRole};
use crate::utils::geo;

/// Effective candidate filters after profile defaulting. `None` disables the
/// corresponding predicate rather than failing the query, so a profile with
/// no coordinates still gets a feed. The date window only makes sense when
/// the targets are venues (it matches against their open gigs).
#[derive(Debug, Clone)]
pub struct CandidateQuery {
    pub actor_id: Uuid,
    pub target_role: ActorRole,
    pub genres: Option<Vec<String>>,
    pub budget_max: Option<BigDecimal>,
    pub budget_min: Option<BigDecimal>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub radius_km: Option<f64>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
}

/// One predicate string shared verbatim by the fetch and the count query.
/// Radius-filtered fetching and total-count aggregation therefore always see
/// the same candidate set; there is no second geospatial operator to drift.
fn candidate_predicate() -> String {
    format!(
        r#"p.role = $1
          AND p.visible = TRUE
          AND p.setup_complete = TRUE
          AND p.accepting_bookings = TRUE
          AND p.id <> $2
          AND NOT EXISTS (
              SELECT 1 FROM decisions d
              WHERE d.actor_id = $2 AND d.target_id = p.id
          )
          AND ($3::text[] IS NULL OR p.genres && $3)
          AND ($4::numeric IS NULL OR p.min_rate IS NULL OR p.min_rate <= $4)
          AND ($5::numeric IS NULL OR p.max_rate IS NULL OR p.max_rate >= $5)
          AND ($6::float8 IS NULL OR $7::float8 IS NULL OR $8::float8 IS NULL
               OR (p.latitude IS NOT NULL AND p.longitude IS NOT NULL
                   AND {distance} <= $8))
          AND ($9::timestamptz IS NULL OR EXISTS (
              SELECT 1 FROM gigs g
              WHERE g.venue_id = p.id
                AND g.status = 'open'
                AND g.event_date >= $9
                AND ($10::timestamptz IS NULL OR g.event_date <= $10)
          ))"#,
        distance = geo::distance_sql("$6", "$7"),
    )
}

#[async_trait]
pub trait DiscoveryExt {
    async fn find_candidates(
        &self,
        query: &CandidateQuery,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ActorProfile>, Error>;

    async fn count_candidates(&self, query: &CandidateQuery) -> Result<i64, Error>;
}

#[async_trait]
impl DiscoveryExt for DBClient {
    async fn find_candidates(
        &self,
        query: &CandidateQuery,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ActorProfile>, Error> {
        let sql = format!(
            r#"
            SELECT p.id, p.role, p.display_name, p.visible, p.setup_complete,
                   p.accepting_bookings, p.latitude, p.longitude, p.travel_radius_km,
                   p.genres, p.min_rate, p.max_rate, p.rating, p.created_at, p.updated_at
            FROM actor_profiles p
            WHERE {predicate}
            ORDER BY p.created_at DESC
            LIMIT $11 OFFSET $12
            "#,
            predicate = candidate_predicate(),
        );

        sqlx::query_as::<_, ActorProfile>(&sql)
            .bind(query.target_role)
            .bind(query.actor_id)
            .bind(query.genres.as_deref())
            .bind(query.budget_max.as_ref())
            .bind(query.budget_min.as_ref())
            .bind(query.latitude)
            .bind(query.longitude)
            .bind(query.radius_km)
            .bind(query.date_from)
            .bind(query.date_to)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
    }

    async fn count_candidates(&self, query: &CandidateQuery) -> Result<i64, Error> {
        let sql = format!(
            r#"
            SELECT COUNT(*) AS total
            FROM actor_profiles p
            WHERE {predicate}
            "#,
            predicate = candidate_predicate(),
        );

        let row = sqlx::query(&sql)
            .bind(query.target_role)
            .bind(query.actor_id)
            .bind(query.genres.as_deref())
            .bind(query.budget_max.as_ref())
            .bind(query.budget_min.as_ref())
            .bind(query.latitude)
            .bind(query.longitude)
            .bind(query.radius_km)
            .bind(query.date_from)
            .bind(query.date_to)
            .fetch_one(&self.pool)
            .await?;

        row.try_get("total")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_and_count_share_the_predicate() {
        // Regenerating the predicate twice must yield identical SQL; the
        // count query can never drift from the fetch query.
        assert_eq!(candidate_predicate(), candidate_predicate());
        assert!(candidate_predicate().contains("NOT EXISTS"));
        assert!(candidate_predicate().contains("acos"));
    }
}
