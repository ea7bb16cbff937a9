// services/recommendation_service.rs
//
// Feed composition: candidate retrieval, scoring and ranking, with an
// optional short-lived Redis cache for the default (no-override) feed.
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use sqlx::types::BigDecimal;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{
    db::DBClient,
    discoverydb::{CandidateQuery, DiscoveryExt},
    gigdb::GigExt,
};
use crate::dtos::discoverydtos::FeedQueryDto;
use crate::models::actormodel::{ActorProfile, ActorRole};
use crate::service::error::ServiceError;
use crate::services::scoring::{self, ScoredCandidate, ScorerProfile};

const DEFAULT_RADIUS_KM: f64 = 50.0;
// Ranking window: how many candidates are scored per feed computation.
const MAX_RANKED: i64 = 200;

#[derive(Debug, Clone)]
pub struct RecommendationService {
    db_client: Arc<DBClient>,
    cache_ttl: usize,
}

impl RecommendationService {
    pub fn new(db_client: Arc<DBClient>, cache_ttl_seconds: usize) -> Self {
        Self {
            db_client,
            cache_ttl: cache_ttl_seconds,
        }
    }

    pub fn redis_key(actor_id: Uuid) -> String {
        format!("feed:ranked:{}", actor_id)
    }

    /// Ranked, paginated feed for the actor. Override filters bypass the
    /// cache; the defaulted feed is cached briefly to absorb rapid swiping.
    pub async fn get_feed(
        &self,
        actor: &ActorProfile,
        filters: &FeedQueryDto,
        page: u32,
        limit: u32,
    ) -> Result<(Vec<ScoredCandidate>, i64), ServiceError> {
        let (query, scorer) = Self::effective_query(actor, filters);
        let total = self.db_client.count_candidates(&query).await?;

        let ranked = if filters.has_overrides() {
            self.compute_ranked(&query, &scorer).await?
        } else {
            match self.get_cached_ranked(actor.id).await {
                Ok(Some(cached)) => cached,
                _ => {
                    let computed = self.compute_ranked(&query, &scorer).await?;
                    if let Err(e) = self.cache_ranked(actor.id, &computed).await {
                        tracing::debug!("feed cache write failed: {}", e);
                    }
                    computed
                }
            }
        };

        let start = (page.saturating_sub(1) as usize) * limit as usize;
        let page_items = ranked
            .into_iter()
            .skip(start)
            .take(limit as usize)
            .collect();

        Ok((page_items, total))
    }

    async fn compute_ranked(
        &self,
        query: &CandidateQuery,
        scorer: &ScorerProfile,
    ) -> Result<Vec<ScoredCandidate>, ServiceError> {
        let profiles = self.db_client.find_candidates(query, MAX_RANKED, 0).await?;

        // Venue candidates are scored against their soonest open gig.
        let venue_ids: Vec<Uuid> = profiles
            .iter()
            .filter(|p| p.role == ActorRole::Venue)
            .map(|p| p.id)
            .collect();
        let mut gig_by_venue: HashMap<Uuid, crate::models::gigmodel::Gig> = HashMap::new();
        if !venue_ids.is_empty() {
            for gig in self.db_client.get_open_gigs_for_venues(&venue_ids).await? {
                gig_by_venue.insert(gig.venue_id, gig);
            }
        }

        let now = chrono::Utc::now();
        let mut ranked: Vec<ScoredCandidate> = profiles
            .into_iter()
            .map(|target| {
                let gig = gig_by_venue.get(&target.id).cloned();
                let (score, match_reasons) =
                    scoring::score_candidate(scorer, &target, gig.as_ref(), now);
                ScoredCandidate {
                    target,
                    gig,
                    score,
                    match_reasons,
                }
            })
            .collect();

        scoring::rank_candidates(&mut ranked);
        Ok(ranked)
    }

    /// Fold request overrides over the actor's stored profile attributes.
    /// Missing coordinates disable the radius predicate instead of erroring,
    /// so a profile without a home location still gets a feed.
    pub fn effective_query(
        actor: &ActorProfile,
        filters: &FeedQueryDto,
    ) -> (CandidateQuery, ScorerProfile) {
        let genres = filters
            .genres
            .clone()
            .filter(|g| !g.is_empty())
            .or_else(|| {
                if actor.genres.is_empty() {
                    None
                } else {
                    Some(actor.genres.clone())
                }
            });

        let coordinates = match (filters.latitude, filters.longitude) {
            (Some(lat), Some(lng)) => Some((lat, lng)),
            _ => actor.coordinates(),
        };

        let radius_km = filters
            .radius_km
            .or(actor.travel_radius_km)
            .unwrap_or(DEFAULT_RADIUS_KM);

        let budget_max = filters
            .budget_max
            .and_then(|b| BigDecimal::try_from(b).ok())
            .or_else(|| actor.max_rate.clone());
        let budget_min = filters
            .budget_min
            .and_then(|b| BigDecimal::try_from(b).ok())
            .or_else(|| actor.min_rate.clone());

        // A date window only filters venue targets (through their open gigs).
        let (date_from, date_to) = if actor.role == ActorRole::Performer {
            (filters.date_from, filters.date_to)
        } else {
            (None, None)
        };

        let query = CandidateQuery {
            actor_id: actor.id,
            target_role: actor.role.counterpart(),
            genres: genres.clone(),
            budget_max: budget_max.clone(),
            budget_min: budget_min.clone(),
            latitude: coordinates.map(|c| c.0),
            longitude: coordinates.map(|c| c.1),
            radius_km: coordinates.map(|_| radius_km),
            date_from,
            date_to,
        };

        let scorer = ScorerProfile {
            genres: genres.unwrap_or_default(),
            coordinates,
            max_travel_radius_km: radius_km,
            budget_min: filters.budget_min.or_else(|| {
                actor
                    .min_rate
                    .as_ref()
                    .and_then(|r| num_traits::ToPrimitive::to_f64(r))
            }),
            budget_max: filters.budget_max.or_else(|| {
                actor
                    .max_rate
                    .as_ref()
                    .and_then(|r| num_traits::ToPrimitive::to_f64(r))
            }),
        };

        (query, scorer)
    }

    async fn cache_ranked(
        &self,
        actor_id: Uuid,
        items: &Vec<ScoredCandidate>,
    ) -> Result<(), redis::RedisError> {
        if let Some(rc) = &self.db_client.redis_client {
            let mut conn = ConnectionManager::clone(rc);
            let key = Self::redis_key(actor_id);
            let payload = serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string());
            let _: () = conn.set_ex(key, payload, self.cache_ttl).await?;
        }
        Ok(())
    }

    async fn get_cached_ranked(
        &self,
        actor_id: Uuid,
    ) -> Result<Option<Vec<ScoredCandidate>>, redis::RedisError> {
        if let Some(rc) = &self.db_client.redis_client {
            let mut conn = ConnectionManager::clone(rc);
            let key = Self::redis_key(actor_id);
            if let Ok(Some(raw)) = conn.get::<_, Option<String>>(key).await {
                if let Ok(vec) = serde_json::from_str::<Vec<ScoredCandidate>>(&raw) {
                    return Ok(Some(vec));
                }
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sqlx::PgPool;

    #[tokio::test]
    async fn recommendation_service_compiles() {
        let pool = PgPool::connect_lazy("postgres://localhost/stagelink").unwrap();
        let db_client = Arc::new(DBClient::new(pool));
        let svc = RecommendationService::new(db_client, 60);
        let _ = &svc;
    }

    fn actor_with_profile_defaults() -> ActorProfile {
        ActorProfile {
            id: Uuid::new_v4(),
            role: ActorRole::Performer,
            display_name: "Night Owl Trio".to_string(),
            visible: true,
            setup_complete: true,
            accepting_bookings: true,
            latitude: Some(41.88),
            longitude: Some(-87.63),
            travel_radius_km: Some(25.0),
            genres: vec!["jazz".to_string()],
            min_rate: None,
            max_rate: None,
            rating: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn omitted_filters_fall_back_to_profile() {
        let actor = actor_with_profile_defaults();
        let filters = FeedQueryDto::default();
        let (query, scorer) = RecommendationService::effective_query(&actor, &filters);

        assert_eq!(query.target_role, ActorRole::Venue);
        assert_eq!(query.latitude, Some(41.88));
        assert_eq!(query.radius_km, Some(25.0));
        assert_eq!(query.genres, Some(vec!["jazz".to_string()]));
        assert_eq!(scorer.max_travel_radius_km, 25.0);
    }

    #[test]
    fn missing_coordinates_skip_geo_predicate() {
        let mut actor = actor_with_profile_defaults();
        actor.latitude = None;
        actor.longitude = None;
        let (query, scorer) =
            RecommendationService::effective_query(&actor, &FeedQueryDto::default());

        assert_eq!(query.latitude, None);
        assert_eq!(query.radius_km, None, "radius must not apply without a center");
        assert_eq!(scorer.coordinates, None);
    }

    #[test]
    fn overrides_win_over_profile() {
        let actor = actor_with_profile_defaults();
        let filters = FeedQueryDto {
            genres: Some(vec!["metal".to_string()]),
            radius_km: Some(100.0),
            ..Default::default()
        };
        let (query, _) = RecommendationService::effective_query(&actor, &filters);
        assert_eq!(query.genres, Some(vec!["metal".to_string()]));
        assert_eq!(query.radius_km, Some(100.0));
    }
}
