// service/match_service.rs
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    db::{db::DBClient, decisiondb::DecisionExt, matchdb::MatchExt},
    models::actormodel::ActorRole,
    models::discoverymodel::{Decision, MatchRecord},
    service::error::ServiceError,
};

#[derive(Debug, Clone)]
pub struct MatchService {
    db_client: Arc<DBClient>,
}

impl MatchService {
    pub fn new(db_client: Arc<DBClient>) -> Self {
        Self { db_client }
    }

    /// Called after a positive decision committed. Looks up the reciprocal
    /// pending like and, when present, materializes the match exactly once.
    /// Returns the match plus whether this call created it (`false` means a
    /// concurrent opposing swipe won the race, which callers treat as
    /// success). One retry on transaction failure; after that the decision is
    /// left `liked` for later reconciliation and the error surfaces as
    /// internal.
    pub async fn resolve_reciprocity(
        &self,
        decision: &Decision,
    ) -> Result<Option<(MatchRecord, bool)>, ServiceError> {
        let reciprocal = self
            .db_client
            .find_reciprocal(decision.actor_id, decision.target_id)
            .await?;

        if reciprocal.is_none() {
            return Ok(None);
        }

        let (performer_id, venue_id) = Self::normalize_pair(
            decision.actor_id,
            decision.actor_role,
            decision.target_id,
        );

        let mut attempts = 0;
        loop {
            attempts += 1;
            match self
                .db_client
                .create_match_for_pair(performer_id, venue_id)
                .await
            {
                Ok((record, created)) => {
                    if created {
                        tracing::info!(
                            "match created for performer {} / venue {}",
                            performer_id,
                            venue_id
                        );
                    }
                    return Ok(Some((record, created)));
                }
                Err(e) if attempts < 2 => {
                    tracing::warn!("match transaction failed, retrying once: {}", e);
                }
                Err(e) => {
                    return Err(ServiceError::Internal(format!(
                        "match creation failed after retry: {}",
                        e
                    )));
                }
            }
        }
    }

    /// Collapse the directional (actor, target) pair onto the match table's
    /// (performer, venue) columns. Roles are disjoint, so this is the whole
    /// of the unordered-pair normalization.
    pub fn normalize_pair(
        actor_id: Uuid,
        actor_role: ActorRole,
        target_id: Uuid,
    ) -> (Uuid, Uuid) {
        match actor_role {
            ActorRole::Performer => (actor_id, target_id),
            ActorRole::Venue => (target_id, actor_id),
        }
    }

    pub async fn get_match_for_actor(
        &self,
        match_id: Uuid,
        actor_id: Uuid,
    ) -> Result<MatchRecord, ServiceError> {
        let record = self
            .db_client
            .get_match_by_id(match_id)
            .await?
            .ok_or(ServiceError::MatchNotFound(match_id))?;

        if !record.involves(actor_id) {
            return Err(ServiceError::Forbidden(actor_id, match_id));
        }

        Ok(record)
    }

    pub async fn list_matches(
        &self,
        actor_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<MatchRecord>, ServiceError> {
        Ok(self
            .db_client
            .list_matches_for_actor(actor_id, limit, offset)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_normalization_is_symmetric() {
        let performer = Uuid::new_v4();
        let venue = Uuid::new_v4();

        // Whoever swiped first, the pair lands in the same columns.
        let from_performer = MatchService::normalize_pair(performer, ActorRole::Performer, venue);
        let from_venue = MatchService::normalize_pair(venue, ActorRole::Venue, performer);
        assert_eq!(from_performer, from_venue);
        assert_eq!(from_performer, (performer, venue));
    }
}
