// service/decision_service.rs
//
// The swipe path: eligibility checks, quota, ledger write, reciprocity.
use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    db::{actordb::ActorExt, db::DBClient, decisiondb::DecisionExt, gigdb::GigExt},
    dtos::discoverydtos::{SwipeDto, SwipeResultDto},
    models::actormodel::ActorProfile,
    models::discoverymodel::{Decision, DecisionOutcome},
    service::{
        error::ServiceError, match_service::MatchService,
        notification_service::NotificationService, rate_limiter::RateLimiter,
    },
};

pub const UNDO_WINDOW_MINUTES: i64 = 5;

#[derive(Debug, Clone)]
pub struct DecisionService {
    db_client: Arc<DBClient>,
    rate_limiter: Arc<RateLimiter>,
    match_service: Arc<MatchService>,
    notification_service: Arc<NotificationService>,
}

impl DecisionService {
    pub fn new(
        db_client: Arc<DBClient>,
        rate_limiter: Arc<RateLimiter>,
        match_service: Arc<MatchService>,
        notification_service: Arc<NotificationService>,
    ) -> Self {
        Self {
            db_client,
            rate_limiter,
            match_service,
            notification_service,
        }
    }

    /// Record one directional decision. Eligibility and quota guards run
    /// before the write; the unique constraint turns a concurrent duplicate
    /// into a clean conflict for the second committer.
    pub async fn record_decision(
        &self,
        actor: &ActorProfile,
        body: SwipeDto,
    ) -> Result<SwipeResultDto, ServiceError> {
        let target = self
            .db_client
            .get_actor_profile(body.target_id)
            .await?
            .ok_or(ServiceError::TargetNotEligible(body.target_id))?;

        if target.role != actor.role.counterpart() || !target.is_discoverable() {
            return Err(ServiceError::TargetNotEligible(target.id));
        }

        if let Some(gig_id) = body.gig_id {
            let gig = self
                .db_client
                .get_gig_by_id(gig_id)
                .await?
                .ok_or(ServiceError::GigNotFound(gig_id))?;
            if gig.venue_id != target.id && gig.venue_id != actor.id {
                return Err(ServiceError::Validation(
                    "Gig does not belong to either side of this decision".to_string(),
                ));
            }
        }

        self.rate_limiter
            .consume_decision(actor.id, actor.role)
            .await?;

        let now = Utc::now();
        let outcome = if body.direction.is_positive() {
            DecisionOutcome::Liked
        } else {
            DecisionOutcome::NoMatch
        };

        let decision = self
            .db_client
            .create_decision(
                actor.id,
                actor.role,
                target.id,
                target.role,
                body.direction,
                outcome,
                body.gig_id,
                now + Duration::minutes(UNDO_WINDOW_MINUTES),
            )
            .await?
            .ok_or(ServiceError::DuplicateDecision)?;

        // The cached feed may still contain the target just decided on.
        self.invalidate_feed_cache(actor.id).await;

        let matched = if body.direction.is_positive() {
            self.check_reciprocity(&decision).await?
        } else {
            None
        };

        Ok(SwipeResultDto { decision, matched })
    }

    async fn invalidate_feed_cache(&self, actor_id: Uuid) {
        if let Some(rc) = &self.db_client.redis_client {
            let mut conn = redis::aio::ConnectionManager::clone(rc);
            let key = crate::services::recommendation_service::RecommendationService::redis_key(
                actor_id,
            );
            if let Err(e) = redis::cmd("DEL").arg(&key).query_async::<_, ()>(&mut conn).await {
                tracing::debug!("feed cache invalidation failed: {}", e);
            }
        }
    }

    async fn check_reciprocity(
        &self,
        decision: &Decision,
    ) -> Result<Option<crate::models::discoverymodel::MatchRecord>, ServiceError> {
        match self.match_service.resolve_reciprocity(decision).await? {
            Some((record, created)) => {
                if created {
                    // Post-commit signal for the chat collaborator and both
                    // parties' devices; never blocks the swipe response.
                    let notifications = self.notification_service.clone();
                    let match_for_notify = record.clone();
                    tokio::spawn(async move {
                        notifications.notify_match_created(&match_for_notify).await;
                    });
                }
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Withdraw a decision inside its undo window. Quota-guarded like the
    /// swipe itself; a reciprocal like that was still pending gets expired so
    /// it cannot match against a decision that no longer exists.
    pub async fn undo(&self, actor: &ActorProfile, decision_id: Uuid) -> Result<(), ServiceError> {
        let decision = self
            .db_client
            .get_decision_by_id(decision_id)
            .await?
            .ok_or(ServiceError::DecisionNotFound(decision_id))?;

        if decision.actor_id != actor.id {
            return Err(ServiceError::Forbidden(actor.id, decision_id));
        }

        if decision.outcome == DecisionOutcome::Matched {
            return Err(ServiceError::InvalidState(
                "decision already produced a match".to_string(),
            ));
        }

        if !decision.undo_window_open(Utc::now()) {
            return Err(ServiceError::InvalidState(
                "undo window has elapsed".to_string(),
            ));
        }

        self.rate_limiter.consume_undo(actor.id, actor.role).await?;

        self.db_client
            .delete_decision_and_expire_reciprocal(decision.id, decision.actor_id, decision.target_id)
            .await?;

        tracing::debug!("decision {} undone by {}", decision.id, actor.id);
        Ok(())
    }
}
