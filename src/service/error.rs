use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::error::HttpError;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Profile not found for actor {0}")]
    ProfileNotFound(Uuid),

    #[error("Target {0} not found or not open to discovery")]
    TargetNotEligible(Uuid),

    #[error("Decision {0} not found")]
    DecisionNotFound(Uuid),

    #[error("Gig {0} not found")]
    GigNotFound(Uuid),

    #[error("Application {0} not found")]
    ApplicationNotFound(Uuid),

    #[error("Booking {0} not found")]
    BookingNotFound(Uuid),

    #[error("Match {0} not found")]
    MatchNotFound(Uuid),

    #[error("A decision for this target already exists")]
    DuplicateDecision,

    #[error("An application for this gig already exists")]
    DuplicateApplication,

    #[error("Actor {0} is not authorized to act on {1}")]
    Forbidden(Uuid, Uuid),

    #[error("Invalid state transition: {0}")]
    InvalidState(String),

    #[error("Daily limit reached, resets at {resets_at}")]
    ResourceExhausted { resets_at: DateTime<Utc> },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Payment provider error: {0}")]
    Payment(String),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ServiceError> for HttpError {
    fn from(error: ServiceError) -> Self {
        match &error {
            ServiceError::ProfileNotFound(_)
            | ServiceError::TargetNotEligible(_)
            | ServiceError::DecisionNotFound(_)
            | ServiceError::GigNotFound(_)
            | ServiceError::ApplicationNotFound(_)
            | ServiceError::BookingNotFound(_)
            | ServiceError::MatchNotFound(_) => HttpError::not_found(error.to_string()),

            ServiceError::DuplicateDecision | ServiceError::DuplicateApplication => {
                HttpError::conflict(error.to_string())
            }

            ServiceError::Forbidden(_, _) => HttpError::forbidden(error.to_string()),

            ServiceError::InvalidState(_) => HttpError::invalid_state(error.to_string()),

            ServiceError::ResourceExhausted { resets_at } => {
                HttpError::too_many_requests(error.to_string())
                    .with_details(serde_json::json!({ "resets_at": resets_at }))
            }

            ServiceError::Validation(_) => HttpError::bad_request(error.to_string()),

            _ => HttpError::server_error(error.to_string()),
        }
    }
}

impl From<String> for ServiceError {
    fn from(err: String) -> Self {
        ServiceError::Internal(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn taxonomy_maps_to_stable_http_codes() {
        let not_found: HttpError = ServiceError::GigNotFound(Uuid::nil()).into();
        assert_eq!(not_found.status, StatusCode::NOT_FOUND);

        let conflict: HttpError = ServiceError::DuplicateDecision.into();
        assert_eq!(conflict.status, StatusCode::CONFLICT);
        assert_eq!(conflict.code, "CONFLICT");

        let forbidden: HttpError = ServiceError::Forbidden(Uuid::nil(), Uuid::nil()).into();
        assert_eq!(forbidden.status, StatusCode::FORBIDDEN);

        let invalid: HttpError = ServiceError::InvalidState("pending -> paid".into()).into();
        assert_eq!(invalid.status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn resource_exhausted_reports_reset_time() {
        let resets_at = Utc::now();
        let err: HttpError = ServiceError::ResourceExhausted { resets_at }.into();
        assert_eq!(err.status, StatusCode::TOO_MANY_REQUESTS);
        let details = err.details.expect("details");
        assert!(details.get("resets_at").is_some());
    }
}
