// handler/gigs.rs
use std::sync::Arc;

use axum::{
    extract::Path,
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::gigdb::GigExt,
    dtos::discoverydtos::ApiResponse,
    dtos::gigdtos::*,
    error::HttpError,
    middleware::JWTAuthMiddleware,
    models::actormodel::ActorRole,
    models::gigmodel::ApplicationStatus,
    AppState,
};

const DEFAULT_DEPOSIT_PERCENTAGE: i32 = 25;

pub fn gig_handler() -> Router {
    Router::new()
        .route("/", post(create_gig).get(list_my_gigs))
        .route("/:gig_id", get(get_gig))
        .route("/:gig_id/applications", post(apply_to_gig).get(get_gig_applications))
        .route("/applications/:application_id/withdraw", put(withdraw_application))
        .route("/applications/:application_id/reject", put(reject_application))
        .route("/applications/:application_id/accept", post(accept_application))
}

pub async fn create_gig(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Json(body): Json<CreateGigDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    if auth.actor.role != ActorRole::Venue {
        return Err(HttpError::forbidden("Only venues can post gigs"));
    }

    let gig = app_state
        .db_client
        .create_gig(
            auth.actor.id,
            body.title,
            body.description,
            body.genres,
            body.event_date,
            body.budget,
            body.deposit_percentage.unwrap_or(DEFAULT_DEPOSIT_PERCENTAGE),
            body.required_performers.unwrap_or(1),
            body.latitude.or(auth.actor.latitude),
            body.longitude.or(auth.actor.longitude),
        )
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(ApiResponse::success("Gig created successfully", gig)))
}

pub async fn list_my_gigs(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    if auth.actor.role != ActorRole::Venue {
        return Err(HttpError::forbidden("Only venues have posted gigs"));
    }

    let gigs = app_state
        .db_client
        .list_gigs_by_venue(auth.actor.id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(ApiResponse::success("Gigs retrieved", gigs)))
}

pub async fn get_gig(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(_auth): Extension<JWTAuthMiddleware>,
    Path(gig_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let gig = app_state
        .db_client
        .get_gig_by_id(gig_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or_else(|| HttpError::not_found(format!("Gig {} not found", gig_id)))?;

    Ok(Json(ApiResponse::success("Gig retrieved", gig)))
}

pub async fn apply_to_gig(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(gig_id): Path<Uuid>,
    Json(body): Json<ApplyToGigDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    if auth.actor.role != ActorRole::Performer {
        return Err(HttpError::forbidden("Only performers can apply to gigs"));
    }

    let gig = app_state
        .db_client
        .get_gig_by_id(gig_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or_else(|| HttpError::not_found(format!("Gig {} not found", gig_id)))?;

    if !gig.accepts_applications() {
        return Err(HttpError::invalid_state("Gig is no longer accepting applications"));
    }

    // The partial unique index resolves concurrent duplicates; no row back
    // means another non-withdrawn application already exists.
    let application = app_state
        .db_client
        .create_application(gig.id, auth.actor.id, body.proposed_rate)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or_else(|| HttpError::conflict("You have already applied to this gig"))?;

    Ok(Json(ApiResponse::success(
        "Application submitted",
        application,
    )))
}

pub async fn get_gig_applications(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(gig_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let gig = app_state
        .db_client
        .get_gig_by_id(gig_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or_else(|| HttpError::not_found(format!("Gig {} not found", gig_id)))?;

    if gig.venue_id != auth.actor.id {
        return Err(HttpError::forbidden("Only the posting venue can view applications"));
    }

    let applications = app_state
        .db_client
        .list_applications_for_gig(gig.id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(ApiResponse::success(
        "Applications retrieved",
        applications,
    )))
}

pub async fn withdraw_application(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(application_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let application = app_state
        .db_client
        .get_application_by_id(application_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or_else(|| HttpError::not_found(format!("Application {} not found", application_id)))?;

    if application.performer_id != auth.actor.id {
        return Err(HttpError::forbidden("Only the applicant can withdraw"));
    }
    if application.status != ApplicationStatus::Pending {
        return Err(HttpError::invalid_state(format!(
            "Application is {:?}, only pending applications can be withdrawn",
            application.status
        )));
    }

    let updated = app_state
        .db_client
        .update_application_status(application.id, ApplicationStatus::Withdrawn)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(ApiResponse::success("Application withdrawn", updated)))
}

pub async fn reject_application(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(application_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let application = app_state
        .db_client
        .get_application_by_id(application_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or_else(|| HttpError::not_found(format!("Application {} not found", application_id)))?;

    let gig = app_state
        .db_client
        .get_gig_by_id(application.gig_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or_else(|| HttpError::not_found(format!("Gig {} not found", application.gig_id)))?;

    if gig.venue_id != auth.actor.id {
        return Err(HttpError::forbidden("Only the posting venue can reject applications"));
    }
    if application.status != ApplicationStatus::Pending {
        return Err(HttpError::invalid_state(format!(
            "Application is {:?}, only pending applications can be rejected",
            application.status
        )));
    }

    let updated = app_state
        .db_client
        .update_application_status(application.id, ApplicationStatus::Rejected)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(ApiResponse::success("Application rejected", updated)))
}

pub async fn accept_application(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(application_id): Path<Uuid>,
    Json(body): Json<AcceptApplicationDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let booking = app_state
        .booking_service
        .accept_application(&auth.actor, application_id, body)
        .await
        .map_err(HttpError::from)?;

    Ok(Json(ApiResponse::success(
        "Application accepted and booking created",
        booking,
    )))
}
