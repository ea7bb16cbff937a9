// handler/discovery.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    response::IntoResponse,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::discoverydtos::*,
    error::HttpError,
    middleware::JWTAuthMiddleware,
    AppState,
};

pub fn discovery_handler() -> Router {
    Router::new()
        .route("/feed", get(get_feed))
        .route("/swipes", post(swipe))
        .route("/swipes/:decision_id", delete(undo_swipe))
        .route("/matches", get(list_matches))
        .route("/matches/:match_id", get(get_match))
}

pub async fn get_feed(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Query(params): Query<FeedQueryParams>,
) -> Result<impl IntoResponse, HttpError> {
    let filters = params.into_filters();
    filters
        .validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let page = filters.page.unwrap_or(1).max(1);
    let limit = filters.limit.unwrap_or(20).clamp(1, 100);

    let (items, total) = app_state
        .recommendation_service
        .get_feed(&auth.actor, &filters, page, limit)
        .await
        .map_err(HttpError::from)?;

    Ok(Json(PaginatedResponse::new(items, total, page, limit)))
}

pub async fn swipe(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Json(body): Json<SwipeDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let result = app_state
        .decision_service
        .record_decision(&auth.actor, body)
        .await
        .map_err(HttpError::from)?;

    let message = if result.matched.is_some() {
        "It's a match!"
    } else {
        "Decision recorded"
    };

    Ok(Json(ApiResponse::success(message, result)))
}

pub async fn undo_swipe(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(decision_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    app_state
        .decision_service
        .undo(&auth.actor, decision_id)
        .await
        .map_err(HttpError::from)?;

    Ok(Json(ApiResponse::success("Decision undone", ())))
}

pub async fn list_matches(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Query(query): Query<ListQueryDto>,
) -> Result<impl IntoResponse, HttpError> {
    query
        .validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20);
    let offset = ((page - 1) * limit) as i64;

    let matches = app_state
        .match_service
        .list_matches(auth.actor.id, limit as i64, offset)
        .await
        .map_err(HttpError::from)?;

    Ok(Json(ApiResponse::success("Matches retrieved", matches)))
}

pub async fn get_match(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(match_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let record = app_state
        .match_service
        .get_match_for_actor(match_id, auth.actor.id)
        .await
        .map_err(HttpError::from)?;

    Ok(Json(ApiResponse::success("Match retrieved", record)))
}
