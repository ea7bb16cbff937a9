// handler/bookings.rs
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query},
    http::HeaderMap,
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::gigdb::GigExt,
    dtos::bookingdtos::*,
    dtos::discoverydtos::{ApiResponse, ListQueryDto},
    error::HttpError,
    middleware::JWTAuthMiddleware,
    AppState,
};

pub fn booking_handler() -> Router {
    Router::new()
        .route("/", get(list_my_bookings).post(create_from_match))
        .route("/:booking_id", get(get_booking))
        .route("/:booking_id/confirm", put(confirm_booking))
        .route("/:booking_id/start", put(start_booking))
        .route("/:booking_id/complete", put(complete_booking))
        .route("/:booking_id/cancel", put(cancel_booking))
        .route("/:booking_id/payments/deposit", post(initiate_deposit))
        .route("/:booking_id/payments/deposit/confirm", post(confirm_deposit))
        .route("/:booking_id/payments/final", post(initiate_final_payment))
        .route("/:booking_id/payments/final/confirm", post(confirm_final_payment))
        .route("/:booking_id/payments/:phase/status", get(payment_status))
        .route("/:booking_id/contract", put(upload_contract))
        .route("/:booking_id/contract/sign", put(sign_contract))
}

pub async fn list_my_bookings(
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

    let bookings = app_state
        .db_client
        .list_bookings_for_actor(auth.actor.id, limit as i64, offset)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(ApiResponse::success("Bookings retrieved", bookings)))
}

pub async fn create_from_match(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Json(body): Json<CreateBookingFromMatchDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let booking = app_state
        .booking_service
        .create_booking_from_match(&auth.actor, body)
        .await
        .map_err(HttpError::from)?;

    Ok(Json(ApiResponse::success(
        "Booking offer created from match",
        booking,
    )))
}

pub async fn get_booking(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(booking_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let booking = app_state
        .booking_service
        .get_booking_for_actor(&auth.actor, booking_id)
        .await
        .map_err(HttpError::from)?;

    Ok(Json(ApiResponse::success("Booking retrieved", booking)))
}

pub async fn confirm_booking(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(booking_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let booking = app_state
        .booking_service
        .confirm(&auth.actor, booking_id)
        .await
        .map_err(HttpError::from)?;

    Ok(Json(ApiResponse::success("Confirmation recorded", booking)))
}

pub async fn start_booking(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(booking_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let booking = app_state
        .booking_service
        .start(&auth.actor, booking_id)
        .await
        .map_err(HttpError::from)?;

    Ok(Json(ApiResponse::success("Booking marked in progress", booking)))
}

pub async fn complete_booking(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(booking_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let booking = app_state
        .booking_service
        .complete(&auth.actor, booking_id)
        .await
        .map_err(HttpError::from)?;

    Ok(Json(ApiResponse::success("Completion recorded", booking)))
}

pub async fn cancel_booking(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(booking_id): Path<Uuid>,
    Json(body): Json<CancelBookingDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let booking = app_state
        .booking_service
        .cancel(&auth.actor, booking_id, body.reason)
        .await
        .map_err(HttpError::from)?;

    Ok(Json(ApiResponse::success("Booking cancelled", booking)))
}

pub async fn initiate_deposit(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(booking_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let intent = app_state
        .booking_service
        .initiate_deposit(&auth.actor, booking_id)
        .await
        .map_err(HttpError::from)?;

    Ok(Json(ApiResponse::success("Deposit payment intent created", intent)))
}

pub async fn confirm_deposit(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(booking_id): Path<Uuid>,
    Json(body): Json<ConfirmPaymentDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let booking = app_state
        .booking_service
        .confirm_deposit(&auth.actor, booking_id, &body.intent_ref)
        .await
        .map_err(HttpError::from)?;

    Ok(Json(ApiResponse::success("Deposit payment confirmed", booking)))
}

pub async fn initiate_final_payment(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(booking_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let intent = app_state
        .booking_service
        .initiate_final_payment(&auth.actor, booking_id)
        .await
        .map_err(HttpError::from)?;

    Ok(Json(ApiResponse::success("Final payment intent created", intent)))
}

pub async fn confirm_final_payment(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(booking_id): Path<Uuid>,
    Json(body): Json<ConfirmPaymentDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let booking = app_state
        .booking_service
        .confirm_final_payment(&auth.actor, booking_id, &body.intent_ref)
        .await
        .map_err(HttpError::from)?;

    Ok(Json(ApiResponse::success("Final payment confirmed", booking)))
}

pub async fn payment_status(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path((booking_id, phase)): Path<(Uuid, String)>,
) -> Result<impl IntoResponse, HttpError> {
    let status = app_state
        .booking_service
        .payment_status(&auth.actor, booking_id, &phase)
        .await
        .map_err(HttpError::from)?;

    Ok(Json(ApiResponse::success(
        "Payment status retrieved",
        serde_json::json!({ "phase": phase, "status": status }),
    )))
}

pub async fn upload_contract(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(booking_id): Path<Uuid>,
    Json(body): Json<UploadContractDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let booking = app_state
        .booking_service
        .upload_contract(&auth.actor, booking_id, body.contract_url)
        .await
        .map_err(HttpError::from)?;

    Ok(Json(ApiResponse::success("Contract uploaded", booking)))
}

pub async fn sign_contract(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(booking_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let booking = app_state
        .booking_service
        .sign_contract(&auth.actor, booking_id)
        .await
        .map_err(HttpError::from)?;

    Ok(Json(ApiResponse::success("Contract signature recorded", booking)))
}

/// Public gateway webhook. The HMAC signature is verified against the raw
/// body before anything is parsed; unverifiable requests are rejected
/// without touching any booking.
pub async fn payment_webhook(
    Extension(app_state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, HttpError> {
    let signature = headers
        .get("x-gateway-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| HttpError::unauthorized("Missing webhook signature"))?;

    if !app_state
        .payment_provider
        .verify_webhook_signature(&body, signature)
    {
        return Err(HttpError::unauthorized("Invalid webhook signature"));
    }

    let event: PaymentWebhookDto = serde_json::from_slice(&body)
        .map_err(|e| HttpError::bad_request(format!("Malformed webhook payload: {}", e)))?;

    app_state
        .booking_service
        .apply_gateway_event(&event.event, &event.intent_ref)
        .await
        .map_err(HttpError::from)?;

    Ok(Json(ApiResponse::success("Webhook processed", ())))
}
