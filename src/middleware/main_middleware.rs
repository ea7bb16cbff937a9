use std::sync::Arc;

use axum::{
    extract::Request,
    http::header,
    middleware::Next,
    response::IntoResponse,
    Extension,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};

use crate::{
    db::actordb::ActorExt,
    error::{ErrorMessage, HttpError},
    models::actormodel::ActorProfile,
    utils::token,
    AppState,
};

/// Resolved identity for the request: the acting profile as served by the
/// identity provider. Role gating happens in handlers against `actor.role`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JWTAuthMiddleware {
    pub actor: ActorProfile,
}

pub async fn auth(
    cookie_jar: CookieJar,
    Extension(app_state): Extension<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, HttpError> {
    let token = cookie_jar
        .get("token")
        .map(|cookie| cookie.value().to_string())
        .or_else(|| {
            req.headers()
                .get(header::AUTHORIZATION)
                .and_then(|auth_header| auth_header.to_str().ok())
                .and_then(|auth_value| {
                    auth_value
                        .strip_prefix("Bearer ")
                        .map(|token| token.to_owned())
                })
        })
        .ok_or_else(|| HttpError::unauthorized(ErrorMessage::TokenNotProvided.to_string()))?;

    let subject = token::decode_token(token, app_state.env.jwt_secret.as_bytes())?;

    let actor_id = uuid::Uuid::parse_str(&subject)
        .map_err(|_| HttpError::unauthorized(ErrorMessage::InvalidToken.to_string()))?;

    let actor = app_state
        .db_client
        .get_actor_profile(actor_id)
        .await
        .map_err(|_| HttpError::unauthorized(ErrorMessage::ActorNoLongerExists.to_string()))?
        .ok_or_else(|| HttpError::unauthorized(ErrorMessage::ActorNoLongerExists.to_string()))?;

    req.extensions_mut().insert(JWTAuthMiddleware { actor });

    Ok(next.run(req).await)
}
