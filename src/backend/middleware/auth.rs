/**
 * Viewer Extraction
 *
 * Identifies the user behind a request. Handlers take a [`Viewer`]
 * argument; a request without valid credentials is rejected with 401
 * before the handler runs.
 *
 * # Credential Sources
 *
 * 1. `Authorization: Bearer <jwt>`
 * 2. `access_token=<jwt>` query parameter, for WebSocket upgrades where
 *    browsers cannot set headers
 * 3. `X-Dev-User-Id: <uuid>`, only when `DEV_AUTH_BYPASS` is enabled
 */

use axum::extract::FromRequestParts;
use axum::http::{header::AUTHORIZATION, request::Parts};
use uuid::Uuid;

use crate::backend::auth::sessions::verify_token;
use crate::backend::error::BackendError;
use crate::backend::server::state::AppState;

pub const DEV_USER_HEADER: &str = "x-dev-user-id";
const TOKEN_QUERY_PARAM: &str = "access_token";

/// The authenticated user of a request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Viewer {
    pub user_id: Uuid,
}

impl FromRequestParts<AppState> for Viewer {
    type Rejection = BackendError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(token) = bearer_token(parts) {
            return viewer_from_token(&state.config.jwt_secret, &token);
        }

        if state.config.dev_auth_bypass {
            if let Some(raw) = parts.headers.get(DEV_USER_HEADER).and_then(|h| h.to_str().ok()) {
                let user_id = Uuid::parse_str(raw.trim()).map_err(|_| {
                    tracing::warn!("Invalid {} header", DEV_USER_HEADER);
                    BackendError::unauthorized("Invalid development user id")
                })?;
                return Ok(Viewer { user_id });
            }
        }

        tracing::warn!("Missing credentials on {}", parts.uri.path());
        Err(BackendError::unauthorized("Missing bearer token"))
    }
}

fn bearer_token(parts: &Parts) -> Option<String> {
    let from_header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string());
    if from_header.is_some() {
        return from_header;
    }

    parts.uri.query().and_then(|query| {
        query.split('&').find_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            (key == TOKEN_QUERY_PARAM && !value.is_empty()).then(|| value.to_string())
        })
    })
}

fn viewer_from_token(secret: &str, token: &str) -> Result<Viewer, BackendError> {
    let claims = verify_token(secret, token).map_err(|e| {
        tracing::warn!("Invalid token: {:?}", e);
        BackendError::unauthorized("Invalid bearer token")
    })?;
    let user_id = Uuid::parse_str(&claims.sub).map_err(|e| {
        tracing::warn!("Invalid user ID in token: {:?}", e);
        BackendError::unauthorized("Invalid bearer token")
    })?;
    Ok(Viewer { user_id })
}
