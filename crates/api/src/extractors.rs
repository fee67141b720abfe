//! Request extractors.

use axum::{
    extract::{FromRequestParts, Query},
    http::{StatusCode, request::Parts},
};
use serde::Deserialize;

use aniparty_core::Identity;

use crate::middleware::AppState;

#[derive(Deserialize)]
struct TokenQuery {
    /// Access token query parameter.
    i: Option<String>,
}

fn bearer_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get("Authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(ToString::to_string)
}

fn query_token(parts: &Parts) -> Option<String> {
    Query::<TokenQuery>::try_from_uri(&parts.uri).ok()?.0.i
}

/// The acting identity behind a request: an account if a valid token
/// was presented, a fresh guest otherwise. Requests are never
/// rejected for missing credentials; anonymous viewers are
/// first-class.
#[derive(Debug, Clone)]
pub struct ActingIdentity(pub Identity);

impl FromRequestParts<AppState> for ActingIdentity {
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).or_else(|| query_token(parts));
        let identity = state.identity_service.resolve(token.as_deref()).await;
        Ok(Self(identity))
    }
}
