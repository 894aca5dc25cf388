//! Caller identity. Authentication happens upstream; this module trusts the
//! `x-user-id` header the auth proxy injects.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::api::rest::error::unauthenticated;
use crate::api::rest::problem::ProblemResponse;

pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated user on whose behalf the request runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser(pub Uuid);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ProblemResponse;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let instance = parts.uri.path().to_string();
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| unauthenticated("missing x-user-id header", &instance))?;
        let id = raw
            .to_str()
            .ok()
            .and_then(|s| Uuid::parse_str(s.trim()).ok())
            .ok_or_else(|| unauthenticated("x-user-id is not a valid UUID", &instance))?;
        Ok(Self(id))
    }
}
