//! Request extractors

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::errors::RestError;

/// Header carrying the caller's identity
pub const USER_ID_HEADER: &str = "x-user-id";

/// Authenticated caller, taken from the `x-user-id` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserId(pub String);

impl<S> FromRequestParts<S> for UserId
where
    S: Send + Sync,
{
    type Rejection = RestError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| RestError::unauthorized("Missing user identity"))?;

        let user_id = value
            .to_str()
            .map_err(|_| RestError::unauthorized("Malformed user identity"))?
            .trim();

        if user_id.is_empty() {
            return Err(RestError::unauthorized("Missing user identity"));
        }

        Ok(UserId(user_id.to_string()))
    }
}
