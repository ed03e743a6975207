use axum::{extract::FromRequestParts, RequestPartsExt};
use tower_sessions::Session;

use crate::auth::USER_SESSION_KEY;
use crate::error::ApiError;

/// Extractor for the logged-in username. Handlers taking an `AuthUser` reject
/// unauthenticated requests with 401 before any state is touched.
pub struct AuthUser(pub String);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        let session = parts
            .extract::<Session>()
            .await
            .map_err(|_| ApiError::Unavailable("session layer missing".to_string()))?;

        match session.get::<String>(USER_SESSION_KEY).await {
            Ok(Some(user)) => Ok(AuthUser(user)),
            Ok(None) => Err(ApiError::Unauthorized),
            Err(err) => Err(ApiError::Unavailable(err.to_string())),
        }
    }
}
