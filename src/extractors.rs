use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::header;
use axum::http::request::Parts;
use axum::Json;
use serde::de::DeserializeOwned;

use crate::auth::session;
use crate::comments::{FieldError, UserId, Validate};
use crate::error::AppError;
use crate::state::AppState;

/// Header clients send the session token in.
pub const AUTH_TOKEN_HEADER: &str = "x-auth-token";

/// Represents the currently authenticated user.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: UserId,
}

/// Extractor that requires authentication.
/// Returns 401 if no valid session found.
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_token(parts, &state.config.auth.cookie_name)
            .ok_or(AppError::Unauthenticated("No token, authorization denied"))?;

        let user = session::resolve_session(&state.db, token)?
            .ok_or(AppError::Unauthenticated("Token is not valid"))?;

        tracing::debug!(user = %user.id, username = %user.username, "Session resolved");
        Ok(CurrentUser {
            id: UserId::new(user.id),
        })
    }
}

/// JSON body that has passed its `Validate` rules. Bodies that are not JSON at
/// all are rejected with the same `{"errors": [...]}` shape.
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| {
                tracing::debug!("Rejected request body: {}", rejection.body_text());
                AppError::Validation(vec![FieldError::body("body", rejection.body_text())])
            })?;

        value.validate().map_err(AppError::Validation)?;
        Ok(ValidatedJson(value))
    }
}

/// Token lookup order: `x-auth-token`, `Authorization: Bearer`, session cookie.
fn extract_token<'a>(parts: &'a Parts, cookie_name: &str) -> Option<&'a str> {
    if let Some(token) = parts
        .headers
        .get(AUTH_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|t| !t.is_empty())
    {
        return Some(token);
    }

    if let Some(token) = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
    {
        return Some(token);
    }

    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(';'))
        .map(|s| s.trim())
        .find_map(|cookie| {
            let mut split = cookie.splitn(2, '=');
            let key = split.next()?.trim();
            let val = split.next()?.trim();
            if key == cookie_name && !val.is_empty() {
                Some(val)
            } else {
                None
            }
        })
}
