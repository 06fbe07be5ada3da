//! Session extractors.
//!
//! A session token is read from the `Authorization: Bearer` header or, failing
//! that, from the `shelfwise_session` cookie.

use axum::extract::FromRequestParts;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;
use shelfwise_common::{Error, User};
use tracing::debug;

use crate::error::AppError;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "shelfwise_session";

/// The authenticated user making the request.
pub struct CurrentUser(pub User);

/// An authenticated user with the admin role.
pub struct AdminUser(pub User);

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then(|| token.trim())
        .filter(|token| !token.is_empty())
}

fn cookie_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, token)| token.trim())
        .filter(|token| !token.is_empty())
}

pub fn session_token(parts: &Parts) -> Option<&str> {
    bearer_token(parts).or_else(|| cookie_token(parts))
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(token) = session_token(parts) else {
            debug!("Request without a session token");
            return Err(AppError::Unauthorized);
        };

        match state.db.session_user(token).await? {
            Some(user) => Ok(CurrentUser(user)),
            None => {
                debug!("Unknown or expired session token");
                Err(AppError::Unauthorized)
            }
        }
    }
}

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(Error::forbidden("admin role required").into());
        }
        Ok(AdminUser(user))
    }
}
