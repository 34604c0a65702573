//! Authentication extractors.
//!
//! The logged-in user lives in the session under
//! [`session_keys::CURRENT_USER`]; these extractors read it back.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::models::{CurrentUser, session_keys};

/// Extractor that requires a logged-in user.
///
/// Page requests are redirected to the login form; anything else gets a
/// bare 401.
///
/// ```rust,ignore
/// async fn account(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", user.display_name)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Rejection for [`RequireAuth`].
#[derive(Debug)]
pub enum AuthRejection {
    RedirectToLogin,
    Unauthorized,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/auth/login").into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
        }
    }
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(AuthRejection::Unauthorized)?;

        current_user(session).await.map(Self).ok_or_else(|| {
            if parts.method == axum::http::Method::GET {
                AuthRejection::RedirectToLogin
            } else {
                AuthRejection::Unauthorized
            }
        })
    }
}

/// Extractor that reads the current user if there is one.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = match parts.extensions.get::<Session>() {
            Some(session) => current_user(session).await,
            None => None,
        };
        Ok(Self(user))
    }
}

/// The user stored in `session`. Unreadable entries count as logged out.
pub async fn current_user(session: &Session) -> Option<CurrentUser> {
    session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
}

/// Store the logged-in user.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CURRENT_USER, user).await
}
