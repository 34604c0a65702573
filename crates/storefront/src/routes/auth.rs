//! Authentication route handlers.
//!
//! Email/password login and registration. Logging in or registering moves
//! the visitor's anonymous cart into the account's cart.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, instrument, warn};

use musicshop_core::User;

use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{cart_token, clear_cart_token, set_current_user};
use crate::models::CurrentUser;
use crate::services::{AuthError, AuthService, CartService, Registration};
use crate::state::AppState;

// =============================================================================
// Forms and queries
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
}

/// `?error=` code carried across the redirect back to a form.
#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub user: Option<CurrentUser>,
    pub error: Option<String>,
}

#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub user: Option<CurrentUser>,
    pub error: Option<String>,
}

/// Human text for an error code, unknown codes are dropped.
fn error_message(code: Option<&str>) -> Option<String> {
    let message = match code? {
        "credentials" => "Invalid email or password.",
        "email_taken" => "An account with this email already exists.",
        "invalid_email" => "Please enter a valid email address.",
        "password_mismatch" => "Passwords do not match.",
        "weak_password" => "Password must be at least 8 characters.",
        _ => return None,
    };
    Some(message.to_string())
}

/// Error code for a failed registration, `None` for server errors.
const fn registration_error_code(err: &AuthError) -> Option<&'static str> {
    match err {
        AuthError::UserAlreadyExists => Some("email_taken"),
        AuthError::InvalidEmail(_) => Some("invalid_email"),
        AuthError::WeakPassword(_) => Some("weak_password"),
        _ => None,
    }
}

// =============================================================================
// Handlers
// =============================================================================

pub async fn login_page(Query(query): Query<MessageQuery>) -> LoginTemplate {
    LoginTemplate {
        user: None,
        error: error_message(query.error.as_deref()),
    }
}

#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let user = match AuthService::new(state.store())
        .login(&form.email, &form.password)
        .await
    {
        Ok(user) => user,
        Err(AuthError::InvalidCredentials) => {
            return Ok(Redirect::to("/auth/login?error=credentials").into_response());
        }
        Err(e) => return Err(e.into()),
    };

    start_session(&state, &session, &user).await?;
    info!(user_id = %user.id, "User logged in");
    Ok(Redirect::to("/account").into_response())
}

pub async fn register_page(Query(query): Query<MessageQuery>) -> RegisterTemplate {
    RegisterTemplate {
        user: None,
        error: error_message(query.error.as_deref()),
    }
}

#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Result<Response> {
    if form.password != form.password_confirm {
        return Ok(Redirect::to("/auth/register?error=password_mismatch").into_response());
    }

    let registration = Registration {
        email: form.email,
        password: form.password,
        first_name: form.first_name,
        last_name: form.last_name,
        phone: form.phone,
        address: form.address,
    };
    let (user, _customer) = match AuthService::new(state.store())
        .register(registration)
        .await
    {
        Ok(account) => account,
        Err(e) => {
            return match registration_error_code(&e) {
                Some(code) => {
                    Ok(Redirect::to(&format!("/auth/register?error={code}")).into_response())
                }
                None => Err(e.into()),
            };
        }
    };

    start_session(&state, &session, &user).await?;
    Ok(Redirect::to("/account").into_response())
}

#[instrument(skip_all)]
pub async fn logout(session: Session) -> Result<Redirect> {
    session.flush().await?;
    clear_sentry_user();
    Ok(Redirect::to("/"))
}

/// Log `user` in and fold the visitor's anonymous cart into theirs.
///
/// A failed merge is logged and the login still succeeds; the anonymous
/// cart is left alone.
async fn start_session(state: &AppState, session: &Session, user: &User) -> Result<()> {
    let token = cart_token(session).await;

    session.cycle_id().await?;
    set_current_user(session, &CurrentUser::from(user)).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));

    if let Some(token) = token {
        match CartService::new(state.store())
            .merge_anonymous(user.id, &token)
            .await
        {
            Ok(_) => clear_cart_token(session).await?,
            Err(e) => warn!(error = %e, "Could not merge anonymous cart on login"),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            error_message(Some("credentials")).as_deref(),
            Some("Invalid email or password.")
        );
        assert_eq!(error_message(Some("<script>")), None);
        assert_eq!(error_message(None), None);
    }

    #[test]
    fn test_registration_error_codes() {
        assert_eq!(
            registration_error_code(&AuthError::UserAlreadyExists),
            Some("email_taken")
        );
        assert_eq!(
            registration_error_code(&AuthError::WeakPassword("short".to_string())),
            Some("weak_password")
        );
        assert_eq!(registration_error_code(&AuthError::PasswordHash), None);
    }

    #[test]
    fn test_every_code_has_a_message() {
        for err in [
            AuthError::UserAlreadyExists,
            AuthError::WeakPassword(String::new()),
        ] {
            let code = registration_error_code(&err);
            assert!(error_message(code).is_some());
        }
    }
}
