use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use cookie::{Cookie, SameSite};
use serde::Deserialize;

use crate::{
    AppState,
    auth::{self, ACCESS_TOKEN_COOKIE, AuthUser},
    auth_provider::AuthProviderError,
    config::Env,
    error::AppError,
    gate::{ADMIN_DASHBOARD_PATH, HOME_PATH, LOGIN_PATH, ReasonCode},
    models::{
        ActionResult, AuthPageNotice, ChangePasswordRequest, ForgotPasswordRequest, LoginRequest,
        NewPasswordRequest, NewProfile, RedirectResponse, RegisterRequest,
    },
    role::Role,
};

use super::{require_email, require_text};

/// Minimum length of a new password.
pub const MIN_PASSWORD_LEN: usize = 8;

const INVALID_CREDENTIALS: &str = "invalid_credentials";
const CHECK_EMAIL: &str = "check_email";

/// AuthPageQuery
///
/// The `error` and `message` codes other routes (and the request gate) attach
/// to `/login` and `/register`.
#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AuthPageQuery {
    pub error: Option<String>,
    pub message: Option<String>,
}

/// Human-readable text for a known notice code. Unknown codes are never echoed back.
fn notice_for(code: &str) -> Option<&'static str> {
    match code {
        c if c == ReasonCode::AuthenticationRequired.as_str() => {
            Some("Please sign in to continue.")
        }
        c if c == ReasonCode::AdminAccessRequired.as_str() => Some(
            "Access denied: admin privileges are required. Sign in with an administrator account.",
        ),
        INVALID_CREDENTIALS => Some("Could not authenticate user."),
        CHECK_EMAIL => Some("Check your email to continue registration."),
        _ => None,
    }
}

fn session_cookie(token: &str, max_age_secs: i64, env: &Env) -> Cookie<'static> {
    Cookie::build((ACCESS_TOKEN_COOKIE, token.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(*env == Env::Production)
        .max_age(cookie::time::Duration::seconds(max_age_secs))
        .build()
}

fn with_cookie(status: StatusCode, cookie: Cookie<'_>, body: RedirectResponse) -> Response {
    let mut response = (status, Json(body)).into_response();
    match HeaderValue::from_str(&cookie.to_string()) {
        Ok(value) => {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
        Err(e) => tracing::error!(error = %e, "session cookie is not a valid header value"),
    }
    response
}

/// validate_new_password
///
/// Length and confirmation checks shared by the reset and change flows.
pub fn validate_new_password(password: &str, confirm: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "New password must be at least {} characters long",
            MIN_PASSWORD_LEN
        )));
    }
    if password != confirm {
        return Err(AppError::BadRequest("New passwords do not match".to_string()));
    }
    Ok(())
}

/// login_page
///
/// [Public Route] The notice to display above the login form, if any.
#[utoipa::path(
    get,
    path = "/login",
    params(AuthPageQuery),
    responses((status = 200, description = "Login page notice", body = AuthPageNotice))
)]
pub async fn login_page(Query(query): Query<AuthPageQuery>) -> Json<AuthPageNotice> {
    let notice = query
        .error
        .as_deref()
        .and_then(notice_for)
        .or_else(|| query.message.as_deref().and_then(notice_for));
    Json(AuthPageNotice {
        notice: notice.map(str::to_string),
    })
}

/// register_page
///
/// [Public Route] Same notice lookup as the login page.
#[utoipa::path(
    get,
    path = "/register",
    params(AuthPageQuery),
    responses((status = 200, description = "Register page notice", body = AuthPageNotice))
)]
pub async fn register_page(query: Query<AuthPageQuery>) -> Json<AuthPageNotice> {
    login_page(query).await
}

/// login
///
/// [Public Route] Password sign-in. On success the access token is stored in
/// the session cookie and the client is sent to the dashboard (admins) or home.
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = RedirectResponse),
        (status = 401, description = "Bad credentials", body = RedirectResponse)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Response, AppError> {
    require_text("email", &payload.email)?;
    require_text("password", &payload.password)?;

    let session = match state.auth.sign_in(payload.email.trim(), &payload.password).await {
        Ok(session) => session,
        Err(AuthProviderError::Rejected(reason)) => {
            tracing::info!(reason = %reason, "sign-in rejected");
            let body = RedirectResponse {
                redirect_to: format!("{}?message={}", LOGIN_PATH, INVALID_CREDENTIALS),
            };
            return Ok((StatusCode::UNAUTHORIZED, Json(body)).into_response());
        }
        Err(e) => return Err(e.into()),
    };

    let is_admin = state
        .repo
        .get_profile(session.user.id)
        .await?
        .is_some_and(|profile| profile.role().is_admin());

    let redirect_to = if is_admin { ADMIN_DASHBOARD_PATH } else { HOME_PATH };
    tracing::info!(user_id = %session.user.id, redirect_to, "signed in");

    Ok(with_cookie(
        StatusCode::OK,
        session_cookie(&session.access_token, session.expires_in, &state.config.env),
        RedirectResponse {
            redirect_to: redirect_to.to_string(),
        },
    ))
}

/// register
///
/// [Public Route] Creates the account with the identity provider, then mirrors
/// it into `profiles` as a subscriber.
#[utoipa::path(
    post,
    path = "/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered", body = RedirectResponse),
        (status = 400, description = "Rejected by the identity provider")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RedirectResponse>), AppError> {
    require_email(&payload.email)?;
    require_text("password", &payload.password)?;

    let email = payload.email.trim();
    let full_name = payload.full_name.trim();
    let user_id = state.auth.sign_up(email, &payload.password, full_name).await?;

    state
        .repo
        .upsert_profile(NewProfile {
            id: user_id,
            email: Some(email.to_string()),
            full_name: Some(full_name.to_string()).filter(|n| !n.is_empty()),
            role: Role::Subscriber,
        })
        .await?;

    tracing::info!(%user_id, "account registered");
    Ok((
        StatusCode::CREATED,
        Json(RedirectResponse {
            redirect_to: format!("{}?message={}", LOGIN_PATH, CHECK_EMAIL),
        }),
    ))
}

/// logout
///
/// [Public Route] Expires the session cookie.
#[utoipa::path(
    post,
    path = "/logout",
    responses((status = 200, description = "Signed out", body = RedirectResponse))
)]
pub async fn logout(State(state): State<AppState>) -> Response {
    with_cookie(
        StatusCode::OK,
        session_cookie("", 0, &state.config.env),
        RedirectResponse {
            redirect_to: LOGIN_PATH.to_string(),
        },
    )
}

/// forgot_password
///
/// [Public Route] Sends the recovery e-mail; its link lands on `/update-password`.
#[utoipa::path(
    post,
    path = "/forgot-password",
    request_body = ForgotPasswordRequest,
    responses((status = 200, description = "Recovery e-mail sent", body = ActionResult))
)]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<Json<ActionResult>, AppError> {
    require_email(&payload.email)?;
    let redirect_to = format!("{}/update-password", state.config.site_url.trim_end_matches('/'));

    state
        .auth
        .send_password_reset(payload.email.trim(), &redirect_to)
        .await?;

    Ok(Json(ActionResult::ok("Check your email for the reset link.")))
}

/// update_password
///
/// [Authenticated Route] Sets a new password for the session that followed the
/// recovery link. No current password is asked for.
#[utoipa::path(
    post,
    path = "/update-password",
    request_body = NewPasswordRequest,
    responses(
        (status = 200, description = "Password updated", body = ActionResult),
        (status = 400, description = "Validation failed")
    )
)]
pub async fn update_password(
    _user: AuthUser,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<NewPasswordRequest>,
) -> Result<Json<ActionResult>, AppError> {
    validate_new_password(&payload.password, &payload.confirm_password)?;
    let token = auth::access_token(&headers).ok_or(AppError::Unauthorized)?;

    state.auth.update_password(&token, &payload.password).await?;
    Ok(Json(ActionResult::ok("Password updated.")))
}

/// change_password
///
/// [Authenticated Route] Verifies the current password with a fresh sign-in and
/// uses that session to set the new one.
#[utoipa::path(
    post,
    path = "/me/password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = ActionResult),
        (status = 400, description = "Wrong current password or validation failed")
    )
)]
pub async fn change_password(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<ActionResult>, AppError> {
    let email = state
        .repo
        .get_profile(id)
        .await?
        .and_then(|profile| profile.email)
        .ok_or(AppError::NotFound("User"))?;

    let session = match state.auth.sign_in(&email, &payload.current_password).await {
        Ok(session) => session,
        Err(AuthProviderError::Rejected(_)) => {
            return Err(AppError::BadRequest("Invalid current password".to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    validate_new_password(&payload.password, &payload.confirm_password)?;

    state
        .auth
        .update_password(&session.access_token, &payload.password)
        .await?;

    tracing::info!(user_id = %id, "password changed");
    Ok(Json(ActionResult::ok("Password updated.")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notices_only_for_known_codes() {
        assert!(notice_for("admin_access_required").is_some());
        assert!(notice_for("authentication_required").is_some());
        assert!(notice_for("<script>alert(1)</script>").is_none());
    }

    #[test]
    fn new_password_rules() {
        assert!(validate_new_password("short", "short").is_err());
        assert!(validate_new_password("long-enough", "long-enougH").is_err());
        assert!(validate_new_password("long-enough", "long-enough").is_ok());
    }
}
