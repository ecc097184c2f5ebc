/// Authentication Routes
///
/// Handles sign-up, login, token refresh, logout and current account information.

use actix_web::{web, HttpRequest, HttpResponse, HttpResponseBuilder};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{AuthService, Claims, CredentialPair, SessionManager};
use crate::cookies::{removal_cookies, token_cookies, REFRESH_COOKIE};
use crate::error::{AppError, AuthError, ErrorContext};

/// Sign-up and login request
#[derive(Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

/// Token refresh / logout request
///
/// The `refreshToken` cookie takes precedence over the body.
#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

/// Authentication response with access and refresh tokens
#[derive(Serialize)]
pub struct AuthResponse {
    pub message: String,
    pub account_id: Uuid,
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

#[derive(Serialize)]
pub struct LogoutResponse {
    pub logged_out: bool,
}

/// Optional identity of the caller
#[derive(Serialize)]
pub struct SessionStatusResponse {
    pub authenticated: bool,
    pub email: Option<String>,
}

/// Account information response
#[derive(Serialize)]
pub struct AccountResponse {
    pub id: String,
    pub email: String,
}

/// POST /auth/signup
///
/// Register a new account with email and password.
/// Sets token cookies and returns both tokens on success.
///
/// # Errors
/// - 400: Invalid email or empty password
/// - 409: Email already in use
/// - 500: Internal server error
pub async fn signup(
    form: web::Json<CredentialsRequest>,
    auth: web::Data<AuthService>,
    sessions: web::Data<SessionManager>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("account_signup");

    let signed_in = auth
        .signup(&form.email, &form.password)
        .await
        .map_err(|e| log_failure(&context, e))?;

    tracing::info!(
        request_id = %context.request_id,
        account_id = %signed_in.account_id,
        "Account signed up successfully"
    );

    Ok(token_response(
        HttpResponse::Created(),
        "Student signed up successfully",
        signed_in.account_id,
        signed_in.tokens,
        &sessions,
    ))
}

/// POST /auth/login
///
/// Authenticate with email and password.
/// Any previous session of the account is superseded.
///
/// # Errors
/// - 401: Unknown email or incorrect password
/// - 500: Internal server error
pub async fn login(
    form: web::Json<CredentialsRequest>,
    auth: web::Data<AuthService>,
    sessions: web::Data<SessionManager>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("account_login");

    let signed_in = auth
        .login(&form.email, &form.password)
        .await
        .map_err(|e| log_failure(&context, e))?;

    tracing::info!(
        request_id = %context.request_id,
        account_id = %signed_in.account_id,
        "Account logged in successfully"
    );

    Ok(token_response(
        HttpResponse::Ok(),
        "Student logged in successfully",
        signed_in.account_id,
        signed_in.tokens,
        &sessions,
    ))
}

/// POST /auth/refresh
///
/// Exchange a refresh token for a new credential pair (token rotation).
/// The presented refresh token cannot be used again afterwards.
///
/// # Errors
/// - 401: Missing, invalid, expired or superseded refresh token, or unknown account
/// - 409: The token was rotated by a concurrent request
/// - 500: Internal server error
pub async fn refresh(
    req: HttpRequest,
    body: Option<web::Json<RefreshRequest>>,
    sessions: web::Data<SessionManager>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("token_refresh");

    let refresh_token = presented_refresh_token(&req, body.as_deref())
        .ok_or_else(|| log_failure(&context, AuthError::MissingToken.into()))?;

    let renewal = sessions
        .renew(&refresh_token)
        .await
        .map_err(|e| log_failure(&context, e.into()))?;

    tracing::info!(
        request_id = %context.request_id,
        account_id = %renewal.account_id,
        "Token refreshed successfully"
    );

    Ok(token_response(
        HttpResponse::Ok(),
        "Tokens refreshed successfully",
        renewal.account_id,
        renewal.tokens,
        &sessions,
    ))
}

/// POST /auth/logout
///
/// Delete the session of the presented refresh token and clear both cookies.
/// Logging out twice is not an error.
pub async fn logout(
    req: HttpRequest,
    body: Option<web::Json<RefreshRequest>>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("account_logout");

    let logged_out = match presented_refresh_token(&req, body.as_deref()) {
        Some(token) => auth
            .logout(&token)
            .await
            .map_err(|e| log_failure(&context, e))?,
        None => false,
    };

    tracing::info!(request_id = %context.request_id, logged_out, "Logout handled");

    let mut response = HttpResponse::Ok();
    for cookie in removal_cookies() {
        response.cookie(cookie);
    }
    Ok(response.json(LogoutResponse { logged_out }))
}

/// GET /api/me
///
/// Current account's information.
/// **Requires authentication**; claims are injected by `RequireAuth`.
///
/// # Errors
/// - 404: The account no longer exists
pub async fn get_current_account(
    claims: web::ReqData<Claims>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("current_account").with_account_id(claims.id);

    let account = auth
        .current_account(claims.id)
        .await
        .map_err(|e| log_failure(&context, e))?;

    Ok(HttpResponse::Ok().json(AccountResponse {
        id: account.id.to_string(),
        email: account.email,
    }))
}

/// GET /auth/status
///
/// Who the caller is, if anyone. Never rejects; identity is attached by `CheckUser`.
pub async fn session_status(claims: Option<web::ReqData<Claims>>) -> HttpResponse {
    let claims = claims.map(|c| c.into_inner());

    HttpResponse::Ok().json(SessionStatusResponse {
        authenticated: claims.is_some(),
        email: claims.map(|c| c.email),
    })
}

fn presented_refresh_token(req: &HttpRequest, body: Option<&RefreshRequest>) -> Option<String> {
    req.cookie(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .or_else(|| body.and_then(|b| b.refresh_token.clone()))
        .filter(|token| !token.is_empty())
}

fn token_response(
    mut builder: HttpResponseBuilder,
    message: &str,
    account_id: Uuid,
    tokens: CredentialPair,
    sessions: &SessionManager,
) -> HttpResponse {
    let settings = sessions.settings();
    for cookie in token_cookies(&tokens, settings) {
        builder.cookie(cookie);
    }

    builder.json(AuthResponse {
        message: message.to_string(),
        account_id,
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: settings.access_token_seconds(),
    })
}

fn log_failure(context: &ErrorContext, error: AppError) -> AppError {
    context.log_error(&error);
    error
}
