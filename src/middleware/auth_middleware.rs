/// Authentication Middleware
///
/// Validates the access token from the `Authorization: Bearer` header or the
/// `accessToken` cookie and injects its claims into request extensions.
/// When no access token is present but a refresh cookie is, the session is
/// renewed on the fly and the rotated cookies are set on the response.
///
/// `CheckUser` attaches the caller's claims when it can and never rejects.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;
use std::sync::Arc;

use crate::auth::SessionManager;
use crate::cookies::{token_cookies, ACCESS_COOKIE, REFRESH_COOKIE};
use crate::error::{AppError, AuthError};

/// Middleware for protecting routes
pub struct RequireAuth {
    sessions: Arc<SessionManager>,
}

impl RequireAuth {
    pub fn new(sessions: Arc<SessionManager>) -> Self {
        Self { sessions }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequireAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequireAuthService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(RequireAuthService {
            service: Rc::new(service),
            sessions: self.sessions.clone(),
        }))
    }
}

pub struct RequireAuthService<S> {
    service: Rc<S>,
    sessions: Arc<SessionManager>,
}

impl<S, B> Service<ServiceRequest> for RequireAuthService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let access_token = access_token(&req);
        let refresh_token = req.cookie(REFRESH_COOKIE).map(|c| c.value().to_string());

        let service = self.service.clone();
        let sessions = self.sessions.clone();

        Box::pin(async move {
            if let Some(token) = access_token {
                let claims = sessions.validate_access(&token).ok_or_else(|| {
                    tracing::warn!("Access token validation failed");
                    AppError::Auth(AuthError::TokenInvalid)
                })?;

                tracing::debug!(account_id = %claims.id, "Access token validated");
                req.extensions_mut().insert(claims);
                return service.call(req).await;
            }

            let Some(refresh_token) = refresh_token else {
                tracing::warn!("Missing access and refresh tokens");
                return Err(AppError::Auth(AuthError::MissingToken).into());
            };

            let renewal = sessions.renew(&refresh_token).await.map_err(AppError::from)?;
            let claims = sessions
                .validate_access(&renewal.tokens.access_token)
                .ok_or_else(|| AppError::Internal("Renewed access token rejected".to_string()))?;

            tracing::debug!(account_id = %claims.id, "Session renewed by middleware");
            req.extensions_mut().insert(claims);

            let mut res = service.call(req).await?;
            for cookie in token_cookies(&renewal.tokens, sessions.settings()) {
                res.response_mut()
                    .add_cookie(&cookie)
                    .map_err(|e| AppError::Internal(format!("Failed to set cookie: {}", e)))?;
            }
            Ok(res)
        })
    }
}

/// Middleware attaching optional identity
///
/// Claims come from the access token, or failing that from the refresh token.
/// The refresh token is only verified, never rotated or looked up.
pub struct CheckUser {
    sessions: Arc<SessionManager>,
}

impl CheckUser {
    pub fn new(sessions: Arc<SessionManager>) -> Self {
        Self { sessions }
    }
}

impl<S, B> Transform<S, ServiceRequest> for CheckUser
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = CheckUserService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(CheckUserService {
            service: Rc::new(service),
            sessions: self.sessions.clone(),
        }))
    }
}

pub struct CheckUserService<S> {
    service: Rc<S>,
    sessions: Arc<SessionManager>,
}

impl<S, B> Service<ServiceRequest> for CheckUserService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let claims = access_token(&req)
            .and_then(|token| self.sessions.validate_access(&token))
            .or_else(|| {
                req.cookie(REFRESH_COOKIE)
                    .and_then(|c| self.sessions.validate_refresh(c.value()))
            });

        if let Some(claims) = claims {
            tracing::debug!(account_id = %claims.id, "Caller identified");
            req.extensions_mut().insert(claims);
        }

        let service = self.service.clone();
        Box::pin(async move { service.call(req).await })
    }
}

fn access_token(req: &ServiceRequest) -> Option<String> {
    bearer_token(req).or_else(|| req.cookie(ACCESS_COOKIE).map(|c| c.value().to_string()))
}

fn bearer_token(req: &ServiceRequest) -> Option<String> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}
