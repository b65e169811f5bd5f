//! JWT 认证中间件
//!
//! 从 `Authorization: Bearer` 或 access cookie 中读取令牌，校验通过后把
//! `AuthenticatedUser` 放入 request extensions。没有令牌的请求按匿名放行，
//! 由各 handler 通过提取器决定是否要求登录。

use actix_service::{Service, Transform};
use actix_web::{
    Error, FromRequest, HttpMessage, HttpRequest,
    body::EitherBody,
    dev::{Payload, ServiceRequest, ServiceResponse},
};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use std::rc::Rc;
use tracing::{debug, trace};

use crate::api::jwt::{Claims, get_jwt_service};
use crate::api::services::helpers::error_from_quickslug;
use crate::config::get_config;
use crate::errors::QuickslugError;
use crate::storage::Plan;

/// 令牌来源
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthMethod {
    Bearer,
    Cookie,
}

/// 已认证的调用方
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub plan: Plan,
    pub method: AuthMethod,
}

impl AuthenticatedUser {
    fn from_claims(claims: Claims, method: AuthMethod) -> Self {
        Self {
            user_id: claims.sub,
            plan: claims.plan,
            method,
        }
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = QuickslugError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthenticatedUser>()
                .cloned()
                .ok_or_else(|| QuickslugError::unauthorized("Authentication required")),
        )
    }
}

/// JWT authentication middleware
#[derive(Clone, Default)]
pub struct JwtAuth;

impl<S, B> Transform<S, ServiceRequest> for JwtAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = JwtAuthMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(JwtAuthMiddleware {
            service: Rc::new(service),
            access_cookie_name: get_config().api.access_cookie_name.clone(),
        }))
    }
}

pub struct JwtAuthMiddleware<S> {
    service: Rc<S>,
    access_cookie_name: String,
}

/// 从 Authorization header 提取 Bearer token
fn extract_bearer_token(req: &ServiceRequest) -> Option<String> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl<S, B> Service<ServiceRequest> for JwtAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = self.service.clone();
        let jwt = get_jwt_service();

        // Bearer 令牌无效时直接拒绝；过期的 cookie 视为匿名
        if let Some(token) = extract_bearer_token(&req) {
            match jwt.validate_access_token(&token) {
                Ok(claims) => {
                    trace!("Bearer token accepted for {}", claims.sub);
                    req.extensions_mut()
                        .insert(AuthenticatedUser::from_claims(claims, AuthMethod::Bearer));
                }
                Err(e) => {
                    debug!("Bearer token rejected: {}", e);
                    let response = error_from_quickslug(&QuickslugError::unauthorized(
                        "Invalid or expired token",
                    ));
                    return Box::pin(async move {
                        Ok(req.into_response(response).map_into_right_body())
                    });
                }
            }
        } else if let Some(cookie) = req.cookie(&self.access_cookie_name) {
            match jwt.validate_access_token(cookie.value()) {
                Ok(claims) => {
                    trace!("Cookie token accepted for {}", claims.sub);
                    req.extensions_mut()
                        .insert(AuthenticatedUser::from_claims(claims, AuthMethod::Cookie));
                }
                Err(e) => debug!("Access cookie ignored: {}", e),
            }
        }

        Box::pin(async move {
            let res = srv.call(req).await?;
            Ok(res.map_into_left_body())
        })
    }
}
