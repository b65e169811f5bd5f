//! 短链接跳转

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::http::header::USER_AGENT;
use actix_web::{HttpRequest, HttpResponse, Responder, web};
use tracing::{debug, error, trace};

use crate::errors::QuickslugError;
use crate::services::LinkService;
use crate::utils::ip::client_ip_or_unknown;

/// 配置的跳转状态码，非 3xx 跳转码时退回 307
pub fn redirect_status_code(configured: u16) -> StatusCode {
    match configured {
        301 => StatusCode::MOVED_PERMANENTLY,
        302 => StatusCode::FOUND,
        308 => StatusCode::PERMANENT_REDIRECT,
        _ => StatusCode::TEMPORARY_REDIRECT,
    }
}

pub struct RedirectService {}

impl RedirectService {
    pub async fn handle_redirect(
        req: HttpRequest,
        path: web::Path<String>,
        service: web::Data<Arc<LinkService>>,
    ) -> impl Responder {
        let captured_path = path.into_inner();
        let status = redirect_status_code(service.redirect_status());

        if captured_path.is_empty() {
            return match service.default_url() {
                Some(default_url) => Self::redirect_to(status, default_url),
                None => Self::not_found_response(),
            };
        }

        let now = chrono::Utc::now();
        match service.resolve(&captured_path, now).await {
            Ok(link) => {
                let ip = client_ip_or_unknown(&req);
                let user_agent = req
                    .headers()
                    .get(USER_AGENT)
                    .and_then(|v| v.to_str().ok());
                service.record_click(&link, &ip, user_agent, now).await;

                trace!("Redirecting '{}' -> '{}'", link.slug, link.original_url);
                Self::redirect_to(status, &link.original_url)
            }
            Err(QuickslugError::NotFound(_)) => {
                debug!("Redirect link not found: {}", captured_path);
                Self::not_found_response()
            }
            Err(QuickslugError::Gone(_)) => {
                debug!("Redirect link expired: {}", captured_path);
                Self::gone_response()
            }
            Err(e) => {
                error!("Database error during redirect lookup: {}", e);
                Self::error_response()
            }
        }
    }

    #[inline]
    fn redirect_to(status: StatusCode, location: &str) -> HttpResponse {
        HttpResponse::build(status)
            .insert_header(("Location", location))
            .finish()
    }

    #[inline]
    fn not_found_response() -> HttpResponse {
        HttpResponse::build(StatusCode::NOT_FOUND)
            .insert_header(("Content-Type", "text/html; charset=utf-8"))
            .insert_header(("Cache-Control", "public, max-age=60"))
            .body("Not Found")
    }

    #[inline]
    fn gone_response() -> HttpResponse {
        HttpResponse::build(StatusCode::GONE)
            .insert_header(("Content-Type", "text/html; charset=utf-8"))
            .body("Link Expired")
    }

    #[inline]
    fn error_response() -> HttpResponse {
        HttpResponse::build(StatusCode::INTERNAL_SERVER_ERROR)
            .insert_header(("Content-Type", "text/html; charset=utf-8"))
            .body("Internal Server Error")
    }
}

pub fn redirect_routes() -> actix_web::Scope {
    web::scope("")
        .route("/{path}*", web::get().to(RedirectService::handle_redirect))
        .route("/{path}*", web::head().to(RedirectService::handle_redirect))
}
