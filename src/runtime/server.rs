//! Server mode
//!
//! Connects storage, builds the services and runs the HTTP server until
//! it stops or Ctrl+C is received.

use actix_cors::Cors;
use actix_web::{
    App, HttpServer,
    middleware::{Compress, DefaultHeaders},
    web,
};
use anyhow::Result;
use std::sync::Arc;
use tracing::{error, warn};

use crate::api::middleware::RequestIdMiddleware;
use crate::api::services::{AppStartTime, api_v1_routes, health_routes, redirect_routes};
use crate::config::{StaticConfig, get_config};
use crate::services::{AnalyticsService, LinkService, UserService};
use crate::storage::SeaOrmStorage;
use crate::system::listen_for_shutdown;

/// Shared application state registered as `web::Data`
#[derive(Clone)]
pub struct AppServices {
    pub storage: Arc<SeaOrmStorage>,
    pub link_service: Arc<LinkService>,
    pub analytics_service: Arc<AnalyticsService>,
    pub user_service: Arc<UserService>,
    pub app_start_time: AppStartTime,
}

impl AppServices {
    pub fn new(storage: Arc<SeaOrmStorage>, config: &StaticConfig) -> Self {
        Self {
            link_service: Arc::new(LinkService::new(storage.clone(), config)),
            analytics_service: Arc::new(AnalyticsService::new(
                storage.clone(),
                config.analytics.clone(),
            )),
            user_service: Arc::new(UserService::new(storage.clone(), config.quota.clone())),
            storage,
            app_start_time: AppStartTime {
                start_datetime: chrono::Utc::now(),
            },
        }
    }

    /// 注册共享状态与全部路由；重定向路由必须最后注册
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(web::Data::new(self.storage.clone()))
            .app_data(web::Data::new(self.link_service.clone()))
            .app_data(web::Data::new(self.analytics_service.clone()))
            .app_data(web::Data::new(self.user_service.clone()))
            .app_data(web::Data::new(self.app_start_time.clone()))
            .service(api_v1_routes())
            .service(health_routes())
            .service(redirect_routes());
    }
}

/// Build CORS middleware from configuration
///
/// 未配置来源时使用浏览器默认的同源策略。
fn build_cors_middleware(allowed_origins: &[String]) -> Cors {
    if allowed_origins.is_empty() {
        return Cors::default();
    }

    let mut cors = Cors::default()
        .allowed_methods(vec!["GET", "HEAD", "POST", "PUT", "DELETE"])
        .allowed_headers(vec!["Content-Type", "Authorization", "Accept"])
        .max_age(3600);

    if allowed_origins.iter().any(|o| o == "*") {
        // 任意来源时不允许携带凭据
        cors = cors.allow_any_origin();
    } else {
        for origin in allowed_origins {
            cors = cors.allowed_origin(origin);
        }
        cors = cors.supports_credentials();
    }

    cors
}

/// Run the HTTP server
///
/// **Note**: Logging system must be initialized before calling this function
pub async fn run_server() -> Result<()> {
    let config = get_config();

    let storage = Arc::new(SeaOrmStorage::connect(&config.database).await.map_err(|e| {
        error!("Server startup failed: {}", e);
        e
    })?);
    warn!(
        "Connected to {} storage, {} links stored",
        storage.backend_name(),
        storage.count_links().await.unwrap_or(0)
    );

    let services = AppServices::new(storage.clone(), &config);

    if config.api.jwt_secret.is_empty() {
        warn!("api.jwt_secret is not set; sessions will not survive a restart");
    }
    if config.api.trusted_proxies.is_empty() {
        warn!(
            "Client IP detection: auto-detect mode. \
             Connections from private IPs will use X-Forwarded-For. \
             To disable, configure api.trusted_proxies explicitly."
        );
    }

    let cpu_count = config.server.cpu_count.clamp(1, 32);
    warn!("Using {} CPU cores for the server", cpu_count);

    let cors_origins = config.api.cors_allowed_origins.clone();
    let db_for_shutdown = storage.get_db().clone();

    let bind_address = format!("{}:{}", config.server.host, config.server.port);
    warn!("Starting server at http://{}", bind_address);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(RequestIdMiddleware)
            .wrap(build_cors_middleware(&cors_origins))
            .wrap(Compress::default())
            .wrap(DefaultHeaders::new().add(("Cache-Control", "no-cache, no-store, must-revalidate")))
            .app_data(web::PayloadConfig::new(1024 * 1024))
            .configure(|cfg| services.configure(cfg))
    })
    .keep_alive(std::time::Duration::from_secs(30))
    .client_request_timeout(std::time::Duration::from_millis(5000))
    .client_disconnect_timeout(std::time::Duration::from_millis(1000))
    .workers(cpu_count)
    .bind(&bind_address)?
    .run();

    tokio::select! {
        res = server => {
            res?;
        }
        _ = listen_for_shutdown(db_for_shutdown) => {
            warn!("Graceful shutdown completed");
        }
    }

    Ok(())
}
