//! 链接 API 端点

use std::sync::Arc;

use actix_web::{HttpRequest, Responder, Result as ActixResult, web};
use tracing::{info, trace};

use crate::api::middleware::AuthenticatedUser;
use crate::services::{AnalyticsService, LinkService};
use crate::utils::ip::client_ip_or_unknown;

use super::helpers::{api_result, created_response, error_from_quickslug};
use super::types::{
    GetLinksQuery, LinkListResponse, LinkResponse, PaginationInfo, PostNewLink, SuccessResponse,
    UpdateLinkBody,
};

/// 创建短链接，登录可选
pub async fn post_link(
    req: HttpRequest,
    user: Option<AuthenticatedUser>,
    body: web::Json<PostNewLink>,
    service: web::Data<Arc<LinkService>>,
) -> ActixResult<impl Responder> {
    let ip = client_ip_or_unknown(&req);
    let user_id = user.as_ref().map(|u| u.user_id.as_str());
    trace!("API: create link request from {} (user={:?})", ip, user_id);

    let response = match service
        .create_link(body.into_inner().into(), user_id, &ip)
        .await
    {
        Ok(link) => {
            let short_url = service.short_url(&link.slug);
            created_response(LinkResponse::new(link, short_url, chrono::Utc::now()))
        }
        Err(e) => error_from_quickslug(&e),
    };
    Ok(response)
}

/// 当前用户的链接列表
pub async fn get_links(
    user: AuthenticatedUser,
    query: web::Query<GetLinksQuery>,
    service: web::Data<Arc<LinkService>>,
) -> ActixResult<impl Responder> {
    let result = service
        .list_user_links(&user.user_id, query.page, query.page_size)
        .await
        .map(|page| {
            let now = chrono::Utc::now();
            let links = page
                .links
                .into_iter()
                .map(|link| {
                    let short_url = service.short_url(&link.slug);
                    LinkResponse::new(link, short_url, now)
                })
                .collect::<Vec<_>>();

            trace!(
                "API: returning {} links for {} (total {})",
                links.len(),
                user.user_id,
                page.total
            );

            LinkListResponse {
                links,
                pagination: PaginationInfo {
                    page: page.page,
                    page_size: page.page_size,
                    total: page.total,
                    total_pages: page.total.div_ceil(page.page_size),
                },
            }
        });

    Ok(api_result(result))
}

/// 检查自定义短码是否可用
pub async fn check_slug(
    path: web::Path<String>,
    service: web::Data<Arc<LinkService>>,
) -> ActixResult<impl Responder> {
    Ok(api_result(service.check_slug(&path.into_inner()).await))
}

pub async fn update_link(
    user: AuthenticatedUser,
    path: web::Path<String>,
    body: web::Json<UpdateLinkBody>,
    service: web::Data<Arc<LinkService>>,
) -> ActixResult<impl Responder> {
    let link_id = path.into_inner();
    let result = service
        .update_link(&user.user_id, &link_id, body.into_inner().into())
        .await
        .map(|link| {
            let short_url = service.short_url(&link.slug);
            LinkResponse::new(link, short_url, chrono::Utc::now())
        });

    Ok(api_result(result))
}

pub async fn delete_link(
    user: AuthenticatedUser,
    path: web::Path<String>,
    service: web::Data<Arc<LinkService>>,
) -> ActixResult<impl Responder> {
    let link_id = path.into_inner();
    let result = service.delete_link(&user.user_id, &link_id).await;
    if result.is_ok() {
        info!("API: user {} deleted link {}", user.user_id, link_id);
    }

    Ok(api_result(result.map(|_| SuccessResponse { success: true })))
}

/// 单链接点击分析
pub async fn get_link_analytics(
    user: AuthenticatedUser,
    path: web::Path<String>,
    service: web::Data<Arc<AnalyticsService>>,
) -> ActixResult<impl Responder> {
    let link_id = path.into_inner();
    Ok(api_result(
        service.link_analytics(&user.user_id, &link_id).await,
    ))
}
