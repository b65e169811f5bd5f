//! API 常量

/// API 路由前缀
pub const API_PREFIX: &str = "/api/v1";

/// Refresh cookie 只在认证路由下发送
pub const AUTH_COOKIE_PATH: &str = "/api/v1/auth";

pub const TOKEN_TYPE_ACCESS: &str = "access";
pub const TOKEN_TYPE_REFRESH: &str = "refresh";

/// 请求 ID 响应头
pub const REQUEST_ID_HEADER: &str = "x-request-id";
