//! Service layer for business logic
//!
//! HTTP handlers stay thin and delegate to these services, which own the
//! validation, quota and ownership rules.

mod analytics_service;
mod link_service;
mod quota;
mod user_service;

pub use analytics_service::*;
pub use link_service::*;
pub use quota::*;
pub use user_service::*;
