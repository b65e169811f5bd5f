//! 持久化层
//!
//! 唯一的后端是基于 SeaORM 的 `SeaOrmStorage`，支持 SQLite、MySQL 和 PostgreSQL。

pub mod backend;
pub mod models;

pub use backend::{InsertOutcome, OwnerQuota, SeaOrmStorage, infer_backend_from_url};
pub use models::{ClickEvent, Link, LinkChanges, Plan, User};
