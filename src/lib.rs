//! Quickslug - a URL shortener service
//!
//! Custom or generated slugs, optional link expiry, per-user and per-IP
//! quotas, click analytics and JWT-based accounts.
//!
//! # Architecture
//! - `storage`: SeaORM persistence for links, click events and users
//! - `services`: link, quota, analytics and account logic
//! - `api`: HTTP handlers, middleware and JWT
//! - `config`: TOML + environment configuration
//! - `runtime`: HTTP server startup
//! - `system`: logging and shutdown

pub mod api;
pub mod config;
pub mod errors;
pub mod runtime;
pub mod services;
pub mod storage;
pub mod system;
pub mod utils;
