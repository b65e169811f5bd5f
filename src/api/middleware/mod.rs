pub mod auth;
pub mod request_id;

pub use auth::{AuthMethod, AuthenticatedUser, JwtAuth};
pub use request_id::{RequestId, RequestIdMiddleware};
