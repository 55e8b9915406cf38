// /learnhub-lms/services/payments-service/src/middleware/mod.rs
pub mod auth;
pub mod rate_limit;
pub mod security;

pub use auth::{auth_middleware, AuthUser};
pub use rate_limit::{rate_limit_middleware, RateLimiter};
pub use security::security_headers_middleware;
