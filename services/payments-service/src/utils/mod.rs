// /learnhub-lms/services/payments-service/src/utils/mod.rs
pub mod error;
pub mod validator;
pub mod constants;
pub mod logger;
pub mod cors;
pub mod banner;
pub mod health;

pub use constants::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
