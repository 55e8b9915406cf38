// /learnhub-lms/services/payments-service/src/core/mod.rs
pub mod checkout;
pub mod gateway;
pub mod reconcile;
pub mod stores;

#[cfg(test)]
pub mod testkit;

pub use checkout::CheckoutService;
pub use gateway::DodoClient;
pub use reconcile::{ReconcileRequest, ReconciliationEngine};
