// /learnhub-lms/services/payments-service/src/utils/health.rs

use serde::Serialize;
use crate::repository::Repository;

/// Hasil comprehensive health check
#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub database_connected: bool,
    pub gateway_configured: bool,
    pub webhook_signature_enabled: bool,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub version: &'static str,
}

/// Comprehensive health check: database ping plus konfigurasi gateway.
/// Gateway sendiri tidak di-ping - verify path punya fallback ke ledger.
pub async fn comprehensive_health_check(repository: &Repository) -> HealthReport {
    let database_connected = sqlx::query("SELECT 1")
        .fetch_one(repository.get_pool())
        .await
        .is_ok();

    let gateway_configured = std::env::var("DODO_API_KEY").is_ok();
    let webhook_signature_enabled = std::env::var("DODO_WEBHOOK_SECRET").is_ok();

    HealthReport {
        status: if database_connected { "healthy" } else { "degraded" },
        database_connected,
        gateway_configured,
        webhook_signature_enabled,
        timestamp: chrono::Utc::now(),
        version: env!("CARGO_PKG_VERSION"),
    }
}
