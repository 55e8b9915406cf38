// /learnhub-lms/services/payments-service/src/repository/audit.rs

use sqlx::PgPool;
use uuid::Uuid;

/// Audit trail untuk event penting. Best-effort: gagal tulis audit tidak
/// boleh menggagalkan operasi utamanya.
pub struct AuditRepository {
    pool: PgPool,
}

impl AuditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn record(
        &self,
        action: &str,
        entity_id: &str,
        actor: Option<Uuid>,
        details: serde_json::Value,
    ) {
        let result = sqlx::query(
            r#"
            INSERT INTO audit_logs (action, entity_id, actor, details)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(action)
        .bind(entity_id)
        .bind(actor)
        .bind(details)
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            tracing::warn!("Gagal menulis audit log '{}' untuk {}: {}", action, entity_id, e);
        }
    }

    pub async fn webhook_processed(&self, event_type: &str, payment_id: Option<&str>) {
        self.record(
            "webhook_processed",
            payment_id.unwrap_or("unknown"),
            None,
            serde_json::json!({ "event_type": event_type }),
        )
        .await;
    }

    pub async fn admin_decision(
        &self,
        admin_id: Uuid,
        record_id: Uuid,
        action: &str,
        notes: Option<&str>,
    ) {
        self.record(
            "manual_payment_decision",
            &record_id.to_string(),
            Some(admin_id),
            serde_json::json!({ "decision": action, "notes": notes }),
        )
        .await;
    }
}
