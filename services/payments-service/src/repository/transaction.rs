// /learnhub-lms/services/payments-service/src/repository/transaction.rs

use async_trait::async_trait;
use sqlx::PgPool;

use crate::core::stores::{NewTransaction, TransactionStore};
use crate::models::PaymentTransaction;
use crate::utils::error::AppResult;

/// Ledger payment_transactions di Postgres. Semua transisi status lewat
/// conditional UPDATE supaya aman dipanggil concurrent.
pub struct PgTransactionStore {
    pool: PgPool,
}

impl PgTransactionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionStore for PgTransactionStore {
    async fn create(&self, new: NewTransaction) -> AppResult<PaymentTransaction> {
        let transaction = sqlx::query_as::<_, PaymentTransaction>(
            r#"
            INSERT INTO payment_transactions
                (reference, user_id, course_slug, course_name, original_price,
                 discount_code, discount_amount, final_price, currency, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'pending')
            RETURNING *
            "#,
        )
        .bind(&new.reference)
        .bind(new.user_id)
        .bind(&new.course_slug)
        .bind(&new.course_name)
        .bind(&new.original_price)
        .bind(&new.discount_code)
        .bind(&new.discount_amount)
        .bind(&new.final_price)
        .bind(&new.currency)
        .fetch_one(&self.pool)
        .await?;

        Ok(transaction)
    }

    async fn find_by_reference(&self, reference: &str) -> AppResult<Option<PaymentTransaction>> {
        let transaction = sqlx::query_as::<_, PaymentTransaction>(
            "SELECT * FROM payment_transactions WHERE reference = $1",
        )
        .bind(reference)
        .fetch_optional(&self.pool)
        .await?;

        Ok(transaction)
    }

    async fn find_by_gateway_id(
        &self,
        gateway_payment_id: &str,
    ) -> AppResult<Option<PaymentTransaction>> {
        let transaction = sqlx::query_as::<_, PaymentTransaction>(
            "SELECT * FROM payment_transactions WHERE gateway_payment_id = $1",
        )
        .bind(gateway_payment_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(transaction)
    }

    async fn attach_gateway_id(&self, reference: &str, gateway_payment_id: &str) -> AppResult<()> {
        // Write-once: id yang sudah ada tidak pernah di-overwrite
        sqlx::query(
            r#"
            UPDATE payment_transactions
            SET gateway_payment_id = $2
            WHERE reference = $1 AND gateway_payment_id IS NULL
            "#,
        )
        .bind(reference)
        .bind(gateway_payment_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn mark_completed(&self, reference: &str) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE payment_transactions
            SET status = 'completed', completed_at = NOW()
            WHERE reference = $1 AND status <> 'completed'
            "#,
        )
        .bind(reference)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_failed(&self, reference: &str) -> AppResult<bool> {
        // Hanya dari in-flight; completed/refunded tidak pernah turun
        let result = sqlx::query(
            r#"
            UPDATE payment_transactions
            SET status = 'failed'
            WHERE reference = $1 AND status IN ('pending', 'processing')
            "#,
        )
        .bind(reference)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
