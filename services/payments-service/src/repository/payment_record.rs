// /learnhub-lms/services/payments-service/src/repository/payment_record.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::core::stores::{NewPaymentRecord, PaymentRecordStore};
use crate::models::{PaymentRecord, RecordStatus};
use crate::utils::error::AppResult;

/// Payment record projection di Postgres. At-most-once per transaction_id
/// lewat unique constraint, keputusan admin lewat conditional UPDATE.
pub struct PgPaymentRecordStore {
    pool: PgPool,
}

impl PgPaymentRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentRecordStore for PgPaymentRecordStore {
    async fn record_once(&self, record: NewPaymentRecord) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO payment_records
                (user_id, course_slug, amount, method, status, transaction_id, processed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (transaction_id) DO NOTHING
            "#,
        )
        .bind(record.user_id)
        .bind(&record.course_slug)
        .bind(&record.amount)
        .bind(record.method.as_db_str())
        .bind(record.status.as_db_str())
        .bind(&record.transaction_id)
        .bind(record.processed_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<PaymentRecord>> {
        let record =
            sqlx::query_as::<_, PaymentRecord>("SELECT * FROM payment_records WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(record)
    }

    async fn list(
        &self,
        status: Option<&str>,
        page: u32,
        limit: u32,
    ) -> AppResult<(Vec<PaymentRecord>, i64)> {
        let offset = list_offset(page, limit);

        let (records, total) = match status {
            Some(status) => {
                let records = sqlx::query_as::<_, PaymentRecord>(
                    r#"
                    SELECT * FROM payment_records
                    WHERE status = $1
                    ORDER BY submitted_at DESC
                    LIMIT $2 OFFSET $3
                    "#,
                )
                .bind(status)
                .bind(limit as i64)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?;

                let total: (i64,) =
                    sqlx::query_as("SELECT COUNT(*) FROM payment_records WHERE status = $1")
                        .bind(status)
                        .fetch_one(&self.pool)
                        .await?;

                (records, total.0)
            }
            None => {
                let records = sqlx::query_as::<_, PaymentRecord>(
                    r#"
                    SELECT * FROM payment_records
                    ORDER BY submitted_at DESC
                    LIMIT $1 OFFSET $2
                    "#,
                )
                .bind(limit as i64)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?;

                let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM payment_records")
                    .fetch_one(&self.pool)
                    .await?;

                (records, total.0)
            }
        };

        Ok((records, total))
    }

    async fn finalize(&self, id: Uuid, status: RecordStatus) -> AppResult<bool> {
        // Dua admin yang race: yang kedua dapat 0 rows, bukan double decision
        let result = sqlx::query(
            r#"
            UPDATE payment_records
            SET status = $2, processed_at = NOW()
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(status.as_db_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Hitung di i64: page dari query string bisa sebesar u32::MAX dan
/// perkalian di u32 overflow
fn list_offset(page: u32, limit: u32) -> i64 {
    (i64::from(page) - 1) * i64::from(limit)
}
