// /learnhub-lms/services/payments-service/src/repository/enrollment.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::core::stores::{EnrollmentStore, GrantOutcome, PaidGrant};
use crate::models::Enrollment;
use crate::utils::error::AppResult;

/// Enrollment store di Postgres. Uniqueness (user_id, course_slug) ditegakkan
/// oleh constraint; grant memanfaatkan itu untuk idempotency tanpa lock.
pub struct PgEnrollmentStore {
    pool: PgPool,
}

impl PgEnrollmentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EnrollmentStore for PgEnrollmentStore {
    async fn find(&self, user_id: Uuid, course_slug: &str) -> AppResult<Option<Enrollment>> {
        let enrollment = sqlx::query_as::<_, Enrollment>(
            "SELECT * FROM enrollments WHERE user_id = $1 AND course_slug = $2",
        )
        .bind(user_id)
        .bind(course_slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(enrollment)
    }

    async fn grant_paid(&self, grant: PaidGrant) -> AppResult<GrantOutcome> {
        // Jalur cepat: row belum ada sama sekali. ON CONFLICT DO NOTHING
        // menyerap race dengan grant concurrent untuk pasangan yang sama.
        let inserted = sqlx::query(
            r#"
            INSERT INTO enrollments
                (user_id, course_slug, course_name, paid, amount, payment_id, payment_date)
            VALUES ($1, $2, $3, TRUE, $4, $5, NOW())
            ON CONFLICT (user_id, course_slug) DO NOTHING
            "#,
        )
        .bind(grant.user_id)
        .bind(&grant.course_slug)
        .bind(&grant.course_name)
        .bind(&grant.amount)
        .bind(&grant.payment_id)
        .execute(&self.pool)
        .await?;

        if inserted.rows_affected() > 0 {
            return Ok(GrantOutcome::Created);
        }

        // Row sudah ada: upgrade hanya kalau masih unpaid. Kalau 0 row kena,
        // berarti sudah paid - payment fields yang ada tidak disentuh.
        let upgraded = sqlx::query(
            r#"
            UPDATE enrollments
            SET paid = TRUE,
                amount = $3,
                payment_id = $4,
                payment_date = NOW(),
                course_name = COALESCE(course_name, $5)
            WHERE user_id = $1 AND course_slug = $2 AND paid = FALSE
            "#,
        )
        .bind(grant.user_id)
        .bind(&grant.course_slug)
        .bind(&grant.amount)
        .bind(&grant.payment_id)
        .bind(&grant.course_name)
        .execute(&self.pool)
        .await?;

        if upgraded.rows_affected() > 0 {
            Ok(GrantOutcome::Upgraded)
        } else {
            Ok(GrantOutcome::AlreadyPaid)
        }
    }
}
