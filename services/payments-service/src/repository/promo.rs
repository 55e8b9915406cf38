// /learnhub-lms/services/payments-service/src/repository/promo.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::core::stores::{PromoRedemption, PromoStore};
use crate::models::PromoCode;
use crate::utils::error::AppResult;

/// Promo code store. Redeem = satu conditional UPDATE, jadi dua checkout
/// concurrent tidak pernah dua-duanya dapat slot terakhir.
pub struct PgPromoStore {
    pool: PgPool,
}

impl PgPromoStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PromoStore for PgPromoStore {
    async fn redeem(&self, code: &str, now: DateTime<Utc>) -> AppResult<PromoRedemption> {
        let redeemed = sqlx::query_as::<_, PromoCode>(
            r#"
            UPDATE promo_codes
            SET used_count = used_count + 1
            WHERE code = $1
              AND used_count < max_uses
              AND (expires_at IS NULL OR expires_at > $2)
            RETURNING *
            "#,
        )
        .bind(code)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(promo) = redeemed {
            return Ok(PromoRedemption::Applied(promo));
        }

        // Update tidak kena: cari tahu kenapa supaya pesan error spesifik
        let snapshot =
            sqlx::query_as::<_, PromoCode>("SELECT * FROM promo_codes WHERE code = $1")
                .bind(code)
                .fetch_optional(&self.pool)
                .await?;

        match snapshot {
            None => Ok(PromoRedemption::NotFound),
            Some(promo) if promo.expires_at.map(|e| e <= now).unwrap_or(false) => {
                Ok(PromoRedemption::Expired)
            }
            Some(_) => Ok(PromoRedemption::Exhausted),
        }
    }
}
