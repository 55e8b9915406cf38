// /learnhub-lms/services/payments-service/src/core/checkout.rs
//
// Checkout initiation: hitung pricing snapshot (catalog price + promo), bekukan
// di ledger entry baru, dan untuk bank transfer buat pending record yang nanti
// diputuskan admin.

use bigdecimal::BigDecimal;
use rand::{distr::Alphanumeric, Rng};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    models::{CheckoutRequest, CheckoutResponse, PaymentMethod, RecordStatus},
    utils::error::{AppError, AppResult},
    utils::validator,
};
use super::stores::{
    CourseCatalog, NewPaymentRecord, NewTransaction, PaymentRecordStore, PromoRedemption,
    PromoStore, TransactionStore,
};

#[derive(Clone)]
pub struct CheckoutService {
    transactions: Arc<dyn TransactionStore>,
    promos: Arc<dyn PromoStore>,
    catalog: Arc<dyn CourseCatalog>,
    records: Arc<dyn PaymentRecordStore>,
}

impl CheckoutService {
    pub fn new(
        transactions: Arc<dyn TransactionStore>,
        promos: Arc<dyn PromoStore>,
        catalog: Arc<dyn CourseCatalog>,
        records: Arc<dyn PaymentRecordStore>,
    ) -> Self {
        Self { transactions, promos, catalog, records }
    }

    /// Inisiasi checkout untuk user yang sudah terautentikasi. Promo redeem
    /// terjadi di sini (initiation time), bukan saat completion.
    pub async fn initiate(
        &self,
        user_id: Uuid,
        request: CheckoutRequest,
    ) -> AppResult<CheckoutResponse> {
        validator::validate_course_slug(&request.course_slug)?;

        let method = PaymentMethod::from_str(&request.method).ok_or_else(|| {
            AppError::BadRequest(format!("Payment method '{}' is not supported", request.method))
        })?;

        let course = self
            .catalog
            .find_by_slug(&request.course_slug)
            .await?
            .ok_or_else(|| AppError::NotFound("Course not found".to_string()))?;

        let original_price = course.price.clone();
        validator::validate_positive_amount(&original_price, "course price")?;

        // Promo invalid = checkout gagal, bukan silently full price
        let (discount_code, discount_amount) = match &request.promo_code {
            Some(code) => {
                validator::validate_promo_code(code)?;
                match self.promos.redeem(code, chrono::Utc::now()).await? {
                    PromoRedemption::Applied(promo) => {
                        let discount = original_price.clone()
                            * BigDecimal::from(promo.discount_percent)
                            / BigDecimal::from(100);
                        (Some(promo.code), discount)
                    }
                    PromoRedemption::NotFound => {
                        return Err(AppError::NotFound("Promo code not found".to_string()));
                    }
                    PromoRedemption::Expired => {
                        return Err(AppError::BadRequest("Promo code has expired".to_string()));
                    }
                    PromoRedemption::Exhausted => {
                        return Err(AppError::BadRequest(
                            "Promo code usage limit reached".to_string(),
                        ));
                    }
                }
            }
            None => (None, BigDecimal::from(0)),
        };

        let final_price = original_price.clone() - discount_amount.clone();
        let reference = generate_reference(method);

        let transaction = self
            .transactions
            .create(NewTransaction {
                reference: reference.clone(),
                user_id: Some(user_id),
                course_slug: Some(course.slug.clone()),
                course_name: Some(course.name.clone()),
                original_price: original_price.clone(),
                discount_code,
                discount_amount: discount_amount.clone(),
                final_price: final_price.clone(),
                currency: course.currency.clone(),
            })
            .await?;

        tracing::info!(
            "Checkout {} dibuat: user={} course={} final={} {}",
            transaction.reference, user_id, course.slug, final_price, course.currency
        );

        // Bank transfer langsung punya pending record supaya muncul di admin
        // queue; online payment record-nya diproyeksikan saat reconcile
        if method == PaymentMethod::Manual {
            self.records
                .record_once(NewPaymentRecord {
                    user_id,
                    course_slug: course.slug.clone(),
                    amount: final_price.clone(),
                    method: PaymentMethod::Manual,
                    status: RecordStatus::Pending,
                    transaction_id: reference.clone(),
                    processed_at: None,
                })
                .await?;
        }

        let message = match method {
            PaymentMethod::Manual => {
                "Checkout initiated. Complete the bank transfer and wait for admin confirmation."
            }
            PaymentMethod::Online => "Checkout initiated",
        };

        Ok(CheckoutResponse {
            success: true,
            message: message.to_string(),
            reference,
            original_price,
            discount_amount,
            final_price,
            currency: course.currency,
        })
    }
}

/// Reference opaque: `<prefix>_<millis>_<rand6>`. Prefix membedakan manual
/// dan online flow di log tanpa perlu lookup.
fn generate_reference(method: PaymentMethod) -> String {
    let prefix = match method {
        PaymentMethod::Manual => "bank",
        PaymentMethod::Online => "online",
    };

    let suffix: String = rand::rng()
        .sample_iter(Alphanumeric)
        .take(6)
        .map(char::from)
        .collect();

    format!(
        "{}_{}_{}",
        prefix,
        chrono::Utc::now().timestamp_millis(),
        suffix.to_lowercase()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testkit::*;
    use std::str::FromStr;

    fn service(fx: &Fixtures) -> CheckoutService {
        CheckoutService::new(
            fx.ledger.clone(),
            fx.promos.clone(),
            fx.catalog.clone(),
            fx.records.clone(),
        )
    }

    fn request(slug: &str, method: &str, promo: Option<&str>) -> CheckoutRequest {
        CheckoutRequest {
            course_slug: slug.to_string(),
            method: method.to_string(),
            promo_code: promo.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_online_checkout_freezes_pricing_snapshot() {
        let fx = Fixtures::new();
        fx.catalog.seed(course("ai-101", "AI 101", "5000")).await;

        let response = service(&fx)
            .initiate(Uuid::new_v4(), request("ai-101", "online", None))
            .await
            .unwrap();

        assert!(response.success);
        assert!(response.reference.starts_with("online_"));
        assert_eq!(response.final_price, BigDecimal::from(5000));
        assert_eq!(response.discount_amount, BigDecimal::from(0));

        let stored = fx.ledger.get(&response.reference).await.unwrap();
        assert_eq!(stored.status, "pending");
        assert_eq!(stored.final_price, BigDecimal::from(5000));
        assert_eq!(stored.course_name.as_deref(), Some("AI 101"));

        // Online: belum ada payment record sampai payment confirmed
        assert!(fx.records.all().await.is_empty());
    }

    #[tokio::test]
    async fn test_promo_discount_applied_at_initiation() {
        let fx = Fixtures::new();
        fx.catalog.seed(course("ai-101", "AI 101", "5000")).await;
        fx.promos.seed(promo("LAUNCH50", 50, 100, 0)).await;

        let response = service(&fx)
            .initiate(Uuid::new_v4(), request("ai-101", "online", Some("LAUNCH50")))
            .await
            .unwrap();

        assert_eq!(response.discount_amount, BigDecimal::from(2500));
        assert_eq!(response.final_price, BigDecimal::from(2500));
        assert_eq!(fx.promos.used_count("LAUNCH50").await, Some(1));

        let stored = fx.ledger.get(&response.reference).await.unwrap();
        assert_eq!(stored.discount_code.as_deref(), Some("LAUNCH50"));
    }

    #[tokio::test]
    async fn test_exhausted_promo_rejected_before_ledger_write() {
        // Promo dengan max_uses=1 yang sudah terpakai
        let fx = Fixtures::new();
        fx.catalog.seed(course("ai-101", "AI 101", "5000")).await;
        fx.promos.seed(promo("ONCE", 100, 1, 1)).await;

        let err = service(&fx)
            .initiate(Uuid::new_v4(), request("ai-101", "online", Some("ONCE")))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::BadRequest(_)));
        // Tidak ada ledger entry yang nyangkut
        assert!(fx.ledger.all().await.is_empty());
        assert_eq!(fx.promos.used_count("ONCE").await, Some(1));
    }

    #[tokio::test]
    async fn test_expired_promo_rejected() {
        let fx = Fixtures::new();
        fx.catalog.seed(course("ai-101", "AI 101", "5000")).await;
        let mut expired = promo("OLD2024", 25, 100, 0);
        expired.expires_at = Some(chrono::Utc::now() - chrono::Duration::days(1));
        fx.promos.seed(expired).await;

        let err = service(&fx)
            .initiate(Uuid::new_v4(), request("ai-101", "online", Some("OLD2024")))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_manual_checkout_creates_pending_admin_record() {
        let fx = Fixtures::new();
        fx.catalog.seed(course("rust-201", "Rust 201", "7500.50")).await;
        let user = Uuid::new_v4();

        let response = service(&fx)
            .initiate(user, request("rust-201", "bank_transfer", None))
            .await
            .unwrap();

        assert!(response.reference.starts_with("bank_"));

        let records = fx.records.all().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, "pending");
        assert_eq!(records[0].method, "manual");
        assert_eq!(records[0].transaction_id, response.reference);
        assert_eq!(records[0].amount, BigDecimal::from_str("7500.50").unwrap());
    }

    #[tokio::test]
    async fn test_unknown_course_is_not_found() {
        let fx = Fixtures::new();
        let err = service(&fx)
            .initiate(Uuid::new_v4(), request("no-such-course", "online", None))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_unsupported_method_rejected() {
        let fx = Fixtures::new();
        fx.catalog.seed(course("ai-101", "AI 101", "5000")).await;
        let err = service(&fx)
            .initiate(Uuid::new_v4(), request("ai-101", "crypto", None))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn test_reference_format() {
        let reference = generate_reference(PaymentMethod::Manual);
        let parts: Vec<&str> = reference.splitn(3, '_').collect();
        assert_eq!(parts[0], "bank");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 6);
    }
}
