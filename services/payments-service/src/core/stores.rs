// /learnhub-lms/services/payments-service/src/core/stores.rs
// Seam antara reconciliation engine dan storage/gateway. Engine hanya tahu
// trait ini; implementasi Postgres ada di repository/, implementasi in-memory
// dipakai di tests.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Course, Enrollment, GatewayPayment, PaymentMethod, PaymentRecord, PaymentTransaction,
    PromoCode, RecordStatus,
};
use crate::utils::error::AppResult;

// ========================= TRANSACTION LEDGER =========================

/// Data untuk ledger entry baru. Pricing snapshot dibekukan di sini dan tidak
/// pernah dihitung ulang oleh reconciliation.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub reference: String,
    pub user_id: Option<Uuid>,
    pub course_slug: Option<String>,
    pub course_name: Option<String>,
    pub original_price: BigDecimal,
    pub discount_code: Option<String>,
    pub discount_amount: BigDecimal,
    pub final_price: BigDecimal,
    pub currency: String,
}

#[async_trait]
pub trait TransactionStore: Send + Sync {
    async fn create(&self, new: NewTransaction) -> AppResult<PaymentTransaction>;

    async fn find_by_reference(&self, reference: &str) -> AppResult<Option<PaymentTransaction>>;

    async fn find_by_gateway_id(
        &self,
        gateway_payment_id: &str,
    ) -> AppResult<Option<PaymentTransaction>>;

    /// Set gateway payment id sekali; no-op kalau sudah ada
    async fn attach_gateway_id(&self, reference: &str, gateway_payment_id: &str) -> AppResult<()>;

    /// Transisi ke `completed` dan set `completed_at`, atomic dan conditional.
    /// Return false kalau transaksi sudah completed (atau tidak ada) - caller
    /// tidak boleh memperlakukan itu sebagai error.
    async fn mark_completed(&self, reference: &str) -> AppResult<bool>;

    /// Transisi ke `failed`, hanya dari pending/processing. Status completed
    /// tidak pernah di-regress.
    async fn mark_failed(&self, reference: &str) -> AppResult<bool>;
}

// ========================= ENROLLMENT STORE =========================

/// Field yang di-set saat paid grant
#[derive(Debug, Clone)]
pub struct PaidGrant {
    pub user_id: Uuid,
    pub course_slug: String,
    pub course_name: Option<String>,
    pub amount: Option<BigDecimal>,
    pub payment_id: String,
}

/// Hasil dari grant_paid - semua variant sukses, tidak ada yang error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantOutcome {
    /// Enrollment sudah paid sebelumnya; no-op (at-most-once guarantee)
    AlreadyPaid,
    /// Enrollment unpaid yang sudah ada di-flip jadi paid
    Upgraded,
    /// Enrollment baru dibuat langsung paid
    Created,
}

#[async_trait]
pub trait EnrollmentStore: Send + Sync {
    async fn find(&self, user_id: Uuid, course_slug: &str) -> AppResult<Option<Enrollment>>;

    /// Idempotent paid grant, atomic pada key (user_id, course_slug).
    /// Aman dipanggil concurrent dari webhook dan poll path.
    async fn grant_paid(&self, grant: PaidGrant) -> AppResult<GrantOutcome>;
}

// ========================= PAYMENT RECORD PROJECTOR =========================

#[derive(Debug, Clone)]
pub struct NewPaymentRecord {
    pub user_id: Uuid,
    pub course_slug: String,
    pub amount: BigDecimal,
    pub method: PaymentMethod,
    pub status: RecordStatus,
    pub transaction_id: String,
    pub processed_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait PaymentRecordStore: Send + Sync {
    /// Insert dengan uniqueness guard pada transaction_id.
    /// Return false kalau record untuk transaction_id itu sudah ada.
    async fn record_once(&self, record: NewPaymentRecord) -> AppResult<bool>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<PaymentRecord>>;

    async fn list(
        &self,
        status: Option<&str>,
        page: u32,
        limit: u32,
    ) -> AppResult<(Vec<PaymentRecord>, i64)>;

    /// Conditional transition dari `pending`; return false kalau record
    /// sudah diputuskan sebelumnya
    async fn finalize(&self, id: Uuid, status: RecordStatus) -> AppResult<bool>;
}

// ========================= PROMO & CATALOG =========================

/// Hasil redeem promo code
#[derive(Debug, Clone)]
pub enum PromoRedemption {
    Applied(PromoCode),
    NotFound,
    Expired,
    Exhausted,
}

#[async_trait]
pub trait PromoStore: Send + Sync {
    /// Atomic redeem: increment used_count hanya kalau belum expired dan
    /// used_count < max_uses
    async fn redeem(&self, code: &str, now: DateTime<Utc>) -> AppResult<PromoRedemption>;
}

#[async_trait]
pub trait CourseCatalog: Send + Sync {
    async fn find_by_slug(&self, slug: &str) -> AppResult<Option<Course>>;
}

// ========================= PAYMENT GATEWAY =========================

/// Error dari gateway adapter. Reconciliation tidak pernah gagal karena ini -
/// dua-duanya di-recover dengan fallback ke ledger.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("payment not found at gateway")]
    NotFound,

    #[error("gateway unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Read-only status query ke gateway
    async fn fetch_payment(&self, payment_id: &str) -> Result<GatewayPayment, GatewayError>;
}
