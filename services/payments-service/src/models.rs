// /learnhub-lms/services/payments-service/src/models.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use chrono::{DateTime, Utc};
use validator::Validate;
use bigdecimal::BigDecimal;

// ========================= DOMAIN MODELS =========================

/// Ledger entry untuk setiap payment attempt
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PaymentTransaction {
    pub id: Uuid,
    /// Opaque reference, immutable setelah dibuat (mis. `bank_<millis>_<rand>`)
    pub reference: String,
    pub user_id: Option<Uuid>,
    pub course_slug: Option<String>,
    pub course_name: Option<String>,
    /// Pricing snapshot saat inisiasi, tidak pernah dihitung ulang
    pub original_price: BigDecimal,
    pub discount_code: Option<String>,
    pub discount_amount: BigDecimal,
    pub final_price: BigDecimal,
    pub currency: String,
    /// Di-set sekali saat gateway assign payment id
    pub gateway_payment_id: Option<String>,
    pub status: String,
    pub initiated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Enrollment per (user, course), paling banyak satu baris per pasangan
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_slug: String,
    pub course_name: Option<String>,
    pub enrolled_at: DateTime<Utc>,
    pub progress: i32,
    pub completed_lessons: Vec<String>,
    pub paid: bool,
    pub amount: Option<BigDecimal>,
    pub payment_id: Option<String>,
    pub payment_date: Option<DateTime<Utc>>,
    /// Soft-unenroll flag, hanya admin yang set false
    pub is_enrolled: bool,
}

/// Projection untuk admin reporting, derived dari ledger + gateway events.
/// Juga dipakai sebagai daftar manual bank-transfer submissions.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_slug: String,
    pub amount: BigDecimal,
    pub method: String,
    pub status: String,
    pub transaction_id: String,
    pub submitted_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

/// Course catalog entry (read-only di service ini)
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Course {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub price: BigDecimal,
    pub currency: String,
}

/// Promo code, valid kalau belum expired dan used_count < max_uses
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PromoCode {
    pub id: Uuid,
    pub code: String,
    pub discount_percent: i32,
    pub max_uses: i32,
    pub used_count: i32,
    pub expires_at: Option<DateTime<Utc>>,
}

// ========================= REQUEST DTOs =========================

/// Request untuk inisiasi checkout
#[derive(Debug, Deserialize, Validate)]
pub struct CheckoutRequest {
    #[validate(length(min = 1, message = "Course slug diperlukan"))]
    pub course_slug: String,

    #[validate(length(min = 1, message = "Metode pembayaran diperlukan"))]
    pub method: String,

    pub promo_code: Option<String>,
}

/// Query parameters untuk verify endpoint
#[derive(Debug, Default, Deserialize)]
pub struct VerifyQuery {
    pub payment_id: Option<String>,
    #[serde(rename = "ref")]
    pub reference: Option<String>,
    pub user_id: Option<Uuid>,
    pub course_slug: Option<String>,
}

/// Query parameters untuk admin payment list
#[derive(Debug, Deserialize)]
pub struct AdminPaymentsQuery {
    pub status: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Request body untuk approve/reject manual payment
#[derive(Debug, Deserialize, Validate)]
pub struct AdminPaymentDecision {
    #[validate(length(min = 1, message = "Action diperlukan"))]
    pub action: String,

    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

// ========================= RESPONSE DTOs =========================

/// Response untuk checkout initiation
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub success: bool,
    pub message: String,
    pub reference: String,
    pub original_price: BigDecimal,
    pub discount_amount: BigDecimal,
    pub final_price: BigDecimal,
    pub currency: String,
}

/// Response untuk verify endpoint
#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub success: bool,
    pub verified: bool,
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_name: Option<String>,
}

/// Response wrapper untuk admin payment list
#[derive(Debug, Serialize)]
pub struct PaymentsListResponse {
    pub success: bool,
    pub message: String,
    pub data: Vec<PaymentRecord>,
    pub pagination: Option<PaginationMeta>,
}

/// Metadata untuk pagination
#[derive(Debug, Serialize, Clone)]
pub struct PaginationMeta {
    pub current_page: u32,
    pub per_page: u32,
    pub total_items: i64,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_prev: bool,
}

/// Standard error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    pub error_code: Option<String>,
    pub details: Option<serde_json::Value>,
}

// ========================= PAYMENT GATEWAY DTOs =========================

/// Metadata dari gateway - loosely typed, setiap field bisa absen
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayMetadata {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub course_slug: Option<String>,
    #[serde(default)]
    pub course_name: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
}

/// Payment state yang dilaporkan gateway
#[derive(Debug, Clone)]
pub struct GatewayPayment {
    pub payment_id: String,
    pub status: GatewayStatus,
    /// Amount dalam minor units (cents)
    pub total_amount: Option<i64>,
    pub currency: Option<String>,
    pub metadata: GatewayMetadata,
}

/// Raw payment response dari Dodo API
#[derive(Debug, Deserialize)]
pub struct DodoPaymentResponse {
    pub payment_id: Option<String>,
    pub status: String,
    pub total_amount: Option<i64>,
    pub currency: Option<String>,
    #[serde(default)]
    pub metadata: GatewayMetadata,
}

/// Webhook envelope dari gateway
#[derive(Debug, Deserialize)]
pub struct WebhookEnvelope {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookData,
}

/// Payload data dalam webhook event
#[derive(Debug, Deserialize)]
pub struct WebhookData {
    #[serde(default)]
    pub payment_id: Option<String>,
    #[serde(default)]
    pub total_amount: Option<i64>,
    #[serde(default)]
    pub metadata: GatewayMetadata,
}

// ========================= AUTH MODELS =========================

/// JWT claims yang di-issue auth service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    #[serde(default)]
    pub email: Option<String>,
    pub exp: usize,
}

// ========================= ENUMS =========================

/// Status transaksi di ledger, monotonic forward-only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Refunded,
    Cancelled,
}

impl TransactionStatus {
    /// Convert dari string database
    pub fn from_str(status: &str) -> Self {
        match status.to_lowercase().as_str() {
            "pending" => TransactionStatus::Pending,
            "processing" => TransactionStatus::Processing,
            "completed" => TransactionStatus::Completed,
            "refunded" => TransactionStatus::Refunded,
            "cancelled" => TransactionStatus::Cancelled,
            _ => TransactionStatus::Failed,
        }
    }

    /// Convert ke string untuk database
    pub fn as_db_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Processing => "processing",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Refunded => "refunded",
            TransactionStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self, TransactionStatus::Pending | TransactionStatus::Processing)
    }
}

/// Status dari payment gateway, dipetakan ke taxonomy lokal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayStatus {
    Succeeded,
    Processing,
    Pending,
    Failed,
    Cancelled,
    /// Status yang belum dikenal - diperlakukan sebagai belum confirmed,
    /// bukan terminal failure
    Other(String),
}

impl GatewayStatus {
    pub fn from_str(status: &str) -> Self {
        match status.to_lowercase().as_str() {
            "succeeded" | "completed" => GatewayStatus::Succeeded,
            "processing" => GatewayStatus::Processing,
            "pending" | "requires_customer_action" => GatewayStatus::Pending,
            "failed" => GatewayStatus::Failed,
            "cancelled" => GatewayStatus::Cancelled,
            other => GatewayStatus::Other(other.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, GatewayStatus::Succeeded)
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self, GatewayStatus::Pending | GatewayStatus::Processing)
    }
}

/// Metode pembayaran untuk payment record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentMethod {
    Manual,
    Online,
}

impl PaymentMethod {
    pub fn from_str(method: &str) -> Option<Self> {
        match method.to_lowercase().as_str() {
            "manual" | "bank_transfer" => Some(PaymentMethod::Manual),
            "online" => Some(PaymentMethod::Online),
            _ => None,
        }
    }

    pub fn as_db_str(&self) -> &'static str {
        match self {
            PaymentMethod::Manual => "manual",
            PaymentMethod::Online => "online",
        }
    }
}

/// Status payment record untuk admin list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStatus {
    Pending,
    Completed,
    Failed,
    Rejected,
}

impl RecordStatus {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            RecordStatus::Pending => "pending",
            RecordStatus::Completed => "completed",
            RecordStatus::Failed => "failed",
            RecordStatus::Rejected => "rejected",
        }
    }
}

// ========================= HELPER IMPLEMENTATIONS =========================

impl PaginationMeta {
    /// Create pagination metadata dari hasil query
    pub fn new(current_page: u32, per_page: u32, total_items: i64) -> Self {
        let total_pages = ((total_items as f64) / (per_page as f64)).ceil() as u32;

        Self {
            current_page,
            per_page,
            total_items,
            total_pages: if total_pages == 0 { 1 } else { total_pages },
            has_next: current_page < total_pages,
            has_prev: current_page > 1,
        }
    }
}
