// /learnhub-lms/services/payments-service/src/core/reconcile.rs
//
// Reconciliation engine: menyatukan status dari gateway dan ledger lokal jadi
// satu keputusan, lalu apply enrollment/credit mutation exactly once. Webhook
// path dan customer poll path dua-duanya masuk ke sini tanpa koordinasi -
// semua mutation idempotent pada key-nya masing-masing.

use bigdecimal::BigDecimal;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    models::{
        GatewayMetadata, PaymentMethod, PaymentTransaction, RecordStatus, TransactionStatus,
        WebhookEnvelope,
    },
    utils::error::{AppError, AppResult},
};
use super::stores::{
    EnrollmentStore, GatewayError, GrantOutcome, NewPaymentRecord, PaidGrant, PaymentGateway,
    PaymentRecordStore, TransactionStore,
};

// ========================= PUBLIC TYPES =========================

/// Input untuk reconcile - minimal salah satu dari gateway_payment_id /
/// transaction_ref harus ada
#[derive(Debug, Clone, Default)]
pub struct ReconcileRequest {
    pub gateway_payment_id: Option<String>,
    pub transaction_ref: Option<String>,
    pub user_id: Option<Uuid>,
    pub course_slug: Option<String>,
}

/// Unified status hasil reconcile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileStatus {
    Completed,
    Processing,
    Unknown,
}

impl ReconcileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileStatus::Completed => "completed",
            ReconcileStatus::Processing => "processing",
            ReconcileStatus::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    pub success: bool,
    pub verified: bool,
    pub status: ReconcileStatus,
    pub message: String,
    pub course_slug: Option<String>,
    pub course_name: Option<String>,
}

/// Hasil keputusan admin atas manual payment record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManualDecision {
    Approved(GrantOutcome),
    Rejected,
}

// ========================= ENGINE =========================

#[derive(Clone)]
pub struct ReconciliationEngine {
    transactions: Arc<dyn TransactionStore>,
    enrollments: Arc<dyn EnrollmentStore>,
    records: Arc<dyn PaymentRecordStore>,
    gateway: Arc<dyn PaymentGateway>,
}

impl ReconciliationEngine {
    pub fn new(
        transactions: Arc<dyn TransactionStore>,
        enrollments: Arc<dyn EnrollmentStore>,
        records: Arc<dyn PaymentRecordStore>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self { transactions, enrollments, records, gateway }
    }

    /// Reconcile satu payment: baca gateway dan/atau ledger, hitung unified
    /// status, dan kalau confirmed sukses apply grant idempotent.
    pub async fn reconcile(&self, req: ReconcileRequest) -> AppResult<ReconcileOutcome> {
        if req.gateway_payment_id.is_none() && req.transaction_ref.is_none() {
            return Err(AppError::BadRequest(
                "payment_id or ref is required".to_string(),
            ));
        }

        // Gateway read adalah best-effort corroboration, bukan satu-satunya
        // sumber kebenaran; error apapun jatuh ke ledger lokal
        let gateway_payment = match &req.gateway_payment_id {
            Some(payment_id) => match self.gateway.fetch_payment(payment_id).await {
                Ok(payment) => Some(payment),
                Err(GatewayError::NotFound) => {
                    tracing::warn!("Gateway tidak kenal payment {}", payment_id);
                    None
                }
                Err(GatewayError::Unavailable(e)) => {
                    tracing::warn!(
                        "Gateway unavailable untuk {}, fallback ke ledger: {}",
                        payment_id, e
                    );
                    None
                }
            },
            None => None,
        };

        // Ledger lookup: by ref dulu, baru by gateway id
        let mut transaction = match &req.transaction_ref {
            Some(reference) => self.transactions.find_by_reference(reference).await?,
            None => None,
        };
        if transaction.is_none() {
            if let Some(payment_id) = &req.gateway_payment_id {
                transaction = self.transactions.find_by_gateway_id(payment_id).await?;
            }
        }

        // Resolve identity: caller fields > gateway metadata > ledger entry
        let metadata = gateway_payment.as_ref().map(|p| p.metadata.clone()).unwrap_or_default();
        let (user_id, course_slug, course_name) =
            resolve_identity(&req, &metadata, transaction.as_ref());

        // Unified status. Tie-break: status paling maju menang - completed di
        // ledger tidak pernah di-overwrite oleh gateway read yang stale.
        let gateway_success = gateway_payment
            .as_ref()
            .map(|p| p.status.is_success())
            .unwrap_or(false);
        let gateway_in_flight = gateway_payment
            .as_ref()
            .map(|p| p.status.is_in_flight())
            .unwrap_or(false);

        let txn_status = transaction
            .as_ref()
            .map(|t| TransactionStatus::from_str(&t.status));
        let ledger_success = txn_status == Some(TransactionStatus::Completed);
        let ledger_in_flight = txn_status.map(|s| s.is_in_flight()).unwrap_or(false);

        let success = gateway_success || ledger_success;

        if !success {
            if gateway_in_flight || ledger_in_flight {
                // Expected mid-flow; caller boleh re-poll, tidak ada mutation
                return Ok(ReconcileOutcome {
                    success: false,
                    verified: false,
                    status: ReconcileStatus::Processing,
                    message: "Payment is still processing. Please check again shortly."
                        .to_string(),
                    course_slug,
                    course_name,
                });
            }

            return Ok(ReconcileOutcome {
                success: false,
                verified: false,
                status: ReconcileStatus::Unknown,
                message: "Payment could not be confirmed. Please retry, or contact support if you were charged."
                    .to_string(),
                course_slug,
                course_name,
            });
        }

        // Payment confirmed tapi identitas tidak ke-resolve: jangan pernah
        // silently drop - operator harus lihat ini
        let (user_id, course_slug_ok) = match (user_id, course_slug.clone()) {
            (Some(u), Some(s)) => (u, s),
            _ => {
                tracing::error!(
                    "ENROLLMENT INFO MISSING: payment confirmed tapi user/course tidak ke-resolve \
                     (payment_id={:?}, ref={:?}) - perlu manual follow-up",
                    req.gateway_payment_id, req.transaction_ref
                );
                return Ok(ReconcileOutcome {
                    success: true,
                    verified: true,
                    status: ReconcileStatus::Completed,
                    message: "Payment received, but we could not match it to your account. Please contact support."
                        .to_string(),
                    course_slug,
                    course_name,
                });
            }
        };

        // Amount precedence: ledger final_price (price-at-time-of-sale), baru
        // gateway total_amount
        let amount = transaction
            .as_ref()
            .map(|t| t.final_price.clone())
            .or_else(|| {
                gateway_payment
                    .as_ref()
                    .and_then(|p| p.total_amount)
                    .map(cents_to_amount)
            });

        let payment_id = req
            .gateway_payment_id
            .clone()
            .or_else(|| transaction.as_ref().and_then(|t| t.gateway_payment_id.clone()))
            .or_else(|| transaction.as_ref().map(|t| t.reference.clone()))
            .or_else(|| req.transaction_ref.clone())
            .unwrap_or_default();

        let grant = PaidGrant {
            user_id,
            course_slug: course_slug_ok.clone(),
            course_name: course_name.clone(),
            amount: amount.clone(),
            payment_id: payment_id.clone(),
        };

        let outcome = self
            .apply_confirmed(grant, transaction.as_ref(), req.gateway_payment_id.as_deref())
            .await?;

        // Payment record projection: best-effort reporting, gagalnya tidak
        // boleh membatalkan reconciliation
        if let Some(amount) = amount {
            self.project_record(NewPaymentRecord {
                user_id,
                course_slug: course_slug_ok,
                amount,
                method: PaymentMethod::Online,
                status: RecordStatus::Completed,
                transaction_id: record_key(
                    transaction.as_ref(),
                    req.gateway_payment_id.as_deref(),
                ),
                processed_at: Some(chrono::Utc::now()),
            })
            .await;
        }

        let message = match outcome {
            GrantOutcome::AlreadyPaid => "Already enrolled in this course".to_string(),
            _ => "Payment verified and enrollment activated".to_string(),
        };

        Ok(ReconcileOutcome {
            success: true,
            verified: true,
            status: ReconcileStatus::Completed,
            message,
            course_slug,
            course_name,
        })
    }

    /// Webhook ingestion (§gateway push). Event adalah assertion dari gateway
    /// sendiri jadi tidak di-verify ulang, tapi idempotency guard tetap jalan.
    pub async fn handle_event(&self, envelope: &WebhookEnvelope) -> AppResult<()> {
        match envelope.event_type.as_str() {
            "checkout.completed" | "payment.succeeded" => {
                self.handle_payment_succeeded(envelope).await
            }
            "payment.failed" => self.handle_payment_failed(envelope).await,
            other => {
                // Unrecognized event bukan error
                tracing::info!("Webhook event '{}' tidak dikenal, diabaikan", other);
                Ok(())
            }
        }
    }

    async fn handle_payment_succeeded(&self, envelope: &WebhookEnvelope) -> AppResult<()> {
        let data = &envelope.data;

        let Some(payment_id) = data.payment_id.clone() else {
            tracing::warn!(
                "Webhook '{}' tanpa payment_id, tidak bisa dikorelasikan - diabaikan",
                envelope.event_type
            );
            return Ok(());
        };

        let transaction = self.transactions.find_by_gateway_id(&payment_id).await?;

        let req = ReconcileRequest::default();
        let (user_id, course_slug, course_name) =
            resolve_identity(&req, &data.metadata, transaction.as_ref());

        let (Some(user_id), Some(course_slug)) = (user_id, course_slug) else {
            tracing::error!(
                "ENROLLMENT INFO MISSING: webhook {} confirmed payment {} tapi metadata dan \
                 ledger tidak punya user/course - perlu manual follow-up",
                envelope.event_type, payment_id
            );
            return Ok(());
        };

        let amount = transaction
            .as_ref()
            .map(|t| t.final_price.clone())
            .or_else(|| data.total_amount.map(cents_to_amount));

        let grant = PaidGrant {
            user_id,
            course_slug: course_slug.clone(),
            course_name,
            amount: amount.clone(),
            payment_id: payment_id.clone(),
        };

        let outcome = self
            .apply_confirmed(grant, transaction.as_ref(), Some(&payment_id))
            .await?;

        if outcome == GrantOutcome::AlreadyPaid {
            tracing::info!(
                "Webhook untuk payment {} sudah pernah di-reconcile, no-op", payment_id
            );
        }

        if let Some(amount) = amount {
            self.project_record(NewPaymentRecord {
                user_id,
                course_slug,
                amount,
                method: PaymentMethod::Online,
                status: RecordStatus::Completed,
                transaction_id: record_key(transaction.as_ref(), Some(&payment_id)),
                processed_at: Some(chrono::Utc::now()),
            })
            .await;
        }

        Ok(())
    }

    async fn handle_payment_failed(&self, envelope: &WebhookEnvelope) -> AppResult<()> {
        let Some(payment_id) = envelope.data.payment_id.as_deref() else {
            return Ok(());
        };

        if let Some(transaction) = self.transactions.find_by_gateway_id(payment_id).await? {
            // mark_failed hanya transisi dari pending/processing - completed
            // tidak pernah di-regress oleh event yang datang out of order
            let transitioned = self.transactions.mark_failed(&transaction.reference).await?;
            if transitioned {
                tracing::info!(
                    "Transaction {} marked failed (gateway payment {})",
                    transaction.reference, payment_id
                );
            }
        } else {
            tracing::warn!("payment.failed untuk payment {} tanpa ledger entry", payment_id);
        }

        Ok(())
    }

    /// Approve atau reject manual (bank transfer) payment record. Approval
    /// memakai grant path idempotent yang sama dengan verify/webhook.
    pub async fn decide_manual(&self, record_id: Uuid, approve: bool) -> AppResult<ManualDecision> {
        let record = self
            .records
            .find_by_id(record_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Payment record not found".to_string()))?;

        if record.status != RecordStatus::Pending.as_db_str() {
            return Err(AppError::Conflict(
                "Payment record has already been decided".to_string(),
            ));
        }

        if !approve {
            let transitioned = self.records.finalize(record_id, RecordStatus::Rejected).await?;
            if !transitioned {
                return Err(AppError::Conflict(
                    "Payment record has already been decided".to_string(),
                ));
            }
            return Ok(ManualDecision::Rejected);
        }

        let transaction = self
            .transactions
            .find_by_reference(&record.transaction_id)
            .await?;

        // Menangkan CAS pending->completed dulu. Grant baru jalan setelah
        // keputusan ini final - kalau admin lain keburu reject, tidak boleh
        // ada enrollment yang sudah terlanjur dibuat.
        let transitioned = self.records.finalize(record_id, RecordStatus::Completed).await?;
        if !transitioned {
            return Err(AppError::Conflict(
                "Payment record has already been decided".to_string(),
            ));
        }

        // Ledger snapshot menang atas amount yang disubmit
        let amount = transaction
            .as_ref()
            .map(|t| t.final_price.clone())
            .unwrap_or_else(|| record.amount.clone());

        let course_name = transaction.as_ref().and_then(|t| t.course_name.clone());

        let outcome = self
            .apply_confirmed(
                PaidGrant {
                    user_id: record.user_id,
                    course_slug: record.course_slug.clone(),
                    course_name,
                    amount: Some(amount),
                    payment_id: record.transaction_id.clone(),
                },
                transaction.as_ref(),
                None,
            )
            .await?;

        Ok(ManualDecision::Approved(outcome))
    }

    // ========================= INTERNAL =========================

    /// Apply confirmed payment: idempotent enrollment grant + conditional
    /// ledger completion. Dipakai oleh verify, webhook, dan admin approval.
    async fn apply_confirmed(
        &self,
        grant: PaidGrant,
        transaction: Option<&PaymentTransaction>,
        gateway_payment_id: Option<&str>,
    ) -> AppResult<GrantOutcome> {
        let outcome = self.enrollments.grant_paid(grant.clone()).await?;

        match outcome {
            GrantOutcome::AlreadyPaid => {
                tracing::debug!(
                    "Enrollment {}/{} sudah paid, grant no-op",
                    grant.user_id, grant.course_slug
                );
            }
            GrantOutcome::Upgraded => {
                tracing::info!(
                    "Enrollment {}/{} di-upgrade ke paid (payment {})",
                    grant.user_id, grant.course_slug, grant.payment_id
                );
            }
            GrantOutcome::Created => {
                tracing::info!(
                    "Enrollment {}/{} dibuat paid (payment {})",
                    grant.user_id, grant.course_slug, grant.payment_id
                );
            }
        }

        if let Some(transaction) = transaction {
            if TransactionStatus::from_str(&transaction.status) != TransactionStatus::Completed {
                let transitioned = self.transactions.mark_completed(&transaction.reference).await?;
                if transitioned {
                    tracing::info!("Transaction {} completed", transaction.reference);
                }
            }

            // Simpan gateway id di ledger sekali, kalau baru ketahuan sekarang
            if transaction.gateway_payment_id.is_none() {
                if let Some(payment_id) = gateway_payment_id {
                    if let Err(e) = self
                        .transactions
                        .attach_gateway_id(&transaction.reference, payment_id)
                        .await
                    {
                        tracing::warn!(
                            "Gagal attach gateway id ke {}: {}", transaction.reference, e
                        );
                    }
                }
            }
        }

        Ok(outcome)
    }

    /// Best-effort payment record projection
    async fn project_record(&self, record: NewPaymentRecord) {
        let transaction_id = record.transaction_id.clone();
        match self.records.record_once(record).await {
            Ok(true) => {
                tracing::debug!("Payment record dibuat untuk {}", transaction_id);
            }
            Ok(false) => {
                tracing::debug!("Payment record untuk {} sudah ada", transaction_id);
            }
            Err(e) => {
                tracing::warn!("Gagal membuat payment record untuk {}: {}", transaction_id, e);
            }
        }
    }
}

// ========================= HELPERS =========================

/// Identity precedence: caller > gateway metadata > ledger
fn resolve_identity(
    req: &ReconcileRequest,
    metadata: &GatewayMetadata,
    transaction: Option<&PaymentTransaction>,
) -> (Option<Uuid>, Option<String>, Option<String>) {
    let user_id = req
        .user_id
        .or_else(|| {
            metadata
                .user_id
                .as_deref()
                .and_then(|s| Uuid::parse_str(s).ok())
        })
        .or_else(|| transaction.and_then(|t| t.user_id));

    let course_slug = req
        .course_slug
        .clone()
        .or_else(|| metadata.course_slug.clone())
        .or_else(|| transaction.and_then(|t| t.course_slug.clone()));

    let course_name = metadata
        .course_name
        .clone()
        .or_else(|| transaction.and_then(|t| t.course_name.clone()));

    (user_id, course_slug, course_name)
}

/// Gateway melaporkan amount dalam minor units
fn cents_to_amount(cents: i64) -> BigDecimal {
    BigDecimal::from(cents) / BigDecimal::from(100)
}

/// Key uniqueness untuk payment record. Gateway payment id menang kalau ada:
/// webhook bisa datang sebelum ledger entry punya gateway id attached, dan
/// webhook hanya kenal id gateway - kalau poll pakai key lain, satu payment
/// jadi dua record. Reference hanya untuk manual/bank flow tanpa gateway id.
fn record_key(
    transaction: Option<&PaymentTransaction>,
    gateway_payment_id: Option<&str>,
) -> String {
    gateway_payment_id
        .map(str::to_string)
        .or_else(|| transaction.and_then(|t| t.gateway_payment_id.clone()))
        .or_else(|| transaction.map(|t| t.reference.clone()))
        .unwrap_or_default()
}

// ========================= TESTS =========================
