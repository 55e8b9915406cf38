// /learnhub-lms/services/payments-service/src/core/testkit.rs
// In-memory store doubles untuk unit test engine & checkout tanpa Postgres.
// Semua mutation di bawah satu Mutex per store, jadi guarantee atomicity-nya
// setara dengan conditional UPDATE di implementasi Postgres.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::{
    Course, Enrollment, GatewayMetadata, GatewayPayment, GatewayStatus, PaymentRecord,
    PaymentTransaction, PromoCode, RecordStatus, TransactionStatus,
};
use crate::utils::error::AppResult;
use super::stores::*;

use async_trait::async_trait;

// ========================= FIXTURES =========================

/// Satu set store untuk satu test
pub struct Fixtures {
    pub ledger: Arc<MemLedger>,
    pub enrollments: Arc<MemEnrollments>,
    pub records: Arc<MemRecords>,
    pub promos: Arc<MemPromos>,
    pub catalog: Arc<MemCatalog>,
    pub gateway: Arc<StubGateway>,
}

impl Fixtures {
    pub fn new() -> Self {
        Self {
            ledger: Arc::new(MemLedger::default()),
            enrollments: Arc::new(MemEnrollments::default()),
            records: Arc::new(MemRecords::default()),
            promos: Arc::new(MemPromos::default()),
            catalog: Arc::new(MemCatalog::default()),
            gateway: Arc::new(StubGateway::default()),
        }
    }
}

// ========================= TRANSACTION LEDGER =========================

#[derive(Default)]
pub struct MemLedger {
    rows: Mutex<Vec<PaymentTransaction>>,
}

impl MemLedger {
    pub async fn seed(&self, transaction: PaymentTransaction) {
        self.rows.lock().await.push(transaction);
    }

    pub async fn get(&self, reference: &str) -> Option<PaymentTransaction> {
        self.rows
            .lock()
            .await
            .iter()
            .find(|t| t.reference == reference)
            .cloned()
    }

    pub async fn all(&self) -> Vec<PaymentTransaction> {
        self.rows.lock().await.clone()
    }
}

#[async_trait]
impl TransactionStore for MemLedger {
    async fn create(&self, new: NewTransaction) -> AppResult<PaymentTransaction> {
        let transaction = PaymentTransaction {
            id: Uuid::new_v4(),
            reference: new.reference,
            user_id: new.user_id,
            course_slug: new.course_slug,
            course_name: new.course_name,
            original_price: new.original_price,
            discount_code: new.discount_code,
            discount_amount: new.discount_amount,
            final_price: new.final_price,
            currency: new.currency,
            gateway_payment_id: None,
            status: TransactionStatus::Pending.as_db_str().to_string(),
            initiated_at: Utc::now(),
            completed_at: None,
        };
        self.rows.lock().await.push(transaction.clone());
        Ok(transaction)
    }

    async fn find_by_reference(&self, reference: &str) -> AppResult<Option<PaymentTransaction>> {
        Ok(self.get(reference).await)
    }

    async fn find_by_gateway_id(
        &self,
        gateway_payment_id: &str,
    ) -> AppResult<Option<PaymentTransaction>> {
        Ok(self
            .rows
            .lock()
            .await
            .iter()
            .find(|t| t.gateway_payment_id.as_deref() == Some(gateway_payment_id))
            .cloned())
    }

    async fn attach_gateway_id(&self, reference: &str, gateway_payment_id: &str) -> AppResult<()> {
        let mut rows = self.rows.lock().await;
        if let Some(row) = rows.iter_mut().find(|t| t.reference == reference) {
            if row.gateway_payment_id.is_none() {
                row.gateway_payment_id = Some(gateway_payment_id.to_string());
            }
        }
        Ok(())
    }

    async fn mark_completed(&self, reference: &str) -> AppResult<bool> {
        let mut rows = self.rows.lock().await;
        match rows.iter_mut().find(|t| t.reference == reference) {
            Some(row) if row.status != "completed" => {
                row.status = "completed".to_string();
                row.completed_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_failed(&self, reference: &str) -> AppResult<bool> {
        let mut rows = self.rows.lock().await;
        match rows.iter_mut().find(|t| t.reference == reference) {
            Some(row)
                if TransactionStatus::from_str(&row.status).is_in_flight() =>
            {
                row.status = "failed".to_string();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

// ========================= ENROLLMENTS =========================

#[derive(Default)]
pub struct MemEnrollments {
    rows: Mutex<Vec<Enrollment>>,
}

impl MemEnrollments {
    pub async fn seed(&self, enrollment: Enrollment) {
        self.rows.lock().await.push(enrollment);
    }

    pub async fn all(&self) -> Vec<Enrollment> {
        self.rows.lock().await.clone()
    }
}

#[async_trait]
impl EnrollmentStore for MemEnrollments {
    async fn find(&self, user_id: Uuid, course_slug: &str) -> AppResult<Option<Enrollment>> {
        Ok(self
            .rows
            .lock()
            .await
            .iter()
            .find(|e| e.user_id == user_id && e.course_slug == course_slug)
            .cloned())
    }

    async fn grant_paid(&self, grant: PaidGrant) -> AppResult<GrantOutcome> {
        let mut rows = self.rows.lock().await;

        if let Some(row) = rows
            .iter_mut()
            .find(|e| e.user_id == grant.user_id && e.course_slug == grant.course_slug)
        {
            if row.paid {
                return Ok(GrantOutcome::AlreadyPaid);
            }
            row.paid = true;
            row.amount = grant.amount;
            row.payment_id = Some(grant.payment_id);
            row.payment_date = Some(Utc::now());
            if row.course_name.is_none() {
                row.course_name = grant.course_name;
            }
            return Ok(GrantOutcome::Upgraded);
        }

        rows.push(Enrollment {
            id: Uuid::new_v4(),
            user_id: grant.user_id,
            course_slug: grant.course_slug,
            course_name: grant.course_name,
            enrolled_at: Utc::now(),
            progress: 0,
            completed_lessons: vec![],
            paid: true,
            amount: grant.amount,
            payment_id: Some(grant.payment_id),
            payment_date: Some(Utc::now()),
            is_enrolled: true,
        });
        Ok(GrantOutcome::Created)
    }
}

// ========================= PAYMENT RECORDS =========================

#[derive(Default)]
pub struct MemRecords {
    rows: Mutex<Vec<PaymentRecord>>,
}

impl MemRecords {
    pub async fn all(&self) -> Vec<PaymentRecord> {
        self.rows.lock().await.clone()
    }

    /// Seed pending manual record, return id-nya
    pub async fn seed_pending_manual(
        &self,
        user_id: Uuid,
        course_slug: &str,
        amount: &str,
        transaction_id: &str,
    ) -> Uuid {
        let id = Uuid::new_v4();
        self.rows.lock().await.push(PaymentRecord {
            id,
            user_id,
            course_slug: course_slug.to_string(),
            amount: BigDecimal::from_str(amount).unwrap(),
            method: "manual".to_string(),
            status: "pending".to_string(),
            transaction_id: transaction_id.to_string(),
            submitted_at: Utc::now(),
            processed_at: None,
        });
        id
    }
}

#[async_trait]
impl PaymentRecordStore for MemRecords {
    async fn record_once(&self, record: NewPaymentRecord) -> AppResult<bool> {
        let mut rows = self.rows.lock().await;
        if rows.iter().any(|r| r.transaction_id == record.transaction_id) {
            return Ok(false);
        }
        rows.push(PaymentRecord {
            id: Uuid::new_v4(),
            user_id: record.user_id,
            course_slug: record.course_slug,
            amount: record.amount,
            method: record.method.as_db_str().to_string(),
            status: record.status.as_db_str().to_string(),
            transaction_id: record.transaction_id,
            submitted_at: Utc::now(),
            processed_at: record.processed_at,
        });
        Ok(true)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<PaymentRecord>> {
        Ok(self.rows.lock().await.iter().find(|r| r.id == id).cloned())
    }

    async fn list(
        &self,
        status: Option<&str>,
        page: u32,
        limit: u32,
    ) -> AppResult<(Vec<PaymentRecord>, i64)> {
        let rows = self.rows.lock().await;
        let filtered: Vec<PaymentRecord> = rows
            .iter()
            .filter(|r| status.map(|s| r.status == s).unwrap_or(true))
            .cloned()
            .collect();
        let total = filtered.len() as i64;
        let offset = (page.max(1) as usize - 1).saturating_mul(limit as usize);
        let items = filtered.into_iter().skip(offset).take(limit as usize).collect();
        Ok((items, total))
    }

    async fn finalize(&self, id: Uuid, status: RecordStatus) -> AppResult<bool> {
        let mut rows = self.rows.lock().await;
        match rows.iter_mut().find(|r| r.id == id) {
            Some(row) if row.status == "pending" => {
                row.status = status.as_db_str().to_string();
                row.processed_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

// ========================= PROMOS & CATALOG =========================

#[derive(Default)]
pub struct MemPromos {
    rows: Mutex<Vec<PromoCode>>,
}

impl MemPromos {
    pub async fn seed(&self, promo: PromoCode) {
        self.rows.lock().await.push(promo);
    }

    pub async fn used_count(&self, code: &str) -> Option<i32> {
        self.rows
            .lock()
            .await
            .iter()
            .find(|p| p.code == code)
            .map(|p| p.used_count)
    }
}

#[async_trait]
impl PromoStore for MemPromos {
    async fn redeem(&self, code: &str, now: DateTime<Utc>) -> AppResult<PromoRedemption> {
        let mut rows = self.rows.lock().await;
        let Some(row) = rows.iter_mut().find(|p| p.code == code) else {
            return Ok(PromoRedemption::NotFound);
        };
        if row.expires_at.map(|e| e < now).unwrap_or(false) {
            return Ok(PromoRedemption::Expired);
        }
        if row.used_count >= row.max_uses {
            return Ok(PromoRedemption::Exhausted);
        }
        row.used_count += 1;
        Ok(PromoRedemption::Applied(row.clone()))
    }
}

#[derive(Default)]
pub struct MemCatalog {
    rows: Mutex<Vec<Course>>,
}

impl MemCatalog {
    pub async fn seed(&self, course: Course) {
        self.rows.lock().await.push(course);
    }
}

#[async_trait]
impl CourseCatalog for MemCatalog {
    async fn find_by_slug(&self, slug: &str) -> AppResult<Option<Course>> {
        Ok(self.rows.lock().await.iter().find(|c| c.slug == slug).cloned())
    }
}

// ========================= GATEWAY STUB =========================

#[derive(Default)]
pub struct StubGateway {
    payments: Mutex<HashMap<String, GatewayPayment>>,
    unavailable: AtomicBool,
}

impl StubGateway {
    pub async fn insert(&self, payment: GatewayPayment) {
        self.payments
            .lock()
            .await
            .insert(payment.payment_id.clone(), payment);
    }

    pub fn set_unavailable(&self, down: bool) {
        self.unavailable.store(down, Ordering::SeqCst);
    }
}

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn fetch_payment(&self, payment_id: &str) -> Result<GatewayPayment, GatewayError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(GatewayError::Unavailable("stub outage".to_string()));
        }
        self.payments
            .lock()
            .await
            .get(payment_id)
            .cloned()
            .ok_or(GatewayError::NotFound)
    }
}

// ========================= BUILDERS =========================

pub fn meta(
    user_id: Option<Uuid>,
    course_slug: Option<&str>,
    course_name: Option<&str>,
) -> GatewayMetadata {
    GatewayMetadata {
        user_id: user_id.map(|u| u.to_string()),
        course_slug: course_slug.map(str::to_string),
        course_name: course_name.map(str::to_string),
        amount: None,
    }
}

pub fn gateway_payment(
    payment_id: &str,
    status: GatewayStatus,
    total_amount: Option<i64>,
    metadata: GatewayMetadata,
) -> GatewayPayment {
    GatewayPayment {
        payment_id: payment_id.to_string(),
        status,
        total_amount,
        currency: Some("USD".to_string()),
        metadata,
    }
}

fn transaction(
    reference: &str,
    user_id: Uuid,
    course_slug: &str,
    final_price: &str,
    status: &str,
) -> PaymentTransaction {
    let price = BigDecimal::from_str(final_price).unwrap();
    PaymentTransaction {
        id: Uuid::new_v4(),
        reference: reference.to_string(),
        user_id: Some(user_id),
        course_slug: Some(course_slug.to_string()),
        course_name: None,
        original_price: price.clone(),
        discount_code: None,
        discount_amount: BigDecimal::from(0),
        final_price: price,
        currency: "USD".to_string(),
        gateway_payment_id: None,
        status: status.to_string(),
        initiated_at: Utc::now(),
        completed_at: None,
    }
}

pub fn pending_transaction(
    reference: &str,
    user_id: Uuid,
    course_slug: &str,
    final_price: &str,
) -> PaymentTransaction {
    transaction(reference, user_id, course_slug, final_price, "pending")
}

pub fn completed_transaction(
    reference: &str,
    user_id: Uuid,
    course_slug: &str,
    final_price: &str,
) -> PaymentTransaction {
    let mut txn = transaction(reference, user_id, course_slug, final_price, "completed");
    txn.completed_at = Some(Utc::now());
    txn
}

pub fn unpaid_enrollment(user_id: Uuid, course_slug: &str) -> Enrollment {
    Enrollment {
        id: Uuid::new_v4(),
        user_id,
        course_slug: course_slug.to_string(),
        course_name: None,
        enrolled_at: Utc::now(),
        progress: 0,
        completed_lessons: vec![],
        paid: false,
        amount: None,
        payment_id: None,
        payment_date: None,
        is_enrolled: true,
    }
}

pub fn course(slug: &str, name: &str, price: &str) -> Course {
    Course {
        id: Uuid::new_v4(),
        slug: slug.to_string(),
        name: name.to_string(),
        price: BigDecimal::from_str(price).unwrap(),
        currency: "USD".to_string(),
    }
}

pub fn promo(code: &str, discount_percent: i32, max_uses: i32, used_count: i32) -> PromoCode {
    PromoCode {
        id: Uuid::new_v4(),
        code: code.to_string(),
        discount_percent,
        max_uses,
        used_count,
        expires_at: None,
    }
}
