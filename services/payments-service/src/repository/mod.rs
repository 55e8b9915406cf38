// /learnhub-lms/services/payments-service/src/repository/mod.rs
pub mod audit;
pub mod course;
pub mod enrollment;
pub mod payment_record;
pub mod promo;
pub mod transaction;

use sqlx::PgPool;
use std::sync::Arc;

pub use audit::AuditRepository;
pub use course::PgCourseCatalog;
pub use enrollment::PgEnrollmentStore;
pub use payment_record::PgPaymentRecordStore;
pub use promo::PgPromoStore;
pub use transaction::PgTransactionStore;

/// Aggregate semua store di atas satu pool
pub struct Repository {
    pool: PgPool,
    pub transactions: Arc<PgTransactionStore>,
    pub enrollments: Arc<PgEnrollmentStore>,
    pub records: Arc<PgPaymentRecordStore>,
    pub promos: Arc<PgPromoStore>,
    pub courses: Arc<PgCourseCatalog>,
    pub audit: AuditRepository,
}

impl Repository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            transactions: Arc::new(PgTransactionStore::new(pool.clone())),
            enrollments: Arc::new(PgEnrollmentStore::new(pool.clone())),
            records: Arc::new(PgPaymentRecordStore::new(pool.clone())),
            promos: Arc::new(PgPromoStore::new(pool.clone())),
            courses: Arc::new(PgCourseCatalog::new(pool.clone())),
            audit: AuditRepository::new(pool.clone()),
            pool,
        }
    }

    pub fn get_pool(&self) -> &PgPool {
        &self.pool
    }
}
