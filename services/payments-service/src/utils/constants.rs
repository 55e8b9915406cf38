// /learnhub-lms/services/payments-service/src/utils/constants.rs

pub mod constants {
    /// Default page size untuk admin listing
    pub const DEFAULT_PAGE_SIZE: u32 = 10;

    /// Maximum page size untuk admin listing
    pub const MAX_PAGE_SIZE: u32 = 100;

    /// Bounded timeout untuk gateway calls. Kalau lewat, reconciliation
    /// jatuh ke status ledger lokal
    pub const GATEWAY_TIMEOUT_SECS: u64 = 8;
}
