// /learnhub-lms/services/payments-service/src/utils/banner.rs

/// Print startup banner
pub fn print_startup_banner(bind_address: &str) {
    println!(r#"
╔══════════════════════════════════════════════════════════╗
║                 PAYMENTS SERVICE v1.0.0                   ║
║                     LearnHub LMS                          ║
╚══════════════════════════════════════════════════════════╝
    "#);

    tracing::info!("🚀 Payments Service starting at {}", bind_address);
    tracing::info!("📋 Available endpoints:");
    tracing::info!("  Public:");
    tracing::info!("    GET  /api/payments/verify        - Verify/reconcile payment");
    tracing::info!("    POST /api/payments/webhook       - Gateway webhook");
    tracing::info!("  Protected:");
    tracing::info!("    POST /api/payments/checkout      - Initiate checkout");
    tracing::info!("    GET  /api/enrollments/...        - Enrollment status");
    tracing::info!("  Admin:");
    tracing::info!("    GET  /api/admin/payments         - List payment records");
    tracing::info!("    PUT  /api/admin/payments/:id     - Approve/reject manual payment");
}
