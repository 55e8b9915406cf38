// /learnhub-lms/services/payments-service/src/api/routes.rs

use axum::{
    routing::{get, post, put},
    Router,
};

use super::handlers;
use crate::AppState;

/// Create semua routes untuk payments service
pub fn create_routes() -> Router<AppState> {
    Router::new()
        // Checkout initiation (authenticated)
        .route("/api/payments/checkout", post(handlers::initiate_checkout))

        // Payment verification (public, dipanggil payment-success page)
        .route("/api/payments/verify", get(handlers::verify_payment))

        // Webhook endpoint (public, signature-verified)
        .route("/api/payments/webhook", post(handlers::handle_gateway_webhook))

        // Enrollment status (owner atau admin)
        .route(
            "/api/enrollments/{user_id}/{course_slug}",
            get(handlers::enrollment_status),
        )

        // Admin: manual payment queue
        .route("/api/admin/payments", get(handlers::list_admin_payments))
        .route("/api/admin/payments/{id}", put(handlers::decide_admin_payment))

        // Detailed health
        .route("/health/detailed", get(handlers::comprehensive_health_check_handler))
}
