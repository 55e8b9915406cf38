// /learnhub-lms/services/payments-service/src/api/handlers.rs

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::Json,
    Extension,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use std::env;
use uuid::Uuid;
use validator::Validate;

use crate::{
    core::reconcile::{ManualDecision, ReconcileRequest},
    core::stores::{EnrollmentStore, PaymentRecordStore},
    middleware::AuthUser,
    models::{
        AdminPaymentDecision, AdminPaymentsQuery, CheckoutRequest, CheckoutResponse,
        PaginationMeta, PaymentsListResponse, VerifyQuery, VerifyResponse, WebhookEnvelope,
    },
    utils::{
        error::{AppError, AppResult},
        health, validator as validators, DEFAULT_PAGE_SIZE,
    },
    AppState,
};

// ========================= CHECKOUT =========================

/// POST /api/payments/checkout - inisiasi pembelian course
pub async fn initiate_checkout(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CheckoutRequest>,
) -> AppResult<(StatusCode, Json<CheckoutResponse>)> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e.to_string()))?;

    let response = state.checkout.initiate(user.id, payload).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

// ========================= VERIFICATION =========================

/// GET /api/payments/verify - dipanggil payment-success page setelah redirect.
/// Public: saat redirect dari gateway, session belum tentu ada.
pub async fn verify_payment(
    State(state): State<AppState>,
    Query(query): Query<VerifyQuery>,
) -> AppResult<Json<VerifyResponse>> {
    if let Some(payment_id) = &query.payment_id {
        validators::validate_payment_identifier(payment_id, "payment_id")?;
    }
    if let Some(reference) = &query.reference {
        validators::validate_payment_identifier(reference, "ref")?;
    }
    if let Some(course_slug) = &query.course_slug {
        validators::validate_course_slug(course_slug)?;
    }

    let outcome = state
        .engine
        .reconcile(ReconcileRequest {
            gateway_payment_id: query.payment_id,
            transaction_ref: query.reference,
            user_id: query.user_id,
            course_slug: query.course_slug,
        })
        .await?;

    Ok(Json(VerifyResponse {
        success: outcome.success,
        verified: outcome.verified,
        status: outcome.status.as_str().to_string(),
        message: outcome.message,
        course_slug: outcome.course_slug,
        course_name: outcome.course_name,
    }))
}

// ========================= WEBHOOK =========================

/// POST /api/payments/webhook - event push dari Dodo.
/// Response selalu `{"received": true}` supaya gateway tidak retry event yang
/// sudah kita terima; satu-satunya non-2xx adalah payload yang bukan JSON.
pub async fn handle_gateway_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> AppResult<Json<serde_json::Value>> {
    // Signature verification aktif kalau secret dikonfigurasi. Event dengan
    // signature salah dibuang diam-diam - balas sukses supaya attacker tidak
    // dapat sinyal, dan gateway asli tetap punya event log-nya sendiri.
    if let Ok(secret) = env::var("DODO_WEBHOOK_SECRET") {
        if !verify_webhook_signature(&secret, &headers, &body) {
            tracing::warn!("Webhook signature tidak valid, event dibuang");
            return Ok(Json(json!({ "received": true })));
        }
    }

    let envelope: WebhookEnvelope = serde_json::from_str(&body)
        .map_err(|e| AppError::Internal(format!("Malformed webhook payload: {}", e)))?;

    tracing::info!("Webhook diterima: {}", envelope.event_type);
    state
        .repository
        .audit
        .webhook_processed(&envelope.event_type, envelope.data.payment_id.as_deref())
        .await;

    // Processing error tidak bocor ke gateway - retry mereka tidak akan
    // memperbaiki bug kita, dan semua mutation idempotent
    if let Err(e) = state.engine.handle_event(&envelope).await {
        tracing::error!("Webhook {} gagal diproses: {}", envelope.event_type, e);
    }

    Ok(Json(json!({ "received": true })))
}

/// Verifikasi signature standard-webhooks: HMAC-SHA256 atas
/// `{id}.{timestamp}.{body}` dengan key base64 setelah prefix `whsec_`
fn verify_webhook_signature(secret: &str, headers: &HeaderMap, body: &str) -> bool {
    let Some(webhook_id) = header_str(headers, "webhook-id") else { return false };
    let Some(timestamp) = header_str(headers, "webhook-timestamp") else { return false };
    let Some(signature_header) = header_str(headers, "webhook-signature") else { return false };

    let key = match secret.strip_prefix("whsec_") {
        Some(encoded) => match BASE64.decode(encoded) {
            Ok(key) => key,
            Err(_) => return false,
        },
        None => secret.as_bytes().to_vec(),
    };

    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(&key) else { return false };
    mac.update(format!("{}.{}.{}", webhook_id, timestamp, body).as_bytes());
    let expected = BASE64.encode(mac.finalize().into_bytes());

    // Header bisa berisi beberapa signature space-separated, format `v1,<sig>`
    signature_header.split_whitespace().any(|candidate| {
        let sig = candidate.split_once(',').map(|(_, s)| s).unwrap_or(candidate);
        sig == expected
    })
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

// ========================= ENROLLMENT =========================

/// GET /api/enrollments/{user_id}/{course_slug} - cek status enrollment.
/// Owner atau admin saja.
pub async fn enrollment_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path((user_id, course_slug)): Path<(Uuid, String)>,
) -> AppResult<Json<serde_json::Value>> {
    if auth.id != user_id && !auth.is_admin() {
        return Err(AppError::Forbidden(
            "Cannot view another user's enrollment".to_string(),
        ));
    }

    validators::validate_course_slug(&course_slug)?;

    let enrollment = state.repository.enrollments.find(user_id, &course_slug).await?;

    match enrollment {
        Some(enrollment) => Ok(Json(json!({
            "success": true,
            "enrolled": enrollment.is_enrolled,
            "paid": enrollment.paid,
            "data": enrollment,
        }))),
        None => Ok(Json(json!({
            "success": true,
            "enrolled": false,
            "paid": false,
            "data": null,
        }))),
    }
}

// ========================= ADMIN =========================

/// GET /api/admin/payments - list payment records dengan filter dan pagination
pub async fn list_admin_payments(
    State(state): State<AppState>,
    Query(query): Query<AdminPaymentsQuery>,
) -> AppResult<Json<PaymentsListResponse>> {
    let page = query.page.unwrap_or(1);
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    let (page, limit) = validators::validate_pagination(page, limit)?;

    if let Some(status) = &query.status {
        validators::validate_record_status(status)?;
    }

    let (records, total) = state
        .repository
        .records
        .list(query.status.as_deref(), page, limit)
        .await?;

    Ok(Json(PaymentsListResponse {
        success: true,
        message: "Payment records retrieved".to_string(),
        data: records,
        pagination: Some(PaginationMeta::new(page, limit, total)),
    }))
}

/// PUT /api/admin/payments/{id} - approve atau reject manual payment
pub async fn decide_admin_payment(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    Path(record_id): Path<Uuid>,
    Json(payload): Json<AdminPaymentDecision>,
) -> AppResult<Json<serde_json::Value>> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e.to_string()))?;

    let approve = match payload.action.to_lowercase().as_str() {
        "approve" => true,
        "reject" => false,
        other => {
            return Err(AppError::BadRequest(format!(
                "Action '{}' tidak dikenal, harus 'approve' atau 'reject'",
                other
            )));
        }
    };

    let decision = state.engine.decide_manual(record_id, approve).await?;

    state
        .repository
        .audit
        .admin_decision(admin.id, record_id, &payload.action, payload.notes.as_deref())
        .await;

    let message = match decision {
        ManualDecision::Approved(_) => "Payment approved and enrollment activated",
        ManualDecision::Rejected => "Payment rejected",
    };

    Ok(Json(json!({ "success": true, "message": message })))
}

// ========================= HEALTH =========================

/// GET /health/detailed - database ping + status konfigurasi
pub async fn comprehensive_health_check_handler(
    State(state): State<AppState>,
) -> Json<health::HealthReport> {
    Json(health::comprehensive_health_check(&state.repository).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn signed_headers(secret: &str, webhook_id: &str, timestamp: &str, body: &str) -> HeaderMap {
        let key = match secret.strip_prefix("whsec_") {
            Some(encoded) => BASE64.decode(encoded).unwrap(),
            None => secret.as_bytes().to_vec(),
        };
        let mut mac = Hmac::<Sha256>::new_from_slice(&key).unwrap();
        mac.update(format!("{}.{}.{}", webhook_id, timestamp, body).as_bytes());
        let signature = BASE64.encode(mac.finalize().into_bytes());

        let mut headers = HeaderMap::new();
        headers.insert("webhook-id", HeaderValue::from_str(webhook_id).unwrap());
        headers.insert("webhook-timestamp", HeaderValue::from_str(timestamp).unwrap());
        headers.insert(
            "webhook-signature",
            HeaderValue::from_str(&format!("v1,{}", signature)).unwrap(),
        );
        headers
    }

    #[test]
    fn test_webhook_signature_valid() {
        let secret = "whsec_c2VjcmV0LWtleS1mb3ItdGVzdHM=";
        let body = r#"{"type":"payment.succeeded","data":{}}"#;
        let headers = signed_headers(secret, "msg_1", "1700000000", body);
        assert!(verify_webhook_signature(secret, &headers, body));
    }

    #[test]
    fn test_webhook_signature_rejects_tampered_body() {
        let secret = "whsec_c2VjcmV0LWtleS1mb3ItdGVzdHM=";
        let headers =
            signed_headers(secret, "msg_1", "1700000000", r#"{"type":"payment.succeeded"}"#);
        assert!(!verify_webhook_signature(secret, &headers, r#"{"type":"payment.failed"}"#));
    }

    #[test]
    fn test_webhook_signature_requires_headers() {
        let headers = HeaderMap::new();
        assert!(!verify_webhook_signature("whsec_abc", &headers, "{}"));
    }

    #[test]
    fn test_webhook_signature_raw_secret_without_prefix() {
        let secret = "plain-shared-secret";
        let body = "{}";
        let headers = signed_headers(secret, "msg_2", "1700000001", body);
        assert!(verify_webhook_signature(secret, &headers, body));
    }
}
