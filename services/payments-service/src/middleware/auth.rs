// /learnhub-lms/services/payments-service/src/middleware/auth.rs

use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{Json, Response},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use std::env;
use uuid::Uuid;

use crate::models::{Claims, ErrorResponse};

/// Identitas hasil verifikasi token, diambil handler via Extension
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: String,
    pub email: Option<String>,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

/// Verifikasi JWT yang di-issue auth service. Token di-decode lokal dengan
/// shared secret, tidak ada round-trip per request.
pub async fn auth_middleware(
    mut req: Request,
    next: Next,
) -> Result<Response, (StatusCode, Json<ErrorResponse>)> {
    let path = req.uri().path().to_string();

    // Skip auth untuk public endpoints
    if is_public_endpoint(&path) {
        return Ok(next.run(req).await);
    }

    let token = req
        .headers()
        .get("authorization")
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(str::to_string);

    let Some(token) = token else {
        tracing::debug!("Request ke {} ditolak: missing authorization header", path);
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                success: false,
                message: "Authorization header diperlukan".to_string(),
                error_code: Some("MISSING_TOKEN".to_string()),
                details: None,
            }),
        ));
    };

    let secret = env::var("JWT_SECRET").map_err(|_| {
        tracing::error!("JWT_SECRET tidak di-set, semua authenticated request gagal");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                success: false,
                message: "Authentication tidak terkonfigurasi".to_string(),
                error_code: Some("AUTH_MISCONFIGURED".to_string()),
                details: None,
            }),
        )
    })?;

    let claims = decode::<Claims>(
        &token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map_err(|e| {
        tracing::debug!("Token invalid untuk {}: {}", path, e);
        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                success: false,
                message: "Token tidak valid atau expired".to_string(),
                error_code: Some("INVALID_TOKEN".to_string()),
                details: None,
            }),
        )
    })?
    .claims;

    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| {
        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                success: false,
                message: "Format user ID tidak valid".to_string(),
                error_code: Some("INVALID_USER_ID".to_string()),
                details: None,
            }),
        )
    })?;

    let user = AuthUser {
        id: user_id,
        role: claims.role,
        email: claims.email,
    };

    // Admin guard untuk semua path /admin/
    if path.contains("/admin/") && !user.is_admin() {
        tracing::warn!("Non-admin user {} mencoba akses admin: {}", user.id, path);
        return Err((
            StatusCode::FORBIDDEN,
            Json(ErrorResponse {
                success: false,
                message: "Akses admin diperlukan".to_string(),
                error_code: Some("INSUFFICIENT_PRIVILEGES".to_string()),
                details: None,
            }),
        ));
    }

    if path.contains("/admin/") {
        tracing::info!("Admin access: {} by user {}", path, user.id);
    }

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// Endpoint yang tidak perlu auth: health checks, webhook (signature-verified
/// sendiri), dan verify (dipakai payment-success page sebelum session ada)
fn is_public_endpoint(path: &str) -> bool {
    let public_paths = [
        "/health",
        "/api/payments/webhook",
        "/api/payments/verify",
    ];

    public_paths.iter().any(|&public_path| path.starts_with(public_path))
}
