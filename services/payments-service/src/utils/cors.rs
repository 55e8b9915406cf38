// /learnhub-lms/services/payments-service/src/utils/cors.rs

use tower_http::cors::CorsLayer;
use axum::http::{header, HeaderValue, Method};
use std::env;

/// Setup CORS layer untuk payments service
pub fn create_cors_layer() -> CorsLayer {
    let production = env::var("ENVIRONMENT")
        .map(|e| e.to_lowercase() == "production")
        .unwrap_or(false);

    let layer = CorsLayer::new()
        .allow_origin(parse_allowed_origins(production))
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::ORIGIN,
        ])
        .allow_credentials(true);

    if production {
        layer
            .allow_methods([Method::GET, Method::POST, Method::PUT])
            .max_age(std::time::Duration::from_secs(86400))
    } else {
        layer
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
            .max_age(std::time::Duration::from_secs(3600))
    }
}

/// Parse origins dari environment variable. Production hanya menerima https.
fn parse_allowed_origins(production: bool) -> Vec<HeaderValue> {
    let origins_str = env::var("ALLOWED_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:3000".to_string());

    origins_str
        .split(',')
        .map(str::trim)
        .filter(|origin| !production || origin.starts_with("https://"))
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(header) => Some(header),
            Err(e) => {
                tracing::warn!("Invalid origin format '{}': {}", origin, e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_parse_origins() {
        env::set_var("ALLOWED_ORIGINS", "http://localhost:3000,http://localhost:8080");
        let origins = parse_allowed_origins(false);
        assert_eq!(origins.len(), 2);
        env::remove_var("ALLOWED_ORIGINS");
    }

    #[test]
    #[serial]
    fn test_production_requires_https() {
        env::set_var("ALLOWED_ORIGINS", "http://insecure.test,https://app.learnhub.test");
        let origins = parse_allowed_origins(true);
        assert_eq!(origins.len(), 1);
        env::remove_var("ALLOWED_ORIGINS");
    }
}
