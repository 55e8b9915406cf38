// /learnhub-lms/services/payments-service/src/core/gateway.rs

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::env;
use std::time::Duration;

use crate::{
    models::{DodoPaymentResponse, GatewayPayment, GatewayStatus},
    utils::constants::constants::GATEWAY_TIMEOUT_SECS,
    utils::error::{AppError, AppResult},
};
use super::stores::{GatewayError, PaymentGateway};

/// Read adapter untuk Dodo Payments. Satu-satunya operasi adalah status query;
/// adapter ini tidak pernah mutate state di gateway.
pub struct DodoClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl DodoClient {
    /// Initialize client dari environment
    pub fn new() -> AppResult<Self> {
        let api_key = env::var("DODO_API_KEY")
            .map_err(|_| AppError::Configuration("DODO_API_KEY not set".to_string()))?;

        let environment = env::var("DODO_ENVIRONMENT")
            .unwrap_or_else(|_| "test_mode".to_string());

        let base_url = if environment == "live_mode" {
            "https://live.dodopayments.com".to_string()
        } else {
            "https://test.dodopayments.com".to_string()
        };

        Self::from_parts(api_key, base_url)
    }

    /// Construct dengan base URL eksplisit (dipakai di tests)
    pub fn from_parts(api_key: String, base_url: String) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(GATEWAY_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, api_key, base_url })
    }
}

#[async_trait]
impl PaymentGateway for DodoClient {
    async fn fetch_payment(&self, payment_id: &str) -> Result<GatewayPayment, GatewayError> {
        let response = self.client
            .get(format!("{}/payments/{}", self.base_url, payment_id))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(GatewayError::NotFound);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_else(|_| "<no body>".to_string());
            return Err(GatewayError::Unavailable(format!(
                "gateway returned {}: {}", status, body
            )));
        }

        let payment: DodoPaymentResponse = response.json().await
            .map_err(|e| GatewayError::Unavailable(format!("invalid gateway response: {}", e)))?;

        Ok(GatewayPayment {
            payment_id: payment.payment_id.unwrap_or_else(|| payment_id.to_string()),
            status: GatewayStatus::from_str(&payment.status),
            total_amount: payment.total_amount,
            currency: payment.currency,
            metadata: payment.metadata,
        })
    }
}
