//! Payment processor client.
//!
//! The engine only needs a hold/capture/refund/void contract: money is
//! authorized when a booking is requested, captured on approval, and
//! released when a request is rejected or cancelled.

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::{config::PaymentConfig, models::enums::Currency};

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("declined by processor: {0}")]
    Declined(String),

    #[error("processor unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected processor response: {0}")]
    Unexpected(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Place a hold for `amount`; returns the processor's hold id
    async fn authorize(&self, amount: Decimal, currency: Currency) -> Result<String, PaymentError>;

    async fn capture(&self, hold_id: &str) -> Result<(), PaymentError>;

    /// Return captured funds to the guest
    async fn refund(&self, hold_id: &str) -> Result<(), PaymentError>;

    /// Release a hold that was never captured
    async fn void(&self, hold_id: &str) -> Result<(), PaymentError>;
}

/// Request to place a hold
#[derive(Debug, Serialize)]
pub struct HoldRequest {
    /// Amount in the currency's smallest unit
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, Deserialize)]
pub struct HoldResponse {
    pub id: String,
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct ProcessorError {
    pub code: String,
    pub description: String,
}

/// REST client for the payment processor
#[derive(Clone)]
pub struct HttpPaymentProcessor {
    client: Client,
    config: PaymentConfig,
}

impl HttpPaymentProcessor {
    pub fn new(config: PaymentConfig) -> Result<Self, PaymentError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self { client, config })
    }

    /// Check if the processor is configured (credentials are set)
    pub fn is_configured(&self) -> bool {
        !self.config.api_key.is_empty()
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn post_action(&self, hold_id: &str, action: &str) -> Result<(), PaymentError> {
        let response = self
            .client
            .post(self.url(&format!("holds/{}/{}", hold_id, action)))
            .bearer_auth(&self.config.api_key)
            .send()
            .await?;
        check_status(response).await.map(|_| ())
    }
}

/// Smallest-unit integer amount, e.g. 275.50 EUR -> 27550
pub fn to_minor_units(amount: Decimal, currency: Currency) -> Result<i64, PaymentError> {
    let scale = currency.minor_unit_scale();
    let scaled = (amount * Decimal::from(10_i64.pow(scale))).round();
    i64::try_from(scaled)
        .map_err(|_| PaymentError::Unexpected(format!("amount {} out of range", amount)))
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, PaymentError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ProcessorError>(&body) {
        Ok(err) if status.is_client_error() => {
            Err(PaymentError::Declined(format!("{}: {}", err.code, err.description)))
        }
        _ => Err(PaymentError::Unexpected(format!("HTTP {}: {}", status, body))),
    }
}

#[async_trait]
impl PaymentProcessor for HttpPaymentProcessor {
    async fn authorize(&self, amount: Decimal, currency: Currency) -> Result<String, PaymentError> {
        let request = HoldRequest {
            amount: to_minor_units(amount, currency)?,
            currency: currency.iso_code().to_string(),
        };

        let response = self
            .client
            .post(self.url("holds"))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let hold: HoldResponse = check_status(response).await?.json().await?;
        if hold.status != "authorized" {
            return Err(PaymentError::Declined(format!(
                "hold {} returned status {}",
                hold.id, hold.status
            )));
        }
        tracing::debug!("Authorized hold {} for {} {}", hold.id, amount, currency);
        Ok(hold.id)
    }

    async fn capture(&self, hold_id: &str) -> Result<(), PaymentError> {
        self.post_action(hold_id, "capture").await
    }

    async fn refund(&self, hold_id: &str) -> Result<(), PaymentError> {
        self.post_action(hold_id, "refund").await
    }

    async fn void(&self, hold_id: &str) -> Result<(), PaymentError> {
        self.post_action(hold_id, "void").await
    }
}
