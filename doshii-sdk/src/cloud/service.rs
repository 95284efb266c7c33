//! DoshiiClient - REST reporter for the Doshii partner API

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::{Deserialize, Serialize};
use shared::cloud::{OrderRejection, ReportReceipt, TransactionRejection};
use shared::error::AppError;
use shared::order::{Order, Rejection, Transaction};
use std::error::Error as StdError;
use std::time::Duration;

use super::reporter::{CloudReporter, ReportError, ReportResult};

/// Attempts per report (network errors and 5xx only)
const MAX_RETRIES: u32 = 3;
/// Delay before the first retry, doubled after each attempt
const INITIAL_RETRY_DELAY_MS: u64 = 500;
/// HTTP client timeout
const CLIENT_TIMEOUT_SECS: u64 = 30;
/// Location header expected by Doshii on every partner call
const LOCATION_HEADER: &str = "doshii-location-id";

/// Versioned resource as returned by Doshii
#[derive(Debug, Deserialize)]
struct VersionedBody {
    version: String,
    #[serde(default)]
    id: Option<String>,
}

/// HTTP client for the Doshii partner API
pub struct DoshiiClient {
    client: Client,
    api_url: String,
    vendor_token: String,
    location_id: String,
    retry_delay: Duration,
}

impl std::fmt::Debug for DoshiiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DoshiiClient")
            .field("api_url", &self.api_url)
            .field("location_id", &self.location_id)
            .finish_non_exhaustive()
    }
}

impl DoshiiClient {
    pub fn new(
        api_url: impl Into<String>,
        vendor_token: impl Into<String>,
        location_id: impl Into<String>,
    ) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(CLIENT_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::internal(format!("Failed to build HTTP client: {e}")))?;

        let api_url = api_url.into().trim_end_matches('/').to_string();
        tracing::info!(api_url = %api_url, "DoshiiClient ready");

        Ok(Self {
            client,
            api_url,
            vendor_token: vendor_token.into(),
            location_id: location_id.into(),
            retry_delay: Duration::from_millis(INITIAL_RETRY_DELAY_MS),
        })
    }

    /// Override the first retry delay
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Send with retry on network errors and 5xx
    async fn send<B>(&self, method: Method, path: &str, body: &B) -> ReportResult<VersionedBody>
    where
        B: Serialize + Sync + ?Sized,
    {
        let url = format!("{}{}", self.api_url, path);
        let mut delay = self.retry_delay;
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.send_once(method.clone(), &url, body).await {
                Ok(versioned) => return Ok(versioned),
                Err(e) if e.is_retryable() && attempt < MAX_RETRIES => {
                    tracing::warn!(
                        url = %url,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Doshii request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send_once<B>(&self, method: Method, url: &str, body: &B) -> ReportResult<VersionedBody>
    where
        B: Serialize + Sync + ?Sized,
    {
        let response = self
            .client
            .request(method, url)
            .bearer_auth(&self.vendor_token)
            .header(LOCATION_HEADER, &self.location_id)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    return ReportError::Timeout(Duration::from_secs(CLIENT_TIMEOUT_SECS));
                }
                let mut msg = format!("Doshii request failed: {e}");
                let mut source: Option<&dyn StdError> = StdError::source(&e);
                while let Some(s) = source {
                    msg.push_str(&format!(" → {s}"));
                    source = s.source();
                }
                ReportError::Network(msg)
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ReportError::Network(format!("Failed to read Doshii response: {e}")))?;

        if status == StatusCode::CONFLICT {
            return Err(ReportError::VersionConflict(text));
        }
        if !status.is_success() {
            return Err(ReportError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(serde_json::from_str(&text)?)
    }

    fn order_path(order: &Order) -> ReportResult<String> {
        let doshii_id = order.doshii_id.as_deref().ok_or_else(|| {
            ReportError::Invalid(format!("order {} has no Doshii id", order.display_id()))
        })?;
        Ok(format!("/orders/{doshii_id}"))
    }
}

#[async_trait]
impl CloudReporter for DoshiiClient {
    async fn accept_order(&self, order: &Order) -> ReportResult<ReportReceipt> {
        let path = Self::order_path(order)?;
        let body = self.send(Method::PUT, &path, order).await?;
        Ok(ReportReceipt::new(body.version))
    }

    async fn reject_order(
        &self,
        doshii_id: &str,
        rejection: &Rejection,
    ) -> ReportResult<ReportReceipt> {
        let body = OrderRejection::from(rejection.clone());
        let body = self
            .send(Method::PUT, &format!("/orders/{doshii_id}"), &body)
            .await?;
        Ok(ReportReceipt::new(body.version))
    }

    async fn update_order(&self, order: &Order) -> ReportResult<ReportReceipt> {
        let path = Self::order_path(order)?;
        let body = self.send(Method::PUT, &path, order).await?;
        Ok(ReportReceipt::new(body.version))
    }

    async fn create_order(&self, order: &Order) -> ReportResult<ReportReceipt> {
        let body = self.send(Method::POST, "/orders", order).await?;
        Ok(ReportReceipt {
            version: body.version,
            doshii_id: body.id,
        })
    }

    async fn update_transaction(&self, trx: &Transaction) -> ReportResult<ReportReceipt> {
        let body = self
            .send(Method::PUT, &format!("/transactions/{}", trx.id), trx)
            .await?;
        Ok(ReportReceipt::new(body.version))
    }

    async fn reject_transaction(
        &self,
        trx: &Transaction,
        rejection: &Rejection,
    ) -> ReportResult<ReportReceipt> {
        let body = TransactionRejection::new(trx.version.clone(), rejection.clone());
        let body = self
            .send(Method::PUT, &format!("/transactions/{}", trx.id), &body)
            .await?;
        Ok(ReportReceipt::new(body.version))
    }
}
