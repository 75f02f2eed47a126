//! Email dispatch seam
//!
//! The transactional email service is invoked with an order snapshot plus
//! the resend/standalone flags and answers `{success, message?}`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::order::{NotificationKind, Order};
use std::time::Duration;
use thiserror::Error;

/// Request sent to the email service
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchRequest {
    pub kind: NotificationKind,
    pub order: Order,
    pub force_resend: bool,
    pub is_standalone: bool,
}

/// Email service answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl DispatchResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

/// Transport-level dispatch failure
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Email service request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Email service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Email service unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait EmailDispatcher: Send + Sync {
    async fn dispatch(&self, request: &DispatchRequest) -> Result<DispatchResponse, DispatchError>;
}

/// HTTP client for the email service
#[derive(Debug, Clone)]
pub struct HttpEmailDispatcher {
    client: Client,
    order_email_url: String,
    invoice_email_url: String,
}

impl HttpEmailDispatcher {
    pub fn new(
        order_email_url: impl Into<String>,
        invoice_email_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, DispatchError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            order_email_url: order_email_url.into(),
            invoice_email_url: invoice_email_url.into(),
        })
    }

    fn url_for(&self, kind: NotificationKind) -> &str {
        match kind {
            NotificationKind::OrderConfirmation => &self.order_email_url,
            NotificationKind::Invoice => &self.invoice_email_url,
        }
    }
}

#[async_trait]
impl EmailDispatcher for HttpEmailDispatcher {
    async fn dispatch(&self, request: &DispatchRequest) -> Result<DispatchResponse, DispatchError> {
        let url = self.url_for(request.kind);
        tracing::debug!(order_id = %request.order.id, kind = %request.kind, url = %url, "Dispatching email");

        let response = self.client.post(url).json(request).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(DispatchError::Status { status, body });
        }

        Ok(response.json().await?)
    }
}
