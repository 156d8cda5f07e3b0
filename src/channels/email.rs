// src/channels/email.rs

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::channels::{AlertEmail, ChannelError, EmailChannel};
use crate::config::EmailConfig;

pub const RESEND_API_URL: &str = "https://api.resend.com/emails";

#[derive(Debug, Serialize)]
struct ResendRequest<'a> {
    from: &'a str,
    to: Vec<&'a str>,
    subject: &'a str,
    html: &'a str,
}

#[derive(Debug, Deserialize)]
struct ResendResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ResendErrorBody {
    message: Option<String>,
}

/// Correo transaccional vía Resend.
#[derive(Clone)]
pub struct ResendEmailChannel {
    client: reqwest::Client,
    config: Option<EmailConfig>,
}

impl ResendEmailChannel {
    pub fn new(client: reqwest::Client, config: Option<EmailConfig>) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl EmailChannel for ResendEmailChannel {
    fn is_configured(&self) -> bool {
        self.config.is_some()
    }

    async fn send_alert_email(
        &self,
        to: &str,
        recipient_name: &str,
        alert: &AlertEmail,
    ) -> Result<String, ChannelError> {
        let config = self.config.as_ref().ok_or(ChannelError::NotConfigured)?;

        if !to.contains('@') {
            return Err(ChannelError::InvalidRecipient(to.to_string()));
        }

        let payload = ResendRequest {
            from: &config.from_address,
            to: vec![to],
            subject: &alert.subject,
            html: &alert.html,
        };

        let response = self
            .client
            .post(RESEND_API_URL)
            .bearer_auth(&config.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ResendErrorBody>()
                .await
                .ok()
                .and_then(|b| b.message)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("error desconocido").to_string());
            tracing::warn!("⚠️ Resend rechazó el correo a {}: {}", to, message);
            return Err(ChannelError::Provider { status: status.as_u16(), message });
        }

        let sent: ResendResponse = response.json().await?;
        tracing::debug!("Correo {} entregado a Resend para {}", sent.id, recipient_name);
        Ok(sent.id)
    }
}
