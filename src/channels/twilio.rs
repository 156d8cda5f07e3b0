// src/channels/twilio.rs

use async_trait::async_trait;
use serde::Deserialize;

use crate::channels::{normalize_phone, ChannelError, WhatsAppChannel};
use crate::config::TwilioConfig;

pub const TWILIO_API_BASE: &str = "https://api.twilio.com";

#[derive(Debug, Deserialize)]
struct TwilioMessage {
    sid: String,
}

#[derive(Debug, Deserialize)]
struct TwilioErrorBody {
    message: Option<String>,
    code: Option<i64>,
}

/// WhatsApp a través de la API de mensajes de Twilio.
#[derive(Clone)]
pub struct TwilioWhatsAppChannel {
    client: reqwest::Client,
    config: Option<TwilioConfig>,
    default_country_code: String,
    api_base: String,
}

impl TwilioWhatsAppChannel {
    pub fn new(client: reqwest::Client, config: Option<TwilioConfig>, default_country_code: &str) -> Self {
        Self {
            client,
            config,
            default_country_code: default_country_code.to_string(),
            api_base: TWILIO_API_BASE.to_string(),
        }
    }

    fn messages_url(&self, account_sid: &str) -> String {
        format!("{}/2010-04-01/Accounts/{}/Messages.json", self.api_base, account_sid)
    }

    /// Campos del formulario que espera Twilio.
    fn form_fields(&self, config: &TwilioConfig, to: &str, body: &str) -> Result<Vec<(&'static str, String)>, ChannelError> {
        let to = normalize_phone(to, &self.default_country_code)
            .ok_or_else(|| ChannelError::InvalidRecipient(to.to_string()))?;
        let from = normalize_phone(&config.whatsapp_from, &self.default_country_code)
            .ok_or_else(|| ChannelError::InvalidRecipient(config.whatsapp_from.clone()))?;

        Ok(vec![
            ("From", format!("whatsapp:{}", from)),
            ("To", format!("whatsapp:{}", to)),
            ("Body", body.to_string()),
        ])
    }
}

#[async_trait]
impl WhatsAppChannel for TwilioWhatsAppChannel {
    fn is_configured(&self) -> bool {
        self.config.is_some()
    }

    async fn send_message(&self, to: &str, body: &str) -> Result<String, ChannelError> {
        let config = self.config.as_ref().ok_or(ChannelError::NotConfigured)?;
        let form = self.form_fields(config, to, body)?;

        let response = self
            .client
            .post(self.messages_url(&config.account_sid))
            .basic_auth(&config.account_sid, Some(&config.auth_token))
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error: Option<TwilioErrorBody> = response.json().await.ok();
            let message = match error {
                Some(TwilioErrorBody { message: Some(m), code: Some(c) }) => format!("{} (código {})", m, c),
                Some(TwilioErrorBody { message: Some(m), .. }) => m,
                _ => status.canonical_reason().unwrap_or("error desconocido").to_string(),
            };
            tracing::warn!("⚠️ Twilio rechazó el mensaje a {}: {}", to, message);
            return Err(ChannelError::Provider { status: status.as_u16(), message });
        }

        let message: TwilioMessage = response.json().await?;
        tracing::debug!("WhatsApp enviado a {} (sid {})", to, message.sid);
        Ok(message.sid)
    }
}
