// src/channels.rs

use async_trait::async_trait;
use thiserror::Error;

pub mod email;
pub use email::ResendEmailChannel;
pub mod twilio;
pub use twilio::TwilioWhatsAppChannel;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("not configured")]
    NotConfigured,

    #[error("destinatario inválido: {0}")]
    InvalidRecipient(String),

    #[error("timeout")]
    Timeout,

    #[error("el proveedor respondió {status}: {message}")]
    Provider { status: u16, message: String },

    #[error("error de red: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for ChannelError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ChannelError::Timeout
        } else {
            ChannelError::Transport(e.to_string())
        }
    }
}

/// Correo de alerta ya renderizado.
#[derive(Debug, Clone)]
pub struct AlertEmail {
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait WhatsAppChannel: Send + Sync {
    /// Consulta de salud: ¿hay credenciales?
    fn is_configured(&self) -> bool;

    /// Envía un mensaje y devuelve el id del proveedor.
    async fn send_message(&self, to: &str, body: &str) -> Result<String, ChannelError>;
}

#[async_trait]
pub trait EmailChannel: Send + Sync {
    fn is_configured(&self) -> bool;

    async fn send_alert_email(
        &self,
        to: &str,
        recipient_name: &str,
        alert: &AlertEmail,
    ) -> Result<String, ChannelError>;
}

/// Normaliza un número a E.164.
///
/// Quita separadores, convierte `00` en `+` y antepone el código de país a los
/// números locales (10 dígitos o menos). `None` si no quedan dígitos suficientes.
pub fn normalize_phone(raw: &str, default_country_code: &str) -> Option<String> {
    let raw = raw.trim();
    let raw = raw.strip_prefix("whatsapp:").unwrap_or(raw).trim();

    let has_plus = raw.starts_with('+');
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.len() < 7 {
        return None;
    }

    let normalized = if has_plus {
        format!("+{}", digits)
    } else if let Some(rest) = digits.strip_prefix("00") {
        format!("+{}", rest)
    } else if digits.len() <= 10 {
        let cc: String = default_country_code.chars().filter(|c| c.is_ascii_digit()).collect();
        format!("+{}{}", cc, digits)
    } else {
        format!("+{}", digits)
    };

    Some(normalized)
}
