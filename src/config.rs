// src/config.rs

use std::{env, sync::Arc, time::Duration};

use anyhow::{anyhow, Context};
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    channels::{EmailChannel, ResendEmailChannel, TwilioWhatsAppChannel, WhatsAppChannel},
    common::i18n::I18nStore,
    db::{
        AlertLedger, AlertNotificationRepository, PermissionRepository, PermissionStore,
        PropertyRepository, PropertyStore, UserRepository, UserStore,
    },
    services::{
        alert_service::AlertService,
        auth::AuthService,
        dedup::NotificationDeduplicator,
        events::{EventBus, EventPublisher},
        notification_service::NotificationDispatcher,
        permission_service::PermissionService,
        templates::AlertTemplates,
    },
};

#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub whatsapp_from: String,
}

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub api_key: String,
    pub from_address: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub host: String,
    pub port: u16,
    /// Base de los enlaces a la ficha del inmueble.
    pub app_base_url: String,
    pub cron_secret: Option<String>,
    pub twilio: Option<TwilioConfig>,
    pub email: Option<EmailConfig>,
    pub whatsapp_default_country_code: String,
    pub notification_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Lee la configuración desde cualquier fuente clave/valor.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Variables vacías cuentan como ausentes
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let database_url = get("DATABASE_URL").context("DATABASE_URL debe estar definida")?;
        let jwt_secret = get("JWT_SECRET").context("JWT_SECRET debe estar definido")?;

        let port = match get("APP_PORT") {
            Some(p) => p.parse::<u16>().with_context(|| format!("APP_PORT inválido: {}", p))?,
            None => 3000,
        };

        let database_max_connections = match get("DATABASE_MAX_CONNECTIONS") {
            Some(n) => n
                .parse::<u32>()
                .with_context(|| format!("DATABASE_MAX_CONNECTIONS inválido: {}", n))?,
            None => 5,
        };

        let timeout_secs = match get("NOTIFICATION_TIMEOUT_SECS") {
            Some(s) => s
                .parse::<u64>()
                .with_context(|| format!("NOTIFICATION_TIMEOUT_SECS inválido: {}", s))?,
            None => 10,
        };
        if timeout_secs == 0 {
            return Err(anyhow!("NOTIFICATION_TIMEOUT_SECS debe ser mayor que 0"));
        }

        // Los canales son opcionales: sin credenciales quedan "no configurados"
        let twilio = match (
            get("TWILIO_ACCOUNT_SID"),
            get("TWILIO_AUTH_TOKEN"),
            get("TWILIO_WHATSAPP_FROM"),
        ) {
            (Some(account_sid), Some(auth_token), Some(whatsapp_from)) => Some(TwilioConfig {
                account_sid,
                auth_token,
                whatsapp_from,
            }),
            _ => None,
        };

        let email = get("RESEND_API_KEY").map(|api_key| EmailConfig {
            api_key,
            from_address: get("ALERT_EMAIL_FROM")
                .unwrap_or_else(|| "Alertas <alertas@notificaciones.inmobiliaria.com>".to_string()),
        });

        Ok(Self {
            database_url,
            database_max_connections,
            jwt_secret,
            host: get("APP_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            app_base_url: get("APP_BASE_URL")
                .unwrap_or_else(|| "http://localhost:3000".to_string())
                .trim_end_matches('/')
                .to_string(),
            cron_secret: get("CRON_SECRET"),
            twilio,
            email,
            whatsapp_default_country_code: get("WHATSAPP_DEFAULT_COUNTRY_CODE")
                .unwrap_or_else(|| "52".to_string()),
            notification_timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Repositorios y canales que necesita el grafo de servicios.
#[derive(Clone)]
pub struct Collaborators {
    pub users: Arc<dyn UserStore>,
    pub properties: Arc<dyn PropertyStore>,
    pub ledger: Arc<dyn AlertLedger>,
    pub permissions: Arc<dyn PermissionStore>,
    pub whatsapp: Arc<dyn WhatsAppChannel>,
    pub email: Arc<dyn EmailChannel>,
}

// El estado compartido accesible en toda la aplicación
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub auth_service: AuthService,
    pub alert_service: AlertService,
    pub permission_service: PermissionService,
    pub event_bus: EventBus,
    pub i18n_store: Arc<I18nStore>,
}

impl AppState {
    pub async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await?;

        tracing::info!("✅ Conexión con la base de datos establecida");
        Ok(pool)
    }

    pub fn from_pool(config: AppConfig, pool: PgPool) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.notification_timeout)
            .build()
            .context("no se pudo construir el cliente HTTP")?;

        let collaborators = Collaborators {
            users: Arc::new(UserRepository::new(pool.clone())),
            properties: Arc::new(PropertyRepository::new(pool.clone())),
            ledger: Arc::new(AlertNotificationRepository::new(pool.clone())),
            permissions: Arc::new(PermissionRepository::new(pool)),
            whatsapp: Arc::new(TwilioWhatsAppChannel::new(
                http.clone(),
                config.twilio.clone(),
                &config.whatsapp_default_country_code,
            )),
            email: Arc::new(ResendEmailChannel::new(http, config.email.clone())),
        };

        if config.twilio.is_none() {
            tracing::warn!("WhatsApp (Twilio) no configurado: los envíos se reportarán como 'not configured'");
        }
        if config.email.is_none() {
            tracing::warn!("Email (Resend) no configurado: los envíos se reportarán como 'not configured'");
        }

        Self::assemble(config, collaborators, EventBus::default())
    }

    // --- Monta el grafo de dependencias ---
    pub fn assemble(config: AppConfig, c: Collaborators, event_bus: EventBus) -> anyhow::Result<Self> {
        let publisher: Arc<dyn EventPublisher> = Arc::new(event_bus.clone());
        let templates = Arc::new(AlertTemplates::new().context("no se pudieron registrar las plantillas")?);

        let dispatcher = NotificationDispatcher::new(
            c.users.clone(),
            c.whatsapp,
            c.email,
            templates.clone(),
            &config.app_base_url,
            config.notification_timeout,
        );
        let dedup = NotificationDeduplicator::new(c.ledger);

        let alert_service = AlertService::new(
            c.properties.clone(),
            c.users.clone(),
            dedup,
            dispatcher,
            templates,
            publisher.clone(),
        );
        let permission_service = PermissionService::new(c.permissions, c.properties, publisher);
        let auth_service = AuthService::new(c.users, config.jwt_secret.clone());

        Ok(Self {
            config: Arc::new(config),
            auth_service,
            alert_service,
            permission_service,
            event_bus,
            i18n_store: Arc::new(I18nStore::new()),
        })
    }
}
