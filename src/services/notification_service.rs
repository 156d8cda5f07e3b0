// src/services/notification_service.rs

use std::{future::Future, sync::Arc, time::Duration};

use crate::{
    channels::{AlertEmail, ChannelError, EmailChannel, WhatsAppChannel},
    common::error::AppError,
    db::UserStore,
    models::alert::{Channel, ChannelStatus, DeliveryResult, DispatchReport, InactivityAlert},
    services::templates::{AlertContext, AlertTemplates},
};

/// Destinatario ya resuelto de una alerta.
#[derive(Debug, Clone)]
pub struct Recipient {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub whatsapp: Option<String>,
    pub is_owner: bool,
}

#[derive(Clone)]
pub struct NotificationDispatcher {
    users: Arc<dyn UserStore>,
    whatsapp: Arc<dyn WhatsAppChannel>,
    email: Arc<dyn EmailChannel>,
    templates: Arc<AlertTemplates>,
    app_base_url: String,
    timeout: Duration,
}

impl NotificationDispatcher {
    pub fn new(
        users: Arc<dyn UserStore>,
        whatsapp: Arc<dyn WhatsAppChannel>,
        email: Arc<dyn EmailChannel>,
        templates: Arc<AlertTemplates>,
        app_base_url: &str,
        timeout: Duration,
    ) -> Self {
        Self {
            users,
            whatsapp,
            email,
            templates,
            app_base_url: app_base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub fn channel_status(&self) -> ChannelStatus {
        ChannelStatus {
            whatsapp_configured: self.whatsapp.is_configured(),
            email_configured: self.email.is_configured(),
        }
    }

    pub fn property_url(&self, property_id: i64) -> String {
        format!("{}/propiedades/{}", self.app_base_url, property_id)
    }

    /// Responsable + usuarios activos de rango superior, sin repetir.
    pub async fn recipients(&self, alert: &InactivityAlert) -> Result<Vec<Recipient>, AppError> {
        let owner = &alert.owner;
        let mut recipients = vec![Recipient {
            id: owner.id,
            name: owner.name.clone(),
            email: owner.email.clone(),
            whatsapp: owner.whatsapp.clone(),
            is_owner: true,
        }];

        if owner.role.roles_above().is_empty() {
            return Ok(recipients);
        }

        for user in self.users.find_active_above(owner.role).await? {
            if recipients.iter().any(|r| r.id == user.id) {
                continue;
            }
            recipients.push(Recipient {
                id: user.id,
                name: user.name.clone(),
                email: user.email_contact().map(str::to_string),
                whatsapp: user.whatsapp_contact().map(str::to_string),
                is_owner: false,
            });
        }

        Ok(recipients)
    }

    /// Envía la alerta por todos los canales a todos los destinatarios.
    ///
    /// Los fallos de canal quedan en el reporte; sólo se propagan los errores
    /// al resolver destinatarios o al renderizar las plantillas.
    pub async fn dispatch(&self, alert: &InactivityAlert) -> Result<DispatchReport, AppError> {
        let recipients = self.recipients(alert).await?;
        let url = self.property_url(alert.property_id);

        let mut results = Vec::with_capacity(recipients.len() * 2);
        for recipient in &recipients {
            let context = AlertContext::new(alert).addressed_to(&recipient.name, recipient.is_owner, &url);
            let body = self.templates.whatsapp_message(alert.alert_type, &context)?;
            let email = self.templates.alert_email(alert.alert_type, &context)?;

            // Un canal no bloquea al otro
            let (wa, mail) = tokio::join!(
                self.send_whatsapp(recipient, &body),
                self.send_email(recipient, &email)
            );
            results.extend(wa);
            results.extend(mail);
        }

        let report = DispatchReport::from_results(alert.property_id, alert.alert_type, results);
        tracing::info!(
            "📨 Alerta {} del inmueble {}: {} enviados, {} fallidos, {} sin configurar",
            alert.alert_type.as_str(),
            alert.property_id,
            report.total_sent,
            report.total_failed,
            report.total_not_configured
        );
        Ok(report)
    }

    async fn send_whatsapp(&self, recipient: &Recipient, body: &str) -> Option<DeliveryResult> {
        if !self.whatsapp.is_configured() {
            return Some(DeliveryResult::not_configured(recipient.id, &recipient.name, Channel::Whatsapp));
        }
        let to = recipient.whatsapp.as_deref()?;
        Some(
            self.deliver(recipient, Channel::Whatsapp, self.whatsapp.send_message(to, body))
                .await,
        )
    }

    async fn send_email(&self, recipient: &Recipient, email: &AlertEmail) -> Option<DeliveryResult> {
        if !self.email.is_configured() {
            return Some(DeliveryResult::not_configured(recipient.id, &recipient.name, Channel::Email));
        }
        let to = recipient.email.as_deref()?;
        Some(
            self.deliver(
                recipient,
                Channel::Email,
                self.email.send_alert_email(to, &recipient.name, email),
            )
            .await,
        )
    }

    async fn deliver<F>(&self, recipient: &Recipient, channel: Channel, send: F) -> DeliveryResult
    where
        F: Future<Output = Result<String, ChannelError>>,
    {
        let outcome = match tokio::time::timeout(self.timeout, send).await {
            Ok(result) => result,
            Err(_) => Err(ChannelError::Timeout),
        };

        match outcome {
            Ok(message_id) => DeliveryResult::sent(recipient.id, &recipient.name, channel, message_id),
            Err(ChannelError::NotConfigured) => {
                DeliveryResult::not_configured(recipient.id, &recipient.name, channel)
            }
            Err(e) => {
                tracing::warn!("⚠️ Falló el envío {:?} a {} ({}): {}", channel, recipient.name, recipient.id, e);
                DeliveryResult::failed(recipient.id, &recipient.name, channel, e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{alert::DeliveryStatus, property::OperationType, user::Role};
    use crate::services::inactivity::classify;
    use crate::test_support::{property, user, FakeEmail, FakeWhatsApp, InMemoryUsers};
    use chrono::Utc;

    fn stale_alert(owner_role: Role) -> InactivityAlert {
        let now = Utc::now();
        let owner = user(1, owner_role);
        let p = property(7, OperationType::Alquiler, owner.id, 95, now);
        classify(&p, &owner, now, &AlertTemplates::new().unwrap()).unwrap().unwrap()
    }

    fn staff() -> Arc<InMemoryUsers> {
        let mut inactive_admin = user(4, Role::Admin);
        inactive_admin.is_active = false;
        Arc::new(InMemoryUsers::with(vec![
            user(1, Role::Asesor),
            user(2, Role::Admin),
            user(3, Role::Gerencia),
            inactive_admin,
        ]))
    }

    fn dispatcher(users: Arc<InMemoryUsers>, wa: Arc<FakeWhatsApp>, email: Arc<FakeEmail>) -> NotificationDispatcher {
        NotificationDispatcher::new(
            users,
            wa,
            email,
            Arc::new(AlertTemplates::new().unwrap()),
            "https://crm.example.com/",
            Duration::from_millis(200),
        )
    }

    #[tokio::test]
    async fn recipients_escalate_by_role() {
        let d = dispatcher(staff(), Arc::new(FakeWhatsApp::configured()), Arc::new(FakeEmail::configured()));

        let ids = |rs: Vec<Recipient>| rs.into_iter().map(|r| r.id).collect::<Vec<_>>();
        assert_eq!(ids(d.recipients(&stale_alert(Role::Asesor)).await.unwrap()), vec![1, 3, 2]);

        let mut alert = stale_alert(Role::Admin);
        alert.owner.id = 2;
        assert_eq!(ids(d.recipients(&alert).await.unwrap()), vec![2, 3]);

        let mut alert = stale_alert(Role::Gerencia);
        alert.owner.id = 3;
        assert_eq!(ids(d.recipients(&alert).await.unwrap()), vec![3]);
    }

    #[tokio::test]
    async fn unconfigured_whatsapp_still_sends_email() {
        let wa = Arc::new(FakeWhatsApp::unconfigured());
        let email = Arc::new(FakeEmail::configured());
        let d = dispatcher(staff(), wa.clone(), email.clone());

        let report = d.dispatch(&stale_alert(Role::Asesor)).await.unwrap();

        let whatsapp: Vec<_> = report.results.iter().filter(|r| r.channel == Channel::Whatsapp).collect();
        assert!(!whatsapp.is_empty());
        assert!(whatsapp.iter().all(|r| !r.success && r.error.as_deref() == Some("not configured")));

        let emails = report.results.iter().filter(|r| r.channel == Channel::Email).count();
        assert!(emails >= 1);
        assert_eq!(report.total_sent, 3);
        assert_eq!(report.total_not_configured, 3);
        assert!(wa.sent().is_empty());
        assert_eq!(email.sent().len(), 3);
    }

    #[tokio::test]
    async fn owner_and_escalation_get_different_texts() {
        let wa = Arc::new(FakeWhatsApp::configured());
        let d = dispatcher(staff(), wa.clone(), Arc::new(FakeEmail::unconfigured()));

        d.dispatch(&stale_alert(Role::Asesor)).await.unwrap();

        let sent = wa.sent();
        assert_eq!(sent.len(), 3);
        assert!(sent[0].1.contains("tu propiedad"));
        assert!(sent[1].1.contains("Responsable: Usuario 1 (asesor)"));
        assert!(sent.iter().all(|(_, body)| body.contains("https://crm.example.com/propiedades/7")));
    }

    #[tokio::test]
    async fn provider_failures_and_timeouts_become_failed_results() {
        let wa = Arc::new(FakeWhatsApp::slow(Duration::from_secs(5)));
        let email = Arc::new(FakeEmail::failing());
        let users = Arc::new(InMemoryUsers::with(vec![user(3, Role::Gerencia)]));
        let d = dispatcher(users, wa, email);

        let mut alert = stale_alert(Role::Gerencia);
        alert.owner.id = 3;
        let report = d.dispatch(&alert).await.unwrap();

        assert_eq!(report.total_failed, 2);
        assert!(!report.any_sent());
        let timeout = report.results.iter().find(|r| r.channel == Channel::Whatsapp).unwrap();
        assert_eq!(timeout.status, DeliveryStatus::Failed);
        assert_eq!(timeout.error.as_deref(), Some("timeout"));
    }

    #[tokio::test]
    async fn whatsapp_failure_does_not_block_email() {
        let email = Arc::new(FakeEmail::configured());
        let d = dispatcher(staff(), Arc::new(FakeWhatsApp::failing()), email.clone());

        let report = d.dispatch(&stale_alert(Role::Asesor)).await.unwrap();

        assert_eq!(report.total_failed, 3);
        assert_eq!(report.total_sent, 3);
        assert!(!report.whatsapp_sent());
        assert_eq!(report.first_message_sid(), None);
        assert!(email.sent().iter().all(|(_, subject)| subject.contains("Inmueble 7")));
    }

    #[tokio::test]
    async fn recipients_without_contact_are_skipped() {
        let mut owner = stale_alert(Role::Gerencia);
        owner.owner.id = 3;
        owner.owner.whatsapp = None;
        let wa = Arc::new(FakeWhatsApp::configured());
        let d = dispatcher(Arc::new(InMemoryUsers::default()), wa.clone(), Arc::new(FakeEmail::configured()));

        let report = d.dispatch(&owner).await.unwrap();
        assert_eq!(report.results.len(), 1);
        assert_eq!(report.results[0].channel, Channel::Email);
        assert!(wa.sent().is_empty());
    }
}
