// src/services/templates.rs

use anyhow::Context;
use handlebars::Handlebars;
use serde::Serialize;

use crate::{
    channels::AlertEmail,
    common::error::AppError,
    models::alert::{AlertType, InactivityAlert},
    services::inactivity::inactivity_label,
};

const TITLE: &str = "title";
const DESCRIPTION: &str = "description";
const WHATSAPP_OWNER: &str = "whatsapp-owner";
const WHATSAPP_ESCALATION: &str = "whatsapp-escalation";
const EMAIL_SUBJECT: &str = "email-subject";
const EMAIL_BODY: &str = "email-body";

/// Textos de un tipo de alerta. Los de WhatsApp, asunto y descripción son
/// texto plano (`{{{ }}}`); el cuerpo del correo es HTML y se escapa.
struct TemplateSet {
    alert_type: AlertType,
    title: &'static str,
    description: &'static str,
    whatsapp_owner: &'static str,
    whatsapp_escalation: &'static str,
    email_subject: &'static str,
    email_body: &'static str,
}

const SALE: TemplateSet = TemplateSet {
    alert_type: AlertType::VentaSinMovimiento,
    title: "Propiedad sin movimiento de venta",
    description: "\"{{{property_title}}}\" ({{{location}}}) lleva {{{elapsed}}} ({{days_inactive}} días) sin movimiento de venta. El umbral es de {{threshold_days}} días.",
    whatsapp_owner: "⚠️ Hola {{{recipient_name}}}, tu propiedad \"{{{property_title}}}\" ({{{operation}}}) lleva {{{elapsed}}} ({{days_inactive}} días) sin movimiento de venta.\nActualízala o márcala como vendida: {{{property_url}}}",
    whatsapp_escalation: "⚠️ Alerta de inactividad: la propiedad \"{{{property_title}}}\" ({{{operation}}}) lleva {{{elapsed}}} ({{days_inactive}} días) sin movimiento de venta.\nResponsable: {{{owner_name}}} ({{{owner_role}}}).\nVer propiedad: {{{property_url}}}",
    email_subject: "Propiedad sin movimiento de venta: {{{property_title}}}",
    email_body: r#"<div style="font-family: Arial, sans-serif; max-width: 560px; margin: 0 auto;">
  <h2 style="color: #b45309;">Propiedad sin movimiento de venta</h2>
  <p>Hola {{recipient_name}},</p>
  <p>{{#if is_owner}}Tu propiedad{{else}}La propiedad{{/if}} <strong>{{property_title}}</strong> ({{location}}) lleva {{elapsed}} ({{days_inactive}} días) sin venderse. El umbral es de {{threshold_days}} días.</p>
  {{#unless is_owner}}<p>Responsable: {{owner_name}} ({{owner_role}})</p>{{/unless}}
  {{> property_link}}
</div>"#,
};

const RENTAL: TemplateSet = TemplateSet {
    alert_type: AlertType::AlquilerSinMovimiento,
    title: "Propiedad sin movimiento de alquiler",
    description: "\"{{{property_title}}}\" ({{{location}}}) lleva {{{elapsed}}} ({{days_inactive}} días) sin movimiento de alquiler. El umbral es de {{threshold_days}} días.",
    whatsapp_owner: "⚠️ Hola {{{recipient_name}}}, tu propiedad \"{{{property_title}}}\" ({{{operation}}}) lleva {{{elapsed}}} ({{days_inactive}} días) sin movimiento de alquiler.\nActualízala o márcala como alquilada: {{{property_url}}}",
    whatsapp_escalation: "⚠️ Alerta de inactividad: la propiedad \"{{{property_title}}}\" ({{{operation}}}) lleva {{{elapsed}}} ({{days_inactive}} días) sin movimiento de alquiler.\nResponsable: {{{owner_name}}} ({{{owner_role}}}).\nVer propiedad: {{{property_url}}}",
    email_subject: "Propiedad sin movimiento de alquiler: {{{property_title}}}",
    email_body: r#"<div style="font-family: Arial, sans-serif; max-width: 560px; margin: 0 auto;">
  <h2 style="color: #b45309;">Propiedad sin movimiento de alquiler</h2>
  <p>Hola {{recipient_name}},</p>
  <p>{{#if is_owner}}Tu propiedad{{else}}La propiedad{{/if}} <strong>{{property_title}}</strong> ({{location}}) lleva {{elapsed}} ({{days_inactive}} días) sin alquilarse. El umbral es de {{threshold_days}} días.</p>
  {{#unless is_owner}}<p>Responsable: {{owner_name}} ({{owner_role}})</p>{{/unless}}
  {{> property_link}}
</div>"#,
};

const PROPERTY_LINK: &str = r#"<p><a href="{{property_url}}" style="display: inline-block; padding: 10px 16px; background: #1d4ed8; color: #ffffff; text-decoration: none; border-radius: 6px;">Ver propiedad</a></p>
  <p style="color: #6b7280; font-size: 12px;">Este es un aviso automático de inactividad.</p>"#;

fn template_name(alert_type: AlertType, part: &str) -> String {
    format!("{}-{}", alert_type.as_str(), part)
}

/// Datos que ven las plantillas.
#[derive(Debug, Serialize)]
pub struct AlertContext<'a> {
    property_title: &'a str,
    location: &'a str,
    operation: &'a str,
    elapsed: String,
    days_inactive: i64,
    threshold_days: i64,
    owner_name: &'a str,
    owner_role: &'a str,
    recipient_name: Option<&'a str>,
    is_owner: bool,
    property_url: Option<&'a str>,
}

impl<'a> AlertContext<'a> {
    pub fn new(alert: &'a InactivityAlert) -> Self {
        Self {
            property_title: &alert.property_title,
            location: &alert.location,
            operation: alert.operation_type.label(),
            elapsed: inactivity_label(alert.days_inactive),
            days_inactive: alert.days_inactive,
            threshold_days: alert.alert_type.threshold_days(),
            owner_name: &alert.owner.name,
            owner_role: alert.owner.role.label(),
            recipient_name: None,
            is_owner: false,
            property_url: None,
        }
    }

    pub fn addressed_to(mut self, recipient_name: &'a str, is_owner: bool, property_url: &'a str) -> Self {
        self.recipient_name = Some(recipient_name);
        self.is_owner = is_owner;
        self.property_url = Some(property_url);
        self
    }
}

/// Registro de plantillas por tipo de alerta.
pub struct AlertTemplates {
    registry: Handlebars<'static>,
}

impl AlertTemplates {
    pub fn new() -> anyhow::Result<Self> {
        let mut registry = Handlebars::new();
        registry
            .register_partial("property_link", PROPERTY_LINK)
            .context("registrando el parcial property_link")?;

        for set in [SALE, RENTAL] {
            register_templates(&mut registry, &set)?;
        }

        Ok(Self { registry })
    }

    fn render(&self, alert_type: AlertType, part: &str, context: &AlertContext<'_>) -> Result<String, AppError> {
        let name = template_name(alert_type, part);
        let rendered = self
            .registry
            .render(&name, context)
            .with_context(|| format!("renderizando la plantilla {}", name))?;
        Ok(rendered)
    }

    /// Título y descripción del descriptor de la alerta.
    pub fn describe(&self, alert_type: AlertType, context: &AlertContext<'_>) -> Result<(String, String), AppError> {
        Ok((
            self.render(alert_type, TITLE, context)?,
            self.render(alert_type, DESCRIPTION, context)?,
        ))
    }

    pub fn whatsapp_message(
        &self,
        alert_type: AlertType,
        context: &AlertContext<'_>,
    ) -> Result<String, AppError> {
        let part = if context.is_owner { WHATSAPP_OWNER } else { WHATSAPP_ESCALATION };
        self.render(alert_type, part, context)
    }

    pub fn alert_email(&self, alert_type: AlertType, context: &AlertContext<'_>) -> Result<AlertEmail, AppError> {
        Ok(AlertEmail {
            subject: self.render(alert_type, EMAIL_SUBJECT, context)?,
            html: self.render(alert_type, EMAIL_BODY, context)?,
        })
    }
}

fn register_templates(registry: &mut Handlebars<'static>, set: &TemplateSet) -> anyhow::Result<()> {
    let parts = [
        (TITLE, set.title),
        (DESCRIPTION, set.description),
        (WHATSAPP_OWNER, set.whatsapp_owner),
        (WHATSAPP_ESCALATION, set.whatsapp_escalation),
        (EMAIL_SUBJECT, set.email_subject),
        (EMAIL_BODY, set.email_body),
    ];

    for (part, template) in parts {
        let name = template_name(set.alert_type, part);
        registry
            .register_template_string(&name, template)
            .with_context(|| format!("registrando la plantilla {}", name))?;
    }
    Ok(())
}
