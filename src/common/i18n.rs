// src/common/i18n.rs

use std::collections::HashMap;

pub const DEFAULT_LANG: &str = "es";

/// Catálogo de mensajes de error por idioma.
/// Las plantillas usan `{0}`, `{1}`... para los argumentos posicionales.
#[derive(Debug, Clone)]
pub struct I18nStore {
    catalogs: HashMap<&'static str, HashMap<&'static str, &'static str>>,
}

impl I18nStore {
    pub fn new() -> Self {
        let es = HashMap::from([
            ("validation_error", "Uno o más campos son inválidos."),
            ("missing_field", "El campo '{0}' es obligatorio."),
            ("invalid_input", "Solicitud inválida: {0}"),
            ("property_not_found", "Inmueble {0} no encontrado."),
            ("permission_request_not_found", "Solicitud {0} no encontrada."),
            ("user_not_found", "Usuario no encontrado."),
            ("duplicate_pending_request", "Ya existe una solicitud pendiente de tipo '{1}' para el inmueble {0}."),
            ("request_already_reviewed", "La solicitud {0} ya fue revisada."),
            ("forbidden", "No tienes permiso para realizar esta acción: {0}"),
            ("invalid_token", "Token de autenticación inválido o ausente."),
            ("internal_error", "Ocurrió un error inesperado."),
        ]);

        let en = HashMap::from([
            ("validation_error", "One or more fields are invalid."),
            ("missing_field", "Field '{0}' is required."),
            ("invalid_input", "Invalid request: {0}"),
            ("property_not_found", "Property {0} not found."),
            ("permission_request_not_found", "Request {0} not found."),
            ("user_not_found", "User not found."),
            ("duplicate_pending_request", "A pending '{1}' request already exists for property {0}."),
            ("request_already_reviewed", "Request {0} has already been reviewed."),
            ("forbidden", "You are not allowed to perform this action: {0}"),
            ("invalid_token", "Invalid or missing authentication token."),
            ("internal_error", "An unexpected error occurred."),
        ]);

        Self {
            catalogs: HashMap::from([("es", es), ("en", en)]),
        }
    }

    pub fn translate(&self, lang: &str, key: &str, args: &[String]) -> String {
        let template = self
            .catalogs
            .get(lang)
            .and_then(|c| c.get(key))
            .or_else(|| self.catalogs.get(DEFAULT_LANG).and_then(|c| c.get(key)))
            .copied()
            .unwrap_or(key);

        args.iter()
            .enumerate()
            .fold(template.to_string(), |msg, (i, arg)| msg.replace(&format!("{{{}}}", i), arg))
    }
}

impl Default for I18nStore {
    fn default() -> Self {
        Self::new()
    }
}
