// src/services/events.rs

use tokio::sync::broadcast;

use crate::models::event::{DomainEvent, EventEnvelope};

const DEFAULT_CAPACITY: usize = 256;

/// Punto de salida de los eventos de dominio.
///
/// Entrega como mucho una vez y sin reintentos: publicar nunca falla ni
/// bloquea a quien publica. Para varias instancias hay que implementar este
/// trait sobre un broker externo.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: DomainEvent);
}

/// Difusión en proceso sobre `tokio::sync::broadcast`.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EventEnvelope>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventPublisher for EventBus {
    fn publish(&self, event: DomainEvent) {
        let name = event.name();
        match self.sender.send(EventEnvelope::wrap(event)) {
            Ok(receivers) => tracing::debug!("📣 Evento {} entregado a {} suscriptores", name, receivers),
            // Sin suscriptores el evento se descarta
            Err(_) => tracing::trace!("Evento {} descartado: sin suscriptores", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::property::PropertyStatus;

    fn status_changed() -> DomainEvent {
        DomainEvent::PropertyStatusChanged {
            property_id: 3,
            previous_status: PropertyStatus::Disponible,
            new_status: PropertyStatus::Deshabilitado,
            changed_by: 2,
        }
    }

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.publish(status_changed());

        let envelope = rx.recv().await.unwrap();
        assert_eq!(envelope.event, status_changed());
    }

    #[test]
    fn publishing_without_subscribers_is_a_no_op() {
        let bus = EventBus::new(4);
        assert_eq!(bus.subscriber_count(), 0);
        bus.publish(status_changed());
    }

    #[test]
    fn envelope_serializes_with_type_and_payload() {
        let json = serde_json::to_value(EventEnvelope::wrap(status_changed())).unwrap();
        assert_eq!(json["type"], "property.status_changed");
        assert_eq!(json["payload"]["propertyId"], 3);
        assert_eq!(json["payload"]["newStatus"], "deshabilitado");
        assert!(json["occurredAt"].is_string());
    }
}
