use crate::error::AppError;
use crate::metrics;
use crate::models::Message;
use crate::repository::MessageStore;
use crate::services::authorization::AuthorizationGate;
use crate::websocket::{PresenceRegistry, WsOutboundEvent};
use std::sync::Arc;
use uuid::Uuid;

/// Orchestrates a send: authorize, persist, then push.
///
/// Persistence is the ground truth and must commit before any push; the
/// push is best-effort and its outcome never changes the caller's response.
pub struct DeliveryCoordinator {
    gate: AuthorizationGate,
    messages: Arc<dyn MessageStore>,
    presence: PresenceRegistry,
}

impl DeliveryCoordinator {
    pub fn new(
        gate: AuthorizationGate,
        messages: Arc<dyn MessageStore>,
        presence: PresenceRegistry,
    ) -> Self {
        Self {
            gate,
            messages,
            presence,
        }
    }

    pub async fn send(
        &self,
        sender: Uuid,
        receiver: Uuid,
        content: String,
        nonce: Option<String>,
    ) -> Result<Message, AppError> {
        if sender == receiver {
            return Err(AppError::BadRequest("cannot message yourself".into()));
        }
        if content.is_empty() {
            return Err(AppError::BadRequest(
                "message content cannot be empty".into(),
            ));
        }

        if !self.gate.can_send_message(sender, receiver).await? {
            return Err(AppError::Forbidden);
        }

        let message = self.messages.append(sender, receiver, content, nonce).await?;
        metrics::observe_message_sent();

        // The message is durable from here on; a recipient without a live
        // connection picks it up from history instead.
        match WsOutboundEvent::from_message(&message).to_json() {
            Ok(payload) => {
                let delivered = self.presence.notify(receiver, &payload).await;
                metrics::observe_push(delivered);
                if delivered == 0 {
                    tracing::debug!(
                        message_id = message.id,
                        %receiver,
                        "receiver offline, realtime push dropped"
                    );
                }
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    message_id = message.id,
                    "failed to encode push event"
                );
            }
        }

        Ok(message)
    }

    pub async fn conversation(&self, a: Uuid, b: Uuid) -> Result<Vec<Message>, AppError> {
        self.messages.conversation(a, b).await
    }
}
