use crate::models::Message;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Events pushed from server to connected clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WsOutboundEvent {
    /// A newly persisted message addressed to this user.
    #[serde(rename = "message")]
    Message {
        id: i64,
        sender_id: Uuid,
        receiver_id: Uuid,
        content: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        nonce: Option<String>,
        created_at: String,
    },

    /// Someone sent this user a contact request.
    #[serde(rename = "contact.request")]
    ContactRequest {
        contact_id: Uuid,
        from: Uuid,
        created_at: String,
    },

    /// A request this user sent was accepted.
    #[serde(rename = "contact.accepted")]
    ContactAccepted { contact_id: Uuid, by: Uuid },

    /// Transient typing indicator; never persisted.
    #[serde(rename = "typing")]
    Typing { sender_id: Uuid },
}

impl WsOutboundEvent {
    pub fn from_message(message: &Message) -> Self {
        WsOutboundEvent::Message {
            id: message.id,
            sender_id: message.sender_id,
            receiver_id: message.receiver_id,
            content: message.content.clone(),
            nonce: message.nonce.clone(),
            created_at: message.created_at.to_rfc3339(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Events a connected client may send over the socket.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WsInboundEvent {
    #[serde(rename = "typing")]
    Typing { peer_id: Uuid },
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn message_event_carries_the_persisted_fields() {
        let message = Message {
            id: 7,
            sender_id: Uuid::new_v4(),
            receiver_id: Uuid::new_v4(),
            content: "ciphertext".into(),
            nonce: Some("n0".into()),
            created_at: Utc::now(),
        };

        let json = WsOutboundEvent::from_message(&message).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["type"], "message");
        assert_eq!(value["id"], 7);
        assert_eq!(value["content"], "ciphertext");
        assert_eq!(value["nonce"], "n0");
    }

    #[test]
    fn nonce_is_omitted_when_absent() {
        let message = Message {
            id: 1,
            sender_id: Uuid::new_v4(),
            receiver_id: Uuid::new_v4(),
            content: "plain".into(),
            nonce: None,
            created_at: Utc::now(),
        };

        let json = WsOutboundEvent::from_message(&message).to_json().unwrap();
        assert!(!json.contains("nonce"));
    }

    #[test]
    fn inbound_typing_parses_from_tagged_json() {
        let peer = Uuid::new_v4();
        let json = format!(r#"{{"type":"typing","peer_id":"{peer}"}}"#);

        let event: WsInboundEvent = serde_json::from_str(&json).unwrap();
        let WsInboundEvent::Typing { peer_id } = event;
        assert_eq!(peer_id, peer);
    }
}
