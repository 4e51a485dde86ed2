use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One append-only message log entry.
///
/// `id` is assigned monotonically by the store and doubles as the tie-break
/// sort key when two messages share a timestamp. Content is an opaque
/// payload; when clients encrypt, `nonce` travels alongside untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// True when this message belongs to the conversation between `a` and `b`.
    pub fn between(&self, a: Uuid, b: Uuid) -> bool {
        (self.sender_id == a && self.receiver_id == b)
            || (self.sender_id == b && self.receiver_id == a)
    }
}
