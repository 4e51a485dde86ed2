use crate::error::AppError;
use crate::repository::ContactRegistry;
use std::sync::Arc;
use uuid::Uuid;

/// The single choke-point answering "may sender message receiver now?".
///
/// Consulted before every message persistence. It reads only the sender's
/// own row: each side of a relationship authorizes its own sends, so a
/// sender whose receiver has independently blocked them may still hold
/// `accepted` on their side. The receiver's block surfaces when the
/// receiver tries to send, not here.
#[derive(Clone)]
pub struct AuthorizationGate {
    contacts: Arc<dyn ContactRegistry>,
}

impl AuthorizationGate {
    pub fn new(contacts: Arc<dyn ContactRegistry>) -> Self {
        Self { contacts }
    }

    pub async fn can_send_message(
        &self,
        sender: Uuid,
        receiver: Uuid,
    ) -> Result<bool, AppError> {
        let row = self.contacts.find_by_peer(sender, receiver).await?;
        Ok(row.map(|c| c.status.allows_sending()).unwrap_or(false))
    }
}
