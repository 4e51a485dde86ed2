use crate::error::AppError;
use crate::metrics;
use crate::models::{Contact, ContactStatus};
use crate::repository::{ContactRegistry, UserDirectory};
use crate::websocket::{PresenceRegistry, WsOutboundEvent};
use std::sync::Arc;
use uuid::Uuid;

/// Contact lifecycle operations: validation first, then the registry, then a
/// best-effort push to the affected peer.
pub struct ContactService {
    contacts: Arc<dyn ContactRegistry>,
    users: Arc<dyn UserDirectory>,
    presence: PresenceRegistry,
}

impl ContactService {
    pub fn new(
        contacts: Arc<dyn ContactRegistry>,
        users: Arc<dyn UserDirectory>,
        presence: PresenceRegistry,
    ) -> Self {
        Self {
            contacts,
            users,
            presence,
        }
    }

    pub async fn add_contact(
        &self,
        owner: Uuid,
        peer: Uuid,
    ) -> Result<(Contact, Contact), AppError> {
        if owner == peer {
            return Err(AppError::BadRequest(
                "cannot add yourself as a contact".into(),
            ));
        }
        if !self.users.exists(peer).await? {
            return Err(AppError::NotFound);
        }

        let (own, mirror) = self.contacts.create_pair(owner, peer).await?;
        metrics::observe_contact_transition("requested");

        self.push_to_peer(
            peer,
            WsOutboundEvent::ContactRequest {
                contact_id: mirror.id,
                from: owner,
                created_at: mirror.created_at.to_rfc3339(),
            },
        )
        .await;

        Ok((own, mirror))
    }

    pub async fn list_contacts(&self, owner: Uuid) -> Result<Vec<Contact>, AppError> {
        self.contacts.list(owner).await
    }

    pub async fn incoming_requests(&self, owner: Uuid) -> Result<Vec<Contact>, AppError> {
        let mut contacts = self.contacts.list(owner).await?;
        contacts.retain(|c| c.status == ContactStatus::IncomingRequest);
        Ok(contacts)
    }

    pub async fn outgoing_requests(&self, owner: Uuid) -> Result<Vec<Contact>, AppError> {
        let mut contacts = self.contacts.list(owner).await?;
        contacts.retain(|c| c.status == ContactStatus::OutgoingRequest);
        Ok(contacts)
    }

    pub async fn accept_request(
        &self,
        owner: Uuid,
        contact_id: Uuid,
    ) -> Result<Contact, AppError> {
        let contact = self.contacts.accept(owner, contact_id).await?;
        metrics::observe_contact_transition("accepted");

        self.push_to_peer(
            contact.peer_id,
            WsOutboundEvent::ContactAccepted {
                contact_id: contact.id,
                by: owner,
            },
        )
        .await;

        Ok(contact)
    }

    pub async fn reject_request(
        &self,
        owner: Uuid,
        contact_id: Uuid,
    ) -> Result<Contact, AppError> {
        let contact = self.contacts.reject(owner, contact_id).await?;
        metrics::observe_contact_transition("rejected");
        Ok(contact)
    }

    pub async fn set_blocked(
        &self,
        owner: Uuid,
        peer: Uuid,
        blocked: bool,
    ) -> Result<Contact, AppError> {
        let contact = self.contacts.set_blocked(owner, peer, blocked).await?;
        metrics::observe_contact_transition(if blocked { "blocked" } else { "unblocked" });
        Ok(contact)
    }

    pub async fn delete_contact(&self, owner: Uuid, peer: Uuid) -> Result<(), AppError> {
        self.contacts.delete(owner, peer).await?;
        metrics::observe_contact_transition("deleted");
        Ok(())
    }

    /// Contact pushes share the delivery discipline of message fan-out:
    /// the registry write has already committed, so failures here are
    /// logged and swallowed.
    async fn push_to_peer(&self, peer: Uuid, event: WsOutboundEvent) {
        match event.to_json() {
            Ok(payload) => {
                self.presence.notify(peer, &payload).await;
            }
            Err(e) => {
                tracing::error!(error = %e, %peer, "failed to encode contact event");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{MemoryContactRegistry, MemoryUserDirectory};

    async fn service_with_users(n: usize) -> (ContactService, Vec<Uuid>) {
        let users = Arc::new(MemoryUserDirectory::new());
        let mut ids = Vec::new();
        for _ in 0..n {
            let id = Uuid::new_v4();
            users.register(id).await;
            ids.push(id);
        }

        let service = ContactService::new(
            Arc::new(MemoryContactRegistry::new()),
            users,
            PresenceRegistry::new(),
        );
        (service, ids)
    }

    #[tokio::test]
    async fn add_contact_rejects_self_reference() {
        let (service, ids) = service_with_users(1).await;
        let err = service.add_contact(ids[0], ids[0]).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn add_contact_requires_a_known_peer() {
        let (service, ids) = service_with_users(1).await;
        let err = service.add_contact(ids[0], Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound));
    }

    #[tokio::test]
    async fn filtered_views_split_pending_requests_by_direction() {
        let (service, ids) = service_with_users(2).await;
        service.add_contact(ids[0], ids[1]).await.unwrap();

        let outgoing = service.outgoing_requests(ids[0]).await.unwrap();
        assert_eq!(outgoing.len(), 1);
        assert_eq!(outgoing[0].peer_id, ids[1]);
        assert!(service.incoming_requests(ids[0]).await.unwrap().is_empty());

        let incoming = service.incoming_requests(ids[1]).await.unwrap();
        assert_eq!(incoming.len(), 1);
        assert_eq!(incoming[0].peer_id, ids[0]);
        assert!(service.outgoing_requests(ids[1]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn accepting_clears_both_pending_views() {
        let (service, ids) = service_with_users(2).await;
        let (_, mirror) = service.add_contact(ids[0], ids[1]).await.unwrap();
        service.accept_request(ids[1], mirror.id).await.unwrap();

        assert!(service.outgoing_requests(ids[0]).await.unwrap().is_empty());
        assert!(service.incoming_requests(ids[1]).await.unwrap().is_empty());

        let contacts = service.list_contacts(ids[0]).await.unwrap();
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].status, ContactStatus::Accepted);
    }

    #[tokio::test]
    async fn online_peer_is_pushed_request_and_accept_events() {
        let users = Arc::new(MemoryUserDirectory::new());
        let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
        users.register(alice).await;
        users.register(bob).await;

        let presence = PresenceRegistry::new();
        let service = ContactService::new(
            Arc::new(MemoryContactRegistry::new()),
            users,
            presence.clone(),
        );

        let (_conn_bob, mut bob_rx) = presence.join(bob).await;
        let (_conn_alice, mut alice_rx) = presence.join(alice).await;

        let (_, mirror) = service.add_contact(alice, bob).await.unwrap();
        let pushed: serde_json::Value =
            serde_json::from_str(&bob_rx.recv().await.unwrap()).unwrap();
        assert_eq!(pushed["type"], "contact.request");
        assert_eq!(pushed["from"], alice.to_string());

        service.accept_request(bob, mirror.id).await.unwrap();
        let pushed: serde_json::Value =
            serde_json::from_str(&alice_rx.recv().await.unwrap()).unwrap();
        assert_eq!(pushed["type"], "contact.accepted");
        assert_eq!(pushed["by"], bob.to_string());
    }
}
