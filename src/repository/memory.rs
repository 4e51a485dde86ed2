//! In-memory backends.
//!
//! Every mutating contact operation holds the write lock for its whole
//! critical section, which gives dual-row operations the same atomicity the
//! Postgres backend gets from transactions. Used by the test suite and for
//! embedded deployments.

use crate::error::AppError;
use crate::models::{BlockTransition, Contact, ContactStatus, Message};
use crate::repository::{ContactRegistry, MessageStore, UserDirectory};
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryContactRegistry {
    // keyed by (owner_id, peer_id); at most one row per ordered pair
    rows: RwLock<HashMap<(Uuid, Uuid), Contact>>,
}

impl MemoryContactRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl ContactRegistry for MemoryContactRegistry {
    async fn create_pair(
        &self,
        owner: Uuid,
        peer: Uuid,
    ) -> Result<(Contact, Contact), AppError> {
        let mut rows = self.rows.write().await;

        if rows.contains_key(&(owner, peer)) || rows.contains_key(&(peer, owner)) {
            return Err(AppError::Conflict(
                "a contact relationship already exists between these users".into(),
            ));
        }

        let own = Contact::new(owner, peer, ContactStatus::OutgoingRequest);
        let mirror = Contact::new(peer, owner, ContactStatus::IncomingRequest);
        rows.insert((owner, peer), own.clone());
        rows.insert((peer, owner), mirror.clone());

        Ok((own, mirror))
    }

    async fn list(&self, owner: Uuid) -> Result<Vec<Contact>, AppError> {
        let rows = self.rows.read().await;
        Ok(rows
            .values()
            .filter(|c| c.owner_id == owner)
            .cloned()
            .collect())
    }

    async fn find_by_id(
        &self,
        owner: Uuid,
        contact_id: Uuid,
    ) -> Result<Option<Contact>, AppError> {
        let rows = self.rows.read().await;
        Ok(rows
            .values()
            .find(|c| c.owner_id == owner && c.id == contact_id)
            .cloned())
    }

    async fn find_by_peer(&self, owner: Uuid, peer: Uuid) -> Result<Option<Contact>, AppError> {
        let rows = self.rows.read().await;
        Ok(rows.get(&(owner, peer)).cloned())
    }

    async fn accept(&self, owner: Uuid, contact_id: Uuid) -> Result<Contact, AppError> {
        let mut rows = self.rows.write().await;

        let key = rows
            .values()
            .find(|c| c.owner_id == owner && c.id == contact_id)
            .map(|c| (c.owner_id, c.peer_id))
            .ok_or(AppError::NotFound)?;

        let contact = rows.get_mut(&key).ok_or(AppError::NotFound)?;
        if !contact.status.is_pending_incoming() {
            return Err(AppError::InvalidState(format!(
                "cannot accept a contact in status {}",
                contact.status.as_db()
            )));
        }
        contact.status = ContactStatus::Accepted;
        contact.prior_status = None;
        let accepted = contact.clone();

        if let Some(mirror) = rows.get_mut(&(key.1, key.0)) {
            mirror.apply_peer_accept();
        }

        Ok(accepted)
    }

    async fn reject(&self, owner: Uuid, contact_id: Uuid) -> Result<Contact, AppError> {
        let mut rows = self.rows.write().await;

        let key = rows
            .values()
            .find(|c| c.owner_id == owner && c.id == contact_id)
            .map(|c| (c.owner_id, c.peer_id))
            .ok_or(AppError::NotFound)?;

        let contact = rows.get_mut(&key).ok_or(AppError::NotFound)?;
        if !contact.status.is_pending_incoming() {
            return Err(AppError::InvalidState(format!(
                "cannot reject a contact in status {}",
                contact.status.as_db()
            )));
        }
        contact.status = ContactStatus::Rejected;
        contact.prior_status = None;

        Ok(contact.clone())
    }

    async fn set_blocked(
        &self,
        owner: Uuid,
        peer: Uuid,
        blocked: bool,
    ) -> Result<Contact, AppError> {
        let mut rows = self.rows.write().await;
        let contact = rows.get_mut(&(owner, peer)).ok_or(AppError::NotFound)?;

        if let BlockTransition::Apply {
            status,
            prior_status,
        } = contact.block_transition(blocked)
        {
            contact.status = status;
            contact.prior_status = prior_status;
        }

        Ok(contact.clone())
    }

    async fn delete(&self, owner: Uuid, peer: Uuid) -> Result<(), AppError> {
        let mut rows = self.rows.write().await;
        rows.remove(&(owner, peer)).ok_or(AppError::NotFound)?;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryMessageStore {
    next_id: AtomicI64,
    messages: RwLock<Vec<Message>>,
}

impl MemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl MessageStore for MemoryMessageStore {
    async fn append(
        &self,
        sender: Uuid,
        receiver: Uuid,
        content: String,
        nonce: Option<String>,
    ) -> Result<Message, AppError> {
        let message = Message {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            sender_id: sender,
            receiver_id: receiver,
            content,
            nonce,
            created_at: Utc::now(),
        };

        self.messages.write().await.push(message.clone());
        Ok(message)
    }

    async fn conversation(&self, a: Uuid, b: Uuid) -> Result<Vec<Message>, AppError> {
        let messages = self.messages.read().await;
        let mut result: Vec<Message> = messages.iter().filter(|m| m.between(a, b)).cloned().collect();
        result.sort_by_key(|m| (m.created_at, m.id));
        Ok(result)
    }
}

#[derive(Default)]
pub struct MemoryUserDirectory {
    users: RwLock<HashSet<Uuid>>,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, user_id: Uuid) {
        self.users.write().await.insert(user_id);
    }
}

#[async_trait::async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn exists(&self, user_id: Uuid) -> Result<bool, AppError> {
        Ok(self.users.read().await.contains(&user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_pair_yields_complementary_rows() {
        let registry = MemoryContactRegistry::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        let (own, mirror) = registry.create_pair(a, b).await.unwrap();
        assert_eq!(own.owner_id, a);
        assert_eq!(own.peer_id, b);
        assert_eq!(own.status, ContactStatus::OutgoingRequest);
        assert_eq!(mirror.owner_id, b);
        assert_eq!(mirror.peer_id, a);
        assert_eq!(mirror.status, ContactStatus::IncomingRequest);
    }

    #[tokio::test]
    async fn create_pair_conflicts_in_both_directions() {
        let registry = MemoryContactRegistry::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        registry.create_pair(a, b).await.unwrap();

        assert!(matches!(
            registry.create_pair(a, b).await,
            Err(AppError::Conflict(_))
        ));
        assert!(matches!(
            registry.create_pair(b, a).await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn accept_flips_both_rows_atomically() {
        let registry = MemoryContactRegistry::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let (_, mirror) = registry.create_pair(a, b).await.unwrap();

        let accepted = registry.accept(b, mirror.id).await.unwrap();
        assert_eq!(accepted.status, ContactStatus::Accepted);

        let requester_row = registry.find_by_peer(a, b).await.unwrap().unwrap();
        assert_eq!(requester_row.status, ContactStatus::Accepted);
    }

    #[tokio::test]
    async fn accept_requires_pending_incoming_status() {
        let registry = MemoryContactRegistry::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let (own, mirror) = registry.create_pair(a, b).await.unwrap();

        // the requester cannot accept their own outgoing request
        assert!(matches!(
            registry.accept(a, own.id).await,
            Err(AppError::InvalidState(_))
        ));

        registry.accept(b, mirror.id).await.unwrap();
        // accepting twice is not valid either
        assert!(matches!(
            registry.accept(b, mirror.id).await,
            Err(AppError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn accept_unknown_contact_is_not_found() {
        let registry = MemoryContactRegistry::new();
        assert!(matches!(
            registry.accept(Uuid::new_v4(), Uuid::new_v4()).await,
            Err(AppError::NotFound)
        ));
    }

    #[tokio::test]
    async fn reject_touches_only_the_owner_row() {
        let registry = MemoryContactRegistry::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let (_, mirror) = registry.create_pair(a, b).await.unwrap();

        let rejected = registry.reject(b, mirror.id).await.unwrap();
        assert_eq!(rejected.status, ContactStatus::Rejected);

        let requester_row = registry.find_by_peer(a, b).await.unwrap().unwrap();
        assert_eq!(requester_row.status, ContactStatus::OutgoingRequest);
    }

    #[tokio::test]
    async fn block_then_unblock_restores_prior_status() {
        let registry = MemoryContactRegistry::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let (_, mirror) = registry.create_pair(a, b).await.unwrap();
        registry.accept(b, mirror.id).await.unwrap();

        let blocked = registry.set_blocked(a, b, true).await.unwrap();
        assert_eq!(blocked.status, ContactStatus::Blocked);

        let restored = registry.set_blocked(a, b, false).await.unwrap();
        assert_eq!(restored.status, ContactStatus::Accepted);
        assert_eq!(restored.prior_status, None);
    }

    #[tokio::test]
    async fn set_blocked_is_idempotent() {
        let registry = MemoryContactRegistry::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        registry.create_pair(a, b).await.unwrap();

        registry.set_blocked(a, b, true).await.unwrap();
        let again = registry.set_blocked(a, b, true).await.unwrap();
        assert_eq!(again.status, ContactStatus::Blocked);
        assert_eq!(again.prior_status, Some(ContactStatus::OutgoingRequest));

        let unblocked = registry.set_blocked(a, b, false).await.unwrap();
        assert_eq!(unblocked.status, ContactStatus::OutgoingRequest);
    }

    #[tokio::test]
    async fn delete_removes_only_the_caller_row() {
        let registry = MemoryContactRegistry::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let (_, mirror) = registry.create_pair(a, b).await.unwrap();
        registry.accept(b, mirror.id).await.unwrap();

        registry.delete(a, b).await.unwrap();

        assert!(registry.find_by_peer(a, b).await.unwrap().is_none());
        let peer_row = registry.find_by_peer(b, a).await.unwrap().unwrap();
        assert_eq!(peer_row.status, ContactStatus::Accepted);

        // deleting again is NotFound, as is an accept racing the delete
        assert!(matches!(
            registry.delete(a, b).await,
            Err(AppError::NotFound)
        ));
    }

    #[tokio::test]
    async fn accept_after_delete_is_not_found() {
        let registry = MemoryContactRegistry::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let (_, mirror) = registry.create_pair(a, b).await.unwrap();

        registry.delete(b, a).await.unwrap();

        assert!(matches!(
            registry.accept(b, mirror.id).await,
            Err(AppError::NotFound)
        ));
    }

    #[tokio::test]
    async fn message_ids_are_monotonic_and_conversation_is_ordered() {
        let store = MemoryMessageStore::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        let first = store.append(a, b, "one".into(), None).await.unwrap();
        let second = store.append(b, a, "two".into(), None).await.unwrap();
        let third = store.append(a, b, "three".into(), None).await.unwrap();
        assert!(first.id < second.id && second.id < third.id);

        let conversation = store.conversation(b, a).await.unwrap();
        let contents: Vec<&str> = conversation.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn conversation_excludes_other_pairs() {
        let store = MemoryMessageStore::new();
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        store.append(a, b, "for b".into(), None).await.unwrap();
        store.append(a, c, "for c".into(), None).await.unwrap();

        let conversation = store.conversation(a, b).await.unwrap();
        assert_eq!(conversation.len(), 1);
        assert_eq!(conversation[0].content, "for b");
    }

    #[tokio::test]
    async fn directory_reports_registered_users_only() {
        let directory = MemoryUserDirectory::new();
        let known = Uuid::new_v4();
        directory.register(known).await;

        assert!(directory.exists(known).await.unwrap());
        assert!(!directory.exists(Uuid::new_v4()).await.unwrap());
    }
}
