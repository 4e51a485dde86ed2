use crate::error::AppError;
use crate::models::{Contact, Message};
use uuid::Uuid;

pub mod memory;
pub mod postgres;

pub use memory::{MemoryContactRegistry, MemoryMessageStore, MemoryUserDirectory};
pub use postgres::{PgContactRegistry, PgMessageStore, PgUserDirectory};

/// Owns contact rows and their state transitions.
///
/// Every mutating operation that touches both sides of a relationship
/// (`create_pair`, `accept`) is atomic with respect to concurrent mutations
/// on the same pair; a racer that finds the row gone gets `NotFound`.
#[async_trait::async_trait]
pub trait ContactRegistry: Send + Sync {
    /// Creates the owner's `outgoing_request` row and the peer's
    /// `incoming_request` row as one unit. `Conflict` when any row already
    /// exists between the two users, in either direction.
    async fn create_pair(&self, owner: Uuid, peer: Uuid)
        -> Result<(Contact, Contact), AppError>;

    /// All rows owned by `owner`, no guaranteed order.
    async fn list(&self, owner: Uuid) -> Result<Vec<Contact>, AppError>;

    async fn find_by_id(&self, owner: Uuid, contact_id: Uuid)
        -> Result<Option<Contact>, AppError>;

    async fn find_by_peer(&self, owner: Uuid, peer: Uuid) -> Result<Option<Contact>, AppError>;

    /// Flips the owner's pending incoming request and the mirrored peer row
    /// to `accepted` in one unit. `NotFound` if the row does not exist or is
    /// not owned by `owner`; `InvalidState` unless the row is a pending
    /// incoming request.
    async fn accept(&self, owner: Uuid, contact_id: Uuid) -> Result<Contact, AppError>;

    /// Marks the owner's pending incoming request `rejected`. The
    /// requester's mirrored row is left untouched.
    async fn reject(&self, owner: Uuid, contact_id: Uuid) -> Result<Contact, AppError>;

    /// Blocks or unblocks the owner's row for `peer`. Idempotent when the
    /// row is already in the requested state; unblock restores the status
    /// saved at block time.
    async fn set_blocked(&self, owner: Uuid, peer: Uuid, blocked: bool)
        -> Result<Contact, AppError>;

    /// Removes only the owner's row. The peer's row, if any, is untouched.
    async fn delete(&self, owner: Uuid, peer: Uuid) -> Result<(), AppError>;
}

/// Append-only message log. Knows nothing about authorization.
#[async_trait::async_trait]
pub trait MessageStore: Send + Sync {
    async fn append(
        &self,
        sender: Uuid,
        receiver: Uuid,
        content: String,
        nonce: Option<String>,
    ) -> Result<Message, AppError>;

    /// Every message exchanged between `a` and `b` in either direction,
    /// ordered by timestamp then id.
    async fn conversation(&self, a: Uuid, b: Uuid) -> Result<Vec<Message>, AppError>;
}

/// Existence checks against the externally owned user set.
#[async_trait::async_trait]
pub trait UserDirectory: Send + Sync {
    async fn exists(&self, user_id: Uuid) -> Result<bool, AppError>;
}
