use crate::error::AppError;
use crate::models::{BlockTransition, Contact, ContactStatus, Message};
use crate::repository::{ContactRegistry, MessageStore, UserDirectory};
use deadpool_postgres::Pool;
use tokio_postgres::error::SqlState;
use tokio_postgres::Row;
use uuid::Uuid;

fn contact_from_row(row: &Row) -> Result<Contact, AppError> {
    let status_str: String = row.get("status");
    let status = ContactStatus::from_db(&status_str)
        .ok_or_else(|| AppError::Database(format!("unknown contact status: {status_str}")))?;
    let prior_str: Option<String> = row.get("prior_status");
    let prior_status = match prior_str {
        Some(s) => Some(
            ContactStatus::from_db(&s)
                .ok_or_else(|| AppError::Database(format!("unknown prior status: {s}")))?,
        ),
        None => None,
    };

    Ok(Contact {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        peer_id: row.get("peer_id"),
        status,
        prior_status,
        created_at: row.get("created_at"),
    })
}

fn message_from_row(row: &Row) -> Message {
    Message {
        id: row.get("id"),
        sender_id: row.get("sender_id"),
        receiver_id: row.get("receiver_id"),
        content: row.get("content"),
        nonce: row.get("nonce"),
        created_at: row.get("created_at"),
    }
}

/// Maps the `(owner_id, peer_id)` unique violation raised by pair-creation
/// races that slip past the existence pre-check.
fn map_unique_violation(e: tokio_postgres::Error) -> AppError {
    if e.code() == Some(&SqlState::UNIQUE_VIOLATION) {
        AppError::Conflict("a contact relationship already exists between these users".into())
    } else {
        AppError::from(e)
    }
}

pub struct PgContactRegistry {
    pool: Pool,
}

impl PgContactRegistry {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ContactRegistry for PgContactRegistry {
    async fn create_pair(
        &self,
        owner: Uuid,
        peer: Uuid,
    ) -> Result<(Contact, Contact), AppError> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;

        let existing = tx
            .query_opt(
                r#"
                SELECT 1 FROM contacts
                WHERE (owner_id = $1 AND peer_id = $2) OR (owner_id = $2 AND peer_id = $1)
                LIMIT 1
                "#,
                &[&owner, &peer],
            )
            .await?;
        if existing.is_some() {
            return Err(AppError::Conflict(
                "a contact relationship already exists between these users".into(),
            ));
        }

        let own_row = tx
            .query_one(
                r#"
                INSERT INTO contacts (id, owner_id, peer_id, status)
                VALUES ($1, $2, $3, $4)
                RETURNING id, owner_id, peer_id, status, prior_status, created_at
                "#,
                &[
                    &Uuid::new_v4(),
                    &owner,
                    &peer,
                    &ContactStatus::OutgoingRequest.as_db(),
                ],
            )
            .await
            .map_err(map_unique_violation)?;
        let mirror_row = tx
            .query_one(
                r#"
                INSERT INTO contacts (id, owner_id, peer_id, status)
                VALUES ($1, $2, $3, $4)
                RETURNING id, owner_id, peer_id, status, prior_status, created_at
                "#,
                &[
                    &Uuid::new_v4(),
                    &peer,
                    &owner,
                    &ContactStatus::IncomingRequest.as_db(),
                ],
            )
            .await
            .map_err(map_unique_violation)?;

        tx.commit().await?;

        Ok((contact_from_row(&own_row)?, contact_from_row(&mirror_row)?))
    }

    async fn list(&self, owner: Uuid) -> Result<Vec<Contact>, AppError> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                r#"
                SELECT id, owner_id, peer_id, status, prior_status, created_at
                FROM contacts
                WHERE owner_id = $1
                ORDER BY created_at DESC
                "#,
                &[&owner],
            )
            .await?;

        rows.iter().map(contact_from_row).collect()
    }

    async fn find_by_id(
        &self,
        owner: Uuid,
        contact_id: Uuid,
    ) -> Result<Option<Contact>, AppError> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                r#"
                SELECT id, owner_id, peer_id, status, prior_status, created_at
                FROM contacts
                WHERE id = $1 AND owner_id = $2
                "#,
                &[&contact_id, &owner],
            )
            .await?;

        row.as_ref().map(contact_from_row).transpose()
    }

    async fn find_by_peer(&self, owner: Uuid, peer: Uuid) -> Result<Option<Contact>, AppError> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                r#"
                SELECT id, owner_id, peer_id, status, prior_status, created_at
                FROM contacts
                WHERE owner_id = $1 AND peer_id = $2
                "#,
                &[&owner, &peer],
            )
            .await?;

        row.as_ref().map(contact_from_row).transpose()
    }

    async fn accept(&self, owner: Uuid, contact_id: Uuid) -> Result<Contact, AppError> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;

        let row = tx
            .query_opt(
                r#"
                SELECT id, owner_id, peer_id, status, prior_status, created_at
                FROM contacts
                WHERE id = $1 AND owner_id = $2
                FOR UPDATE
                "#,
                &[&contact_id, &owner],
            )
            .await?
            .ok_or(AppError::NotFound)?;
        let contact = contact_from_row(&row)?;

        if !contact.status.is_pending_incoming() {
            return Err(AppError::InvalidState(format!(
                "cannot accept a contact in status {}",
                contact.status.as_db()
            )));
        }

        let updated = tx
            .query_one(
                r#"
                UPDATE contacts SET status = $3, prior_status = NULL
                WHERE id = $1 AND owner_id = $2
                RETURNING id, owner_id, peer_id, status, prior_status, created_at
                "#,
                &[&contact_id, &owner, &ContactStatus::Accepted.as_db()],
            )
            .await?;

        // Mirrored requester row: flip the pending request, or advance the
        // saved restore status when the requester blocked in the meantime.
        tx.execute(
            r#"
            UPDATE contacts SET status = $3
            WHERE owner_id = $1 AND peer_id = $2 AND status = $4
            "#,
            &[
                &contact.peer_id,
                &owner,
                &ContactStatus::Accepted.as_db(),
                &ContactStatus::OutgoingRequest.as_db(),
            ],
        )
        .await?;
        tx.execute(
            r#"
            UPDATE contacts SET prior_status = $3
            WHERE owner_id = $1 AND peer_id = $2 AND status = $4 AND prior_status = $5
            "#,
            &[
                &contact.peer_id,
                &owner,
                &ContactStatus::Accepted.as_db(),
                &ContactStatus::Blocked.as_db(),
                &ContactStatus::OutgoingRequest.as_db(),
            ],
        )
        .await?;

        tx.commit().await?;

        contact_from_row(&updated)
    }

    async fn reject(&self, owner: Uuid, contact_id: Uuid) -> Result<Contact, AppError> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;

        let row = tx
            .query_opt(
                r#"
                SELECT id, owner_id, peer_id, status, prior_status, created_at
                FROM contacts
                WHERE id = $1 AND owner_id = $2
                FOR UPDATE
                "#,
                &[&contact_id, &owner],
            )
            .await?
            .ok_or(AppError::NotFound)?;
        let contact = contact_from_row(&row)?;

        if !contact.status.is_pending_incoming() {
            return Err(AppError::InvalidState(format!(
                "cannot reject a contact in status {}",
                contact.status.as_db()
            )));
        }

        let updated = tx
            .query_one(
                r#"
                UPDATE contacts SET status = $3, prior_status = NULL
                WHERE id = $1 AND owner_id = $2
                RETURNING id, owner_id, peer_id, status, prior_status, created_at
                "#,
                &[&contact_id, &owner, &ContactStatus::Rejected.as_db()],
            )
            .await?;

        tx.commit().await?;

        contact_from_row(&updated)
    }

    async fn set_blocked(
        &self,
        owner: Uuid,
        peer: Uuid,
        blocked: bool,
    ) -> Result<Contact, AppError> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;

        let row = tx
            .query_opt(
                r#"
                SELECT id, owner_id, peer_id, status, prior_status, created_at
                FROM contacts
                WHERE owner_id = $1 AND peer_id = $2
                FOR UPDATE
                "#,
                &[&owner, &peer],
            )
            .await?
            .ok_or(AppError::NotFound)?;
        let contact = contact_from_row(&row)?;

        let (status, prior_status) = match contact.block_transition(blocked) {
            BlockTransition::Noop => {
                tx.commit().await?;
                return Ok(contact);
            }
            BlockTransition::Apply {
                status,
                prior_status,
            } => (status, prior_status),
        };

        let updated = tx
            .query_one(
                r#"
                UPDATE contacts SET status = $3, prior_status = $4
                WHERE owner_id = $1 AND peer_id = $2
                RETURNING id, owner_id, peer_id, status, prior_status, created_at
                "#,
                &[
                    &owner,
                    &peer,
                    &status.as_db(),
                    &prior_status.map(|s| s.as_db()),
                ],
            )
            .await?;

        tx.commit().await?;

        contact_from_row(&updated)
    }

    async fn delete(&self, owner: Uuid, peer: Uuid) -> Result<(), AppError> {
        let client = self.pool.get().await?;
        let deleted = client
            .execute(
                "DELETE FROM contacts WHERE owner_id = $1 AND peer_id = $2",
                &[&owner, &peer],
            )
            .await?;

        if deleted == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }
}

pub struct PgMessageStore {
    pool: Pool,
}

impl PgMessageStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl MessageStore for PgMessageStore {
    async fn append(
        &self,
        sender: Uuid,
        receiver: Uuid,
        content: String,
        nonce: Option<String>,
    ) -> Result<Message, AppError> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                r#"
                INSERT INTO messages (sender_id, receiver_id, content, nonce)
                VALUES ($1, $2, $3, $4)
                RETURNING id, sender_id, receiver_id, content, nonce, created_at
                "#,
                &[&sender, &receiver, &content, &nonce],
            )
            .await?;

        Ok(message_from_row(&row))
    }

    async fn conversation(&self, a: Uuid, b: Uuid) -> Result<Vec<Message>, AppError> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                r#"
                SELECT id, sender_id, receiver_id, content, nonce, created_at
                FROM messages
                WHERE (sender_id = $1 AND receiver_id = $2)
                   OR (sender_id = $2 AND receiver_id = $1)
                ORDER BY created_at ASC, id ASC
                "#,
                &[&a, &b],
            )
            .await?;

        Ok(rows.iter().map(message_from_row).collect())
    }
}

pub struct PgUserDirectory {
    pool: Pool,
}

impl PgUserDirectory {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl UserDirectory for PgUserDirectory {
    async fn exists(&self, user_id: Uuid) -> Result<bool, AppError> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt("SELECT 1 FROM users WHERE id = $1", &[&user_id])
            .await?;

        Ok(row.is_some())
    }
}
