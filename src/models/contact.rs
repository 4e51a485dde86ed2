use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Directed relationship status from the owner's point of view.
///
/// Each side of a relationship holds its own independently mutable row, so
/// the two sides may disagree (one side blocked, the other still accepted).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactStatus {
    OutgoingRequest,
    IncomingRequest,
    Accepted,
    Rejected,
    Blocked,
}

impl ContactStatus {
    pub fn as_db(&self) -> &'static str {
        match self {
            ContactStatus::OutgoingRequest => "outgoing_request",
            ContactStatus::IncomingRequest => "incoming_request",
            ContactStatus::Accepted => "accepted",
            ContactStatus::Rejected => "rejected",
            ContactStatus::Blocked => "blocked",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "outgoing_request" => Some(ContactStatus::OutgoingRequest),
            "incoming_request" => Some(ContactStatus::IncomingRequest),
            "accepted" => Some(ContactStatus::Accepted),
            "rejected" => Some(ContactStatus::Rejected),
            "blocked" => Some(ContactStatus::Blocked),
            _ => None,
        }
    }

    /// Accept and reject are only valid on a pending incoming request.
    pub fn is_pending_incoming(&self) -> bool {
        matches!(self, ContactStatus::IncomingRequest)
    }

    /// Only an accepted row authorizes message sends from its owner.
    pub fn allows_sending(&self) -> bool {
        matches!(self, ContactStatus::Accepted)
    }
}

/// Effect of a block/unblock request against the current row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockTransition {
    /// Already in the requested block state.
    Noop,
    Apply {
        status: ContactStatus,
        prior_status: Option<ContactStatus>,
    },
}

/// One directed contact row owned by `owner_id` about `peer_id`.
#[derive(Debug, Clone, Serialize)]
pub struct Contact {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub peer_id: Uuid,
    pub status: ContactStatus,
    /// Status held immediately before a block; never exposed to clients.
    #[serde(skip_serializing)]
    pub prior_status: Option<ContactStatus>,
    pub created_at: DateTime<Utc>,
}

impl Contact {
    pub fn new(owner_id: Uuid, peer_id: Uuid, status: ContactStatus) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            peer_id,
            status,
            prior_status: None,
            created_at: Utc::now(),
        }
    }

    /// Computes what a block/unblock request does to this row.
    ///
    /// Blocking remembers the current status so unblock can restore it.
    /// A blocked row always carries `prior_status`; if it is ever absent the
    /// restore falls back to `accepted`.
    pub fn block_transition(&self, blocked: bool) -> BlockTransition {
        match (blocked, self.status) {
            (true, ContactStatus::Blocked) => BlockTransition::Noop,
            (false, status) if status != ContactStatus::Blocked => BlockTransition::Noop,
            (true, status) => BlockTransition::Apply {
                status: ContactStatus::Blocked,
                prior_status: Some(status),
            },
            (false, _) => BlockTransition::Apply {
                status: self.prior_status.unwrap_or(ContactStatus::Accepted),
                prior_status: None,
            },
        }
    }

    /// Requester-side effect of the peer accepting the pending request.
    ///
    /// The mirrored row normally sits in `outgoing_request` and flips to
    /// `accepted`. If the requester blocked the peer while the request was
    /// pending, the block stays and only the saved restore status advances.
    pub fn apply_peer_accept(&mut self) {
        match self.status {
            ContactStatus::OutgoingRequest => {
                self.status = ContactStatus::Accepted;
                self.prior_status = None;
            }
            ContactStatus::Blocked => {
                if self.prior_status == Some(ContactStatus::OutgoingRequest) {
                    self.prior_status = Some(ContactStatus::Accepted);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(status: ContactStatus) -> Contact {
        Contact::new(Uuid::new_v4(), Uuid::new_v4(), status)
    }

    #[test]
    fn status_db_roundtrip() {
        for status in [
            ContactStatus::OutgoingRequest,
            ContactStatus::IncomingRequest,
            ContactStatus::Accepted,
            ContactStatus::Rejected,
            ContactStatus::Blocked,
        ] {
            assert_eq!(ContactStatus::from_db(status.as_db()), Some(status));
        }
        assert_eq!(ContactStatus::from_db("friends"), None);
    }

    #[test]
    fn only_accepted_allows_sending() {
        assert!(ContactStatus::Accepted.allows_sending());
        for status in [
            ContactStatus::OutgoingRequest,
            ContactStatus::IncomingRequest,
            ContactStatus::Rejected,
            ContactStatus::Blocked,
        ] {
            assert!(!status.allows_sending());
        }
    }

    #[test]
    fn block_saves_prior_status_and_unblock_restores_it() {
        let contact = row(ContactStatus::Accepted);

        let BlockTransition::Apply {
            status,
            prior_status,
        } = contact.block_transition(true)
        else {
            panic!("blocking an accepted row must apply");
        };
        assert_eq!(status, ContactStatus::Blocked);
        assert_eq!(prior_status, Some(ContactStatus::Accepted));

        let mut blocked = contact.clone();
        blocked.status = status;
        blocked.prior_status = prior_status;

        let BlockTransition::Apply {
            status,
            prior_status,
        } = blocked.block_transition(false)
        else {
            panic!("unblocking a blocked row must apply");
        };
        assert_eq!(status, ContactStatus::Accepted);
        assert_eq!(prior_status, None);
    }

    #[test]
    fn block_preserves_pending_statuses_too() {
        let contact = row(ContactStatus::IncomingRequest);
        match contact.block_transition(true) {
            BlockTransition::Apply { prior_status, .. } => {
                assert_eq!(prior_status, Some(ContactStatus::IncomingRequest));
            }
            BlockTransition::Noop => panic!("must apply"),
        }
    }

    #[test]
    fn block_and_unblock_are_idempotent() {
        let mut blocked = row(ContactStatus::Accepted);
        blocked.status = ContactStatus::Blocked;
        blocked.prior_status = Some(ContactStatus::Accepted);
        assert_eq!(blocked.block_transition(true), BlockTransition::Noop);

        let accepted = row(ContactStatus::Accepted);
        assert_eq!(accepted.block_transition(false), BlockTransition::Noop);
    }

    #[test]
    fn peer_accept_flips_outgoing_request() {
        let mut contact = row(ContactStatus::OutgoingRequest);
        contact.apply_peer_accept();
        assert_eq!(contact.status, ContactStatus::Accepted);
    }

    #[test]
    fn peer_accept_does_not_override_a_block() {
        let mut contact = row(ContactStatus::OutgoingRequest);
        contact.status = ContactStatus::Blocked;
        contact.prior_status = Some(ContactStatus::OutgoingRequest);

        contact.apply_peer_accept();

        assert_eq!(contact.status, ContactStatus::Blocked);
        assert_eq!(contact.prior_status, Some(ContactStatus::Accepted));
    }

    #[test]
    fn peer_accept_leaves_other_statuses_alone() {
        let mut rejected = row(ContactStatus::Rejected);
        rejected.apply_peer_accept();
        assert_eq!(rejected.status, ContactStatus::Rejected);
    }
}
