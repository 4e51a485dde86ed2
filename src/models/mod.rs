pub mod contact;
pub mod message;

pub use contact::{BlockTransition, Contact, ContactStatus};
pub use message::Message;
