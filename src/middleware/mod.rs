pub mod guards;
pub mod request_id;

pub use guards::User;
pub use request_id::RequestId;
