pub mod authorization;
pub mod contact_service;
pub mod delivery_service;

pub use authorization::AuthorizationGate;
pub use contact_service::ContactService;
pub use delivery_service::DeliveryCoordinator;
