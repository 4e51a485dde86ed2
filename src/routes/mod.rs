// Re-export route modules
pub mod contacts;
pub mod messages;
pub mod wsroute;
