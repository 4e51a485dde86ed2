use crate::{
    config::Config,
    repository::{
        ContactRegistry, MessageStore, PgContactRegistry, PgMessageStore, PgUserDirectory,
        UserDirectory,
    },
    services::{AuthorizationGate, ContactService, DeliveryCoordinator},
    websocket::PresenceRegistry,
};
use deadpool_postgres::Pool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub contacts: Arc<ContactService>,
    pub delivery: Arc<DeliveryCoordinator>,
    pub presence: PresenceRegistry,
    pub config: Arc<Config>,
}

impl AppState {
    /// Wires the service graph from injectable backends. Tests pass the
    /// in-memory implementations here; `postgres` is the production wiring.
    pub fn new(
        contacts: Arc<dyn ContactRegistry>,
        messages: Arc<dyn MessageStore>,
        users: Arc<dyn UserDirectory>,
        config: Arc<Config>,
    ) -> Self {
        let presence = PresenceRegistry::new();
        let gate = AuthorizationGate::new(contacts.clone());

        Self {
            contacts: Arc::new(ContactService::new(contacts, users, presence.clone())),
            delivery: Arc::new(DeliveryCoordinator::new(gate, messages, presence.clone())),
            presence,
            config,
        }
    }

    pub fn postgres(pool: Pool, config: Arc<Config>) -> Self {
        Self::new(
            Arc::new(PgContactRegistry::new(pool.clone())),
            Arc::new(PgMessageStore::new(pool.clone())),
            Arc::new(PgUserDirectory::new(pool)),
            config,
        )
    }
}
