use std::sync::Arc;

use crate::config::{Config, JwtConfig};
use crate::database::{ChangeFeed, DocumentStore};
use crate::services::auth_service::TokenRevocations;

/// Shared application state handed to every handler through `web::Data`.
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub feed: ChangeFeed,
    pub jwt: JwtConfig,
    pub bcrypt_cost: u32,
    pub revocations: TokenRevocations,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>, config: &Config) -> Self {
        Self {
            store,
            feed: ChangeFeed::default(),
            jwt: config.jwt.clone(),
            bcrypt_cost: config.bcrypt_cost,
            revocations: TokenRevocations::default(),
        }
    }
}
