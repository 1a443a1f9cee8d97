/*
 * Responsibility
 * - Shared context attached to the Router (AppState)
 * - Clone-cheap: everything inside is Arc'd; config is read-only after start
 */
use std::sync::Arc;

use crate::config::Config;
use crate::repos::user_repo::UserStore;
use crate::services::auth::TokenVerifier;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub users: Arc<dyn UserStore>,
    pub verifier: Arc<dyn TokenVerifier>,
}

impl AppState {
    pub fn new(
        config: Config,
        users: Arc<dyn UserStore>,
        verifier: Arc<dyn TokenVerifier>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            users,
            verifier,
        }
    }
}
