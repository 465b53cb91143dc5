//! Business logic services

pub mod auth;
pub mod catalog;
pub mod members;
pub mod password;
pub mod seed;
pub mod sessions;

use crate::{config::AuthConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub auth: auth::AuthService,
    pub catalog: catalog::CatalogService,
    pub members: members::MembersService,
    pub seed: seed::SeedService,
    pub sessions: sessions::SessionStore,
}

impl Services {
    /// Create all services with the given repository and session store
    pub fn new(
        repository: Repository,
        auth_config: AuthConfig,
        sessions: sessions::SessionStore,
    ) -> Self {
        let min_password_length = auth_config.min_password_length;
        Self {
            auth: auth::AuthService::new(repository.clone(), sessions.clone(), auth_config),
            catalog: catalog::CatalogService::new(repository.clone()),
            members: members::MembersService::new(
                repository.clone(),
                sessions.clone(),
                min_password_length,
            ),
            seed: seed::SeedService::new(repository, min_password_length),
            sessions,
        }
    }
}
