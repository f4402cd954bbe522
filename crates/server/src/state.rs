//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::db::{CatalogRepository, UserRepository};
use crate::services::{
    AuthError, CatalogService, CredentialStore, PasswordPolicy, TokenError, TokenService,
};

/// Error assembling the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("token settings: {0}")]
    Token(#[from] TokenError),
    #[error("credential store: {0}")]
    Credentials(#[from] AuthError),
}

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. Services are constructed once here and
/// handed to handlers through the accessors.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    credentials: CredentialStore,
    tokens: TokenService,
    catalog: CatalogService,
}

impl AppState {
    /// Create the state over a single store that holds users and the catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the token settings are invalid or the dummy
    /// password hash cannot be computed.
    pub fn new<S>(
        config: &ServerConfig,
        store: Arc<S>,
        policy: PasswordPolicy,
    ) -> Result<Self, StateError>
    where
        S: UserRepository + CatalogRepository + 'static,
    {
        let tokens = TokenService::new(config.token_settings()?);
        let credentials = CredentialStore::new(store.clone(), policy)?;
        let catalog = CatalogService::new(store);
        Ok(Self::with_services(credentials, tokens, catalog))
    }

    /// Create the state from already constructed services.
    #[must_use]
    pub fn with_services(
        credentials: CredentialStore,
        tokens: TokenService,
        catalog: CatalogService,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                credentials,
                tokens,
                catalog,
            }),
        }
    }

    #[must_use]
    pub fn credentials(&self) -> &CredentialStore {
        &self.inner.credentials
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenService {
        &self.inner.tokens
    }

    #[must_use]
    pub fn catalog(&self) -> &CatalogService {
        &self.inner.catalog
    }
}
