//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::StorefrontConfig;
use crate::services::{
    ExponeaClient, MarketingError, NoopMarketingClient, SharedMarketingClient,
};
use crate::shopify::StorefrontClient;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// Storefront API client, the marketing client, and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    storefront: StorefrontClient,
    marketing: SharedMarketingClient,
}

impl AppState {
    /// Create application state with clients built from `config`.
    ///
    /// Uses [`NoopMarketingClient`] when no marketing credentials are set.
    ///
    /// # Errors
    ///
    /// Returns an error if the marketing client cannot be built.
    pub fn new(config: StorefrontConfig) -> Result<Self, MarketingError> {
        let storefront = StorefrontClient::new(&config.shopify);
        let marketing: SharedMarketingClient = match &config.marketing {
            Some(exponea) => Arc::new(ExponeaClient::new(exponea)?),
            None => {
                tracing::warn!("Marketing platform not configured, newsletter signups are dropped");
                Arc::new(NoopMarketingClient)
            }
        };

        Ok(Self::with_clients(config, storefront, marketing))
    }

    /// Create application state from already-built clients.
    #[must_use]
    pub fn with_clients(
        config: StorefrontConfig,
        storefront: StorefrontClient,
        marketing: SharedMarketingClient,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                storefront,
                marketing,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the Shopify Storefront API client.
    #[must_use]
    pub fn storefront(&self) -> &StorefrontClient {
        &self.inner.storefront
    }

    /// Get a reference to the marketing platform client.
    #[must_use]
    pub fn marketing(&self) -> &SharedMarketingClient {
        &self.inner.marketing
    }
}
