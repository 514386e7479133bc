//! Marketing platform client for newsletter consent.
//!
//! The storefront talks to the marketing platform through the
//! [`MarketingClient`] capability so handlers never depend on a concrete
//! vendor. [`ExponeaClient`] implements it against the Bloomreach Engagement
//! (formerly Exponea) tracking API; [`NoopMarketingClient`] is used when no
//! credentials are configured.

use std::collections::BTreeMap;
use std::sync::Arc;

use cafe_jalu_core::Email;
use futures::future::BoxFuture;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use thiserror::Error;
use tracing::instrument;
use url::Url;

use crate::config::ExponeaConfig;

/// Free-form attributes attached to a customer or event.
pub type Properties = serde_json::Map<String, serde_json::Value>;

/// Errors that can occur when interacting with the marketing platform.
#[derive(Debug, Error)]
pub enum MarketingError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Endpoint URL could not be built.
    #[error("Invalid endpoint: {0}")]
    Url(#[from] url::ParseError),
}

/// Customer identifiers, keyed by the platform's ID name (e.g. `email_id`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CustomerIds(BTreeMap<String, String>);

impl CustomerIds {
    /// Identify a subscriber by their normalized email address.
    #[must_use]
    pub fn email(email: &Email) -> Self {
        let mut ids = BTreeMap::new();
        ids.insert("email_id".to_string(), email.normalized().into_inner());
        Self(ids)
    }

    /// Look up one identifier.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }
}

/// Marketing platform capability used by the newsletter signup.
///
/// Futures are boxed so the client can live behind `Arc<dyn MarketingClient>`.
pub trait MarketingClient: Send + Sync {
    /// Create or update a customer profile.
    fn identify<'a>(
        &'a self,
        ids: &'a CustomerIds,
        properties: &'a Properties,
    ) -> BoxFuture<'a, Result<(), MarketingError>>;

    /// Record an event for a customer.
    fn track<'a>(
        &'a self,
        event_type: &'a str,
        ids: &'a CustomerIds,
        properties: &'a Properties,
    ) -> BoxFuture<'a, Result<(), MarketingError>>;
}

/// Shared handle stored in application state.
pub type SharedMarketingClient = Arc<dyn MarketingClient>;

// =============================================================================
// Consent
// =============================================================================

/// Name of the event recording a marketing opt-in.
pub const CONSENT_EVENT: &str = "consent";

/// Attributes sent with `identify` for a newsletter subscriber.
#[must_use]
pub fn subscriber_attributes(email: &Email, data_source: &str) -> Properties {
    let mut properties = Properties::new();
    properties.insert("email".into(), email.normalized().into_inner().into());
    properties.insert("data_source".into(), data_source.into());
    properties
}

/// Attributes of the email consent event.
#[must_use]
pub fn consent_attributes(data_source: &str) -> Properties {
    let mut properties = Properties::new();
    properties.insert("category".into(), "email".into());
    properties.insert("valid_until".into(), "unlimited".into());
    properties.insert("action".into(), "accept".into());
    properties.insert("data_source".into(), data_source.into());
    properties
}

/// Identify the subscriber, then record their email consent.
///
/// The consent event is only sent once the profile update has been
/// acknowledged, so a failure never leaves an orphaned consent.
///
/// # Errors
///
/// Returns the first error reported by the marketing platform.
#[instrument(skip(client, email), fields(email = %email))]
pub async fn record_newsletter_consent(
    client: &dyn MarketingClient,
    email: &Email,
    data_source: &str,
) -> Result<(), MarketingError> {
    let ids = CustomerIds::email(email);

    client
        .identify(&ids, &subscriber_attributes(email, data_source))
        .await?;
    client
        .track(CONSENT_EVENT, &ids, &consent_attributes(data_source))
        .await?;

    tracing::info!("Newsletter consent recorded");
    Ok(())
}

// =============================================================================
// Bloomreach Engagement (Exponea)
// =============================================================================

#[derive(Serialize)]
struct CustomerUpdate<'a> {
    customer_ids: &'a CustomerIds,
    properties: &'a Properties,
}

#[derive(Serialize)]
struct CustomerEvent<'a> {
    customer_ids: &'a CustomerIds,
    event_type: &'a str,
    timestamp: f64,
    properties: &'a Properties,
}

/// Bloomreach Engagement tracking API client.
#[derive(Clone)]
pub struct ExponeaClient {
    client: reqwest::Client,
    customers_url: Url,
    events_url: Url,
    key_id: String,
    key_secret: SecretString,
}

impl ExponeaClient {
    /// Create a new tracking API client.
    ///
    /// # Errors
    ///
    /// Returns error if the endpoint URLs cannot be built or the HTTP client
    /// fails to build.
    pub fn new(config: &ExponeaConfig) -> Result<Self, MarketingError> {
        let project = format!("track/v2/projects/{}/", config.project_token);
        let project_url = config.api_base.join(&project)?;

        Ok(Self {
            client: reqwest::Client::builder().build()?,
            customers_url: project_url.join("customers")?,
            events_url: project_url.join("customers/events")?,
            key_id: config.key_id.clone(),
            key_secret: config.key_secret.clone(),
        })
    }

    async fn post<T: Serialize + Sync>(&self, url: &Url, body: &T) -> Result<(), MarketingError> {
        let response = self
            .client
            .post(url.clone())
            .basic_auth(&self.key_id, Some(self.key_secret.expose_secret()))
            .json(body)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(MarketingError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(())
    }
}

impl MarketingClient for ExponeaClient {
    fn identify<'a>(
        &'a self,
        ids: &'a CustomerIds,
        properties: &'a Properties,
    ) -> BoxFuture<'a, Result<(), MarketingError>> {
        Box::pin(async move {
            let body = CustomerUpdate {
                customer_ids: ids,
                properties,
            };
            self.post(&self.customers_url, &body).await
        })
    }

    fn track<'a>(
        &'a self,
        event_type: &'a str,
        ids: &'a CustomerIds,
        properties: &'a Properties,
    ) -> BoxFuture<'a, Result<(), MarketingError>> {
        Box::pin(async move {
            #[allow(clippy::cast_precision_loss)] // Millisecond timestamps fit in f64
            let timestamp = chrono::Utc::now().timestamp_millis() as f64 / 1000.0;
            let body = CustomerEvent {
                customer_ids: ids,
                event_type,
                timestamp,
                properties,
            };
            self.post(&self.events_url, &body).await
        })
    }
}

// =============================================================================
// No-op client
// =============================================================================

/// Client used when the marketing platform is not configured.
///
/// Accepts every call so local development works without credentials.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMarketingClient;

impl MarketingClient for NoopMarketingClient {
    fn identify<'a>(
        &'a self,
        ids: &'a CustomerIds,
        _properties: &'a Properties,
    ) -> BoxFuture<'a, Result<(), MarketingError>> {
        tracing::warn!(?ids, "Marketing client not configured, identify dropped");
        Box::pin(async { Ok(()) })
    }

    fn track<'a>(
        &'a self,
        event_type: &'a str,
        _ids: &'a CustomerIds,
        _properties: &'a Properties,
    ) -> BoxFuture<'a, Result<(), MarketingError>> {
        tracing::warn!(event_type, "Marketing client not configured, event dropped");
        Box::pin(async { Ok(()) })
    }
}
