//! Shopify Storefront API client implementation.
//!
//! Uses `graphql_client` for type-safe queries with `reqwest` 0.13 for HTTP.
//! Caches landing page queries using `moka` (5-minute TTL).

mod cache;
pub mod queries;

use std::sync::Arc;
use std::time::Duration;

use cafe_jalu_core::Locale;
use graphql_client::{GraphQLQuery, Response};
use moka::future::Cache;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, instrument};

use crate::config::ShopifyStorefrontConfig;
use crate::shopify::types::{Collection, Image, Money, Product};
use crate::shopify::{GraphQLError, ShopifyError};

use cache::{CacheKey, CacheValue};
use queries::{FeaturedCollection, RecommendedProducts, featured_collection, recommended_products};

/// Maximum characters of a response body echoed into logs and errors.
const BODY_EXCERPT_LEN: usize = 500;

// =============================================================================
// StorefrontClient
// =============================================================================

/// Client for the Shopify Storefront API.
///
/// Provides type-safe access to the landing page queries.
/// Results are cached for 5 minutes per buyer locale.
#[derive(Clone)]
pub struct StorefrontClient {
    inner: Arc<StorefrontClientInner>,
}

struct StorefrontClientInner {
    client: reqwest::Client,
    endpoint: String,
    access_token: SecretString,
    cache: Cache<CacheKey, CacheValue>,
}

impl StorefrontClient {
    /// Create a new Storefront API client.
    #[must_use]
    pub fn new(config: &ShopifyStorefrontConfig) -> Self {
        Self::with_endpoint(config.endpoint(), config.storefront_private_token.clone())
    }

    /// Create a client for an explicit GraphQL endpoint.
    #[must_use]
    pub fn with_endpoint(endpoint: impl Into<String>, access_token: SecretString) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Self {
            inner: Arc::new(StorefrontClientInner {
                client: reqwest::Client::new(),
                endpoint: endpoint.into(),
                access_token,
                cache,
            }),
        }
    }

    /// Execute a GraphQL query.
    async fn execute<Q: GraphQLQuery>(
        &self,
        variables: Q::Variables,
    ) -> Result<Q::ResponseData, ShopifyError> {
        let request_body = Q::build_query(variables);

        let response = self
            .inner
            .client
            .post(&self.inner.endpoint)
            // Private access tokens use a different header than public tokens
            // See: https://shopify.dev/docs/storefronts/headless/building-with-the-storefront-api/getting-started
            .header(
                "Shopify-Storefront-Private-Token",
                self.inner.access_token.expose_secret(),
            )
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(ShopifyError::RateLimited(retry_after));
        }

        // Body as text first so failures can be logged verbatim
        let response_text = response.text().await?;
        let excerpt = || response_text.chars().take(BODY_EXCERPT_LEN).collect::<String>();

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %excerpt(),
                "Shopify API returned non-success status"
            );
            return Err(ShopifyError::message(format!("HTTP {status}: {}", excerpt())));
        }

        let response: Response<Q::ResponseData> = serde_json::from_str(&response_text)
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    body = %excerpt(),
                    "Failed to parse Shopify GraphQL response"
                );
                ShopifyError::Parse(e)
            })?;

        if let Some(errors) = response.errors
            && !errors.is_empty()
        {
            debug!(errors = ?errors, "GraphQL errors in response");
            return Err(ShopifyError::GraphQL(
                errors.into_iter().map(GraphQLError::from).collect(),
            ));
        }

        response.data.ok_or_else(|| {
            tracing::error!(
                body = %excerpt(),
                "Shopify GraphQL response has no data and no errors"
            );
            ShopifyError::message("No data in response")
        })
    }

    // =========================================================================
    // Landing Page Queries
    // =========================================================================

    /// Get the most recently updated collection, if the shop has any.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, locale), fields(locale = %locale.key()))]
    pub async fn featured_collection(
        &self,
        locale: &Locale,
    ) -> Result<Option<Collection>, ShopifyError> {
        let cache_key = CacheKey::FeaturedCollection(locale.clone());

        if let Some(CacheValue::FeaturedCollection(collection)) =
            self.inner.cache.get(&cache_key).await
        {
            debug!("Cache hit for featured collection");
            return Ok(collection.map(|c| *c));
        }

        let data = self
            .execute::<FeaturedCollection>(featured_collection::Variables::from(locale))
            .await?;

        let collection = data
            .collections
            .nodes
            .into_iter()
            .next()
            .map(convert_collection);

        self.inner
            .cache
            .insert(
                cache_key,
                CacheValue::FeaturedCollection(collection.clone().map(Box::new)),
            )
            .await;

        Ok(collection)
    }

    /// Get the four most recently updated products.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, locale), fields(locale = %locale.key()))]
    pub async fn recommended_products(&self, locale: &Locale) -> Result<Vec<Product>, ShopifyError> {
        let cache_key = CacheKey::RecommendedProducts(locale.clone());

        if let Some(CacheValue::RecommendedProducts(products)) =
            self.inner.cache.get(&cache_key).await
        {
            debug!("Cache hit for recommended products");
            return Ok(products);
        }

        let data = self
            .execute::<RecommendedProducts>(recommended_products::Variables::from(locale))
            .await?;

        let products: Vec<Product> = data
            .products
            .nodes
            .into_iter()
            .map(convert_product)
            .collect();

        self.inner
            .cache
            .insert(cache_key, CacheValue::RecommendedProducts(products.clone()))
            .await;

        Ok(products)
    }
}

// =============================================================================
// Conversions
// =============================================================================

/// Each query module generates its own `ImageFields` fragment struct.
macro_rules! convert_image {
    ($($module:ident),+) => {
        $(
            impl From<$module::ImageFields> for Image {
                fn from(image: $module::ImageFields) -> Self {
                    Self {
                        id: image.id,
                        url: image.url,
                        alt_text: image.alt_text,
                        width: image.width,
                        height: image.height,
                    }
                }
            }
        )+
    };
}

convert_image!(featured_collection, recommended_products);

fn convert_collection(collection: featured_collection::CollectionFields) -> Collection {
    Collection {
        id: collection.id,
        handle: collection.handle,
        title: collection.title,
        image: collection.image.map(Image::from),
    }
}

fn convert_product(product: recommended_products::ProductFields) -> Product {
    let price = product.price_range.min_variant_price;
    Product {
        id: product.id,
        handle: product.handle,
        title: product.title,
        min_variant_price: Money {
            amount: price.amount,
            currency_code: price.currency_code.into(),
        },
        featured_image: product.images.nodes.into_iter().next().map(Image::from),
    }
}
