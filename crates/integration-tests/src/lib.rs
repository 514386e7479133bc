//! Integration test harness for the Café Jalu storefront.
//!
//! Tests drive the real router with `tower::ServiceExt::oneshot`. The
//! Storefront API is replaced by an in-process axum server bound to an
//! ephemeral port, and the marketing platform by [`RecordingMarketingClient`].
//!
//! ```rust,ignore
//! let app = TestApp::new(StorefrontMode::Healthy).await;
//! let response = app.get("/").await;
//! assert_eq!(response.status(), StatusCode::OK);
//! ```

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use cafe_jalu_core::Locale;
use cafe_jalu_storefront::config::{
    NewsletterConfig, ShopifyStorefrontConfig, SiteConfig, StorefrontConfig,
};
use cafe_jalu_storefront::services::marketing::{
    CustomerIds, MarketingClient, MarketingError, Properties,
};
use cafe_jalu_storefront::shopify::StorefrontClient;
use cafe_jalu_storefront::state::AppState;
use futures::future::BoxFuture;
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::sync::Notify;
use tower::ServiceExt;

/// Client address sent with every request so the rate limiter has a key.
pub const TEST_CLIENT_IP: &str = "203.0.113.10";

/// Countries the fake Storefront API accepts in `@inContext`.
const KNOWN_COUNTRIES: [&str; 3] = ["US", "CA", "FR"];

// =============================================================================
// Fake Storefront API
// =============================================================================

/// How the fake Storefront API answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorefrontMode {
    /// Both queries succeed.
    Healthy,
    /// The shop has no collections; products succeed.
    NoCollections,
    /// `RecommendedProducts` returns GraphQL errors.
    RecommendedFails,
    /// `FeaturedCollection` returns HTTP 500.
    FeaturedFails,
    /// `RecommendedProducts` waits for [`FakeStorefront::release`].
    RecommendedHeld,
}

#[derive(Clone)]
struct FakeState {
    mode: StorefrontMode,
    operations: Arc<Mutex<Vec<String>>>,
    release: Arc<Notify>,
}

/// In-process Storefront API on an ephemeral port.
pub struct FakeStorefront {
    /// GraphQL endpoint URL.
    pub endpoint: String,
    operations: Arc<Mutex<Vec<String>>>,
    release: Arc<Notify>,
}

impl FakeStorefront {
    /// Bind and serve the fake API in the background.
    pub async fn start(mode: StorefrontMode) -> Self {
        let state = FakeState {
            mode,
            operations: Arc::new(Mutex::new(Vec::new())),
            release: Arc::new(Notify::new()),
        };
        let operations = state.operations.clone();
        let release = state.release.clone();

        let router = Router::new()
            .route("/api/2026-01/graphql.json", post(graphql))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            endpoint: format!("http://{addr}/api/2026-01/graphql.json"),
            operations,
            release,
        }
    }

    /// Requests received so far as `Operation@COUNTRY-LANGUAGE`, in arrival order.
    pub fn operations(&self) -> Vec<String> {
        self.operations.lock().unwrap().clone()
    }

    /// Let a held `RecommendedProducts` request answer.
    pub fn release(&self) {
        self.release.notify_one();
    }
}

async fn graphql(State(state): State<FakeState>, Json(body): Json<Value>) -> Response {
    let operation = body["operationName"].as_str().unwrap_or_default().to_string();
    let country = body["variables"]["country"].as_str().unwrap_or("?");
    let context = format!(
        "{}@{}-{}",
        operation,
        country,
        body["variables"]["language"].as_str().unwrap_or("?"),
    );
    state.operations.lock().unwrap().push(context);

    if !KNOWN_COUNTRIES.contains(&country) {
        return Json(json!({
            "errors": [{
                "message": format!("Variable $country of type CountryCode was provided invalid value {country}"),
                "extensions": {"code": "INVALID_VARIABLE"}
            }]
        }))
        .into_response();
    }

    match (operation.as_str(), state.mode) {
        ("FeaturedCollection", StorefrontMode::FeaturedFails) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded").into_response()
        }
        ("FeaturedCollection", StorefrontMode::NoCollections) => {
            Json(json!({"data": {"collections": {"nodes": []}}})).into_response()
        }
        ("FeaturedCollection", _) => Json(featured_collection_response()).into_response(),
        ("RecommendedProducts", StorefrontMode::RecommendedFails) => Json(json!({
            "errors": [{"message": "Throttled", "extensions": {"code": "THROTTLED"}}]
        }))
        .into_response(),
        ("RecommendedProducts", StorefrontMode::RecommendedHeld) => {
            state.release.notified().await;
            Json(recommended_products_response()).into_response()
        }
        ("RecommendedProducts", _) => Json(recommended_products_response()).into_response(),
        _ => (StatusCode::BAD_REQUEST, "unknown operation").into_response(),
    }
}

fn featured_collection_response() -> Value {
    json!({
        "data": {
            "collections": {
                "nodes": [{
                    "id": "gid://shopify/Collection/1",
                    "title": "Viennoiseries",
                    "handle": "viennoiseries",
                    "image": {
                        "id": "gid://shopify/CollectionImage/1",
                        "url": "https://cdn.shopify.com/viennoiseries.png",
                        "altText": "Croissants on the counter",
                        "width": 1200,
                        "height": 800
                    }
                }]
            }
        }
    })
}

fn product(handle: &str, title: &str, amount: &str) -> Value {
    json!({
        "id": format!("gid://shopify/Product/{handle}"),
        "title": title,
        "handle": handle,
        "priceRange": {"minVariantPrice": {"amount": amount, "currencyCode": "USD"}},
        "images": {"nodes": [{
            "id": format!("gid://shopify/ProductImage/{handle}"),
            "url": format!("https://cdn.shopify.com/{handle}.png"),
            "altText": null,
            "width": 800,
            "height": 800
        }]}
    })
}

fn recommended_products_response() -> Value {
    json!({
        "data": {
            "products": {
                "nodes": [
                    product("croissant", "Croissant", "4.5"),
                    product("pain-au-chocolat", "Pain au chocolat", "5.25"),
                    product("cafe-au-lait", "Café au lait", "6.0"),
                    product("madeleines", "Madeleines", "8.0")
                ]
            }
        }
    })
}

// =============================================================================
// Recording Marketing Client
// =============================================================================

/// One call made to the marketing platform.
#[derive(Debug, Clone, PartialEq)]
pub enum MarketingCall {
    Identify {
        ids: Value,
        properties: Value,
    },
    Track {
        event_type: String,
        ids: Value,
        properties: Value,
    },
}

/// Marketing client that records calls and can be told to fail.
#[derive(Default)]
pub struct RecordingMarketingClient {
    calls: Mutex<Vec<MarketingCall>>,
    fail_track: bool,
}

impl RecordingMarketingClient {
    /// A client whose `track` calls are rejected.
    pub fn failing_track() -> Self {
        Self {
            fail_track: true,
            ..Self::default()
        }
    }

    /// Calls received so far.
    pub fn calls(&self) -> Vec<MarketingCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl MarketingClient for RecordingMarketingClient {
    fn identify<'a>(
        &'a self,
        ids: &'a CustomerIds,
        properties: &'a Properties,
    ) -> BoxFuture<'a, Result<(), MarketingError>> {
        self.calls.lock().unwrap().push(MarketingCall::Identify {
            ids: serde_json::to_value(ids).unwrap(),
            properties: Value::Object(properties.clone()),
        });
        Box::pin(async { Ok(()) })
    }

    fn track<'a>(
        &'a self,
        event_type: &'a str,
        ids: &'a CustomerIds,
        properties: &'a Properties,
    ) -> BoxFuture<'a, Result<(), MarketingError>> {
        self.calls.lock().unwrap().push(MarketingCall::Track {
            event_type: event_type.to_string(),
            ids: serde_json::to_value(ids).unwrap(),
            properties: Value::Object(properties.clone()),
        });
        let fail = self.fail_track;
        Box::pin(async move {
            if fail {
                Err(MarketingError::Api {
                    status: 500,
                    message: "tracking unavailable".to_string(),
                })
            } else {
                Ok(())
            }
        })
    }
}

// =============================================================================
// Test Application
// =============================================================================

/// Storefront configuration pointing at nothing real.
pub fn test_config() -> StorefrontConfig {
    StorefrontConfig {
        host: [127, 0, 0, 1].into(),
        port: 0,
        base_url: "http://localhost:3000".to_string(),
        static_dir: PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/../storefront/static")),
        shopify: ShopifyStorefrontConfig {
            store: "cafe-jalu.myshopify.com".to_string(),
            api_version: "2026-01".to_string(),
            storefront_private_token: SecretString::from("shpat_test_token"),
            default_locale: Locale::default(),
            supported_locales: ["US-EN", "CA-FR", "CA-EN"]
                .into_iter()
                .map(|l| Locale::parse(l).unwrap())
                .collect(),
        },
        marketing: None,
        newsletter: NewsletterConfig::default(),
        site: SiteConfig::default(),
        sentry_dsn: None,
        sentry_environment: None,
    }
}

/// The storefront router wired to fakes.
pub struct TestApp {
    pub router: Router,
    pub storefront: FakeStorefront,
    pub marketing: Arc<RecordingMarketingClient>,
}

impl TestApp {
    /// App with a recording marketing client that accepts everything.
    pub async fn new(mode: StorefrontMode) -> Self {
        Self::with_marketing(mode, RecordingMarketingClient::default()).await
    }

    /// App with a specific marketing client.
    pub async fn with_marketing(mode: StorefrontMode, marketing: RecordingMarketingClient) -> Self {
        let storefront = FakeStorefront::start(mode).await;
        let marketing = Arc::new(marketing);

        let client = StorefrontClient::with_endpoint(
            storefront.endpoint.clone(),
            SecretString::from("shpat_test_token"),
        );
        let state = AppState::with_clients(test_config(), client, marketing.clone());

        Self {
            router: cafe_jalu_storefront::app(state),
            storefront,
            marketing,
        }
    }

    /// Send a request through the router.
    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// `GET uri`.
    pub async fn get(&self, uri: &str) -> Response {
        self.send(
            Request::builder()
                .uri(uri)
                .header("x-forwarded-for", TEST_CLIENT_IP)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    /// `POST uri` with an HTMX form body.
    pub async fn post_form(&self, uri: &str, body: &str) -> Response {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .header("hx-request", "true")
                .header("x-forwarded-for", TEST_CLIENT_IP)
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }
}

/// Collect a response body into a string.
pub async fn body_string(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
