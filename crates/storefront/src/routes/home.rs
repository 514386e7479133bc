//! Landing page route handlers.
//!
//! The featured collection is critical data: it is awaited before the shell
//! renders and its failure fails the request. Recommended products are
//! deferred: the query starts first, the shell streams with a placeholder, and
//! the grid follows once the query settles.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use cafe_jalu_core::Locale;
use tracing::instrument;

use crate::config::SiteConfig;
use crate::deferred::{Deferred, DeferredSection, DeferredView, SWAP_SCRIPT, TwoPhaseResponse};
use crate::error::AppError;
use crate::middleware::{CspNonce, RequestLocale};
use crate::routes::newsletter::{NewsletterFormTemplate, SignupState};
use crate::shopify::types::{Collection, Image, Product};
use crate::shopify::{ShopifyError, StorefrontClient};
use crate::state::AppState;

/// Id shared by the recommended products placeholder and its streamed chunk.
pub const RECOMMENDED_PRODUCTS_SECTION: &str = "recommended-products";

// =============================================================================
// Page Data
// =============================================================================

/// Data for one landing page render.
pub struct HomeData {
    /// Most recently updated collection (critical).
    pub featured_collection: Option<Collection>,
    /// Four most recently updated products (deferred).
    pub recommended_products: Deferred<Vec<Product>>,
}

/// Loads landing page data with the critical/deferred split.
pub struct HomeLoader;

impl HomeLoader {
    /// Start the deferred query, then await the critical one.
    ///
    /// # Errors
    ///
    /// Returns the featured collection query's error. Recommended products
    /// failures never surface here; they resolve to `None`.
    #[instrument(skip(client, locale), fields(locale = %locale.key()))]
    pub async fn load(client: &StorefrontClient, locale: &Locale) -> Result<HomeData, ShopifyError> {
        let recommended_products = {
            let client = client.clone();
            let locale = locale.clone();
            Deferred::spawn("recommended_products", async move {
                client.recommended_products(&locale).await
            })
        };

        let featured_collection = client.featured_collection(locale).await?;

        Ok(HomeData {
            featured_collection,
            recommended_products,
        })
    }
}

// =============================================================================
// Views
// =============================================================================

/// Image display data for templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageView {
    pub url: String,
    pub alt: String,
    pub width: Option<i64>,
    pub height: Option<i64>,
}

impl From<&Image> for ImageView {
    fn from(image: &Image) -> Self {
        Self {
            url: image.url.clone(),
            alt: image.alt_text.clone().unwrap_or_default(),
            width: image.width,
            height: image.height,
        }
    }
}

/// Featured collection display data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionView {
    pub handle: String,
    pub title: String,
    pub image: Option<ImageView>,
}

impl From<&Collection> for CollectionView {
    fn from(collection: &Collection) -> Self {
        Self {
            handle: collection.handle.clone(),
            title: collection.title.clone(),
            image: collection.image.as_ref().map(ImageView::from),
        }
    }
}

/// Recommended product tile display data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductView {
    pub handle: String,
    pub title: String,
    pub price: String,
    pub image: Option<ImageView>,
}

impl From<&Product> for ProductView {
    fn from(product: &Product) -> Self {
        Self {
            handle: product.handle.clone(),
            title: product.title.clone(),
            price: product.min_variant_price.display(),
            image: product.featured_image.as_ref().map(ImageView::from),
        }
    }
}

fn product_views(products: &[Product]) -> Vec<ProductView> {
    products.iter().map(ProductView::from).collect()
}

// =============================================================================
// Section Renderers
// =============================================================================

/// Featured collection link with optional image and title.
#[derive(Template)]
#[template(path = "home/featured_collection.html")]
pub struct FeaturedCollectionTemplate<'a> {
    pub collection: &'a CollectionView,
}

/// Render the featured collection; nothing at all when there is none.
///
/// # Errors
///
/// Returns an error if the template fails to render.
pub fn render_featured_collection(collection: Option<&CollectionView>) -> askama::Result<String> {
    collection.map_or_else(
        || Ok(String::new()),
        |collection| FeaturedCollectionTemplate { collection }.render(),
    )
}

/// Recommended products section: heading plus placeholder or grid.
#[derive(Template, WebTemplate)]
#[template(path = "home/recommended_products.html")]
pub struct RecommendedProductsTemplate {
    pub section_id: &'static str,
    pub loading: bool,
    pub products: Vec<ProductView>,
}

impl RecommendedProductsTemplate {
    /// Build the section for a deferred value's current state.
    ///
    /// `Errored` renders the same empty grid as an empty result.
    #[must_use]
    pub fn from_view(view: DeferredView<Vec<ProductView>>) -> Self {
        let loading = view.is_loading();
        let products = match view {
            DeferredView::Resolved(products) => products,
            DeferredView::Loading | DeferredView::Errored => Vec::new(),
        };

        Self {
            section_id: RECOMMENDED_PRODUCTS_SECTION,
            loading,
            products,
        }
    }
}

/// The grid that replaces the recommended products placeholder.
#[derive(Template)]
#[template(path = "home/recommended_products_grid.html")]
pub struct RecommendedProductsGridTemplate {
    pub products: Vec<ProductView>,
}

/// Render the streamed replacement for the recommended products placeholder.
///
/// Falls back to an empty grid if rendering fails, since the shell has
/// already been sent.
fn render_recommended_grid(view: DeferredView<Vec<ProductView>>) -> String {
    let products = match view {
        DeferredView::Resolved(products) => products,
        DeferredView::Loading | DeferredView::Errored => Vec::new(),
    };

    RecommendedProductsGridTemplate { products }
        .render()
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to render recommended products");
            String::from("<div class=\"recommended-products-grid\"></div>")
        })
}

// =============================================================================
// Page Shell
// =============================================================================

/// Landing page shell. Rendered without the closing `</body></html>` so
/// deferred sections can be streamed after it.
#[derive(Template)]
#[template(path = "base/home.html")]
pub struct HomeTemplate<'a> {
    pub nonce: &'a str,
    pub swap_script: &'static str,
    pub site: &'a SiteConfig,
    pub featured_collection: String,
    pub recommended_products: String,
    pub newsletter_form: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the landing page as a two-phase streamed response.
///
/// # Errors
///
/// Returns 502 if the featured collection query fails.
#[instrument(skip(state, nonce, locale))]
pub async fn home(
    State(state): State<AppState>,
    nonce: CspNonce,
    RequestLocale(locale): RequestLocale,
) -> Result<TwoPhaseResponse, AppError> {
    let data = HomeLoader::load(state.storefront(), &locale).await?;

    let featured = data.featured_collection.as_ref().map(CollectionView::from);
    let recommended_products =
        RecommendedProductsTemplate::from_view(DeferredView::Loading).render()?;
    let newsletter_form = NewsletterFormTemplate::new("", SignupState::Idle).render()?;

    let shell = HomeTemplate {
        nonce: nonce.value(),
        swap_script: SWAP_SCRIPT,
        site: &state.config().site,
        featured_collection: render_featured_collection(featured.as_ref())?,
        recommended_products,
        newsletter_form,
    }
    .render()?;

    let pending = data.recommended_products;
    let section = DeferredSection::new(RECOMMENDED_PRODUCTS_SECTION, async move {
        let view = pending.resolve_view().await;
        render_recommended_grid(map_products(view))
    });

    Ok(TwoPhaseResponse::new(shell, nonce).with_section(section))
}

/// Recommended products section on its own, for clients that don't stream.
///
/// Awaits the query; a failure renders the empty grid.
#[instrument(skip(state, locale))]
pub async fn recommended_fragment(
    State(state): State<AppState>,
    RequestLocale(locale): RequestLocale,
) -> RecommendedProductsTemplate {
    let client = state.storefront().clone();
    let view = Deferred::spawn("recommended_products", async move {
        client.recommended_products(&locale).await
    })
    .resolve_view()
    .await;

    RecommendedProductsTemplate::from_view(map_products(view))
}

fn map_products(view: DeferredView<Vec<Product>>) -> DeferredView<Vec<ProductView>> {
    match view {
        DeferredView::Loading => DeferredView::Loading,
        DeferredView::Resolved(products) => DeferredView::Resolved(product_views(&products)),
        DeferredView::Errored => DeferredView::Errored,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::shopify::types::Money;

    fn croissant() -> Product {
        Product {
            id: "gid://shopify/Product/1".to_string(),
            handle: "croissant".to_string(),
            title: "Croissant".to_string(),
            min_variant_price: Money {
                amount: "4.5".to_string(),
                currency_code: "USD".to_string(),
            },
            featured_image: Some(Image {
                id: Some("gid://shopify/ProductImage/1".to_string()),
                url: "https://cdn.shopify.com/croissant.png".to_string(),
                alt_text: None,
                width: Some(800),
                height: Some(800),
            }),
        }
    }

    #[test]
    fn test_featured_collection_renders_nothing_for_none() {
        assert_eq!(render_featured_collection(None).unwrap(), "");
    }

    #[test]
    fn test_featured_collection_links_to_collection() {
        let collection = CollectionView::from(&Collection {
            id: "gid://shopify/Collection/1".to_string(),
            handle: "viennoiseries".to_string(),
            title: "Viennoiseries".to_string(),
            image: None,
        });

        let html = render_featured_collection(Some(&collection)).unwrap();
        assert!(html.contains(r#"class="featured-collection""#));
        assert!(html.contains(r#"href="/collections/viennoiseries""#));
        assert!(html.contains("<h1>Viennoiseries</h1>"));
        assert!(!html.contains("featured-collection-image"));
    }

    #[test]
    fn test_featured_collection_with_image() {
        let collection = CollectionView {
            handle: "boissons".to_string(),
            title: "Boissons".to_string(),
            image: Some(ImageView {
                url: "https://cdn.shopify.com/boissons.png".to_string(),
                alt: "Café au lait".to_string(),
                width: Some(1200),
                height: None,
            }),
        };

        let html = render_featured_collection(Some(&collection)).unwrap();
        assert!(html.contains("featured-collection-image"));
        assert!(html.contains("https://cdn.shopify.com/boissons.png"));
    }

    #[test]
    fn test_product_view_formats_price() {
        let view = ProductView::from(&croissant());
        assert_eq!(view.price, "$4.50");
        assert_eq!(view.image.unwrap().alt, "");
    }

    #[test]
    fn test_recommended_products_loading_shows_placeholder() {
        let html = RecommendedProductsTemplate::from_view(DeferredView::Loading)
            .render()
            .unwrap();
        assert!(html.contains("<h2>Recommended Products</h2>"));
        assert!(html.contains(r#"id="placeholder-recommended-products""#));
        assert!(html.contains("Loading..."));
    }

    #[test]
    fn test_recommended_products_resolved_grid() {
        let view = DeferredView::Resolved(product_views(&[croissant()]));
        let html = RecommendedProductsTemplate::from_view(view).render().unwrap();
        assert!(!html.contains("Loading..."));
        assert!(html.contains(r#"href="/products/croissant""#));
        assert!(html.contains("<h4>Croissant</h4>"));
        assert!(html.contains("<small>$4.50</small>"));
    }

    #[test]
    fn test_shell_pins_htmx_and_nonces_inline_code() {
        let site = SiteConfig::default();
        let html = HomeTemplate {
            nonce: "bm9uY2U=",
            swap_script: SWAP_SCRIPT,
            site: &site,
            featured_collection: String::new(),
            recommended_products: String::new(),
            newsletter_form: String::new(),
        }
        .render()
        .unwrap();

        assert!(html.contains(
            r#"src="https://unpkg.com/htmx.org@2.0.4/dist/htmx.min.js" integrity="sha384-"#
        ));
        assert!(html.contains(r#"crossorigin="anonymous""#));
        assert_eq!(html.matches(r#"nonce="bm9uY2U=""#).count(), 2);
        assert!(html.contains(r#"url("/static/images/cafejalu-background.png")"#));
        assert!(!html.contains("</html>"));
    }

    #[test]
    fn test_recommended_products_errored_is_empty_grid() {
        let html = render_recommended_grid(DeferredView::Errored);
        assert!(html.contains("recommended-products-grid"));
        assert!(!html.contains("recommended-product\""));
        assert!(!html.contains("Loading..."));
    }
}
