//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                                - Landing page (streamed, two-phase)
//! GET  /fragments/recommended-products  - Recommended products section (HTMX)
//!
//! # Newsletter (HTMX fragments)
//! POST /newsletter                      - Subscribe (rate limited)
//! POST /newsletter/validate             - Submit button for the current input
//! ```
//!
//! `/health` and `/static` are mounted in [`crate::app`].

pub mod home;
pub mod newsletter;

use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware::newsletter_rate_limiter;
use crate::state::AppState;

/// Create the newsletter routes router.
pub fn newsletter_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(newsletter::subscribe))
        // Only routes added above are rate limited
        .route_layer(newsletter_rate_limiter())
        .route("/validate", post(newsletter::validate))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route(
            "/fragments/recommended-products",
            get(home::recommended_fragment),
        )
        .nest("/newsletter", newsletter_routes())
}
