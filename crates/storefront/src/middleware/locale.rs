//! Buyer locale extractor.

use axum::{
    extract::FromRequestParts,
    http::{header::ACCEPT_LANGUAGE, request::Parts},
};
use cafe_jalu_core::Locale;

use crate::state::AppState;

/// Locale used for `@inContext` on Storefront API queries.
///
/// Derived from `Accept-Language` but limited to the store's configured
/// locales, so visitors can't send codes Shopify rejects or mint new cache
/// keys. Falls back to the default locale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLocale(pub Locale);

impl FromRequestParts<AppState> for RequestLocale {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let shopify = &state.config().shopify;
        let fallback = &shopify.default_locale;
        let locale = parts
            .headers
            .get(ACCEPT_LANGUAGE)
            .and_then(|v| v.to_str().ok())
            .map_or_else(
                || fallback.clone(),
                |header| {
                    Locale::from_accept_language(header, &shopify.supported_locales, fallback)
                },
            );

        Ok(Self(locale))
    }
}
