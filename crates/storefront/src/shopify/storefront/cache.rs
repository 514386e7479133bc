//! Cache types for Storefront API responses.

use cafe_jalu_core::Locale;

use crate::shopify::types::{Collection, Product};

/// Cache key: one entry per query and buyer locale.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    FeaturedCollection(Locale),
    RecommendedProducts(Locale),
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    /// `None` is cached too: a shop without collections stays empty for the TTL.
    FeaturedCollection(Option<Box<Collection>>),
    RecommendedProducts(Vec<Product>),
}
