//! GraphQL query definitions for Shopify Storefront API.

use cafe_jalu_core::Locale;
use graphql_client::GraphQLQuery;

// Schema enums mapped onto domain types (`extern_enums`); the generated
// modules pick these up through `use super::*`
use cafe_jalu_core::{CountryCode, CurrencyCode, LanguageCode};

// Scalar types for Shopify GraphQL schema
// Must be defined in the same module where GraphQLQuery derive is used
#[allow(clippy::upper_case_acronyms)]
type Decimal = String;
#[allow(clippy::upper_case_acronyms)]
type URL = String;

// Landing page queries
#[derive(GraphQLQuery)]
#[graphql(
    schema_path = "graphql/storefront/schema.graphql",
    query_path = "graphql/storefront/queries/featured_collection.graphql",
    extern_enums("CountryCode", "LanguageCode"),
    response_derives = "Debug, Clone",
    variables_derives = "Debug, Clone"
)]
pub struct FeaturedCollection;

#[derive(GraphQLQuery)]
#[graphql(
    schema_path = "graphql/storefront/schema.graphql",
    query_path = "graphql/storefront/queries/recommended_products.graphql",
    extern_enums("CountryCode", "LanguageCode", "CurrencyCode"),
    response_derives = "Debug, Clone",
    variables_derives = "Debug, Clone"
)]
pub struct RecommendedProducts;

/// `@inContext` variables from a buyer locale.
macro_rules! in_context_variables {
    ($($module:ident),+) => {
        $(
            impl From<&Locale> for $module::Variables {
                fn from(locale: &Locale) -> Self {
                    Self {
                        country: Some(locale.country.clone()),
                        language: Some(locale.language.clone()),
                    }
                }
            }
        )+
    };
}

in_context_variables!(featured_collection, recommended_products);
