//! Business logic services for storefront.
//!
//! # Services
//!
//! - `marketing` - Newsletter consent via the marketing platform (Bloomreach Engagement)

pub mod marketing;

pub use marketing::{
    ExponeaClient, MarketingClient, MarketingError, NoopMarketingClient, SharedMarketingClient,
};
