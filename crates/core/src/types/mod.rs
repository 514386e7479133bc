//! Core types for the Café Jalu storefront.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod locale;
pub mod price;

pub use email::{Email, EmailError};
pub use locale::{CountryCode, LanguageCode, Locale, LocaleError};
pub use price::{CurrencyCode, Price, PriceError};
