//! Café Jalu Core - Shared types library.
//!
//! This crate provides the small domain types used by the storefront:
//! - [`Email`] - newsletter address with the signup form's grammar
//! - [`Price`] - decimal money with storefront display formatting
//! - [`Locale`] - country/language context for Storefront API queries
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no HTTP clients.
//! This keeps it lightweight and allows it to be used anywhere.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
