//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors; added in `main`)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. CSP nonce (generate per-request nonce for inline scripts)
//! 5. Security headers (CSP with the nonce, frame/sniff/referrer policies)
//! 6. Rate limiting on newsletter endpoints (governor)
//!
//! Extractors: [`CspNonce`] and [`RequestLocale`].

pub mod csp;
pub mod locale;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;

pub use csp::{CspNonce, csp_nonce_middleware};
pub use locale::RequestLocale;
pub use rate_limit::{ClientIpKeyExtractor, newsletter_rate_limiter};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
