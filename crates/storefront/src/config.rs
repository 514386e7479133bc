//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//! - `SHOPIFY_STORE` - Shopify store domain (e.g., your-store.myshopify.com)
//! - `SHOPIFY_STOREFRONT_PRIVATE_TOKEN` - Storefront API private access token
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_STATIC_DIR` - Static asset directory (default: crates/storefront/static)
//! - `SHOPIFY_API_VERSION` - API version (default: 2026-01)
//! - `SHOPIFY_COUNTRY` - Fallback buyer country (default: US)
//! - `SHOPIFY_LANGUAGE` - Fallback buyer language (default: EN)
//! - `SHOPIFY_LOCALES` - Comma-separated `COUNTRY-LANGUAGE` locales enabled in
//!   Shopify Markets that `Accept-Language` may select (e.g. `CA-FR,CA-EN`);
//!   the fallback locale is always included
//! - `EXPONEA_API_BASE` - Bloomreach Engagement API base (default: <https://api.exponea.com>)
//! - `EXPONEA_PROJECT_TOKEN`, `EXPONEA_KEY_ID`, `EXPONEA_KEY_SECRET` - Tracking
//!   API credentials; all three or none
//! - `NEWSLETTER_DATA_SOURCE` - `data_source` attribute on signups (default: restaurant)
//! - `SITE_HOURS` - Opening hours line (default: 8:00 AM - 7:00 PM)
//! - `SITE_MENU_URL` - "View Menu" target (default: /menu)
//! - `SITE_INSTAGRAM_URL` - Instagram link
//! - `SITE_BACKGROUND_URL` - Landing page background image; a root-relative
//!   path or an `https` URL, written into a CSS `url("…")`
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use cafe_jalu_core::{CountryCode, LanguageCode, Locale, LocaleError};
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Directory served under `/static`
    pub static_dir: PathBuf,
    /// Shopify Storefront API configuration
    pub shopify: ShopifyStorefrontConfig,
    /// Bloomreach Engagement (Exponea) tracking API, if configured
    pub marketing: Option<ExponeaConfig>,
    /// Newsletter signup settings
    pub newsletter: NewsletterConfig,
    /// Static landing page content
    pub site: SiteConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g. "production")
    pub sentry_environment: Option<String>,
}

/// Shopify Storefront API configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct ShopifyStorefrontConfig {
    /// Shopify store domain (e.g., your-store.myshopify.com)
    pub store: String,
    /// Shopify API version (e.g., 2026-01)
    pub api_version: String,
    /// Storefront API private access token (server-side only)
    pub storefront_private_token: SecretString,
    /// Locale used when the request does not name a supported one
    pub default_locale: Locale,
    /// Locales a request may select; always contains `default_locale`
    pub supported_locales: Vec<Locale>,
}

impl std::fmt::Debug for ShopifyStorefrontConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopifyStorefrontConfig")
            .field("store", &self.store)
            .field("api_version", &self.api_version)
            .field("storefront_private_token", &"[REDACTED]")
            .field("default_locale", &self.default_locale)
            .field("supported_locales", &self.supported_locales)
            .finish()
    }
}

/// Bloomreach Engagement tracking API configuration.
#[derive(Clone)]
pub struct ExponeaConfig {
    /// API base URL (e.g. <https://api.exponea.com>)
    pub api_base: Url,
    /// Project token the customers and events belong to
    pub project_token: String,
    /// Private API key ID (basic auth username)
    pub key_id: String,
    /// Private API key secret (basic auth password)
    pub key_secret: SecretString,
}

impl std::fmt::Debug for ExponeaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExponeaConfig")
            .field("api_base", &self.api_base.as_str())
            .field("project_token", &self.project_token)
            .field("key_id", &self.key_id)
            .field("key_secret", &"[REDACTED]")
            .finish()
    }
}

/// Newsletter signup settings.
#[derive(Debug, Clone)]
pub struct NewsletterConfig {
    /// Value of the `data_source` attribute sent with identify and consent.
    pub data_source: String,
}

impl Default for NewsletterConfig {
    fn default() -> Self {
        Self {
            data_source: "restaurant".to_string(),
        }
    }
}

/// Static content shown on the landing page.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    /// Opening hours line under "HOURS:"
    pub hours: String,
    /// Target of the "View Menu" button
    pub menu_url: String,
    /// Instagram profile link in the footer
    pub instagram_url: String,
    /// Background image URL, validated by [`validate_background_url`]
    pub background_url: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            hours: "8:00 AM - 7:00 PM".to_string(),
            menu_url: "/menu".to_string(),
            instagram_url: "https://urlgeni.us/instagram/cafejalu".to_string(),
            background_url: "/static/images/cafejalu-background.png".to_string(),
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("STOREFRONT_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_HOST".to_string(), e.to_string())
            })?;
        let port = get_env_or_default("STOREFRONT_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_PORT".to_string(), e.to_string())
            })?;
        let base_url = get_required_env("STOREFRONT_BASE_URL")?;
        Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("STOREFRONT_BASE_URL".to_string(), e.to_string())
        })?;
        let static_dir = PathBuf::from(get_env_or_default(
            "STOREFRONT_STATIC_DIR",
            "crates/storefront/static",
        ));

        let shopify = ShopifyStorefrontConfig::from_env()?;
        let marketing = ExponeaConfig::from_env()?;
        let newsletter = NewsletterConfig::from_env();
        let site = SiteConfig::from_env()?;

        Ok(Self {
            host,
            port,
            base_url,
            static_dir,
            shopify,
            marketing,
            newsletter,
            site,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Parse `SHOPIFY_LOCALES`, keeping `default_locale` first and dropping duplicates.
fn parse_supported_locales(
    value: &str,
    default_locale: &Locale,
) -> Result<Vec<Locale>, LocaleError> {
    let mut locales = vec![default_locale.clone()];
    for entry in value.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let locale = Locale::parse(entry)?;
        if !locales.contains(&locale) {
            locales.push(locale);
        }
    }
    Ok(locales)
}

impl ShopifyStorefrontConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let country = CountryCode::parse(&get_env_or_default("SHOPIFY_COUNTRY", "US"))
            .map_err(|e| ConfigError::InvalidEnvVar("SHOPIFY_COUNTRY".to_string(), e.to_string()))?;
        let language = LanguageCode::parse(&get_env_or_default("SHOPIFY_LANGUAGE", "EN"))
            .map_err(|e| {
                ConfigError::InvalidEnvVar("SHOPIFY_LANGUAGE".to_string(), e.to_string())
            })?;

        let default_locale = Locale::new(country, language);
        let supported_locales = parse_supported_locales(
            &get_env_or_default("SHOPIFY_LOCALES", ""),
            &default_locale,
        )
        .map_err(|e| ConfigError::InvalidEnvVar("SHOPIFY_LOCALES".to_string(), e.to_string()))?;

        Ok(Self {
            store: get_required_env("SHOPIFY_STORE")?,
            api_version: get_env_or_default("SHOPIFY_API_VERSION", "2026-01"),
            storefront_private_token: get_validated_secret("SHOPIFY_STOREFRONT_PRIVATE_TOKEN")?,
            default_locale,
            supported_locales,
        })
    }

    /// GraphQL endpoint for this store and API version.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!(
            "https://{}/api/{}/graphql.json",
            self.store, self.api_version
        )
    }
}

impl ExponeaConfig {
    /// Load tracking credentials. Returns `None` when none of them are set.
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let project_token = get_optional_env("EXPONEA_PROJECT_TOKEN");
        let key_id = get_optional_env("EXPONEA_KEY_ID");
        let key_secret = get_optional_env("EXPONEA_KEY_SECRET");

        let (project_token, key_id, key_secret) = match (project_token, key_id, key_secret) {
            (None, None, None) => return Ok(None),
            (Some(token), Some(id), Some(secret)) => (token, id, secret),
            (token, id, _) => {
                let missing = if token.is_none() {
                    "EXPONEA_PROJECT_TOKEN"
                } else if id.is_none() {
                    "EXPONEA_KEY_ID"
                } else {
                    "EXPONEA_KEY_SECRET"
                };
                return Err(ConfigError::MissingEnvVar(missing.to_string()));
            }
        };
        validate_secret_strength(&key_secret, "EXPONEA_KEY_SECRET")?;

        let api_base = Url::parse(&get_env_or_default(
            "EXPONEA_API_BASE",
            "https://api.exponea.com",
        ))
        .map_err(|e| ConfigError::InvalidEnvVar("EXPONEA_API_BASE".to_string(), e.to_string()))?;

        Ok(Some(Self {
            api_base,
            project_token,
            key_id,
            key_secret: SecretString::from(key_secret),
        }))
    }
}

impl NewsletterConfig {
    fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            data_source: get_optional_env("NEWSLETTER_DATA_SOURCE").unwrap_or(defaults.data_source),
        }
    }
}

impl SiteConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let background_url = match get_optional_env("SITE_BACKGROUND_URL") {
            Some(value) => validate_background_url(&value)
                .map_err(|e| ConfigError::InvalidEnvVar("SITE_BACKGROUND_URL".to_string(), e))?,
            None => defaults.background_url,
        };

        Ok(Self {
            hours: get_optional_env("SITE_HOURS").unwrap_or(defaults.hours),
            menu_url: get_optional_env("SITE_MENU_URL").unwrap_or(defaults.menu_url),
            instagram_url: get_optional_env("SITE_INSTAGRAM_URL")
                .unwrap_or(defaults.instagram_url),
            background_url,
        })
    }
}

/// Check a background image URL before it is written unescaped into the
/// page's CSS `url("…")`.
///
/// Accepts a root-relative path (`/static/…`) or an absolute `https` URL.
/// Absolute URLs are normalized, which percent-encodes quotes and spaces.
/// Anything that could close the string or the `<style>` element is rejected.
///
/// # Errors
///
/// Returns a description of the problem.
pub fn validate_background_url(value: &str) -> Result<String, String> {
    let value = value.trim();

    let url = if value.starts_with('/') && !value.starts_with("//") {
        value.to_string()
    } else {
        let parsed = Url::parse(value).map_err(|e| format!("not a URL: {e}"))?;
        if parsed.scheme() != "https" {
            return Err("must be a root-relative path or an https URL".to_string());
        }
        parsed.to_string()
    };

    let breaks_out = |c: char| {
        c.is_whitespace()
            || c.is_control()
            || matches!(c, '"' | '\'' | '\\' | '(' | ')' | '<' | '>')
    };
    if url.chars().any(breaks_out) {
        return Err("contains characters not allowed in a CSS url()".to_string());
    }

    Ok(url)
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }

    // Real API tokens are random; low entropy means a hand-typed value
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use the token issued by the provider."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        // "ab" has entropy of 1 bit per char (50% a, 50% b)
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_shannon_entropy_high() {
        let entropy = shannon_entropy("aB3$xY9!mK2@nL5#");
        assert!(entropy > 3.3);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-storefront-token", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("shpat_9f3Kq7Lm2XzR8vBn4TcY1wEd6HjU0pAs", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_supported_locales_start_with_default() {
        let default = Locale::default();
        let locales = parse_supported_locales("CA-FR, ca-en,US-EN,CA-FR", &default).unwrap();
        let keys: Vec<String> = locales.iter().map(Locale::key).collect();
        assert_eq!(keys, vec!["US-EN", "CA-FR", "CA-EN"]);

        assert_eq!(parse_supported_locales("", &default).unwrap(), vec![default.clone()]);
        assert!(parse_supported_locales("CA-FR,english", &default).is_err());
    }

    #[test]
    fn test_background_url_accepts_paths_and_https() {
        assert_eq!(
            validate_background_url("/static/images/background.png").unwrap(),
            "/static/images/background.png"
        );
        assert_eq!(
            validate_background_url("https://cdn.shopify.com/files/jalu bg.png").unwrap(),
            "https://cdn.shopify.com/files/jalu%20bg.png"
        );
    }

    #[test]
    fn test_background_url_rejects_css_breakouts() {
        for value in [
            "/static/a.png\");}body{display:none",
            "/static/</style><script>alert(1)</script>",
            "/static/a.png) , url(/x",
            "javascript:alert(1)",
            "http://example.com/a.png",
            "//evil.example/a.png",
            "background.png",
        ] {
            assert!(validate_background_url(value).is_err(), "{value:?}");
        }
    }

    #[test]
    fn test_endpoint() {
        let config = ShopifyStorefrontConfig {
            store: "cafe-jalu.myshopify.com".to_string(),
            api_version: "2026-01".to_string(),
            storefront_private_token: SecretString::from("private"),
            default_locale: Locale::default(),
            supported_locales: vec![Locale::default()],
        };
        assert_eq!(
            config.endpoint(),
            "https://cafe-jalu.myshopify.com/api/2026-01/graphql.json"
        );
    }

    #[test]
    fn test_site_defaults_match_landing_page() {
        let site = SiteConfig::default();
        assert_eq!(site.hours, "8:00 AM - 7:00 PM");
        assert_eq!(site.menu_url, "/menu");
        assert_eq!(NewsletterConfig::default().data_source, "restaurant");
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let shopify = ShopifyStorefrontConfig {
            store: "cafe-jalu.myshopify.com".to_string(),
            api_version: "2026-01".to_string(),
            storefront_private_token: SecretString::from("super_secret_private_token"),
            default_locale: Locale::default(),
            supported_locales: vec![Locale::default()],
        };
        let exponea = ExponeaConfig {
            api_base: Url::parse("https://api.exponea.com").unwrap(),
            project_token: "project-token-value".to_string(),
            key_id: "key_id_value".to_string(),
            key_secret: SecretString::from("super_secret_key"),
        };

        let debug_output = format!("{shopify:?} {exponea:?}");

        assert!(debug_output.contains("cafe-jalu.myshopify.com"));
        assert!(debug_output.contains("key_id_value"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_private_token"));
        assert!(!debug_output.contains("super_secret_key"));
    }
}
