//! Buyer locale for Storefront API `@inContext` queries.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing locale codes.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LocaleError {
    /// The code is not two ASCII letters.
    #[error("invalid {kind} code: {value:?}")]
    InvalidCode {
        /// Which code failed ("country" or "language").
        kind: &'static str,
        /// The rejected input.
        value: String,
    },
}

fn parse_code(kind: &'static str, value: &str) -> Result<String, LocaleError> {
    let trimmed = value.trim();
    if trimmed.len() == 2 && trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(trimmed.to_ascii_uppercase())
    } else {
        Err(LocaleError::InvalidCode {
            kind,
            value: value.to_string(),
        })
    }
}

/// ISO 3166-1 alpha-2 country code, uppercase (e.g. `US`, `FR`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CountryCode(String);

impl CountryCode {
    /// Parse a country code, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns an error unless the input is exactly two ASCII letters.
    pub fn parse(value: &str) -> Result<Self, LocaleError> {
        parse_code("country", value).map(Self)
    }

    /// Returns the code as an uppercase string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CountryCode {
    fn default() -> Self {
        Self("US".to_string())
    }
}

/// ISO 639-1 language code, uppercase as the Storefront API expects (e.g. `EN`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LanguageCode(String);

impl LanguageCode {
    /// Parse a language code, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns an error unless the input is exactly two ASCII letters.
    pub fn parse(value: &str) -> Result<Self, LocaleError> {
        parse_code("language", value).map(Self)
    }

    /// Returns the code as an uppercase string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for LanguageCode {
    fn default() -> Self {
        Self("EN".to_string())
    }
}

macro_rules! code_conversions {
    ($ty:ty) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl TryFrom<String> for $ty {
            type Error = LocaleError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(&value)
            }
        }

        impl From<$ty> for String {
            fn from(code: $ty) -> Self {
                code.0
            }
        }
    };
}

code_conversions!(CountryCode);
code_conversions!(LanguageCode);

/// Country and language a page is rendered for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locale {
    pub country: CountryCode,
    pub language: LanguageCode,
}

impl Locale {
    /// Create a locale from already-parsed codes.
    #[must_use]
    pub const fn new(country: CountryCode, language: LanguageCode) -> Self {
        Self { country, language }
    }

    /// Parse a locale written as `COUNTRY-LANGUAGE` (e.g. `CA-FR`), the same
    /// form as [`Locale::key`].
    ///
    /// # Errors
    ///
    /// Returns an error if either code is not two ASCII letters or the
    /// separator is missing.
    pub fn parse(value: &str) -> Result<Self, LocaleError> {
        let (country, language) =
            value
                .trim()
                .split_once('-')
                .ok_or_else(|| LocaleError::InvalidCode {
                    kind: "locale",
                    value: value.to_string(),
                })?;

        Ok(Self {
            country: CountryCode::parse(country)?,
            language: LanguageCode::parse(language)?,
        })
    }

    /// Pick a locale from an `Accept-Language` header value.
    ///
    /// Language ranges are tried in header order and only locales in
    /// `supported` are ever returned. `fr-CA` matches a supported `CA`/`FR`
    /// exactly; a bare `fr` (or a region the store doesn't sell to) matches
    /// the first supported locale with language `FR`. Anything else, including
    /// wildcards and empty headers, returns `fallback`.
    #[must_use]
    pub fn from_accept_language(header: &str, supported: &[Self], fallback: &Self) -> Self {
        header
            .split(',')
            .filter_map(|range| {
                let tag = range.split(';').next().unwrap_or_default().trim();
                let mut subtags = tag.split(['-', '_']);
                let language = subtags.next().and_then(|l| LanguageCode::parse(l).ok())?;
                let country = subtags.next().and_then(|c| CountryCode::parse(c).ok());
                Some((language, country))
            })
            .find_map(|(language, country)| {
                let exact = country.and_then(|country| {
                    supported
                        .iter()
                        .find(|l| l.language == language && l.country == country)
                });
                exact.or_else(|| supported.iter().find(|l| l.language == language))
            })
            .cloned()
            .unwrap_or_else(|| fallback.clone())
    }

    /// Cache-key fragment, e.g. `US-EN`.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}-{}", self.country, self.language)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_us_english() {
        let locale = Locale::default();
        assert_eq!(locale.country.as_str(), "US");
        assert_eq!(locale.language.as_str(), "EN");
        assert_eq!(locale.key(), "US-EN");
    }

    #[test]
    fn test_codes_are_uppercased() {
        assert_eq!(CountryCode::parse("fr").unwrap().as_str(), "FR");
        assert_eq!(LanguageCode::parse(" en ").unwrap().as_str(), "EN");
    }

    #[test]
    fn test_invalid_codes() {
        assert!(CountryCode::parse("USA").is_err());
        assert!(CountryCode::parse("").is_err());
        assert!(LanguageCode::parse("e1").is_err());
    }

    fn supported() -> Vec<Locale> {
        ["US-EN", "CA-FR", "CA-EN", "FR-FR"]
            .into_iter()
            .map(|l| Locale::parse(l).unwrap())
            .collect()
    }

    #[test]
    fn test_parse_locale() {
        let locale = Locale::parse("ca-fr").unwrap();
        assert_eq!(locale.key(), "CA-FR");
        assert!(Locale::parse("CAFR").is_err());
        assert!(Locale::parse("CA-").is_err());
    }

    #[test]
    fn test_accept_language_with_region() {
        let locale =
            Locale::from_accept_language("fr-FR,fr;q=0.9,en;q=0.8", &supported(), &Locale::default());
        assert_eq!(locale.key(), "FR-FR");
    }

    #[test]
    fn test_accept_language_without_region_picks_first_supported_for_language() {
        let locale = Locale::from_accept_language("fr;q=0.9", &supported(), &Locale::default());
        assert_eq!(locale.key(), "CA-FR");
    }

    #[test]
    fn test_accept_language_unsold_region_keeps_language() {
        let locale = Locale::from_accept_language("en-GB", &supported(), &Locale::default());
        assert_eq!(locale.key(), "US-EN");
        let locale = Locale::from_accept_language("fr-BE", &supported(), &Locale::default());
        assert_eq!(locale.key(), "CA-FR");
    }

    #[test]
    fn test_accept_language_unknown_codes_use_fallback() {
        for header in ["zz-QQ", "en-UK", "de-DE", "es-419"] {
            let locale = Locale::from_accept_language(header, &[], &Locale::default());
            assert_eq!(locale.key(), "US-EN", "header {header:?}");
        }
        let locale = Locale::from_accept_language("zz-QQ", &supported(), &Locale::default());
        assert_eq!(locale.key(), "US-EN");
    }

    #[test]
    fn test_accept_language_skips_unsupported_ranges() {
        let locale =
            Locale::from_accept_language("de-DE,fr-CA;q=0.8", &supported(), &Locale::default());
        assert_eq!(locale.key(), "CA-FR");
    }

    #[test]
    fn test_accept_language_wildcard_uses_fallback() {
        let fallback = Locale::new(
            CountryCode::parse("CA").unwrap(),
            LanguageCode::parse("FR").unwrap(),
        );
        assert_eq!(Locale::from_accept_language("*", &supported(), &fallback), fallback);
        assert_eq!(Locale::from_accept_language("", &supported(), &fallback), fallback);
    }
}
