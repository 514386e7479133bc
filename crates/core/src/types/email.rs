//! Email address type.

use core::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Address grammar accepted by the newsletter signup form.
///
/// A local part made of dot-separated atoms (or a quoted string), an `@`, and
/// a domain of dot-separated labels ending in a label of at least two
/// characters.
const EMAIL_PATTERN: &str = r#"(?i)^(([^<>()\[\]\.,;:\s@"]+(\.[^<>()\[\]\.,;:\s@"]+)*)|(".+"))@(([^<>()\[\]\.,;:\s@"]+\.)+[^<>()\[\]\.,;:\s@"]{2,})$"#;

#[allow(clippy::expect_used)]
static EMAIL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(EMAIL_PATTERN).expect("email pattern is a valid regex"));

/// Errors that can occur when parsing an [`Email`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    /// The input string is empty.
    #[error("email cannot be empty")]
    Empty,
    /// The input does not match the address grammar.
    #[error("email address is malformed")]
    Invalid,
}

/// An email address.
///
/// ## Constraints
///
/// - Non-empty
/// - Local part: dot-separated atoms without `<>()[],;:@"` or whitespace,
///   or a double-quoted string
/// - Domain: at least two labels, the last one two or more characters long
///
/// ## Examples
///
/// ```
/// use cafe_jalu_core::Email;
///
/// // Valid emails
/// assert!(Email::parse("user@example.com").is_ok());
/// assert!(Email::parse("user.name+tag@domain.co.uk").is_ok());
///
/// // Invalid emails
/// assert!(Email::parse("").is_err());
/// assert!(Email::parse("@example.com").is_err());
/// assert!(Email::parse("user@").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Parse an `Email` from a string.
    ///
    /// The input is taken as-is; callers decide whether to trim it first.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty or does not match the address
    /// grammar.
    pub fn parse(s: &str) -> Result<Self, EmailError> {
        if s.is_empty() {
            return Err(EmailError::Empty);
        }

        if !EMAIL_REGEX.is_match(s) {
            return Err(EmailError::Invalid);
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns `true` if `s` would parse as an `Email`.
    #[must_use]
    pub fn is_valid(s: &str) -> bool {
        Self::parse(s).is_ok()
    }

    /// Returns a lowercased copy, used as the subscriber identity.
    #[must_use]
    pub fn normalized(&self) -> Self {
        Self(self.0.to_lowercase())
    }

    /// Returns the email address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `Email` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Returns the local part of the email (before the last @).
    #[must_use]
    pub fn local_part(&self) -> &str {
        self.0.rsplit_once('@').map_or("", |(local, _)| local)
    }

    /// Returns the domain part of the email (after the last @).
    #[must_use]
    pub fn domain(&self) -> &str {
        self.0.rsplit_once('@').map_or("", |(_, domain)| domain)
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Email {
    type Err = EmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Email {
    type Error = EmailError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_emails() {
        assert!(Email::parse("user@example.com").is_ok());
        assert!(Email::parse("user.name@example.com").is_ok());
        assert!(Email::parse("user+tag@example.com").is_ok());
        assert!(Email::parse("user@subdomain.example.com").is_ok());
        assert!(Email::parse("user@example.co.uk").is_ok());
        assert!(Email::parse("\"john doe\"@example.com").is_ok());
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert!(Email::parse("User.Name@Example.COM").is_ok());
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(Email::parse(""), Err(EmailError::Empty));
    }

    #[test]
    fn test_validity_follows_grammar_regardless_of_length() {
        let long = format!("{}@example.com", "a".repeat(250));
        assert!(EMAIL_REGEX.is_match(&long));
        assert!(Email::is_valid(&long));

        let accented = format!("{}@example.com", "é".repeat(125));
        assert!(accented.len() > 254);
        assert_eq!(Email::parse(&accented).unwrap().as_str(), accented);

        let long_invalid = format!("{}@example", "a".repeat(250));
        assert_eq!(Email::is_valid(&long_invalid), EMAIL_REGEX.is_match(&long_invalid));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for input in [
            "user@",
            "@example.com",
            "no-at-symbol",
            "user@domain",
            "user@example.c",
            "user name@example.com",
            ".user@example.com",
            "user.@example.com",
            "user..name@example.com",
            "user@@example.com",
            "user@exa mple.com",
            "<user>@example.com",
        ] {
            assert_eq!(Email::parse(input), Err(EmailError::Invalid), "{input}");
        }
    }

    #[test]
    fn test_is_valid() {
        assert!(Email::is_valid("user@example.com"));
        assert!(!Email::is_valid("user@"));
        assert!(!Email::is_valid("@example.com"));
        assert!(!Email::is_valid(""));
    }

    #[test]
    fn test_normalized_lowercases() {
        let email = Email::parse("Marie.Curie@Example.FR").unwrap();
        assert_eq!(email.normalized().as_str(), "marie.curie@example.fr");
    }

    #[test]
    fn test_local_part_and_domain() {
        let email = Email::parse("user@example.com").unwrap();
        assert_eq!(email.local_part(), "user");
        assert_eq!(email.domain(), "example.com");

        let quoted = Email::parse("\"a@b\"@example.com").unwrap();
        assert_eq!(quoted.local_part(), "\"a@b\"");
        assert_eq!(quoted.domain(), "example.com");
    }

    #[test]
    fn test_display() {
        let email = Email::parse("user@example.com").unwrap();
        assert_eq!(format!("{email}"), "user@example.com");
    }

    #[test]
    fn test_deserialize_validates() {
        let parsed: Email = serde_json::from_str("\"user@example.com\"").unwrap();
        assert_eq!(parsed.as_str(), "user@example.com");

        assert!(serde_json::from_str::<Email>("\"user@\"").is_err());
    }
}
