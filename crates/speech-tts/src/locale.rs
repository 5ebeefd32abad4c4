//! Locales as spoken by speech engines: language, optional country, optional variant.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TtsError;

/// Fallback when the environment does not name a language.
const FALLBACK_LANGUAGE: &str = "en";

/// A language tag such as `en`, `en-US` or `de-CH-1901`.
///
/// Language codes are stored lowercase and country codes uppercase, so
/// `en_us` and `en-US` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Locale {
    language: String,
    country: String,
    variant: String,
}

impl Locale {
    /// A locale with only a language code.
    #[must_use]
    pub fn new(language: &str) -> Self {
        Self {
            language: language.to_ascii_lowercase(),
            country: String::new(),
            variant: String::new(),
        }
    }

    #[must_use]
    pub fn with_country(mut self, country: &str) -> Self {
        self.country = country.to_ascii_uppercase();
        self
    }

    #[must_use]
    pub fn with_variant(mut self, variant: &str) -> Self {
        self.variant = variant.to_string();
        self
    }

    /// Parse `en`, `en-US`, `en_US`, `en_US.UTF-8` or `en-GB-scotland`.
    pub fn parse(tag: &str) -> Result<Self, TtsError> {
        // Drop POSIX encoding and modifier suffixes (`.UTF-8`, `@euro`).
        let core = tag
            .trim()
            .split(['.', '@'])
            .next()
            .unwrap_or_default();

        let mut parts = core.split(['-', '_']);
        let language = parts.next().unwrap_or_default();
        if language.is_empty() || !language.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(TtsError::InvalidLocale(tag.to_string()));
        }

        let mut locale = Self::new(language);
        if let Some(country) = parts.next() {
            if country.is_empty() || !country.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(TtsError::InvalidLocale(tag.to_string()));
            }
            locale = locale.with_country(country);
        }
        let variant: Vec<&str> = parts.filter(|p| !p.is_empty()).collect();
        if !variant.is_empty() {
            locale = locale.with_variant(&variant.join("-"));
        }

        Ok(locale)
    }

    /// The locale of the current process, from `LC_ALL`, `LC_MESSAGES` or `LANG`.
    ///
    /// Falls back to English when none is set or the value is `C`/`POSIX`.
    #[must_use]
    pub fn system_default() -> Self {
        ["LC_ALL", "LC_MESSAGES", "LANG"]
            .iter()
            .filter_map(|key| std::env::var(key).ok())
            .filter(|value| !value.is_empty() && value != "C" && value != "POSIX")
            .find_map(|value| Self::parse(&value).ok())
            .unwrap_or_else(|| Self::new(FALLBACK_LANGUAGE))
    }

    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Country code, empty when unspecified.
    #[must_use]
    pub fn country(&self) -> &str {
        &self.country
    }

    #[must_use]
    pub fn variant(&self) -> &str {
        &self.variant
    }

    /// Whether both locales name the same language, ignoring country and variant.
    #[must_use]
    pub fn same_language(&self, other: &Self) -> bool {
        self.language == other.language
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.language)?;
        if !self.country.is_empty() {
            write!(f, "-{}", self.country)?;
        }
        if !self.variant.is_empty() {
            write!(f, "-{}", self.variant)?;
        }
        Ok(())
    }
}

impl TryFrom<String> for Locale {
    type Error = TtsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Locale> for String {
    fn from(locale: Locale) -> Self {
        locale.to_string()
    }
}

impl FromStr for Locale {
    type Err = TtsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
