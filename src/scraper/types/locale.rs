use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Primary translations offered by TMDB. On duplicate languages the main
/// country comes first.
const PRIMARY_TRANSLATIONS: &[&str] = &[
    "ar-AE", "ar-SA", "be-BY", "bg-BG", "bn-BD", "ca-ES", "ch-GU", "cs-CZ", "da-DK", "de-DE",
    "el-GR", "en-US", "en-AU", "en-CA", "en-GB", "eo-EO", "es-ES", "es-MX", "eu-ES", "fr-FR",
    "fa-IR", "fi-FI", "fr-CA", "gl-ES", "he-IL", "hi-IN", "hu-HU", "id-ID", "it-IT", "ja-JP",
    "ka-GE", "kn-IN", "ko-KR", "lt-LT", "ml-IN", "nb-NO", "nl-NL", "no-NO", "pl-PL", "pt-BR",
    "pt-PT", "ro-RO", "ru-RU", "si-LK", "sk-SK", "sl-SI", "sr-RS", "sv-SE", "ta-IN", "te-IN",
    "th-TH", "tr-TR", "uk-UA", "vi-VN", "zh-CN", "zh-HK", "zh-TW",
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid locale: {0:?}")]
pub struct ParseLocaleError(String);

/// Language (ISO 639-1) with an optional country (ISO 3166-1)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Locale {
    language: String,
    country: Option<String>,
}

impl Locale {
    /// Language every provider is expected to carry
    pub const UNIVERSAL_LANGUAGE: &'static str = "en";

    pub fn english() -> Self {
        Self {
            language: Self::UNIVERSAL_LANGUAGE.to_string(),
            country: None,
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn country(&self) -> Option<&str> {
        self.country.as_deref()
    }

    pub fn is_universal(&self) -> bool {
        self.language == Self::UNIVERSAL_LANGUAGE
    }

    /// Languages are equal; countries are ignored
    pub fn same_language(&self, other: &Self) -> bool {
        self.language == other.language
    }

    /// Map a two-letter preference onto the provider's primary translation
    /// (`de` becomes `de-DE`). Unknown languages keep no country.
    pub fn primary_translation(language: &str) -> Self {
        let language = language.to_ascii_lowercase();
        let country = PRIMARY_TRANSLATIONS
            .iter()
            .filter_map(|tag| tag.split_once('-'))
            .find(|(lang, _)| *lang == language)
            .map(|(_, country)| country.to_string());

        Self { language, country }
    }

    /// Same language, country filled from the primary translation table
    /// when missing
    #[must_use]
    pub fn with_primary_country(&self) -> Self {
        if self.country.is_some() {
            return self.clone();
        }
        Self::primary_translation(&self.language)
    }
}

impl Default for Locale {
    fn default() -> Self {
        Self::english()
    }
}

impl FromStr for Locale {
    type Err = ParseLocaleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let mut parts = trimmed.split(['-', '_']);

        let language = parts
            .next()
            .filter(|l| l.len() == 2 && l.chars().all(|c| c.is_ascii_alphabetic()))
            .ok_or_else(|| ParseLocaleError(s.to_string()))?
            .to_ascii_lowercase();

        let country = match parts.next() {
            Some(c) if c.len() == 2 && c.chars().all(|c| c.is_ascii_alphabetic()) => {
                Some(c.to_ascii_uppercase())
            }
            Some(_) => return Err(ParseLocaleError(s.to_string())),
            None => None,
        };

        if parts.next().is_some() {
            return Err(ParseLocaleError(s.to_string()));
        }

        Ok(Self { language, country })
    }
}

impl TryFrom<String> for Locale {
    type Error = ParseLocaleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Locale> for String {
    fn from(locale: Locale) -> Self {
        locale.to_string()
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.country {
            Some(ref country) => write!(f, "{}-{}", self.language, country),
            None => write!(f, "{}", self.language),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_locale_forms() {
        let de: Locale = "de".parse().unwrap();
        assert_eq!(de.language(), "de");
        assert!(de.country().is_none());

        let pt: Locale = "pt_br".parse().unwrap();
        assert_eq!(pt.to_string(), "pt-BR");

        assert!("deu".parse::<Locale>().is_err());
        assert!("de-DE-x".parse::<Locale>().is_err());
        assert!("".parse::<Locale>().is_err());
    }

    #[test]
    fn test_primary_translation_prefers_first_country() {
        assert_eq!(Locale::primary_translation("en").to_string(), "en-US");
        assert_eq!(Locale::primary_translation("fr").to_string(), "fr-FR");
        assert_eq!(Locale::primary_translation("DE").to_string(), "de-DE");
        assert_eq!(Locale::primary_translation("xx").to_string(), "xx");
    }

    #[test]
    fn test_same_language_ignores_country() {
        let us: Locale = "en-US".parse().unwrap();
        let gb: Locale = "en-GB".parse().unwrap();
        assert!(us.same_language(&gb));
        assert!(us.is_universal());
        assert_ne!(us, gb);
    }

    #[test]
    fn test_serde_as_string() {
        let locale: Locale = serde_json::from_str("\"de-AT\"").unwrap();
        assert_eq!(locale.country(), Some("AT"));
        assert_eq!(serde_json::to_string(&locale).unwrap(), "\"de-AT\"");
    }
}
