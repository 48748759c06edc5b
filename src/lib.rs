//! Provider-agnostic movie and TV metadata resolution.
//!
//! Searches remote metadata providers, ranks the candidates, resolves full
//! records with language fallback and orders artwork. Provider sessions are
//! created lazily and rebuilt when the configured API key changes.

pub mod config;
pub mod logging;
pub mod scraper;

pub use config::{ConfigStore, ResolverConfig, SettingsStore};
pub use scraper::{
    Locale, MediaKind, MediaMetadata, MediaSearchQuery, MediaSearchResult, Result, ScrapeSelector,
    ScraperError, ScraperManager, create_default_manager,
};
