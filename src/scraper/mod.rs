mod artwork;
mod cache;
mod language;
mod manager;
mod matcher;
mod provider;
mod session;
mod types;

pub use artwork::{compare_artwork, parse_resolution, size_bucket, sort_artwork};
pub use cache::ResponseCache;
pub use language::{LanguageFallback, Localizable};
pub use manager::{ScraperConfig, ScraperManager};
pub use matcher::Matcher;
pub use provider::{
    HttpClient, MetadataProvider, ProviderCapabilities, TmdbClient, TmdbConnector, TmdbProvider,
    TvdbClient, TvdbConnector, TvdbProvider,
};
pub use session::{ClientFactory, ProviderSession, SessionManager, SessionRegistry, SessionState};
pub use types::{
    ArtworkFilter, ArtworkItem, ArtworkKind, CastMember, CastRole, EpisodeNumbers, IMDB, Locale,
    MediaKind, MediaMetadata, MediaRating, MediaSearchQuery, MediaSearchResult, ParseLocaleError,
    ScrapeSelector, SizeBucket, is_valid_imdb_id,
};

use crate::config::{ConfigStore, ResolverConfig};
use std::sync::Arc;

/// Scraper result type
pub type Result<T> = std::result::Result<T, ScraperError>;

/// Errors surfaced by the resolution engine
#[derive(Debug, thiserror::Error)]
pub enum ScraperError {
    #[error("Unsupported media kind: {0}")]
    UnsupportedMediaKind(MediaKind),

    #[error("Missing identifier: {0}")]
    MissingIdentifier(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Scrape failure: {0}")]
    ScrapeFailure(#[from] TransportError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ScraperError {
    /// Transport failures a caller may reasonably retry
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ScrapeFailure(TransportError::Network(_)) => true,
            Self::ScrapeFailure(TransportError::Api { status, .. }) => {
                *status == 429 || *status >= 500
            }
            _ => false,
        }
    }

    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<reqwest::Error> for ScraperError {
    fn from(e: reqwest::Error) -> Self {
        Self::ScrapeFailure(TransportError::Network(e))
    }
}

/// Failures of the underlying HTTP transport or payload parsing
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Bootstrap error: {0}")]
    Bootstrap(String),
}

impl TransportError {
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { status: 404, .. })
    }
}

/// Create a manager with the TMDB and TVDB providers registered.
///
/// API keys and fallback languages are read from `settings` on every call,
/// so changing them there takes effect on the next request.
pub fn create_default_manager(
    config: &ResolverConfig,
    settings: Arc<dyn ConfigStore>,
) -> Result<ScraperManager> {
    let mut manager = ScraperManager::with_config(ScraperConfig::from(config));

    let tmdb = manager.sessions().get_or_create(TmdbProvider::ID, || {
        SessionManager::new(
            TmdbProvider::ID,
            TmdbConnector::default(),
            Arc::clone(&settings),
            TmdbProvider::DEFAULT_API_KEY,
        )
    })?;
    manager.add_provider(TmdbProvider::new(tmdb, Arc::clone(&settings)));

    let tvdb = manager.sessions().get_or_create(TvdbProvider::ID, || {
        SessionManager::new(
            TvdbProvider::ID,
            TvdbConnector::default(),
            Arc::clone(&settings),
            TvdbProvider::DEFAULT_API_KEY,
        )
    })?;
    manager.add_provider(TvdbProvider::new(tvdb, settings));

    Ok(manager)
}
