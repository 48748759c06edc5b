use crate::scraper::{
    Result, ScraperError,
    types::{
        ArtworkFilter, ArtworkItem, MediaKind, MediaMetadata, MediaSearchQuery, MediaSearchResult,
        ScrapeSelector,
    },
};
use async_trait::async_trait;

/// Core trait for metadata providers.
///
/// A provider implements any subset of the four capabilities. The default
/// bodies reject the call with [`ScraperError::UnsupportedMediaKind`].
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Provider identifier (e.g., "tmdb", "tvdb")
    fn id(&self) -> &'static str;

    /// Human-readable provider name
    fn name(&self) -> &'static str;

    /// Media kinds this provider handles at all
    fn supported_kinds(&self) -> &[MediaKind];

    /// Capabilities actually implemented
    fn capabilities(&self) -> ProviderCapabilities;

    fn supports(&self, kind: MediaKind) -> bool {
        self.supported_kinds().contains(&kind)
    }

    /// Search for candidates. Scores are assigned by the engine.
    async fn search(&self, query: &MediaSearchQuery) -> Result<Vec<MediaSearchResult>> {
        Err(ScraperError::UnsupportedMediaKind(query.kind()))
    }

    /// Full metadata for one record
    async fn get_metadata(&self, selector: &ScrapeSelector) -> Result<MediaMetadata> {
        Err(ScraperError::UnsupportedMediaKind(selector.kind))
    }

    /// Artwork for one record, unsorted
    async fn get_artwork(
        &self,
        selector: &ScrapeSelector,
        _filter: ArtworkFilter,
    ) -> Result<Vec<ArtworkItem>> {
        Err(ScraperError::UnsupportedMediaKind(selector.kind))
    }

    /// Every episode of a show
    async fn get_episode_list(&self, selector: &ScrapeSelector) -> Result<Vec<MediaMetadata>> {
        Err(ScraperError::UnsupportedMediaKind(selector.kind))
    }
}

/// Provider capability flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProviderCapabilities {
    pub search: bool,
    pub metadata: bool,
    pub artwork: bool,
    pub episode_list: bool,
}

impl ProviderCapabilities {
    pub const fn all() -> Self {
        Self {
            search: true,
            metadata: true,
            artwork: true,
            episode_list: true,
        }
    }
}
