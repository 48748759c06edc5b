use crate::config::ResolverConfig;
use crate::scraper::{
    Result, ScraperError,
    artwork::sort_artwork,
    cache::ResponseCache,
    matcher::Matcher,
    provider::{MetadataProvider, ProviderCapabilities},
    session::SessionRegistry,
    types::{
        ArtworkFilter, ArtworkItem, MediaKind, MediaMetadata, MediaSearchQuery, MediaSearchResult,
        ScrapeSelector,
    },
};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Scraper manager configuration
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    /// Maximum number of results to return from search
    pub max_results: usize,
    /// Whether episode lists are cached
    pub use_cache: bool,
    pub episode_list_ttl: Duration,
    pub episode_list_max_entries: usize,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            max_results: 20,
            use_cache: true,
            episode_list_ttl: Duration::from_secs(600),
            episode_list_max_entries: 5,
        }
    }
}

impl From<&ResolverConfig> for ScraperConfig {
    fn from(config: &ResolverConfig) -> Self {
        Self {
            max_results: config.search.max_results,
            use_cache: true,
            episode_list_ttl: config.cache.episode_list_ttl(),
            episode_list_max_entries: config.cache.episode_list_max_entries,
        }
    }
}

/// Episode lists are cached per show and language
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct EpisodeListKey {
    show_id: String,
    language: String,
}

type EpisodeListCache = ResponseCache<EpisodeListKey, Vec<MediaMetadata>>;

/// Main scraper manager.
///
/// Dispatches to providers, ranks search results, caches episode lists and
/// orders artwork.
pub struct ScraperManager {
    providers: Vec<Arc<dyn MetadataProvider>>,
    episode_lists: DashMap<&'static str, Arc<EpisodeListCache>>,
    sessions: SessionRegistry,
    config: ScraperConfig,
}

impl ScraperManager {
    /// Create a new scraper manager
    pub fn new() -> Self {
        Self::with_config(ScraperConfig::default())
    }

    /// Create with custom configuration
    pub fn with_config(config: ScraperConfig) -> Self {
        Self {
            providers: Vec::new(),
            episode_lists: DashMap::new(),
            sessions: SessionRegistry::new(),
            config,
        }
    }

    /// Add a provider
    pub fn add_provider<P: MetadataProvider + 'static>(&mut self, provider: P) {
        info!("registered provider {} ({})", provider.id(), provider.name());
        self.providers.push(Arc::new(provider));
    }

    /// Get all providers
    pub fn providers(&self) -> &[Arc<dyn MetadataProvider>] {
        &self.providers
    }

    /// Sessions shared by the registered providers
    pub const fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub const fn config(&self) -> &ScraperConfig {
        &self.config
    }

    /// Look up a registered provider
    pub fn provider(&self, provider_id: &str) -> Result<&Arc<dyn MetadataProvider>> {
        self.providers
            .iter()
            .find(|p| p.id() == provider_id)
            .ok_or_else(|| ScraperError::Config(format!("Provider not found: {provider_id}")))
    }

    /// Provider that handles `kind` and offers the capability `offers` picks
    fn provider_for(
        &self,
        provider_id: &str,
        kind: MediaKind,
        offers: fn(&ProviderCapabilities) -> bool,
    ) -> Result<&Arc<dyn MetadataProvider>> {
        let provider = self.provider(provider_id)?;
        if !provider.supports(kind) || !offers(&provider.capabilities()) {
            return Err(ScraperError::UnsupportedMediaKind(kind));
        }
        Ok(provider)
    }

    /// Search one provider and rank the results best first.
    ///
    /// A provider reporting nothing found yields an empty list.
    pub async fn search(
        &self,
        provider_id: &str,
        query: &MediaSearchQuery,
    ) -> Result<Vec<MediaSearchResult>> {
        if query.is_empty() {
            return Err(ScraperError::MissingIdentifier(
                "neither a search term nor an id was given".to_string(),
            ));
        }

        let provider = self.provider_for(provider_id, query.kind(), |c| c.search)?;
        debug!("searching {} for {} '{}'", provider_id, query.kind(), query.query());

        let results = match provider.search(query).await {
            Ok(results) => results,
            Err(ScraperError::NotFound(what)) => {
                debug!("provider {} found nothing: {}", provider_id, what);
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        let mut ranked = Matcher::rank(query, results);
        ranked.truncate(self.config.max_results);
        Ok(ranked)
    }

    /// Search every provider supporting the query's kind and merge the
    /// ranked results. Fails only when every provider failed.
    pub async fn search_all(&self, query: &MediaSearchQuery) -> Result<Vec<MediaSearchResult>> {
        if query.is_empty() {
            return Err(ScraperError::MissingIdentifier(
                "neither a search term nor an id was given".to_string(),
            ));
        }

        let mut all_results = Vec::new();
        let mut first_error = None;
        let mut succeeded = false;

        for provider in self.providers.iter().filter(|p| p.supports(query.kind())) {
            match self.search(provider.id(), query).await {
                Ok(results) => {
                    debug!("Provider {} returned {} results", provider.id(), results.len());
                    succeeded = true;
                    all_results.extend(results);
                }
                Err(ScraperError::UnsupportedMediaKind(_)) => {}
                Err(e) => {
                    warn!("Provider {} search failed: {}", provider.id(), e);
                    first_error.get_or_insert(e);
                }
            }
        }

        if !succeeded && let Some(e) = first_error {
            return Err(e);
        }

        Matcher::sort_ranked(&mut all_results);
        all_results.truncate(self.config.max_results);
        Ok(all_results)
    }

    /// Full metadata for one record.
    ///
    /// Episodes are picked out of the provider's cached episode list when
    /// the provider offers one.
    pub async fn get_metadata(
        &self,
        provider_id: &str,
        selector: &ScrapeSelector,
    ) -> Result<MediaMetadata> {
        let provider = self.provider_for(provider_id, selector.kind, |c| c.metadata)?;

        if selector.kind == MediaKind::TvEpisode && provider.capabilities().episode_list {
            if !selector.aired.is_complete()
                && !selector.dvd.is_complete()
                && selector.release_date.is_none()
            {
                return Err(ScraperError::MissingIdentifier(
                    "season/episode number or release date".to_string(),
                ));
            }

            let show = selector.clone().with_kind(MediaKind::TvShow);
            let episodes = self.get_episode_list(provider_id, &show).await?;
            return selector.pick_episode(&episodes).cloned();
        }

        provider.get_metadata(selector).await
    }

    /// Artwork for one record, filtered and best first
    pub async fn get_artwork(
        &self,
        provider_id: &str,
        selector: &ScrapeSelector,
        filter: ArtworkFilter,
    ) -> Result<Vec<ArtworkItem>> {
        let provider = self.provider_for(provider_id, selector.kind, |c| c.artwork)?;

        let mut items = provider.get_artwork(selector, filter).await?;
        items.retain(|item| filter.matches(item.kind));
        sort_artwork(&mut items, &selector.locale);
        Ok(items)
    }

    /// Every episode of a show, cached per provider, show and language.
    ///
    /// Concurrent callers for the same show share one fetch and receive
    /// the same list.
    pub async fn get_episode_list(
        &self,
        provider_id: &str,
        selector: &ScrapeSelector,
    ) -> Result<Arc<Vec<MediaMetadata>>> {
        let provider = self.provider_for(provider_id, selector.kind, |c| c.episode_list)?;
        let show_id = selector
            .id(provider.id())
            .ok_or_else(|| {
                ScraperError::MissingIdentifier(format!("no {} show id", provider.id()))
            })?
            .to_string();

        if !self.config.use_cache {
            return provider.get_episode_list(selector).await.map(Arc::new);
        }

        let key = EpisodeListKey {
            show_id,
            language: selector.locale.language().to_string(),
        };
        self.episode_cache(provider.id())
            .get_or_try_insert_with(key, || provider.get_episode_list(selector))
            .await
    }

    fn episode_cache(&self, provider_id: &'static str) -> Arc<EpisodeListCache> {
        Arc::clone(
            self.episode_lists
                .entry(provider_id)
                .or_insert_with(|| {
                    Arc::new(ResponseCache::new(
                        self.config.episode_list_ttl,
                        self.config.episode_list_max_entries,
                    ))
                })
                .value(),
        )
    }

    /// Clear the cache
    pub fn clear_cache(&self) {
        for cache in &self.episode_lists {
            cache.value().clear();
        }
    }
}

impl Default for ScraperManager {
    fn default() -> Self {
        Self::new()
    }
}
