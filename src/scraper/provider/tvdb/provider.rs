use super::api_types::{
    Actor, DataResponse, Episode, EpisodePage, Image, Language, LoginRequest, LoginResponse,
    Series, SeriesSearchResult,
};
use crate::config::ConfigStore;
use crate::scraper::{
    Result, ScraperError, TransportError,
    language::LanguageFallback,
    provider::{HttpClient, MetadataProvider, ProviderCapabilities, not_found, year_of},
    session::{ClientFactory, ProviderSession, SessionManager},
    types::{
        ArtworkFilter, ArtworkItem, ArtworkKind, CastMember, CastRole, EpisodeNumbers, IMDB,
        Locale, MediaKind, MediaMetadata, MediaRating, MediaSearchQuery, MediaSearchResult,
        ScrapeSelector, is_valid_imdb_id, parse_date, split_names,
    },
};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, trace, warn};

const TVDB_BASE_URL: &str = "https://api.thetvdb.com";
const ARTWORK_BASE_URL: &str = "https://artworks.thetvdb.com/banners/";
const EPISODE_PAGE_SIZE: usize = 100;

/// Image key types and the artwork kind each one maps to
const IMAGE_KEY_TYPES: [(&str, ArtworkKind); 5] = [
    ("fanart", ArtworkKind::Background),
    ("poster", ArtworkKind::Poster),
    ("season", ArtworkKind::SeasonPoster),
    ("seasonwide", ArtworkKind::SeasonBanner),
    ("series", ArtworkKind::Banner),
];

type TransportResult<T> = std::result::Result<T, TransportError>;

/// Logged-in TVDB client with the language table fetched at login
pub struct TvdbClient {
    http: HttpClient,
    /// TVDB language id -> ISO 639-1 code
    languages: HashMap<i64, String>,
}

impl TvdbClient {
    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> TransportResult<T> {
        self.http.get_with_params(endpoint, params).await
    }

    /// Translated fields come back empty when no translation exists
    async fn get_localized<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
        locale: &Locale,
    ) -> TransportResult<T> {
        self.http
            .get_localized(endpoint, params, locale.language())
            .await
    }

    fn language_code(&self, language_id: Option<i64>) -> Option<String> {
        language_id.and_then(|id| self.languages.get(&id).cloned())
    }
}

/// Builds [`TvdbClient`]s by logging in and loading the language table
#[derive(Debug, Clone)]
pub struct TvdbConnector {
    base_url: String,
}

impl TvdbConnector {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

impl Default for TvdbConnector {
    fn default() -> Self {
        Self::new(TVDB_BASE_URL)
    }
}

#[async_trait]
impl ClientFactory for TvdbConnector {
    type Client = TvdbClient;

    async fn connect(&self, api_key: &str) -> Result<TvdbClient> {
        let http = HttpClient::new(self.base_url.as_str())?;

        let login: LoginResponse = http
            .post_json("/login", &LoginRequest { apikey: api_key })
            .await?;
        if login.token.is_empty() {
            return Err(TransportError::Bootstrap("TVDB login returned no token".to_string()).into());
        }

        let http = http.with_bearer_token(login.token);
        let languages: DataResponse<Vec<Language>> = http.get("/languages").await?;
        if languages.data.is_empty() {
            return Err(TransportError::Bootstrap("TVDB returned no languages".to_string()).into());
        }

        Ok(TvdbClient {
            http,
            languages: languages
                .data
                .into_iter()
                .map(|l| (l.id, l.abbreviation.to_ascii_lowercase()))
                .collect(),
        })
    }
}

/// TheTVDB: shows and episodes
pub struct TvdbProvider {
    session: Arc<SessionManager<TvdbConnector>>,
    config: Arc<dyn ConfigStore>,
}

impl TvdbProvider {
    pub const ID: &'static str = "tvdb";

    /// Built-in key, supplied at build time
    pub const DEFAULT_API_KEY: &'static str = match option_env!("MEDIA_RESOLVER_TVDB_API_KEY") {
        Some(key) => key,
        None => "",
    };

    pub fn new(session: Arc<SessionManager<TvdbConnector>>, config: Arc<dyn ConfigStore>) -> Self {
        Self { session, config }
    }

    async fn client(&self) -> Result<Arc<ProviderSession<TvdbClient>>> {
        self.session.session().await
    }

    fn fallback(&self) -> LanguageFallback {
        LanguageFallback::from_config(self.config.as_ref(), Self::ID)
    }

    fn show_id(selector: &ScrapeSelector) -> Result<i64> {
        selector
            .id_as_int(Self::ID)
            .ok_or_else(|| ScraperError::MissingIdentifier("no tvdb show id".to_string()))
    }

    async fn fetch_series(&self, client: &TvdbClient, id: i64, locale: &Locale) -> Result<Series> {
        client
            .get_localized::<DataResponse<Series>>(&format!("/series/{id}"), &[], locale)
            .await
            .map(|r| r.data)
            .map_err(|e| not_found(e, format!("tvdb series {id}")))
    }

    async fn fetch_series_result(
        &self,
        client: &TvdbClient,
        id: i64,
        locale: Locale,
    ) -> Result<MediaSearchResult> {
        let series = self.fetch_series(client, id, &locale).await?;
        Ok(series_result(
            series.id,
            series.series_name,
            series.overview,
            series.first_aired,
        ))
    }

    async fn fetch_series_metadata(
        &self,
        client: &TvdbClient,
        id: i64,
        locale: Locale,
    ) -> Result<MediaMetadata> {
        let series = self.fetch_series(client, id, &locale).await?;
        Ok(series_metadata(series))
    }

    /// Free-text or IMDb search, retrying in the next language of the chain
    /// while TVDB answers 404
    async fn search_series(
        &self,
        client: &TvdbClient,
        name: Option<&str>,
        imdb_id: Option<&str>,
        locales: &[Locale],
    ) -> Result<Vec<SeriesSearchResult>> {
        let mut params = Vec::with_capacity(1);
        if let Some(imdb_id) = imdb_id {
            params.push(("imdbId", imdb_id));
        } else if let Some(name) = name {
            params.push(("name", name));
        }

        for locale in locales {
            match client
                .get_localized::<DataResponse<Vec<SeriesSearchResult>>>(
                    "/search/series",
                    &params,
                    locale,
                )
                .await
            {
                Ok(found) => return Ok(found.data),
                Err(e) if e.is_not_found() => {
                    debug!("not found in {} - trying next language", locale);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(Vec::new())
    }

    /// The search API only returns banners; look up a real poster
    async fn first_poster(&self, client: &TvdbClient, series_id: &str) -> Option<String> {
        match client
            .get::<DataResponse<Vec<Image>>>(
                &format!("/series/{series_id}/images/query"),
                &[("keyType", "poster")],
            )
            .await
        {
            Ok(images) => images.data.first().map(|i| artwork_url(&i.file_name)),
            Err(e) => {
                warn!("could not get poster for search result: {}", e);
                None
            }
        }
    }

    async fn fetch_actors(&self, client: &TvdbClient, id: i64) -> Vec<Actor> {
        match client
            .get::<DataResponse<Vec<Actor>>>(&format!("/series/{id}/actors"), &[])
            .await
        {
            Ok(actors) => actors.data,
            Err(e) => {
                error!("failed to get actors: {}", e);
                Vec::new()
            }
        }
    }

    /// All pages of a show's episodes. A failing first page is an error; a
    /// failing later page ends the list.
    async fn fetch_episodes(
        &self,
        client: &TvdbClient,
        show_id: i64,
        locale: Locale,
    ) -> Result<Vec<MediaMetadata>> {
        let endpoint = format!("/series/{show_id}/episodes");
        let mut episodes = Vec::new();
        let mut page = 1u32;

        loop {
            let page_param = page.to_string();
            match client
                .get_localized::<EpisodePage>(&endpoint, &[("page", page_param.as_str())], &locale)
                .await
            {
                Ok(response) => {
                    let count = response.data.len();
                    episodes.extend(response.data.into_iter().map(episode_metadata));
                    if count < EPISODE_PAGE_SIZE {
                        break;
                    }
                }
                Err(e) if page == 1 => {
                    error!("failed to get episode list: {}", e);
                    return Err(e.into());
                }
                Err(e) => {
                    debug!("stopping at episode page {}: {}", page, e);
                    break;
                }
            }
            page += 1;
        }

        Ok(episodes)
    }

    async fn fetch_images(
        &self,
        client: &TvdbClient,
        show_id: i64,
        key_type: &str,
        kind: ArtworkKind,
    ) -> Vec<ArtworkItem> {
        match client
            .get::<DataResponse<Vec<Image>>>(
                &format!("/series/{show_id}/images/query"),
                &[("keyType", key_type)],
            )
            .await
        {
            Ok(images) => images
                .data
                .into_iter()
                .map(|image| artwork(client, kind, image))
                .collect(),
            Err(e) if e.is_not_found() => {
                trace!("no {} images for {}", key_type, show_id);
                Vec::new()
            }
            Err(e) => {
                error!("could not get artwork from tvdb: {}", e);
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl MetadataProvider for TvdbProvider {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn name(&self) -> &'static str {
        "TheTVDB"
    }

    fn supported_kinds(&self) -> &[MediaKind] {
        &[MediaKind::TvShow, MediaKind::TvEpisode]
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::all()
    }

    async fn search(&self, query: &MediaSearchQuery) -> Result<Vec<MediaSearchResult>> {
        if query.kind() != MediaKind::TvShow {
            return Err(ScraperError::UnsupportedMediaKind(query.kind()));
        }

        let session = self.client().await?;
        let client = session.client();
        let fallback = self.fallback();
        let locale = query.locale();
        let mut results = Vec::new();

        if let Some(id) = query
            .id(Self::ID)
            .and_then(|id| id.parse::<i64>().ok())
            .filter(|id| *id > 0)
        {
            debug!("found TvDb ID {} - getting direct", id);
            match self.fetch_series_result(client, id, locale.clone()).await {
                Ok(mut result) => {
                    fallback
                        .resolve(locale, &mut result, |l| self.fetch_series_result(client, id, l))
                        .await;
                    results.push(result.direct());
                }
                Err(e) => error!("problem getting data from tvdb via id: {}", e),
            }
        }

        let imdb_id = query.lookup_imdb_id();
        let name = Some(query.query()).filter(|q| !q.is_empty() && imdb_id.is_none());

        if results.is_empty() && (imdb_id.is_some() || name.is_some()) {
            let found = self
                .search_series(client, name, imdb_id, &fallback.locales(locale))
                .await?;

            for show in found {
                let id = show.id;
                let mut result =
                    series_result(show.id, show.series_name, show.overview, show.first_aired);
                fallback
                    .resolve(locale, &mut result, |l| self.fetch_series_result(client, id, l))
                    .await;
                if let Some(imdb_id) = imdb_id {
                    result = result.with_imdb_id(Some(imdb_id.to_string())).direct();
                }
                results.push(result);
            }
        }

        for result in &mut results {
            result.poster_url = self.first_poster(client, &result.id).await;
        }

        Ok(results)
    }

    /// Episodes are picked out of a freshly downloaded episode list.
    /// [`ScraperManager::get_metadata`](crate::scraper::ScraperManager::get_metadata)
    /// serves them from its cache instead.
    async fn get_metadata(&self, selector: &ScrapeSelector) -> Result<MediaMetadata> {
        match selector.kind {
            MediaKind::TvShow => {}
            MediaKind::TvEpisode => {
                let show = selector.clone().with_kind(MediaKind::TvShow);
                let episodes = self.get_episode_list(&show).await?;
                return selector.pick_episode(&episodes).cloned();
            }
            kind => return Err(ScraperError::UnsupportedMediaKind(kind)),
        }

        let id = Self::show_id(selector)?;
        let session = self.client().await?;
        let client = session.client();

        let mut metadata = self
            .fetch_series_metadata(client, id, selector.locale.clone())
            .await?;
        self.fallback()
            .resolve(&selector.locale, &mut metadata, |l| {
                self.fetch_series_metadata(client, id, l)
            })
            .await;

        for actor in self.fetch_actors(client, id).await {
            metadata.add_cast_member(
                CastMember::new(CastRole::Actor, actor.name)
                    .with_character(actor.role)
                    .with_image(actor.image.filter(|i| !i.is_empty()).map(|i| artwork_url(&i))),
            );
        }

        Ok(metadata)
    }

    async fn get_artwork(
        &self,
        selector: &ScrapeSelector,
        filter: ArtworkFilter,
    ) -> Result<Vec<ArtworkItem>> {
        match selector.kind {
            MediaKind::TvShow => {}
            MediaKind::TvEpisode => {
                let show = selector.clone().with_kind(MediaKind::TvShow);
                let episodes = self.get_episode_list(&show).await?;
                let episode = selector.pick_episode(&episodes)?;
                return Ok(episode
                    .artwork
                    .iter()
                    .filter(|item| filter.matches(item.kind))
                    .cloned()
                    .collect());
            }
            kind => return Err(ScraperError::UnsupportedMediaKind(kind)),
        }

        let id = Self::show_id(selector)?;
        let session = self.client().await?;
        let client = session.client();

        let mut items = Vec::new();
        for (key_type, kind) in IMAGE_KEY_TYPES {
            if filter.matches(kind) {
                items.extend(self.fetch_images(client, id, key_type, kind).await);
            }
        }

        Ok(items)
    }

    async fn get_episode_list(&self, selector: &ScrapeSelector) -> Result<Vec<MediaMetadata>> {
        let show_id = Self::show_id(selector)?;
        let session = self.client().await?;
        let client = session.client();

        let mut episodes = self
            .fetch_episodes(client, show_id, selector.locale.clone())
            .await?;
        self.fallback()
            .resolve_list(
                &selector.locale,
                &mut episodes,
                |e| e.id(Self::ID).map(str::to_string),
                |l| self.fetch_episodes(client, show_id, l),
            )
            .await;

        Ok(episodes)
    }
}

fn artwork_url(file_name: &str) -> String {
    format!("{ARTWORK_BASE_URL}{file_name}")
}

fn series_result(
    id: i64,
    name: String,
    overview: Option<String>,
    first_aired: Option<String>,
) -> MediaSearchResult {
    MediaSearchResult::new(TvdbProvider::ID, id.to_string(), name, MediaKind::TvShow)
        .with_overview(overview)
        .with_year(year_of(first_aired.as_deref()))
}

/// Some TVDB entries carry the year in the title ("Show (2010)")
fn strip_year(title: &str, year: Option<i32>) -> String {
    match year {
        Some(year) if title.contains(&year.to_string()) => {
            debug!("weird TVDB entry - removing year {} from title", year);
            title
                .replace(&year.to_string(), "")
                .replace("()", "")
                .trim()
                .to_string()
        }
        _ => title.to_string(),
    }
}

fn series_metadata(series: Series) -> MediaMetadata {
    let mut md = MediaMetadata::new(TvdbProvider::ID, MediaKind::TvShow);
    md.set_id(TvdbProvider::ID, series.id);
    if let Some(imdb) = series.imdb_id.filter(|i| is_valid_imdb_id(i)) {
        md.set_id(IMDB, imdb);
    }
    if let Some(zap2it) = series.zap2it_id {
        md.set_id("zap2it", zap2it);
    }

    md.set_release_date(parse_date(series.first_aired.as_deref()));
    md.title = strip_year(&series.series_name, md.year);
    md.plot = series.overview.unwrap_or_default();
    md.runtime = series
        .runtime
        .and_then(|r| r.trim().parse().ok())
        .filter(|r| *r > 0);
    md.status = series.status.filter(|s| !s.is_empty());
    md.certification = series.rating.filter(|r| !r.is_empty());
    md.genres = series.genre;

    if let Some(rating) = series.site_rating {
        md.add_rating(MediaRating::new(
            TvdbProvider::ID,
            rating,
            series.site_rating_count.unwrap_or_default(),
        ));
    }

    if let Some(poster) = series.poster.filter(|p| !p.is_empty()) {
        md.artwork.push(ArtworkItem::new(
            TvdbProvider::ID,
            ArtworkKind::Poster,
            artwork_url(&poster),
        ));
    }
    md
}

fn episode_metadata(episode: Episode) -> MediaMetadata {
    let mut md = MediaMetadata::new(TvdbProvider::ID, MediaKind::TvEpisode);
    md.set_id(TvdbProvider::ID, episode.id);
    if let Some(imdb) = episode.imdb_id.filter(|i| is_valid_imdb_id(i)) {
        md.set_id(IMDB, imdb);
    }

    md.aired = EpisodeNumbers {
        season: episode.aired_season,
        episode: episode.aired_episode_number,
    };
    // DVD numbers come as decimals ("1.0")
    md.dvd = EpisodeNumbers {
        season: episode.dvd_season.map(|s| s as i32),
        episode: episode.dvd_episode_number.map(|e| e as i32),
    };
    md.title = episode.episode_name.unwrap_or_default();
    md.plot = episode.overview.unwrap_or_default();
    md.set_release_date(parse_date(episode.first_aired.as_deref()));

    if let Some(rating) = episode.site_rating {
        md.add_rating(MediaRating::new(
            TvdbProvider::ID,
            rating,
            episode.site_rating_count.unwrap_or_default(),
        ));
    }

    let credits = [
        (CastRole::Director, &episode.directors),
        (CastRole::Writer, &episode.writers),
        (CastRole::Actor, &episode.guest_stars),
    ];
    for (role, entries) in credits {
        for name in entries.iter().flat_map(|entry| split_names(entry)) {
            md.add_cast_member(CastMember::new(role, name));
        }
    }

    if let Some(filename) = episode.filename.filter(|f| !f.is_empty()) {
        md.artwork.push(ArtworkItem::new(
            TvdbProvider::ID,
            ArtworkKind::Thumbnail,
            artwork_url(&filename),
        ));
    }
    md
}

fn artwork(client: &TvdbClient, kind: ArtworkKind, image: Image) -> ArtworkItem {
    let season = match kind {
        ArtworkKind::SeasonPoster | ArtworkKind::SeasonBanner => {
            image.sub_key.as_deref().and_then(|s| s.trim().parse().ok())
        }
        _ => None,
    };
    let (rating, votes) = image
        .ratings_info
        .map(|r| (r.average.unwrap_or_default(), r.count.unwrap_or_default()))
        .unwrap_or_default();

    ArtworkItem::new(TvdbProvider::ID, kind, artwork_url(&image.file_name))
        .with_preview(
            image
                .thumbnail
                .filter(|t| !t.is_empty())
                .map(|t| artwork_url(&t)),
        )
        .with_language(client.language_code(image.language_id))
        .with_rating(rating, votes)
        .with_internal_id(image.id)
        .with_season(season)
        .with_resolution(image.resolution.as_deref())
}
