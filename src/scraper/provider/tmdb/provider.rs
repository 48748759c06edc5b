use super::api_types::{
    CollectionDetails, CollectionResult, ConfigurationResponse, Credits, EpisodeDetails,
    FindResponse, Image, ImagesResponse, MovieDetails, MovieResult, SearchResponse, SeasonDetails,
    TvDetails, TvResult,
};
use crate::config::{ConfigStore, INCLUDE_ADULT, get_bool};
use crate::scraper::{
    Result, ScraperError, TransportError,
    language::LanguageFallback,
    provider::{HttpClient, MetadataProvider, ProviderCapabilities, not_found, year_of},
    session::{ClientFactory, ProviderSession, SessionManager},
    types::{
        ArtworkFilter, ArtworkItem, ArtworkKind, CastMember, CastRole, EpisodeNumbers, IMDB,
        Locale, MediaKind, MediaMetadata, MediaRating, MediaSearchQuery, MediaSearchResult,
        ScrapeSelector, is_valid_imdb_id, parse_date,
    },
};
use async_trait::async_trait;
use futures::future::try_join_all;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, trace, warn};

const TMDB_BASE_URL: &str = "https://api.themoviedb.org/3";

/// Authenticated TMDB client with the image base URL from `/configuration`
pub struct TmdbClient {
    http: HttpClient,
    api_key: String,
    image_base_url: String,
}

impl TmdbClient {
    async fn request<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        extra_params: &[(&str, &str)],
    ) -> std::result::Result<T, TransportError> {
        let mut params = Vec::with_capacity(extra_params.len() + 1);
        params.push(("api_key", self.api_key.as_str()));
        params.extend_from_slice(extra_params);

        self.http.get_with_params(endpoint, &params).await
    }

    fn image_url(&self, path: Option<&str>, size: &str) -> Option<String> {
        path.filter(|p| !p.is_empty())
            .map(|p| format!("{}{size}{p}", self.image_base_url))
    }
}

/// Builds [`TmdbClient`]s; the key is validated by fetching `/configuration`
#[derive(Debug, Clone)]
pub struct TmdbConnector {
    base_url: String,
}

impl TmdbConnector {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

impl Default for TmdbConnector {
    fn default() -> Self {
        Self::new(TMDB_BASE_URL)
    }
}

#[async_trait]
impl ClientFactory for TmdbConnector {
    type Client = TmdbClient;

    async fn connect(&self, api_key: &str) -> Result<TmdbClient> {
        let http = HttpClient::new(self.base_url.as_str())?;
        let configuration: ConfigurationResponse = http
            .get_with_params("/configuration", &[("api_key", api_key)])
            .await?;

        let image_base_url = configuration.images.secure_base_url;
        if image_base_url.is_empty() {
            return Err(TransportError::Bootstrap(
                "TMDB configuration has no image base url".to_string(),
            )
            .into());
        }

        Ok(TmdbClient {
            http,
            api_key: api_key.to_string(),
            image_base_url,
        })
    }
}

/// The Movie Database: movies, movie sets, shows and episodes
pub struct TmdbProvider {
    session: Arc<SessionManager<TmdbConnector>>,
    config: Arc<dyn ConfigStore>,
}

impl TmdbProvider {
    pub const ID: &'static str = "tmdb";

    /// Built-in key, supplied at build time
    pub const DEFAULT_API_KEY: &'static str = match option_env!("MEDIA_RESOLVER_TMDB_API_KEY") {
        Some(key) => key,
        None => "",
    };

    pub fn new(session: Arc<SessionManager<TmdbConnector>>, config: Arc<dyn ConfigStore>) -> Self {
        Self { session, config }
    }

    async fn client(&self) -> Result<Arc<ProviderSession<TmdbClient>>> {
        self.session.session().await
    }

    fn fallback(&self) -> LanguageFallback {
        LanguageFallback::from_config(self.config.as_ref(), Self::ID)
    }

    fn include_adult(&self) -> &'static str {
        if get_bool(self.config.as_ref(), Self::ID, INCLUDE_ADULT) {
            "true"
        } else {
            "false"
        }
    }

    /// TMDB id from the selector, or looked up through its IMDb id
    async fn resolve_id(&self, client: &TmdbClient, selector: &ScrapeSelector) -> Result<i64> {
        if let Some(id) = selector.id_as_int(Self::ID) {
            return Ok(id);
        }

        if matches!(selector.kind, MediaKind::Movie | MediaKind::TvShow)
            && let Some(imdb) = selector.id(IMDB).filter(|i| is_valid_imdb_id(i))
        {
            let found = self.find(client, imdb, &selector.locale).await?;
            let id = match selector.kind {
                MediaKind::Movie => found.movie_results.first().map(|m| m.id),
                _ => found.tv_results.first().map(|t| t.id),
            };
            return id.ok_or_else(|| ScraperError::NotFound(format!("{} {imdb}", selector.kind)));
        }

        Err(ScraperError::MissingIdentifier(format!(
            "no tmdb id for {}",
            selector.kind
        )))
    }

    async fn find(&self, client: &TmdbClient, imdb_id: &str, locale: &Locale) -> Result<FindResponse> {
        let language = language_tag(locale);
        client
            .request(
                &format!("/find/{imdb_id}"),
                &[("external_source", "imdb_id"), ("language", language.as_str())],
            )
            .await
            .map_err(|e| not_found(e, imdb_id))
    }

    /// Identifier lookups; `None` when the query carries no usable id
    async fn search_direct(
        &self,
        client: &TmdbClient,
        query: &MediaSearchQuery,
    ) -> Result<Option<MediaSearchResult>> {
        let language = language_tag(query.locale());

        if let Some(id) = query
            .id(Self::ID)
            .and_then(|id| id.parse::<i64>().ok())
            .filter(|id| *id > 0)
        {
            debug!("TMDB: getting {} by id {}", query.kind(), id);
            let params = [("language", language.as_str())];
            let result = match query.kind() {
                MediaKind::Movie => client
                    .request::<MovieResult>(&format!("/movie/{id}"), &params)
                    .await
                    .map(|m| movie_result(client, m)),
                MediaKind::TvShow => client
                    .request::<TvResult>(&format!("/tv/{id}"), &params)
                    .await
                    .map(|t| tv_result(client, t)),
                MediaKind::MovieSet => client
                    .request::<CollectionResult>(&format!("/collection/{id}"), &params)
                    .await
                    .map(|c| collection_result(client, c)),
                MediaKind::TvEpisode => return Ok(None),
            };

            match result {
                Ok(result) => return Ok(Some(result.direct())),
                Err(e) if e.is_not_found() => debug!("TMDB: id {} not found", id),
                Err(e) => return Err(e.into()),
            }
        }

        if matches!(query.kind(), MediaKind::Movie | MediaKind::TvShow)
            && let Some(imdb) = query.lookup_imdb_id()
        {
            debug!("TMDB: getting {} by imdb id {}", query.kind(), imdb);
            let found = match self.find(client, imdb, query.locale()).await {
                Ok(found) => found,
                Err(ScraperError::NotFound(_)) => return Ok(None),
                Err(e) => return Err(e),
            };
            let result = match query.kind() {
                MediaKind::Movie => found
                    .movie_results
                    .into_iter()
                    .next()
                    .map(|m| movie_result(client, m)),
                _ => found
                    .tv_results
                    .into_iter()
                    .next()
                    .map(|t| tv_result(client, t)),
            };
            return Ok(result.map(|r| r.with_imdb_id(Some(imdb.to_string())).direct()));
        }

        Ok(None)
    }

    async fn search_text(
        &self,
        client: &TmdbClient,
        query: &MediaSearchQuery,
    ) -> Result<Vec<MediaSearchResult>> {
        let language = language_tag(query.locale());
        let params = [
            ("query", query.query()),
            ("language", language.as_str()),
            ("include_adult", self.include_adult()),
        ];

        let results = match query.kind() {
            MediaKind::Movie => client
                .request::<SearchResponse<MovieResult>>("/search/movie", &params)
                .await?
                .results
                .into_iter()
                .map(|m| movie_result(client, m))
                .collect(),
            MediaKind::TvShow => client
                .request::<SearchResponse<TvResult>>("/search/tv", &params)
                .await?
                .results
                .into_iter()
                .map(|t| tv_result(client, t))
                .collect(),
            MediaKind::MovieSet => client
                .request::<SearchResponse<CollectionResult>>("/search/collection", &params)
                .await?
                .results
                .into_iter()
                .map(|c| collection_result(client, c))
                .collect(),
            MediaKind::TvEpisode => {
                return Err(ScraperError::UnsupportedMediaKind(MediaKind::TvEpisode));
            }
        };

        Ok(results)
    }

    async fn fetch_metadata(
        &self,
        client: &TmdbClient,
        kind: MediaKind,
        id: i64,
        locale: Locale,
    ) -> Result<MediaMetadata> {
        let language = language_tag(&locale);
        match kind {
            MediaKind::Movie => {
                let movie: MovieDetails = client
                    .request(
                        &format!("/movie/{id}"),
                        &[("language", language.as_str()), ("append_to_response", "credits")],
                    )
                    .await
                    .map_err(|e| not_found(e, format!("tmdb movie {id}")))?;
                Ok(movie_metadata(client, movie))
            }
            MediaKind::TvShow => {
                let tv: TvDetails = client
                    .request(
                        &format!("/tv/{id}"),
                        &[
                            ("language", language.as_str()),
                            ("append_to_response", "credits,external_ids"),
                        ],
                    )
                    .await
                    .map_err(|e| not_found(e, format!("tmdb tv show {id}")))?;
                Ok(tv_metadata(client, tv))
            }
            MediaKind::MovieSet => {
                let collection: CollectionDetails = client
                    .request(&format!("/collection/{id}"), &[("language", language.as_str())])
                    .await
                    .map_err(|e| not_found(e, format!("tmdb collection {id}")))?;
                Ok(collection_metadata(client, collection))
            }
            MediaKind::TvEpisode => Err(ScraperError::UnsupportedMediaKind(kind)),
        }
    }

    async fn fetch_episodes(
        &self,
        client: &TmdbClient,
        show_id: i64,
        locale: Locale,
    ) -> Result<Vec<MediaMetadata>> {
        let language = language_tag(&locale);
        let tv: TvDetails = client
            .request(&format!("/tv/{show_id}"), &[("language", language.as_str())])
            .await
            .map_err(|e| not_found(e, format!("tmdb tv show {show_id}")))?;

        let language = language.as_str();
        let seasons = try_join_all(tv.seasons.iter().map(|season| async move {
            let endpoint = format!("/tv/{show_id}/season/{}", season.season_number);
            client
                .request::<SeasonDetails>(&endpoint, &[("language", language)])
                .await
        }))
        .await?;

        Ok(seasons
            .into_iter()
            .flat_map(|season| season.episodes)
            .map(|episode| episode_metadata(client, episode))
            .collect())
    }

    async fn season_posters(&self, client: &TmdbClient, show_id: i64) -> Result<Vec<ArtworkItem>> {
        let tv: TvDetails = client
            .request(&format!("/tv/{show_id}"), &[])
            .await
            .map_err(|e| not_found(e, format!("tmdb tv show {show_id}")))?;

        Ok(tv
            .seasons
            .into_iter()
            .filter_map(|season| {
                let url = client.image_url(season.poster_path.as_deref(), "original")?;
                Some(
                    ArtworkItem::new(Self::ID, ArtworkKind::SeasonPoster, url)
                        .with_preview(client.image_url(season.poster_path.as_deref(), "w342"))
                        .with_season(Some(season.season_number)),
                )
            })
            .collect())
    }
}

#[async_trait]
impl MetadataProvider for TmdbProvider {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn name(&self) -> &'static str {
        "The Movie Database"
    }

    fn supported_kinds(&self) -> &[MediaKind] {
        &[
            MediaKind::Movie,
            MediaKind::MovieSet,
            MediaKind::TvShow,
            MediaKind::TvEpisode,
        ]
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::all()
    }

    async fn search(&self, query: &MediaSearchQuery) -> Result<Vec<MediaSearchResult>> {
        let session = self.client().await?;
        let client = session.client();

        if let Some(direct) = self.search_direct(client, query).await? {
            return Ok(vec![direct]);
        }

        if query.query().is_empty() || is_valid_imdb_id(query.query()) {
            return Err(ScraperError::NotFound(format!(
                "no {} matches the given ids",
                query.kind()
            )));
        }

        trace!("TMDB: searching {} '{}'", query.kind(), query.query());
        self.search_text(client, query).await
    }

    /// Episodes are picked out of a freshly downloaded episode list.
    /// [`ScraperManager::get_metadata`](crate::scraper::ScraperManager::get_metadata)
    /// serves them from its cache instead.
    async fn get_metadata(&self, selector: &ScrapeSelector) -> Result<MediaMetadata> {
        if selector.kind == MediaKind::TvEpisode {
            let show = selector.clone().with_kind(MediaKind::TvShow);
            let episodes = self.get_episode_list(&show).await?;
            return selector.pick_episode(&episodes).cloned();
        }

        let session = self.client().await?;
        let client = session.client();
        let id = self.resolve_id(client, selector).await?;

        let mut metadata = self
            .fetch_metadata(client, selector.kind, id, selector.locale.clone())
            .await?;
        self.fallback()
            .resolve(&selector.locale, &mut metadata, |locale| {
                self.fetch_metadata(client, selector.kind, id, locale)
            })
            .await;

        Ok(metadata)
    }

    async fn get_artwork(
        &self,
        selector: &ScrapeSelector,
        filter: ArtworkFilter,
    ) -> Result<Vec<ArtworkItem>> {
        let session = self.client().await?;
        let client = session.client();
        let id = self.resolve_id(client, selector).await?;

        let endpoint = match selector.kind {
            MediaKind::Movie => format!("/movie/{id}/images"),
            MediaKind::TvShow => format!("/tv/{id}/images"),
            MediaKind::MovieSet => format!("/collection/{id}/images"),
            MediaKind::TvEpisode => {
                let (Some(season), Some(episode)) = (selector.aired.season, selector.aired.episode)
                else {
                    return Err(ScraperError::MissingIdentifier(
                        "season/episode number".to_string(),
                    ));
                };
                format!("/tv/{id}/season/{season}/episode/{episode}/images")
            }
        };

        let image_language = format!("{},en,null", selector.locale.language());
        let images: ImagesResponse = client
            .request(&endpoint, &[("include_image_language", image_language.as_str())])
            .await
            .map_err(|e| not_found(e, format!("tmdb images {id}")))?;

        let mut items: Vec<ArtworkItem> = images
            .posters
            .into_iter()
            .filter_map(|i| artwork(client, ArtworkKind::Poster, i))
            .chain(
                images
                    .backdrops
                    .into_iter()
                    .filter_map(|i| artwork(client, ArtworkKind::Background, i)),
            )
            .chain(
                images
                    .stills
                    .into_iter()
                    .filter_map(|i| artwork(client, ArtworkKind::Thumbnail, i)),
            )
            .collect();

        if selector.kind == MediaKind::TvShow && filter.matches(ArtworkKind::SeasonPoster) {
            match self.season_posters(client, id).await {
                Ok(posters) => items.extend(posters),
                Err(e) => warn!("TMDB: could not get season posters of {}: {}", id, e),
            }
        }

        items.retain(|item| filter.matches(item.kind));
        Ok(items)
    }

    async fn get_episode_list(&self, selector: &ScrapeSelector) -> Result<Vec<MediaMetadata>> {
        let session = self.client().await?;
        let client = session.client();
        let show_id = selector
            .id_as_int(Self::ID)
            .ok_or_else(|| ScraperError::MissingIdentifier("no tmdb show id".to_string()))?;

        let mut episodes = self
            .fetch_episodes(client, show_id, selector.locale.clone())
            .await?;
        self.fallback()
            .resolve_list(
                &selector.locale,
                &mut episodes,
                |e| e.id(Self::ID).map(str::to_string),
                |locale| self.fetch_episodes(client, show_id, locale),
            )
            .await;

        Ok(episodes)
    }
}

/// TMDB expects full language tags (`de-DE`)
fn language_tag(locale: &Locale) -> String {
    locale.with_primary_country().to_string()
}

fn poster(client: &TmdbClient, path: Option<&str>) -> Option<String> {
    client.image_url(path, "w342")
}

fn movie_result(client: &TmdbClient, movie: MovieResult) -> MediaSearchResult {
    MediaSearchResult::new(TmdbProvider::ID, movie.id.to_string(), movie.title, MediaKind::Movie)
        .with_year(year_of(movie.release_date.as_deref()))
        .with_overview(movie.overview)
        .with_poster(poster(client, movie.poster_path.as_deref()))
}

fn tv_result(client: &TmdbClient, tv: TvResult) -> MediaSearchResult {
    MediaSearchResult::new(TmdbProvider::ID, tv.id.to_string(), tv.name, MediaKind::TvShow)
        .with_year(year_of(tv.first_air_date.as_deref()))
        .with_overview(tv.overview)
        .with_poster(poster(client, tv.poster_path.as_deref()))
}

fn collection_result(client: &TmdbClient, collection: CollectionResult) -> MediaSearchResult {
    MediaSearchResult::new(
        TmdbProvider::ID,
        collection.id.to_string(),
        collection.name,
        MediaKind::MovieSet,
    )
    .with_overview(collection.overview)
    .with_poster(poster(client, collection.poster_path.as_deref()))
}

fn poster_artwork(client: &TmdbClient, path: Option<&str>) -> Option<ArtworkItem> {
    let url = client.image_url(path, "original")?;
    Some(
        ArtworkItem::new(TmdbProvider::ID, ArtworkKind::Poster, url)
            .with_preview(poster(client, path)),
    )
}

fn artwork(client: &TmdbClient, kind: ArtworkKind, image: Image) -> Option<ArtworkItem> {
    let url = client.image_url(Some(&image.file_path), "original")?;
    let preview_size = match kind {
        ArtworkKind::Poster | ArtworkKind::SeasonPoster => "w342",
        _ => "w300",
    };

    let item = ArtworkItem::new(TmdbProvider::ID, kind, url)
        .with_preview(client.image_url(Some(&image.file_path), preview_size))
        .with_language(image.iso_639_1)
        .with_rating(
            image.vote_average.unwrap_or_default(),
            image.vote_count.unwrap_or_default(),
        );

    Some(match (image.width, image.height) {
        (Some(width), Some(height)) => item.with_dimensions(width, height),
        _ => item,
    })
}

fn add_credits(client: &TmdbClient, metadata: &mut MediaMetadata, credits: Credits) {
    for cast in credits.cast {
        metadata.add_cast_member(
            CastMember::new(CastRole::Actor, cast.name)
                .with_character(cast.character)
                .with_image(client.image_url(cast.profile_path.as_deref(), "h632")),
        );
    }

    for crew in credits.crew {
        let role = match crew.job.as_deref() {
            Some("Director") => CastRole::Director,
            Some("Writer" | "Screenplay") => CastRole::Writer,
            _ => continue,
        };
        metadata.add_cast_member(
            CastMember::new(role, crew.name)
                .with_image(client.image_url(crew.profile_path.as_deref(), "h632")),
        );
    }
}

fn add_rating(metadata: &mut MediaMetadata, average: Option<f64>, votes: Option<u32>) {
    if let Some(average) = average.filter(|a| *a > 0.0) {
        metadata.add_rating(MediaRating::new(
            TmdbProvider::ID,
            average,
            votes.unwrap_or_default(),
        ));
    }
}

fn movie_metadata(client: &TmdbClient, movie: MovieDetails) -> MediaMetadata {
    let mut md = MediaMetadata::new(TmdbProvider::ID, MediaKind::Movie);
    md.set_id(TmdbProvider::ID, movie.id);
    if let Some(imdb) = movie.imdb_id.filter(|i| is_valid_imdb_id(i)) {
        md.set_id(IMDB, imdb);
    }

    md.title = movie.title;
    md.original_title = movie.original_title;
    md.plot = movie.overview.unwrap_or_default();
    md.set_release_date(parse_date(movie.release_date.as_deref()));
    md.runtime = movie.runtime.filter(|r| *r > 0);
    md.status = movie.status;
    md.genres = movie.genres.into_iter().map(|g| g.name).collect();
    add_rating(&mut md, movie.vote_average, movie.vote_count);
    md.artwork.extend(poster_artwork(client, movie.poster_path.as_deref()));

    if let Some(credits) = movie.credits {
        add_credits(client, &mut md, credits);
    }
    md
}

fn tv_metadata(client: &TmdbClient, tv: TvDetails) -> MediaMetadata {
    let mut md = MediaMetadata::new(TmdbProvider::ID, MediaKind::TvShow);
    md.set_id(TmdbProvider::ID, tv.id);
    if let Some(ids) = tv.external_ids {
        if let Some(imdb) = ids.imdb_id.filter(|i| is_valid_imdb_id(i)) {
            md.set_id(IMDB, imdb);
        }
        if let Some(tvdb) = ids.tvdb_id.filter(|i| *i > 0) {
            md.set_id("tvdb", tvdb);
        }
    }

    md.title = tv.name;
    md.original_title = tv.original_name;
    md.plot = tv.overview.unwrap_or_default();
    md.set_release_date(parse_date(tv.first_air_date.as_deref()));
    md.runtime = tv.episode_run_time.first().copied().filter(|r| *r > 0);
    md.status = tv.status;
    md.genres = tv.genres.into_iter().map(|g| g.name).collect();
    add_rating(&mut md, tv.vote_average, tv.vote_count);
    md.artwork.extend(poster_artwork(client, tv.poster_path.as_deref()));

    if let Some(credits) = tv.credits {
        add_credits(client, &mut md, credits);
    }
    md
}

fn collection_metadata(client: &TmdbClient, collection: CollectionDetails) -> MediaMetadata {
    let mut md = MediaMetadata::new(TmdbProvider::ID, MediaKind::MovieSet);
    md.set_id(TmdbProvider::ID, collection.id);
    md.title = collection.name;
    md.plot = collection.overview.unwrap_or_default();
    md.artwork
        .extend(poster_artwork(client, collection.poster_path.as_deref()));

    // first release of the set
    md.set_release_date(
        collection
            .parts
            .iter()
            .filter_map(|part| parse_date(part.release_date.as_deref()))
            .min(),
    );
    md
}

fn episode_metadata(client: &TmdbClient, episode: EpisodeDetails) -> MediaMetadata {
    let mut md = MediaMetadata::new(TmdbProvider::ID, MediaKind::TvEpisode);
    md.set_id(TmdbProvider::ID, episode.id);

    md.title = episode.name;
    md.plot = episode.overview.unwrap_or_default();
    md.aired = EpisodeNumbers::new(episode.season_number, episode.episode_number);
    md.set_release_date(parse_date(episode.air_date.as_deref()));
    add_rating(&mut md, episode.vote_average, episode.vote_count);

    if let Some(url) = client.image_url(episode.still_path.as_deref(), "original") {
        md.artwork.push(
            ArtworkItem::new(TmdbProvider::ID, ArtworkKind::Thumbnail, url)
                .with_preview(client.image_url(episode.still_path.as_deref(), "w300")),
        );
    }

    add_credits(
        client,
        &mut md,
        Credits {
            cast: episode.guest_stars,
            crew: episode.crew,
        },
    );
    md
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> TmdbClient {
        TmdbClient {
            http: HttpClient::new(TMDB_BASE_URL).unwrap(),
            api_key: "key".to_string(),
            image_base_url: "https://image.tmdb.org/t/p/".to_string(),
        }
    }

    #[test]
    fn test_language_tag_uses_primary_translation() {
        assert_eq!(language_tag(&"de".parse().unwrap()), "de-DE");
        assert_eq!(language_tag(&"pt-BR".parse().unwrap()), "pt-BR");
    }

    #[test]
    fn test_image_url() {
        let client = client();
        assert_eq!(
            client.image_url(Some("/abc.jpg"), "w342").as_deref(),
            Some("https://image.tmdb.org/t/p/w342/abc.jpg")
        );
        assert!(client.image_url(Some(""), "w342").is_none());
        assert!(client.image_url(None, "w342").is_none());
    }

    #[test]
    fn test_movie_result_conversion() {
        let movie: MovieResult = serde_json::from_value(serde_json::json!({
            "id": 603,
            "title": "The Matrix",
            "original_title": "The Matrix",
            "release_date": "1999-03-30",
            "poster_path": "/p.jpg",
            "overview": ""
        }))
        .unwrap();

        let result = movie_result(&client(), movie);
        assert_eq!(result.id, "603");
        assert_eq!(result.year, Some(1999));
        assert!(result.overview.is_none());
        assert_eq!(
            result.poster_url.as_deref(),
            Some("https://image.tmdb.org/t/p/w342/p.jpg")
        );
    }

    #[test]
    fn test_artwork_conversion() {
        let image: Image = serde_json::from_value(serde_json::json!({
            "file_path": "/b.jpg",
            "width": 1920,
            "height": 1080,
            "iso_639_1": "EN",
            "vote_average": 5.4,
            "vote_count": 12
        }))
        .unwrap();

        let item = artwork(&client(), ArtworkKind::Background, image).unwrap();
        assert_eq!(item.url, "https://image.tmdb.org/t/p/original/b.jpg");
        assert_eq!(item.preview_url, "https://image.tmdb.org/t/p/w300/b.jpg");
        assert_eq!(item.language.as_deref(), Some("en"));
        assert_eq!(item.votes, 12);
        assert_eq!(item.width, Some(1920));
    }

    #[test]
    fn test_episode_credits() {
        let episode: EpisodeDetails = serde_json::from_value(serde_json::json!({
            "id": 62085,
            "name": "Pilot",
            "season_number": 1,
            "episode_number": 1,
            "air_date": "2008-01-20",
            "crew": [
                { "name": "Vince Gilligan", "job": "Writer" },
                { "name": "Someone", "job": "Editor" }
            ],
            "guest_stars": [{ "name": "Guest", "character": "Tuco" }]
        }))
        .unwrap();

        let md = episode_metadata(&client(), episode);
        assert_eq!(md.aired, EpisodeNumbers::new(1, 1));
        assert_eq!(md.year, Some(2008));
        assert_eq!(md.id("tmdb"), Some("62085"));
        assert_eq!(md.cast_by_role(CastRole::Writer).count(), 1);
        assert_eq!(md.cast_by_role(CastRole::Director).count(), 0);
        assert_eq!(md.cast_by_role(CastRole::Actor).next().unwrap().name, "Guest");
    }

    mod server {
        use super::*;
        use crate::config::{API_KEY, SettingsStore};
        use serde_json::json;
        use wiremock::matchers::{method, path, query_param};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        async fn mount_configuration(server: &MockServer, base_url: &str) {
            Mock::given(method("GET"))
                .and(path("/configuration"))
                .and(query_param("api_key", "key"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "images": { "secure_base_url": base_url }
                })))
                .mount(server)
                .await;
        }

        async fn configured_server() -> MockServer {
            let server = MockServer::start().await;
            mount_configuration(&server, "https://image.tmdb.org/t/p/").await;
            server
        }

        fn provider(server: &MockServer) -> TmdbProvider {
            let settings = Arc::new(SettingsStore::new());
            settings.set_value(TmdbProvider::ID, API_KEY, "key");
            let config: Arc<dyn ConfigStore> = settings;
            let session = Arc::new(SessionManager::new(
                TmdbProvider::ID,
                TmdbConnector::new(server.uri()),
                Arc::clone(&config),
                "",
            ));
            TmdbProvider::new(session, config)
        }

        #[tokio::test]
        async fn test_configuration_without_image_base_fails() {
            let server = MockServer::start().await;
            mount_configuration(&server, "").await;

            let result = TmdbConnector::new(server.uri()).connect("key").await;
            assert!(matches!(
                result.err(),
                Some(ScraperError::ScrapeFailure(TransportError::Bootstrap(_)))
            ));
        }

        #[tokio::test]
        async fn test_rejected_key_fails_connect() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/configuration"))
                .respond_with(ResponseTemplate::new(401))
                .mount(&server)
                .await;

            let result = TmdbConnector::new(server.uri()).connect("bad").await;
            assert!(matches!(
                result.err(),
                Some(ScraperError::ScrapeFailure(TransportError::Api { status: 401, .. }))
            ));
        }

        #[tokio::test]
        async fn test_imdb_query_uses_find() {
            let server = configured_server().await;
            Mock::given(method("GET"))
                .and(path("/find/tt0133093"))
                .and(query_param("external_source", "imdb_id"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "movie_results": [{
                        "id": 603,
                        "title": "The Matrix",
                        "release_date": "1999-03-30",
                        "poster_path": "/p.jpg"
                    }],
                    "tv_results": []
                })))
                .expect(1)
                .mount(&server)
                .await;
            Mock::given(method("GET"))
                .and(path("/search/movie"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": [] })))
                .expect(0)
                .mount(&server)
                .await;

            let query = MediaSearchQuery::new(MediaKind::Movie, "tt0133093");
            let results = provider(&server).search(&query).await.unwrap();

            assert_eq!(results.len(), 1);
            assert_eq!(results[0].id, "603");
            assert!(results[0].direct_match);
            assert_eq!(results[0].imdb_id.as_deref(), Some("tt0133093"));
            assert_eq!(results[0].year, Some(1999));
        }

        #[tokio::test]
        async fn test_unknown_imdb_id_is_not_found() {
            let server = configured_server().await;
            Mock::given(method("GET"))
                .and(path("/find/tt9999999"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "movie_results": [],
                    "tv_results": []
                })))
                .mount(&server)
                .await;

            let query = MediaSearchQuery::new(MediaKind::Movie, "tt9999999");
            let result = provider(&server).search(&query).await;
            assert!(matches!(result, Err(ScraperError::NotFound(_))));
        }

        #[tokio::test]
        async fn test_show_artwork_survives_season_lookup_failure() {
            let server = configured_server().await;
            Mock::given(method("GET"))
                .and(path("/tv/1396/images"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "posters": [{ "file_path": "/poster.jpg", "iso_639_1": "en" }],
                    "backdrops": [{ "file_path": "/backdrop.jpg", "width": 1920, "height": 1080 }]
                })))
                .mount(&server)
                .await;
            Mock::given(method("GET"))
                .and(path("/tv/1396"))
                .respond_with(ResponseTemplate::new(500))
                .expect(1)
                .mount(&server)
                .await;

            let selector =
                ScrapeSelector::new(MediaKind::TvShow, Locale::english()).with_id("tmdb", "1396");
            let items = provider(&server)
                .get_artwork(&selector, ArtworkFilter::All)
                .await
                .unwrap();

            assert_eq!(items.len(), 2);
            assert!(items.iter().all(|i| i.kind != ArtworkKind::SeasonPoster));
        }
    }
}
