use super::{IMDB, Locale, MediaMetadata, is_valid_imdb_id};
use crate::scraper::{Result, ScraperError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Kind of media a query or record refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Movie,
    TvShow,
    TvEpisode,
    MovieSet,
}

impl MediaKind {
    /// Whether this kind belongs to the TV side (show or episode)
    #[must_use]
    pub const fn is_tv(self) -> bool {
        matches!(self, Self::TvShow | Self::TvEpisode)
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Movie => write!(f, "movie"),
            Self::TvShow => write!(f, "tv show"),
            Self::TvEpisode => write!(f, "tv episode"),
            Self::MovieSet => write!(f, "movie set"),
        }
    }
}

/// Season/episode pair in one particular ordering (aired or DVD).
/// Either number may be unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EpisodeNumbers {
    pub season: Option<i32>,
    pub episode: Option<i32>,
}

impl EpisodeNumbers {
    #[must_use]
    pub const fn new(season: i32, episode: i32) -> Self {
        Self {
            season: Some(season),
            episode: Some(episode),
        }
    }

    /// Both numbers known
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.season.is_some() && self.episode.is_some()
    }
}

/// Search request handed to providers.
///
/// Built once through the `with_*` methods and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaSearchQuery {
    kind: MediaKind,
    query: String,
    ids: BTreeMap<String, String>,
    year: Option<i32>,
    locale: Locale,
}

impl MediaSearchQuery {
    pub fn new(kind: MediaKind, query: impl Into<String>) -> Self {
        Self {
            kind,
            query: query.into().trim().to_string(),
            ids: BTreeMap::new(),
            year: None,
            locale: Locale::english(),
        }
    }

    /// Attach an identifier from some namespace (provider id, "imdb", ...)
    #[must_use]
    pub fn with_id(mut self, namespace: impl Into<String>, id: impl Into<String>) -> Self {
        let id = id.into();
        if !id.trim().is_empty() {
            self.ids.insert(namespace.into(), id.trim().to_string());
        }
        self
    }

    #[must_use]
    pub fn with_imdb_id(self, imdb_id: impl Into<String>) -> Self {
        self.with_id(IMDB, imdb_id)
    }

    /// Year of release; `0` is treated as unknown
    #[must_use]
    pub fn with_year(mut self, year: Option<i32>) -> Self {
        self.year = year.filter(|y| *y > 0);
        self
    }

    #[must_use]
    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    pub const fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn id(&self, namespace: &str) -> Option<&str> {
        self.ids.get(namespace).map(String::as_str)
    }

    pub fn imdb_id(&self) -> Option<&str> {
        self.id(IMDB)
    }

    /// IMDb id to look up directly: the attached one, or the search term
    /// when the term itself is an IMDb id
    pub fn lookup_imdb_id(&self) -> Option<&str> {
        self.imdb_id()
            .filter(|id| is_valid_imdb_id(id))
            .or_else(|| Some(self.query()).filter(|q| is_valid_imdb_id(q)))
    }

    pub const fn year(&self) -> Option<i32> {
        self.year
    }

    pub const fn locale(&self) -> &Locale {
        &self.locale
    }

    /// Neither a search term nor any identifier was supplied
    pub fn is_empty(&self) -> bool {
        self.query.is_empty() && self.ids.is_empty()
    }
}

/// A candidate returned from a provider search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaSearchResult {
    /// Provider that produced this result (e.g. "tmdb")
    pub provider_id: String,
    /// Provider-specific ID
    pub id: String,
    pub title: String,
    pub overview: Option<String>,
    pub year: Option<i32>,
    /// Relevance in `[0, 1]`, filled in by the matcher
    pub score: f32,
    pub kind: MediaKind,
    pub imdb_id: Option<String>,
    pub poster_url: Option<String>,
    /// Found through an identifier lookup rather than free text
    pub direct_match: bool,
}

impl MediaSearchResult {
    pub fn new(
        provider_id: impl Into<String>,
        id: impl Into<String>,
        title: impl Into<String>,
        kind: MediaKind,
    ) -> Self {
        Self {
            provider_id: provider_id.into(),
            id: id.into(),
            title: title.into(),
            overview: None,
            year: None,
            score: 0.0,
            kind,
            imdb_id: None,
            poster_url: None,
            direct_match: false,
        }
    }

    #[must_use]
    pub fn with_year(mut self, year: Option<i32>) -> Self {
        self.year = year;
        self
    }

    #[must_use]
    pub fn with_overview(mut self, overview: Option<String>) -> Self {
        self.overview = overview.filter(|o| !o.is_empty());
        self
    }

    #[must_use]
    pub fn with_poster(mut self, url: Option<String>) -> Self {
        self.poster_url = url;
        self
    }

    #[must_use]
    pub fn with_imdb_id(mut self, imdb_id: Option<String>) -> Self {
        self.imdb_id = imdb_id.filter(|i| !i.is_empty());
        self
    }

    /// Mark as the authoritative hit of an identifier lookup
    #[must_use]
    pub const fn direct(mut self) -> Self {
        self.direct_match = true;
        self
    }
}

/// Identifies one record at one provider for the fetch capabilities
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeSelector {
    pub kind: MediaKind,
    pub ids: BTreeMap<String, String>,
    pub locale: Locale,
    /// Aired-order numbers of the wanted episode
    pub aired: EpisodeNumbers,
    /// DVD-order numbers of the wanted episode
    pub dvd: EpisodeNumbers,
    /// Used to pick an episode when no numbers match
    pub release_date: Option<NaiveDate>,
}

impl ScrapeSelector {
    pub fn new(kind: MediaKind, locale: Locale) -> Self {
        Self {
            kind,
            ids: BTreeMap::new(),
            locale,
            aired: EpisodeNumbers::default(),
            dvd: EpisodeNumbers::default(),
            release_date: None,
        }
    }

    /// Selector for the record behind a search result
    pub fn for_result(result: &MediaSearchResult, locale: Locale) -> Self {
        let selector = Self::new(result.kind, locale).with_id(&result.provider_id, &result.id);
        match result.imdb_id {
            Some(ref imdb) => selector.with_id(IMDB, imdb),
            None => selector,
        }
    }

    #[must_use]
    pub fn with_id(mut self, namespace: impl Into<String>, id: impl Into<String>) -> Self {
        let id = id.into();
        if !id.trim().is_empty() {
            self.ids.insert(namespace.into(), id.trim().to_string());
        }
        self
    }

    #[must_use]
    pub fn with_kind(mut self, kind: MediaKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub const fn with_aired(mut self, season: i32, episode: i32) -> Self {
        self.aired = EpisodeNumbers::new(season, episode);
        self
    }

    #[must_use]
    pub const fn with_dvd(mut self, season: i32, episode: i32) -> Self {
        self.dvd = EpisodeNumbers::new(season, episode);
        self
    }

    #[must_use]
    pub const fn with_release_date(mut self, date: Option<NaiveDate>) -> Self {
        self.release_date = date;
        self
    }

    pub fn id(&self, namespace: &str) -> Option<&str> {
        self.ids.get(namespace).map(String::as_str)
    }

    /// Numeric id for a namespace; zero, negative and garbage count as absent
    pub fn id_as_int(&self, namespace: &str) -> Option<i64> {
        self.id(namespace)
            .and_then(|id| id.parse::<i64>().ok())
            .filter(|id| *id > 0)
    }

    /// Pick the wanted episode out of a show's episode list.
    ///
    /// Aired numbers are matched first; DVD numbers only when the aired pair
    /// is incomplete. The release date is the last resort.
    pub fn pick_episode<'a>(&self, episodes: &'a [MediaMetadata]) -> Result<&'a MediaMetadata> {
        if !self.aired.is_complete() && !self.dvd.is_complete() && self.release_date.is_none() {
            return Err(ScraperError::MissingIdentifier(
                "season/episode number or release date".to_string(),
            ));
        }

        let by_numbers = if self.aired.is_complete() {
            episodes.iter().find(|e| e.aired == self.aired)
        } else if self.dvd.is_complete() {
            episodes.iter().find(|e| e.dvd == self.dvd)
        } else {
            None
        };

        by_numbers
            .or_else(|| {
                let date = self.release_date?;
                episodes.iter().find(|e| e.release_date == Some(date))
            })
            .ok_or_else(|| {
                ScraperError::NotFound(format!(
                    "episode S{:?}E{:?} (dvd S{:?}E{:?})",
                    self.aired.season, self.aired.episode, self.dvd.season, self.dvd.episode
                ))
            })
    }
}
