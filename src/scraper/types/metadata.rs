use super::{ArtworkItem, EpisodeNumbers, MediaKind};
use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Namespace key for IMDb identifiers
pub const IMDB: &str = "imdb";

static IMDB_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^tt\d{7,8}$").expect("valid regex"));

/// Complete metadata for a movie, show, episode or movie set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaMetadata {
    /// Provider that produced this record
    pub provider_id: String,
    pub kind: MediaKind,
    /// Cross-provider identifiers keyed by namespace ("tmdb", "imdb", ...)
    pub ids: BTreeMap<String, String>,
    pub title: String,
    pub original_title: Option<String>,
    /// Full description
    pub plot: String,
    pub release_date: Option<NaiveDate>,
    pub year: Option<i32>,
    pub ratings: Vec<MediaRating>,
    pub cast: Vec<CastMember>,
    pub genres: Vec<String>,
    /// Content rating (e.g. "PG-13", "TV-MA")
    pub certification: Option<String>,
    pub status: Option<String>,
    /// Runtime in minutes
    pub runtime: Option<i32>,
    pub aired: EpisodeNumbers,
    pub dvd: EpisodeNumbers,
    pub artwork: Vec<ArtworkItem>,
}

impl MediaMetadata {
    pub fn new(provider_id: impl Into<String>, kind: MediaKind) -> Self {
        Self {
            provider_id: provider_id.into(),
            kind,
            ids: BTreeMap::new(),
            title: String::new(),
            original_title: None,
            plot: String::new(),
            release_date: None,
            year: None,
            ratings: Vec::new(),
            cast: Vec::new(),
            genres: Vec::new(),
            certification: None,
            status: None,
            runtime: None,
            aired: EpisodeNumbers::default(),
            dvd: EpisodeNumbers::default(),
            artwork: Vec::new(),
        }
    }

    /// Store an id; blank values are ignored and an existing key is replaced
    pub fn set_id(&mut self, namespace: impl Into<String>, id: impl ToString) {
        let id = id.to_string();
        if !id.trim().is_empty() {
            self.ids.insert(namespace.into(), id.trim().to_string());
        }
    }

    pub fn id(&self, namespace: &str) -> Option<&str> {
        self.ids.get(namespace).map(String::as_str)
    }

    /// Set the release date and derive the year from it
    pub fn set_release_date(&mut self, date: Option<NaiveDate>) {
        self.release_date = date;
        if let Some(date) = date {
            self.year = Some(date.year());
        }
    }

    pub fn add_rating(&mut self, rating: MediaRating) {
        self.ratings.push(rating);
    }

    pub fn add_cast_member(&mut self, member: CastMember) {
        self.cast.push(member);
    }

    pub fn cast_by_role(&self, role: CastRole) -> impl Iterator<Item = &CastMember> {
        self.cast.iter().filter(move |c| c.role == role)
    }
}

/// A rating as reported by one provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaRating {
    pub provider_id: String,
    pub value: f64,
    pub votes: u32,
    /// Top of the provider's scale (10 for most)
    pub max_value: u32,
}

impl MediaRating {
    pub fn new(provider_id: impl Into<String>, value: f64, votes: u32) -> Self {
        Self {
            provider_id: provider_id.into(),
            value,
            votes,
            max_value: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CastRole {
    Actor,
    Director,
    Writer,
}

/// Person information (cast/crew)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CastMember {
    pub name: String,
    pub role: CastRole,
    /// Character played (actors only)
    pub character: Option<String>,
    pub image_url: Option<String>,
}

impl CastMember {
    pub fn new(role: CastRole, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role,
            character: None,
            image_url: None,
        }
    }

    #[must_use]
    pub fn with_character(mut self, character: Option<String>) -> Self {
        self.character = character.filter(|c| !c.is_empty());
        self
    }

    #[must_use]
    pub fn with_image(mut self, url: Option<String>) -> Self {
        self.image_url = url;
        self
    }
}

/// `tt` followed by seven or eight digits
pub fn is_valid_imdb_id(candidate: &str) -> bool {
    IMDB_ID.is_match(candidate)
}

/// Parse a provider date (`YYYY-MM-DD`); empty or malformed input gives `None`
pub fn parse_date(raw: Option<&str>) -> Option<NaiveDate> {
    raw.filter(|d| !d.is_empty())
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
}

/// Split a comma separated credit list ("A, B") into names
pub fn split_names(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|n| !n.is_empty())
}
