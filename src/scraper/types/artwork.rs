use crate::scraper::artwork::{parse_resolution, size_bucket};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtworkKind {
    Poster,
    /// Backdrop/fanart
    Background,
    Banner,
    SeasonPoster,
    SeasonBanner,
    Thumbnail,
}

impl std::fmt::Display for ArtworkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Poster => write!(f, "poster"),
            Self::Background => write!(f, "background"),
            Self::Banner => write!(f, "banner"),
            Self::SeasonPoster => write!(f, "season poster"),
            Self::SeasonBanner => write!(f, "season banner"),
            Self::Thumbnail => write!(f, "thumbnail"),
        }
    }
}

/// Coarse size class derived from an image's pixel width
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeBucket {
    Small,
    Medium,
    Big,
    Large,
    ExtraLarge,
}

/// Which artwork kinds a caller wants back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArtworkFilter {
    #[default]
    All,
    Only(ArtworkKind),
}

impl ArtworkFilter {
    pub fn matches(self, kind: ArtworkKind) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => wanted == kind,
        }
    }
}

/// One image offered by a provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtworkItem {
    pub provider_id: String,
    pub kind: ArtworkKind,
    pub url: String,
    pub preview_url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// ISO 639-1 code; `None` for language-neutral images
    pub language: Option<String>,
    pub rating: f64,
    pub votes: u32,
    /// Provider-internal id, only used as the last sort tie-break
    pub internal_id: i64,
    pub size: Option<SizeBucket>,
    /// Season number for season artwork
    pub season: Option<i32>,
}

impl ArtworkItem {
    /// New item whose preview is the full image until told otherwise.
    /// Kinds that never report dimensions get their conventional bucket.
    pub fn new(provider_id: impl Into<String>, kind: ArtworkKind, url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            provider_id: provider_id.into(),
            kind,
            preview_url: url.clone(),
            url,
            width: None,
            height: None,
            language: None,
            rating: 0.0,
            votes: 0,
            internal_id: 0,
            size: size_bucket(kind, None),
            season: None,
        }
    }

    #[must_use]
    pub fn with_preview(mut self, preview_url: Option<String>) -> Self {
        if let Some(preview) = preview_url.filter(|p| !p.is_empty()) {
            self.preview_url = preview;
        }
        self
    }

    #[must_use]
    pub fn with_language(mut self, language: Option<String>) -> Self {
        self.language = language
            .map(|l| l.trim().to_ascii_lowercase())
            .filter(|l| !l.is_empty());
        self
    }

    #[must_use]
    pub const fn with_rating(mut self, average: f64, votes: u32) -> Self {
        self.rating = average;
        self.votes = votes;
        self
    }

    #[must_use]
    pub const fn with_internal_id(mut self, id: i64) -> Self {
        self.internal_id = id;
        self
    }

    #[must_use]
    pub const fn with_season(mut self, season: Option<i32>) -> Self {
        self.season = season;
        self
    }

    #[must_use]
    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self.size = size_bucket(self.kind, Some(width));
        self
    }

    /// Apply a `WxH` resolution token. A token that does not parse leaves
    /// the item without size metadata.
    #[must_use]
    pub fn with_resolution(self, token: Option<&str>) -> Self {
        let Some(token) = token.filter(|t| !t.trim().is_empty()) else {
            return self;
        };
        match parse_resolution(token) {
            Some((width, height)) => self.with_dimensions(width, height),
            None => {
                debug!("could not extract size from artwork: {}", token);
                self
            }
        }
    }
}
