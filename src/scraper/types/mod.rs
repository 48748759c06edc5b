mod artwork;
mod locale;
mod media;
mod metadata;

pub use artwork::{ArtworkFilter, ArtworkItem, ArtworkKind, SizeBucket};
pub use locale::{Locale, ParseLocaleError};
pub use media::{EpisodeNumbers, MediaKind, MediaSearchQuery, MediaSearchResult, ScrapeSelector};
pub use metadata::{CastMember, CastRole, IMDB, MediaMetadata, MediaRating, is_valid_imdb_id};
pub(crate) use metadata::{parse_date, split_names};
