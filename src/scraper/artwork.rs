//! Artwork ordering and size classification.
//!
//! Images are ordered by language first (the caller's preferred language,
//! then English, then everything else), then by rating average, vote count
//! and finally by descending provider-internal id so that the order is total.

use crate::scraper::types::{ArtworkItem, ArtworkKind, Locale, SizeBucket};
use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;

static RESOLUTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([0-9]{3,4})x([0-9]{3,4})\s*$").expect("valid regex"));

/// Compare two images for display order; `Less` means `a` comes first.
pub fn compare_artwork(a: &ArtworkItem, b: &ArtworkItem, preferred_language: &str) -> Ordering {
    let speaks = |item: &ArtworkItem, language: &str| item.language.as_deref() == Some(language);

    speaks(b, preferred_language)
        .cmp(&speaks(a, preferred_language))
        .then_with(|| speaks(b, Locale::UNIVERSAL_LANGUAGE).cmp(&speaks(a, Locale::UNIVERSAL_LANGUAGE)))
        .then_with(|| b.rating.total_cmp(&a.rating))
        .then_with(|| b.votes.cmp(&a.votes))
        .then_with(|| b.internal_id.cmp(&a.internal_id))
}

/// Sort images in place for the given preferred language
pub fn sort_artwork(items: &mut [ArtworkItem], preferred: &Locale) {
    let language = preferred.language();
    items.sort_by(|a, b| compare_artwork(a, b, language));
}

/// Size bucket for an image of the given kind.
///
/// Posters and backgrounds are measured by width. Banners and season artwork
/// never come with dimensions and get a fixed bucket.
pub fn size_bucket(kind: ArtworkKind, width: Option<u32>) -> Option<SizeBucket> {
    match kind {
        ArtworkKind::Banner => Some(SizeBucket::Medium),
        ArtworkKind::SeasonPoster | ArtworkKind::SeasonBanner => Some(SizeBucket::Large),
        ArtworkKind::Poster => width.map(poster_bucket),
        ArtworkKind::Background | ArtworkKind::Thumbnail => width.map(background_bucket),
    }
}

const fn poster_bucket(width: u32) -> SizeBucket {
    match width {
        1000.. => SizeBucket::Large,
        500..=999 => SizeBucket::Big,
        342..=499 => SizeBucket::Medium,
        _ => SizeBucket::Small,
    }
}

const fn background_bucket(width: u32) -> SizeBucket {
    match width {
        3840.. => SizeBucket::ExtraLarge,
        1920..=3839 => SizeBucket::Large,
        1280..=1919 => SizeBucket::Medium,
        _ => SizeBucket::Small,
    }
}

/// Parse a `WxH` token such as `1920x1080`
pub fn parse_resolution(token: &str) -> Option<(u32, u32)> {
    let caps = RESOLUTION.captures(token)?;
    let width = caps.get(1)?.as_str().parse().ok()?;
    let height = caps.get(2)?.as_str().parse().ok()?;
    Some((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(id: i64, language: Option<&str>, rating: f64, votes: u32) -> ArtworkItem {
        ArtworkItem::new("tvdb", ArtworkKind::Poster, format!("https://img/{id}.jpg"))
            .with_language(language.map(str::to_string))
            .with_rating(rating, votes)
            .with_internal_id(id)
    }

    fn ids(items: &[ArtworkItem]) -> Vec<i64> {
        items.iter().map(|i| i.internal_id).collect()
    }

    #[test]
    fn test_preferred_language_beats_rating() {
        let german = image(1, Some("de"), 2.0, 1);
        let english = image(2, Some("en"), 9.5, 300);

        assert_eq!(compare_artwork(&german, &english, "de"), Ordering::Less);
        assert_eq!(compare_artwork(&english, &german, "de"), Ordering::Greater);
    }

    #[test]
    fn test_english_before_other_languages() {
        let english = image(1, Some("en"), 1.0, 0);
        let french = image(2, Some("fr"), 9.0, 100);
        let neutral = image(3, None, 9.0, 100);

        assert_eq!(compare_artwork(&english, &french, "de"), Ordering::Less);
        assert_eq!(compare_artwork(&english, &neutral, "de"), Ordering::Less);
    }

    #[test]
    fn test_rating_then_votes_then_id() {
        let mut items = vec![
            image(10, Some("fr"), 7.0, 5),
            image(11, Some("fr"), 8.0, 1),
            image(12, Some("fr"), 7.0, 9),
            image(13, Some("fr"), 7.0, 9),
        ];
        sort_artwork(&mut items, &"de".parse().unwrap());

        assert_eq!(ids(&items), vec![11, 13, 12, 10]);
    }

    #[test]
    fn test_sorting_is_idempotent() {
        let mut items = vec![
            image(1, None, 5.0, 3),
            image(2, Some("de"), 1.0, 0),
            image(3, Some("en"), 6.0, 10),
            image(4, Some("en"), 6.0, 10),
            image(5, Some("it"), 9.9, 1),
        ];
        let preferred: Locale = "de".parse().unwrap();

        sort_artwork(&mut items, &preferred);
        let first = ids(&items);
        sort_artwork(&mut items, &preferred);

        assert_eq!(first, ids(&items));
        assert_eq!(first, vec![2, 4, 3, 5, 1]);
    }

    #[test]
    fn test_poster_buckets() {
        assert_eq!(size_bucket(ArtworkKind::Poster, Some(1000)), Some(SizeBucket::Large));
        assert_eq!(size_bucket(ArtworkKind::Poster, Some(680)), Some(SizeBucket::Big));
        assert_eq!(size_bucket(ArtworkKind::Poster, Some(342)), Some(SizeBucket::Medium));
        assert_eq!(size_bucket(ArtworkKind::Poster, Some(185)), Some(SizeBucket::Small));
        assert_eq!(size_bucket(ArtworkKind::Poster, None), None);
    }

    #[test]
    fn test_background_buckets() {
        assert_eq!(
            size_bucket(ArtworkKind::Background, Some(3840)),
            Some(SizeBucket::ExtraLarge)
        );
        assert_eq!(size_bucket(ArtworkKind::Background, Some(1920)), Some(SizeBucket::Large));
        assert_eq!(size_bucket(ArtworkKind::Background, Some(1280)), Some(SizeBucket::Medium));
        assert_eq!(size_bucket(ArtworkKind::Background, Some(780)), Some(SizeBucket::Small));
    }

    #[test]
    fn test_fixed_buckets_without_dimensions() {
        assert_eq!(size_bucket(ArtworkKind::Banner, None), Some(SizeBucket::Medium));
        assert_eq!(size_bucket(ArtworkKind::SeasonPoster, None), Some(SizeBucket::Large));
        assert_eq!(size_bucket(ArtworkKind::SeasonBanner, Some(100)), Some(SizeBucket::Large));
    }

    #[test]
    fn test_resolution_parsing() {
        assert_eq!(parse_resolution("1920x1080"), Some((1920, 1080)));
        assert_eq!(parse_resolution(" 680x1000 "), Some((680, 1000)));
        assert_eq!(parse_resolution("huge"), None);
        assert_eq!(parse_resolution("12x12"), None);
    }

    #[test]
    fn test_bad_resolution_keeps_item() {
        let item = ArtworkItem::new("tvdb", ArtworkKind::Background, "https://img/a.jpg")
            .with_resolution(Some("unknown"));

        assert_eq!(item.width, None);
        assert_eq!(item.size, None);

        let item = item.with_resolution(Some("1920x1080"));
        assert_eq!(item.width, Some(1920));
        assert_eq!(item.size, Some(SizeBucket::Large));
    }
}
