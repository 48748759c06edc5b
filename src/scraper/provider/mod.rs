pub mod http;
pub mod tmdb;
pub mod traits;
pub mod tvdb;

pub use http::HttpClient;
pub use tmdb::{TmdbClient, TmdbConnector, TmdbProvider};
pub use traits::{MetadataProvider, ProviderCapabilities};
pub use tvdb::{TvdbClient, TvdbConnector, TvdbProvider};

use crate::scraper::{ScraperError, TransportError};

/// Map an HTTP 404 onto [`ScraperError::NotFound`]; anything else is a
/// scrape failure
pub(crate) fn not_found(err: TransportError, what: impl std::fmt::Display) -> ScraperError {
    if err.is_not_found() {
        ScraperError::NotFound(what.to_string())
    } else {
        err.into()
    }
}

/// Year part of a `YYYY-MM-DD` date
pub(crate) fn year_of(date: Option<&str>) -> Option<i32> {
    date.and_then(|d| d.split('-').next())
        .and_then(|y| y.parse().ok())
        .filter(|y| *y > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_of() {
        assert_eq!(year_of(Some("1999-03-31")), Some(1999));
        assert_eq!(year_of(Some("")), None);
        assert_eq!(year_of(Some("0000-00-00")), None);
        assert_eq!(year_of(None), None);
    }

    #[test]
    fn test_not_found_mapping() {
        let missing = TransportError::Api {
            status: 404,
            message: String::new(),
        };
        assert!(matches!(not_found(missing, "x"), ScraperError::NotFound(_)));

        let denied = TransportError::Api {
            status: 401,
            message: String::new(),
        };
        assert!(matches!(
            not_found(denied, "x"),
            ScraperError::ScrapeFailure(TransportError::Api { status: 401, .. })
        ));
    }
}
