use serde::{Deserialize, Serialize};

/// Every TVDB payload is wrapped in `{ "data": ... }`
#[derive(Debug, Deserialize)]
pub struct DataResponse<T> {
    pub data: T,
}

// Bootstrap
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub apikey: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct Language {
    pub id: i64,
    pub abbreviation: String,
}

// Search
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesSearchResult {
    pub id: i64,
    #[serde(default)]
    pub series_name: String,
    pub overview: Option<String>,
    pub first_aired: Option<String>,
}

// Series
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Series {
    pub id: i64,
    #[serde(default)]
    pub series_name: String,
    pub overview: Option<String>,
    pub first_aired: Option<String>,
    pub imdb_id: Option<String>,
    pub zap2it_id: Option<String>,
    pub runtime: Option<String>,
    pub status: Option<String>,
    pub rating: Option<String>,
    pub site_rating: Option<f64>,
    pub site_rating_count: Option<u32>,
    #[serde(default)]
    pub genre: Vec<String>,
    pub poster: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Actor {
    #[serde(default)]
    pub name: String,
    pub role: Option<String>,
    pub image: Option<String>,
}

// Episodes
#[derive(Debug, Deserialize)]
pub struct EpisodePage {
    #[serde(default)]
    pub data: Vec<Episode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Episode {
    pub id: i64,
    pub aired_season: Option<i32>,
    pub aired_episode_number: Option<i32>,
    pub dvd_season: Option<f64>,
    pub dvd_episode_number: Option<f64>,
    pub episode_name: Option<String>,
    pub overview: Option<String>,
    pub first_aired: Option<String>,
    pub site_rating: Option<f64>,
    pub site_rating_count: Option<u32>,
    pub imdb_id: Option<String>,
    #[serde(default)]
    pub directors: Vec<String>,
    #[serde(default)]
    pub writers: Vec<String>,
    #[serde(default)]
    pub guest_stars: Vec<String>,
    pub filename: Option<String>,
}

// Images
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub id: i64,
    pub sub_key: Option<String>,
    pub file_name: String,
    pub resolution: Option<String>,
    pub ratings_info: Option<RatingsInfo>,
    pub thumbnail: Option<String>,
    pub language_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct RatingsInfo {
    pub average: Option<f64>,
    pub count: Option<u32>,
}
