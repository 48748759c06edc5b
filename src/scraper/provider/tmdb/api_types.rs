use serde::Deserialize;

// Bootstrap
#[derive(Debug, Deserialize)]
pub struct ConfigurationResponse {
    pub images: ImageConfiguration,
}

#[derive(Debug, Deserialize)]
pub struct ImageConfiguration {
    #[serde(default)]
    pub secure_base_url: String,
}

// Search responses
#[derive(Debug, Deserialize)]
pub struct SearchResponse<T> {
    pub results: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub struct MovieResult {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    pub release_date: Option<String>,
    pub poster_path: Option<String>,
    pub overview: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TvResult {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    pub first_air_date: Option<String>,
    pub poster_path: Option<String>,
    pub overview: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CollectionResult {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    pub poster_path: Option<String>,
    pub overview: Option<String>,
}

// Detail responses
#[derive(Debug, Deserialize)]
pub struct MovieDetails {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    pub original_title: Option<String>,
    pub overview: Option<String>,
    pub release_date: Option<String>,
    pub runtime: Option<i32>,
    pub poster_path: Option<String>,
    pub vote_average: Option<f64>,
    pub vote_count: Option<u32>,
    pub status: Option<String>,
    pub imdb_id: Option<String>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    pub credits: Option<Credits>,
}

#[derive(Debug, Deserialize)]
pub struct TvDetails {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    pub original_name: Option<String>,
    pub overview: Option<String>,
    pub first_air_date: Option<String>,
    pub poster_path: Option<String>,
    pub vote_average: Option<f64>,
    pub vote_count: Option<u32>,
    pub status: Option<String>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub episode_run_time: Vec<i32>,
    #[serde(default)]
    pub seasons: Vec<Season>,
    pub external_ids: Option<ExternalIds>,
    pub credits: Option<Credits>,
}

#[derive(Debug, Deserialize)]
pub struct CollectionDetails {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    #[serde(default)]
    pub parts: Vec<MovieResult>,
}

#[derive(Debug, Deserialize)]
pub struct SeasonDetails {
    #[serde(default)]
    pub episodes: Vec<EpisodeDetails>,
}

#[derive(Debug, Deserialize)]
pub struct EpisodeDetails {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    pub season_number: i32,
    pub episode_number: i32,
    pub air_date: Option<String>,
    pub overview: Option<String>,
    pub still_path: Option<String>,
    pub vote_average: Option<f64>,
    pub vote_count: Option<u32>,
    #[serde(default)]
    pub crew: Vec<CrewMember>,
    #[serde(default)]
    pub guest_stars: Vec<CastMember>,
}

// Common types
#[derive(Debug, Deserialize)]
pub struct Genre {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct Season {
    pub season_number: i32,
    pub poster_path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExternalIds {
    pub imdb_id: Option<String>,
    pub tvdb_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct Credits {
    #[serde(default)]
    pub cast: Vec<CastMember>,
    #[serde(default)]
    pub crew: Vec<CrewMember>,
}

#[derive(Debug, Deserialize)]
pub struct CastMember {
    pub name: String,
    pub character: Option<String>,
    pub profile_path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CrewMember {
    pub name: String,
    pub job: Option<String>,
    pub profile_path: Option<String>,
}

// Find by external ID
#[derive(Debug, Deserialize)]
pub struct FindResponse {
    #[serde(default)]
    pub movie_results: Vec<MovieResult>,
    #[serde(default)]
    pub tv_results: Vec<TvResult>,
}

// Images
#[derive(Debug, Deserialize)]
pub struct ImagesResponse {
    #[serde(default)]
    pub posters: Vec<Image>,
    #[serde(default)]
    pub backdrops: Vec<Image>,
    #[serde(default)]
    pub stills: Vec<Image>,
}

#[derive(Debug, Deserialize)]
pub struct Image {
    pub file_path: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub iso_639_1: Option<String>,
    pub vote_average: Option<f64>,
    pub vote_count: Option<u32>,
}
