use crate::scraper::TransportError;
use reqwest::{Client, RequestBuilder, header};
use serde::de::DeserializeOwned;
use std::time::Duration;

type TransportResult<T> = std::result::Result<T, TransportError>;

/// HTTP client wrapper for providers
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    bearer_token: Option<String>,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn new(base_url: impl Into<String>) -> TransportResult<Self> {
        let client = Client::builder()
            .user_agent(concat!("media-resolver/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            bearer_token: None,
        })
    }

    /// Same client, authenticating every request with `token`
    #[must_use]
    pub fn with_bearer_token(&self, token: impl Into<String>) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            bearer_token: Some(token.into()),
        }
    }

    /// Build full URL from endpoint
    #[must_use]
    pub fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    /// Execute GET request and parse JSON response
    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> TransportResult<T> {
        self.send(self.client.get(self.url(endpoint))).await
    }

    /// Execute GET request with query parameters
    pub async fn get_with_params<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> TransportResult<T> {
        self.send(self.client.get(self.url(endpoint)).query(params))
            .await
    }

    /// GET with query parameters and an `Accept-Language` header
    pub async fn get_localized<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
        language: &str,
    ) -> TransportResult<T> {
        let request = self
            .client
            .get(self.url(endpoint))
            .query(params)
            .header(header::ACCEPT_LANGUAGE, language);
        self.send(request).await
    }

    /// Execute POST request with JSON body
    pub async fn post_json<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> TransportResult<T> {
        self.send(self.client.post(self.url(endpoint)).json(body))
            .await
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> TransportResult<T> {
        let request = request.header(header::ACCEPT, "application/json");
        let request = match &self.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        Self::handle_response(request.send().await?).await
    }

    /// Handle response and parse JSON
    async fn handle_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> TransportResult<T> {
        let status = response.status();

        if !status.is_success() {
            let status_code = status.as_u16();
            let message = response.text().await.unwrap_or_default();

            return Err(TransportError::Api {
                status: status_code,
                message,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| TransportError::Parse(format!("JSON parse error: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_base_and_endpoint() {
        let client = HttpClient::new("https://api.themoviedb.org/3").unwrap();
        assert_eq!(
            client.url("/movie/603"),
            "https://api.themoviedb.org/3/movie/603"
        );
    }

    #[test]
    fn test_bearer_token_keeps_base_url() {
        let client = HttpClient::new("https://api.thetvdb.com").unwrap();
        let authed = client.with_bearer_token("secret");

        assert_eq!(authed.url("/languages"), "https://api.thetvdb.com/languages");
        assert!(client.bearer_token.is_none());
        assert_eq!(authed.bearer_token.as_deref(), Some("secret"));
    }
}
