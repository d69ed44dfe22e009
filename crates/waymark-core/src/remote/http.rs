//! reqwest implementation of the remote content service.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use super::RemoteContentService;
use crate::error::{Error, Result};
use crate::models::{ContentId, ContentItem};
use crate::util::{compact_text, is_http_url, normalize_text_option};

/// JSON REST client for the Waymark backend.
///
/// Endpoints:
/// - `POST   /v1/items`
/// - `GET    /v1/items`
/// - `GET    /v1/items/nearby?lat=..&lng=..&radius_km=..`
/// - `PUT    /v1/items/{id}`
/// - `DELETE /v1/items/{id}`
#[derive(Clone)]
pub struct HttpContentService {
    base_url: String,
    token: String,
    client: reqwest::Client,
}

impl HttpContentService {
    /// Create a client for the given API base URL and bearer token.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        let base_url = normalize_base_url(base_url.into())?;
        let token = normalize_text_option(Some(token.into()))
            .ok_or_else(|| Error::InvalidInput("API token must not be empty".to_string()))?;
        let client = reqwest::Client::builder()
            .build()
            .map_err(|error| Error::Remote(error.to_string()))?;
        Ok(Self {
            base_url,
            token,
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send_json<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T> {
        let response = self.check(request).await?;
        response
            .json::<T>()
            .await
            .map_err(|error| Error::Remote(format!("invalid response payload: {error}")))
    }

    async fn check(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let response = request
            .bearer_auth(&self.token)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|error| Error::Remote(error.to_string()))?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(Error::Remote(parse_api_error(status, &body)))
    }
}

#[async_trait]
impl RemoteContentService for HttpContentService {
    async fn create_item(&self, item: &ContentItem) -> Result<ContentItem> {
        self.send_json(self.client.post(self.url("/v1/items")).json(item))
            .await
    }

    async fn list_user_items(&self) -> Result<Vec<ContentItem>> {
        self.send_json(self.client.get(self.url("/v1/items"))).await
    }

    async fn list_nearby_public_items(
        &self,
        latitude: f64,
        longitude: f64,
        radius_km: f64,
    ) -> Result<Vec<ContentItem>> {
        self.send_json(self.client.get(self.url("/v1/items/nearby")).query(&[
            ("lat", latitude),
            ("lng", longitude),
            ("radius_km", radius_km),
        ]))
        .await
    }

    async fn update_item(&self, id: &ContentId, item: &ContentItem) -> Result<ContentItem> {
        self.send_json(
            self.client
                .put(self.url(&format!("/v1/items/{id}")))
                .json(item),
        )
        .await
    }

    async fn delete_item(&self, id: &ContentId) -> Result<()> {
        self.check(self.client.delete(self.url(&format!("/v1/items/{id}"))))
            .await?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", compact_text(trimmed), status.as_u16())
    }
}

fn normalize_base_url(raw: String) -> Result<String> {
    let url = normalize_text_option(Some(raw))
        .ok_or_else(|| Error::InvalidInput("API base URL must not be empty".to_string()))?;
    if is_http_url(&url) {
        Ok(url.trim_end_matches('/').to_string())
    } else {
        Err(Error::InvalidInput(
            "API base URL must include http:// or https://".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base_url_rejects_invalid_values() {
        assert!(normalize_base_url(String::new()).is_err());
        assert!(normalize_base_url("api.example.com".to_string()).is_err());
        assert_eq!(
            normalize_base_url("https://api.example.com/".to_string()).unwrap(),
            "https://api.example.com"
        );
    }

    #[test]
    fn test_parse_api_error_prefers_structured_message() {
        let body = r#"{"message": "rate limited"}"#;
        assert_eq!(
            parse_api_error(StatusCode::TOO_MANY_REQUESTS, body),
            "rate limited (429)"
        );
    }

    #[test]
    fn test_parse_api_error_falls_back_to_body_text() {
        assert_eq!(
            parse_api_error(StatusCode::BAD_GATEWAY, "upstream down"),
            "upstream down (502)"
        );
        assert_eq!(parse_api_error(StatusCode::BAD_GATEWAY, ""), "HTTP 502");
    }

    #[test]
    fn test_new_rejects_empty_token() {
        assert!(HttpContentService::new("https://api.example.com", "  ").is_err());
    }
}
