use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::utils::Config;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Request rejected ({status}): {message}")]
    Status { status: u16, message: String },

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::Status { status: 404, .. })
    }
}

/// `{ "message": ... }` / `{ "error": ... }` bodies the API answers with.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiMessage {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub reply: Option<String>,
}

impl ApiMessage {
    pub fn text(&self) -> Option<&str> {
        self.message
            .as_deref()
            .or(self.error.as_deref())
            .or(self.reply.as_deref())
    }
}

/// JSON client bound to the commerce API base URL.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let mut base_url = Url::parse(base_url)?;
        // Url::join drops the last segment unless the base ends with a slash
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder().timeout(timeout).build()?;

        tracing::info!("API client ready for {}", base_url);
        Ok(Self { client, base_url })
    }

    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        Self::new(&config.api_url, config.request_timeout)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        token: Option<&str>,
    ) -> Result<T, ApiError> {
        let url = self.endpoint(path)?;
        tracing::debug!("GET {} {:?}", url, query);

        let request = self.client.get(url).query(query);
        let response = with_bearer(request, token).send().await?;
        read_json(response).await
    }

    pub async fn send_json<B, T>(
        &self,
        method: Method,
        path: &str,
        body: &B,
        token: Option<&str>,
    ) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        tracing::debug!("{} {}", method, url);

        let request = self.client.request(method, url).json(body);
        let response = with_bearer(request, token).send().await?;
        read_json(response).await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> Result<ApiMessage, ApiError> {
        let url = self.endpoint(path)?;
        tracing::debug!("DELETE {}", url);

        let response = with_bearer(self.client.delete(url), token).send().await?;
        read_json(response).await
    }

    /// Cheapest read the API offers: a one-item listing.
    pub async fn health_check(&self) -> Result<bool, ApiError> {
        let url = self.endpoint("products")?;
        let response = self
            .client
            .get(url)
            .query(&[("limit", "1")])
            .send()
            .await?;

        let healthy = response.status().is_success();
        tracing::info!("API health check: {}", response.status());
        Ok(healthy)
    }
}

fn with_bearer(request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
    match token {
        Some(token) => request.bearer_auth(token),
        None => request,
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status();
    let body = response.text().await?;

    if status.is_success() {
        return Ok(serde_json::from_str(&body)?);
    }

    let message = serde_json::from_str::<ApiMessage>(&body)
        .ok()
        .and_then(|m| m.text().map(str::to_string))
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                status.canonical_reason().unwrap_or("no details").to_string()
            } else {
                body.trim().to_string()
            }
        });

    tracing::debug!("API answered {}: {}", status, message);

    if status == StatusCode::UNAUTHORIZED {
        return Err(ApiError::Unauthorized { message });
    }

    Err(ApiError::Status {
        status: status.as_u16(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let client = ApiClient::new("http://localhost:5000/api", Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url().as_str(), "http://localhost:5000/api/");
        assert_eq!(
            client.endpoint("products").unwrap().as_str(),
            "http://localhost:5000/api/products"
        );
        assert_eq!(
            client.endpoint("/seller/inventory").unwrap().as_str(),
            "http://localhost:5000/api/seller/inventory"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let result = ApiClient::new("not a url", Duration::from_secs(1));
        assert!(matches!(result, Err(ApiError::Url(_))));
    }

    #[test]
    fn test_api_message_prefers_message() {
        let body: ApiMessage =
            serde_json::from_str(r#"{"message":"Invalid credentials","error":"x"}"#).unwrap();
        assert_eq!(body.text(), Some("Invalid credentials"));

        let body: ApiMessage = serde_json::from_str(r#"{"error":"Invalid ID format"}"#).unwrap();
        assert_eq!(body.text(), Some("Invalid ID format"));
    }
}
