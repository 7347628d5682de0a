use log::debug;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::auth::Token;
use crate::error::{InsightsError, Result};

pub(super) const API_VERSION: &str = "5.1";

/// Authenticated JSON client rooted at an organization URL.
pub struct AzureClient {
    client: Client,
    base_url: Url,
    token: Option<Token>,
}

impl AzureClient {
    pub fn new(base_url: &str, token: Option<Token>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("pr-insights/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| InsightsError::Config(format!("Failed to create HTTP client: {e}")))?;

        let mut base_url = Url::parse(base_url)
            .map_err(|e| InsightsError::Config(format!("Invalid base URL: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(InsightsError::Config(format!(
                "Base URL cannot carry a path: {base_url}"
            )));
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    /// Builds `{base}/{segments...}?api-version=..` with every segment percent-encoded.
    pub fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| InsightsError::Config(format!("Invalid base URL: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        url.query_pairs_mut().append_pair("api-version", API_VERSION);
        Ok(url)
    }

    fn auth_request(&self, request: RequestBuilder) -> RequestBuilder {
        if let Some(token) = &self.token {
            request.bearer_auth(token.as_str())
        } else {
            request
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = self.auth_request(request).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(InsightsError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }

    pub async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!("GET {url}");
        let response = self.send(self.client.get(url)).await?;
        Ok(response.json().await?)
    }

    /// Like [`get`](Self::get), but an empty or `204 No Content` response is `None`.
    pub async fn get_optional<T: DeserializeOwned>(&self, url: Url) -> Result<Option<T>> {
        debug!("GET {url}");
        let response = self.send(self.client.get(url)).await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let body = response.text().await?;
        if body.trim().is_empty() || body.trim() == "null" {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&body)?))
    }

    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<T> {
        debug!("POST {url}");
        let response = self.send(self.client.post(url).json(body)).await?;
        Ok(response.json().await?)
    }

    pub async fn patch<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<T> {
        debug!("PATCH {url}");
        let response = self.send(self.client.patch(url).json(body)).await?;
        Ok(response.json().await?)
    }

    pub async fn delete(&self, url: Url) -> Result<()> {
        debug!("DELETE {url}");
        self.send(self.client.delete(url)).await?;
        Ok(())
    }
}
