//! reqwest-backed [`CatalogService`]
//!
//! The session cookie set by `/auth/login` is kept in reqwest's cookie
//! store and replayed on every later call. Cursors are relative URLs and
//! are resolved against the configured base URL.

use crate::config::ClientConfig;
use crate::core::dog::{Credentials, Cursor, Dog, DogId, MatchResponse, SearchPage};
use crate::core::error::NetworkError;
use crate::core::filter::SearchQuery;
use crate::core::service::{CatalogService, ServiceResult};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

const LOGIN_PATH: &str = "/auth/login";
const LOGOUT_PATH: &str = "/auth/logout";
const BREEDS_PATH: &str = "/dogs/breeds";
const SEARCH_PATH: &str = "/dogs/search";
const DOGS_PATH: &str = "/dogs";
const MATCH_PATH: &str = "/dogs/match";

#[derive(Debug, Clone)]
pub struct HttpCatalogClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpCatalogClient {
    pub fn new(config: &ClientConfig) -> ServiceResult<Self> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .map_err(|e| NetworkError::Transport {
                endpoint: config.base_url().to_string(),
                message: e.to_string(),
            })?;

        Ok(Self::with_client(http, config.base_url()))
    }

    /// Use a preconfigured reqwest client (it must keep cookies)
    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, self.url(path))
    }

    async fn send(&self, endpoint: &str, request: RequestBuilder) -> ServiceResult<Response> {
        tracing::debug!(endpoint, "Sending catalog request");

        let response = request.send().await.map_err(|e| {
            tracing::warn!(endpoint, error = %e, "Catalog request failed");
            NetworkError::Transport {
                endpoint: endpoint.to_string(),
                message: e.to_string(),
            }
        })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            tracing::info!(endpoint, "Catalog session is not authorized");
            return Err(NetworkError::Unauthorized {
                endpoint: endpoint.to_string(),
            });
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::warn!(endpoint, status = status.as_u16(), "Catalog returned an error status");
            return Err(NetworkError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        request: RequestBuilder,
    ) -> ServiceResult<T> {
        let response = self.send(endpoint, request).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| NetworkError::Decode {
                endpoint: endpoint.to_string(),
                message: e.to_string(),
            })
    }
}

#[async_trait]
impl CatalogService for HttpCatalogClient {
    async fn login(&self, credentials: &Credentials) -> ServiceResult<()> {
        let request = self.request(Method::POST, LOGIN_PATH).json(credentials);
        self.send(LOGIN_PATH, request).await?;
        tracing::info!(name = %credentials.name, "Signed in to catalog");
        Ok(())
    }

    async fn logout(&self) -> ServiceResult<()> {
        let request = self.request(Method::POST, LOGOUT_PATH);
        self.send(LOGOUT_PATH, request).await?;
        Ok(())
    }

    async fn breeds(&self) -> ServiceResult<Vec<String>> {
        let request = self.request(Method::GET, BREEDS_PATH);
        self.send_json(BREEDS_PATH, request).await
    }

    async fn search(&self, query: &SearchQuery) -> ServiceResult<SearchPage> {
        let request = self.request(Method::GET, SEARCH_PATH).query(query.params());
        self.send_json(SEARCH_PATH, request).await
    }

    async fn page(&self, cursor: &Cursor) -> ServiceResult<SearchPage> {
        let request = self.request(Method::GET, cursor.as_str());
        self.send_json(cursor.as_str(), request).await
    }

    async fn dogs(&self, ids: &[DogId]) -> ServiceResult<Vec<Dog>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let request = self.request(Method::POST, DOGS_PATH).json(ids);
        self.send_json(DOGS_PATH, request).await
    }

    async fn match_favorites(&self, ids: &[DogId]) -> ServiceResult<DogId> {
        let request = self.request(Method::POST, MATCH_PATH).json(ids);
        let response: MatchResponse = self.send_json(MATCH_PATH, request).await?;
        Ok(response.matched)
    }
}
