// SPDX-License-Identifier: MPL-2.0

use super::{ApiError, FeedApi, unwrap_data, unwrap_post, unwrap_posts};
use crate::config::{Config, ME_PATH, POSTS_PATH};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde_json::{Value, json};
use std::sync::RwLock;
use tracing::debug;
use url::Url;

/// Bearer-authenticated REST client for the Plaza backend.
pub struct PlazaClient {
    http: reqwest::Client,
    api_base: String,
    base_url: Url,
    token: RwLock<Option<String>>,
}

impl PlazaClient {
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;
        let base_url = Url::parse(&config.api_base)
            .map_err(|e| ApiError::InvalidResponse(format!("bad api base: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidResponse("api base cannot hold a path".into()));
        }

        Ok(Self {
            http,
            api_base: config.api_base.clone(),
            base_url,
            token: RwLock::new(config.token.clone()),
        })
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub fn set_token(&self, token: Option<String>) {
        if let Ok(mut guard) = self.token.write() {
            *guard = token;
        }
    }

    /// `path` is a fixed endpoint; each of `ids` is appended as one encoded segment.
    fn endpoint(&self, path: &str, ids: &[&str]) -> Result<Url, ApiError> {
        if let Some(bad) = ids.iter().find(|id| matches!(id.trim(), "" | "." | "..")) {
            debug!(id = *bad, "refusing to build a request for an unusable id");
            return Err(ApiError::NotFound);
        }
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidResponse("api base cannot hold a path".into()))?
            .pop_if_empty()
            .extend(path.split('/').filter(|s| !s.is_empty()))
            .extend(ids);
        Ok(url)
    }

    fn request(
        &self,
        method: Method,
        path: &str,
        ids: &[&str],
    ) -> Result<RequestBuilder, ApiError> {
        let url = self.endpoint(path, ids)?;
        let builder = self.http.request(method, url);
        // Token is cloned out so no lock is held across the send
        let token = self.token.read().ok().and_then(|guard| guard.clone());
        Ok(match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        debug!(%status, url = %response.url(), "response");

        match status {
            s if s.is_success() => Ok(response),
            StatusCode::NOT_FOUND => Err(ApiError::NotFound),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ApiError::NotAuthenticated),
            s => {
                let body = response.text().await.unwrap_or_default();
                Err(ApiError::Status {
                    status: s.as_u16(),
                    message: error_message(&body),
                })
            }
        }
    }

    async fn send_json(&self, builder: RequestBuilder) -> Result<Value, ApiError> {
        let response = self.send(builder).await?;
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }
}

/// Prefer the backend's `message` field over the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(String::from))
        .unwrap_or_else(|| body.chars().take(200).collect())
}

#[async_trait]
impl FeedApi for PlazaClient {
    async fn fetch_posts(&self) -> Result<Vec<Value>, ApiError> {
        let payload = self.send_json(self.request(Method::GET, POSTS_PATH, &[])?).await?;
        unwrap_posts(payload)
    }

    async fn fetch_single_post(&self, post_id: &str) -> Result<Value, ApiError> {
        let builder = self.request(Method::GET, POSTS_PATH, &[post_id])?;
        let payload = self.send_json(builder).await?;
        unwrap_post(payload)
    }

    async fn fetch_me(&self) -> Result<Value, ApiError> {
        let payload = self.send_json(self.request(Method::GET, ME_PATH, &[])?).await?;
        match unwrap_data(payload) {
            user @ Value::Object(_) => Ok(user),
            _ => Err(ApiError::InvalidResponse("user is not an object".into())),
        }
    }

    async fn like_post(&self, post_id: &str) -> Result<(), ApiError> {
        let builder = self.request(Method::POST, POSTS_PATH, &[post_id, "like"])?;
        self.send(builder).await?;
        Ok(())
    }

    async fn comment_on_post(&self, post_id: &str, text: &str) -> Result<Value, ApiError> {
        let builder = self
            .request(Method::POST, POSTS_PATH, &[post_id, "comment"])?
            .json(&json!({ "text": text }));
        let payload = self.send_json(builder).await?;
        Ok(unwrap_data(payload))
    }

    async fn delete_comment(&self, post_id: &str, comment_id: &str) -> Result<(), ApiError> {
        let builder =
            self.request(Method::DELETE, POSTS_PATH, &[post_id, "comment", comment_id])?;
        self.send(builder).await?;
        Ok(())
    }

    async fn delete_post(&self, post_id: &str) -> Result<(), ApiError> {
        let builder = self.request(Method::DELETE, POSTS_PATH, &[post_id])?;
        self.send(builder).await?;
        Ok(())
    }
}
