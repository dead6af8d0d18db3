// SPDX-License-Identifier: MPL-2.0

mod client;
#[cfg(test)]
pub(crate) mod fake;

pub use client::PlazaClient;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(String),
    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("not found")]
    NotFound,
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("not authenticated")]
    NotAuthenticated,
}

/// REST operations the feed core consumes.
///
/// Payloads are handed back as raw JSON; turning them into the model is the
/// normalizer's job.
#[async_trait]
pub trait FeedApi: Send + Sync {
    /// Every post the backend has; windowing happens client-side.
    async fn fetch_posts(&self) -> Result<Vec<Value>, ApiError>;

    async fn fetch_single_post(&self, post_id: &str) -> Result<Value, ApiError>;

    /// The signed-in user.
    async fn fetch_me(&self) -> Result<Value, ApiError>;

    /// Toggles the viewer's like server-side.
    async fn like_post(&self, post_id: &str) -> Result<(), ApiError>;

    /// Returns the `data` payload, whose shape varies between deployments.
    async fn comment_on_post(&self, post_id: &str, text: &str) -> Result<Value, ApiError>;

    async fn delete_comment(&self, post_id: &str, comment_id: &str) -> Result<(), ApiError>;

    async fn delete_post(&self, post_id: &str) -> Result<(), ApiError>;
}

/// Unwrap a `{ "data": ... }` envelope if there is one.
pub fn unwrap_data(payload: Value) -> Value {
    match payload {
        Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Pull the post list out of a posts response.
pub fn unwrap_posts(payload: Value) -> Result<Vec<Value>, ApiError> {
    match payload {
        Value::Array(posts) => Ok(posts),
        Value::Object(mut map) => {
            if let Some(Value::Array(posts)) = map.remove("posts") {
                return Ok(posts);
            }
            match map.remove("data") {
                Some(data) => unwrap_posts(data),
                None => Err(ApiError::InvalidResponse("missing posts".into())),
            }
        }
        _ => Err(ApiError::InvalidResponse("missing posts".into())),
    }
}

/// Pull a single post out of `{ post }`, `{ data }` or a bare object.
pub fn unwrap_post(payload: Value) -> Result<Value, ApiError> {
    match unwrap_data(payload) {
        Value::Object(mut map) => match map.remove("post") {
            Some(post @ Value::Object(_)) => Ok(post),
            Some(_) | None => Ok(Value::Object(map)),
        },
        Value::Null => Err(ApiError::NotFound),
        _ => Err(ApiError::InvalidResponse("post is not an object".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unwrap_posts_shapes() {
        assert_eq!(unwrap_posts(json!({ "posts": [1, 2] })).unwrap().len(), 2);
        assert_eq!(unwrap_posts(json!({ "data": { "posts": [1] } })).unwrap().len(), 1);
        assert_eq!(unwrap_posts(json!([1, 2, 3])).unwrap().len(), 3);
        assert!(unwrap_posts(json!({ "ok": true })).is_err());
    }

    #[test]
    fn test_unwrap_post_shapes() {
        assert_eq!(unwrap_post(json!({ "post": { "_id": "a" } })).unwrap()["_id"], "a");
        assert_eq!(unwrap_post(json!({ "data": { "_id": "b" } })).unwrap()["_id"], "b");
        assert_eq!(unwrap_post(json!({ "_id": "c" })).unwrap()["_id"], "c");
        assert_eq!(unwrap_post(json!({ "data": null })), Err(ApiError::NotFound));
    }

    #[test]
    fn test_unwrap_data_passthrough() {
        assert_eq!(unwrap_data(json!({ "data": 1 })), json!(1));
        assert_eq!(unwrap_data(json!({ "x": 1 })), json!({ "x": 1 }));
    }
}
