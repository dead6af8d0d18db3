// SPDX-License-Identifier: MPL-2.0

//! Scripted in-memory backend for controller tests.

use super::{ApiError, FeedApi};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

pub(crate) struct FakeApi {
    pub posts: Mutex<Vec<Value>>,
    pub me: Mutex<Value>,
    pub comment_reply: Mutex<Value>,
    pub calls: Mutex<Vec<String>>,
    pub fail_fetch: AtomicBool,
    pub fail_mutations: AtomicBool,
    /// When set, each mutation waits for a permit before answering
    gate: Mutex<Option<Arc<Semaphore>>>,
}

impl FakeApi {
    pub fn with_posts(posts: Vec<Value>) -> Self {
        Self {
            posts: Mutex::new(posts),
            me: Mutex::new(json!({ "_id": "me", "name": "Me", "username": "me" })),
            comment_reply: Mutex::new(Value::Null),
            calls: Mutex::new(Vec::new()),
            fail_fetch: AtomicBool::new(false),
            fail_mutations: AtomicBool::new(false),
            gate: Mutex::new(None),
        }
    }

    /// `count` posts with ids `p0..p{count}`.
    pub fn numbered(count: usize) -> Self {
        Self::with_posts(
            (0..count)
                .map(|i| json!({ "_id": format!("p{i}"), "text": format!("post {i}"), "likes": [] }))
                .collect(),
        )
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Hold every mutation until the returned semaphore hands out a permit.
    pub fn gate_mutations(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    async fn mutation(&self) -> Result<(), ApiError> {
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.acquire().await.unwrap().forget();
        }
        if self.fail_mutations.load(Ordering::SeqCst) {
            Err(ApiError::Network("connection reset".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl FeedApi for FakeApi {
    async fn fetch_posts(&self) -> Result<Vec<Value>, ApiError> {
        self.record("fetch_posts".into());
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(ApiError::Network("offline".into()));
        }
        Ok(self.posts.lock().unwrap().clone())
    }

    async fn fetch_single_post(&self, post_id: &str) -> Result<Value, ApiError> {
        self.record(format!("fetch_single_post {post_id}"));
        self.posts
            .lock()
            .unwrap()
            .iter()
            .find(|p| p["_id"] == post_id)
            .cloned()
            .ok_or(ApiError::NotFound)
    }

    async fn fetch_me(&self) -> Result<Value, ApiError> {
        self.record("fetch_me".into());
        Ok(self.me.lock().unwrap().clone())
    }

    async fn like_post(&self, post_id: &str) -> Result<(), ApiError> {
        self.record(format!("like_post {post_id}"));
        self.mutation().await
    }

    async fn comment_on_post(&self, post_id: &str, text: &str) -> Result<Value, ApiError> {
        self.record(format!("comment_on_post {post_id} {text}"));
        self.mutation().await?;
        Ok(self.comment_reply.lock().unwrap().clone())
    }

    async fn delete_comment(&self, post_id: &str, comment_id: &str) -> Result<(), ApiError> {
        self.record(format!("delete_comment {post_id} {comment_id}"));
        self.mutation().await
    }

    async fn delete_post(&self, post_id: &str) -> Result<(), ApiError> {
        self.record(format!("delete_post {post_id}"));
        self.mutation().await
    }
}
