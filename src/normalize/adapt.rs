// SPDX-License-Identifier: MPL-2.0

use super::media::{absolutize, build_gallery, extract_url};
use crate::config::{PLACEHOLDER_AVATAR, PLACEHOLDER_USER_NAME, UNKNOWN_AUTHOR_NAME};
use crate::model::{NormalizedComment, NormalizedPost, NormalizedUser, resolve_id};
use serde_json::{Map, Value};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

const CONTENT_FIELDS: &[&str] = &["text", "content", "caption", "description"];
const AUTHOR_FIELDS: &[&str] = &["user", "author"];
const NAME_FIELDS: &[&str] = &["name", "fullName", "displayName", "username"];
const AVATAR_FIELDS: &[&str] = &["avatar", "profilePicture", "profileImage", "photo", "image"];
const COMMENT_TEXT_FIELDS: &[&str] = &["text", "content", "comment", "body"];
const ENTITY_ID_FIELDS: &[&str] = &["_id", "id"];
/// Fields that change locally after adaptation and so stay out of content ids
const MUTABLE_POST_FIELDS: &[&str] = &["likes", "comments"];

static FALLBACK_SEQ: AtomicU64 = AtomicU64::new(0);

/// Synthesize an id for an entity the backend sent without one.
///
/// Timestamp plus a process-wide counter, so two ids minted in the same
/// millisecond never collide.
pub fn fallback_id(prefix: &str) -> String {
    let seq = FALLBACK_SEQ.fetch_add(1, Ordering::Relaxed);
    let millis = chrono::Utc::now().timestamp_millis();
    format!("{prefix}-{millis}-{seq}")
}

/// Id for a post the backend sent without one, derived from its content.
///
/// The same payload always gets the same id, so a re-fetched copy merges
/// with the one already loaded.
pub fn content_id(raw: &Value) -> String {
    let mut hasher = DefaultHasher::new();
    match raw.as_object() {
        Some(map) => {
            for (key, value) in map {
                if MUTABLE_POST_FIELDS.contains(&key.as_str()) {
                    continue;
                }
                key.hash(&mut hasher);
                value.to_string().hash(&mut hasher);
            }
        }
        None => raw.to_string().hash(&mut hasher),
    }
    format!("post-{:016x}", hasher.finish())
}

/// Current time in the ISO-8601 form the backend uses.
pub fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

fn first_string<'a>(map: &'a Map<String, Value>, fields: &[&str]) -> Option<&'a str> {
    fields
        .iter()
        .filter_map(|field| map.get(*field))
        .find_map(|v| v.as_str().map(str::trim).filter(|s| !s.is_empty()))
}

/// First of `_id`/`id` that resolves to a usable id.
fn entity_id(map: &Map<String, Value>) -> Option<String> {
    ENTITY_ID_FIELDS
        .iter()
        .filter_map(|field| map.get(*field))
        .find_map(resolve_id)
}

fn first_value<'a>(map: &'a Map<String, Value>, fields: &[&str]) -> Option<&'a Value> {
    fields
        .iter()
        .filter_map(|field| map.get(*field))
        .find(|v| !v.is_null())
}

/// `createdAt` as sent, or converted from epoch milliseconds.
fn created_at(map: &Map<String, Value>) -> Option<String> {
    match map.get("createdAt")? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => n
            .as_i64()
            .and_then(chrono::DateTime::<chrono::Utc>::from_timestamp_millis)
            .map(|dt| dt.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)),
        _ => None,
    }
}

/// Converts raw backend payloads into the canonical model.
///
/// Holds only the API base used to absolutize media URLs; every method is
/// pure and never fails, degrading malformed fields to safe defaults.
#[derive(Debug, Clone)]
pub struct Normalizer {
    api_base: String,
}

impl Normalizer {
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
        }
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Adapt a user reference, which may be a full object or a bare id.
    pub fn adapt_user(&self, raw: &Value, fallback_name: &str) -> NormalizedUser {
        let id = resolve_id(raw).unwrap_or_else(|| fallback_name.to_string());

        let Some(map) = raw.as_object() else {
            return NormalizedUser {
                id,
                name: fallback_name.to_string(),
                username: None,
                avatar: PLACEHOLDER_AVATAR.to_string(),
            };
        };

        let avatar = first_value(map, AVATAR_FIELDS)
            .and_then(extract_url)
            .and_then(|url| absolutize(&self.api_base, url))
            .unwrap_or_else(|| PLACEHOLDER_AVATAR.to_string());

        NormalizedUser {
            id,
            name: first_string(map, NAME_FIELDS)
                .unwrap_or(fallback_name)
                .to_string(),
            username: first_string(map, &["username"]).map(String::from),
            avatar,
        }
    }

    pub fn adapt_comment(&self, raw: &Value) -> NormalizedComment {
        let Some(map) = raw.as_object() else {
            return NormalizedComment {
                id: fallback_id("comment"),
                text: raw.as_str().unwrap_or_default().trim().to_string(),
                created_at: String::new(),
                author: self.adapt_user(&Value::Null, UNKNOWN_AUTHOR_NAME),
            };
        };

        let id = entity_id(map).unwrap_or_else(|| fallback_id("comment"));

        let author = first_value(map, AUTHOR_FIELDS)
            .map(|u| self.adapt_user(u, UNKNOWN_AUTHOR_NAME))
            .unwrap_or_else(|| self.adapt_user(&Value::Null, UNKNOWN_AUTHOR_NAME));

        NormalizedComment {
            id,
            text: first_string(map, COMMENT_TEXT_FIELDS)
                .unwrap_or_default()
                .to_string(),
            created_at: created_at(map).unwrap_or_default(),
            author,
        }
    }

    /// Users who liked a raw post, from ids or user objects.
    pub fn liked_users(&self, raw: &Value) -> Vec<NormalizedUser> {
        raw.get("likes")
            .and_then(Value::as_array)
            .map(|likes| {
                likes
                    .iter()
                    .filter(|like| !like.is_null())
                    .map(|like| self.adapt_user(like, PLACEHOLDER_USER_NAME))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Adapt a raw post against the current viewer.
    ///
    /// `liked` is derived from `liked_users`, so `likes` and `liked` always
    /// agree with the list.
    pub fn adapt_post(&self, raw: &Value, viewer_id: Option<&str>) -> NormalizedPost {
        let empty = Map::new();
        let map = raw.as_object().unwrap_or(&empty);

        let id = entity_id(map).unwrap_or_else(|| content_id(raw));

        let author = first_value(map, AUTHOR_FIELDS)
            .map(|u| self.adapt_user(u, UNKNOWN_AUTHOR_NAME))
            .unwrap_or_else(|| self.adapt_user(&Value::Null, UNKNOWN_AUTHOR_NAME));

        let (media, media_gallery) = build_gallery(&self.api_base, raw);
        let liked_users = self.liked_users(raw);
        let liked = viewer_id.is_some_and(|viewer| liked_users.iter().any(|u| u.matches(viewer)));

        let comments = map
            .get("comments")
            .and_then(Value::as_array)
            .map(|comments| comments.iter().map(|c| self.adapt_comment(c)).collect())
            .unwrap_or_default();

        NormalizedPost {
            id,
            content: first_string(map, CONTENT_FIELDS).unwrap_or_default().to_string(),
            created_at: created_at(map).unwrap_or_default(),
            media,
            media_gallery,
            likes: liked_users.len(),
            liked,
            liked_users,
            comments,
            author,
            raw: raw.clone(),
        }
    }
}
