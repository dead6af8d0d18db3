// SPDX-License-Identifier: MPL-2.0

mod identity;

pub use identity::{resolve_id, same_id, same_id_str};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Decoupled from the backend's payloads so we own the shape the UI binds to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedUser {
    pub id: String,
    pub name: String,
    pub username: Option<String>,
    /// Always absolute; falls back to the placeholder avatar
    pub avatar: String,
}

impl NormalizedUser {
    /// True when `id` refers to this user, by id or by username.
    pub fn matches(&self, id: &str) -> bool {
        same_id_str(&self.id, id)
            || self
                .username
                .as_deref()
                .is_some_and(|username| same_id_str(username, id))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedComment {
    pub id: String,
    pub text: String,
    /// ISO-8601
    pub created_at: String,
    pub author: NormalizedUser,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub src: String,
}

impl MediaItem {
    pub fn image(src: impl Into<String>) -> Self {
        Self {
            kind: MediaKind::Image,
            src: src.into(),
        }
    }

    pub fn video(src: impl Into<String>) -> Self {
        Self {
            kind: MediaKind::Video,
            src: src.into(),
        }
    }

    pub fn is_video(&self) -> bool {
        self.kind == MediaKind::Video
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPost {
    pub id: String,
    pub content: String,
    /// ISO-8601
    pub created_at: String,
    /// Cover media for the feed card
    pub media: Option<MediaItem>,
    /// Videos first, then images, at most ten entries
    pub media_gallery: Vec<MediaItem>,
    /// Always equal to `liked_users.len()`
    pub likes: usize,
    /// Whether the viewer is among `liked_users`
    pub liked: bool,
    pub liked_users: Vec<NormalizedUser>,
    pub comments: Vec<NormalizedComment>,
    pub author: NormalizedUser,
    /// Backend payload, kept so the post can be re-derived when the viewer changes
    pub raw: Value,
}

impl NormalizedPost {
    pub fn has_video(&self) -> bool {
        self.media_gallery.iter().any(MediaItem::is_video)
    }

    pub fn is_liked_by(&self, viewer_id: &str) -> bool {
        self.liked_users.iter().any(|u| u.matches(viewer_id))
    }

    pub fn is_authored_by(&self, viewer_id: &str) -> bool {
        self.author.matches(viewer_id)
    }
}
