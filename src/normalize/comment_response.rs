// SPDX-License-Identifier: MPL-2.0

use super::adapt::{Normalizer, fallback_id, now_iso};
use crate::model::{NormalizedComment, NormalizedUser};
use serde_json::{Value, json};

/// Shapes the comment-create endpoint has been seen to answer with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CommentResponse<'a> {
    /// The whole post came back; the new comment is the tail of its list
    PostWithComments(&'a Value),
    /// `{ "comment": {...} }`
    Comment(&'a Value),
    /// The payload is the comment itself
    Bare(&'a Value),
    /// Nothing we can read a comment from
    Unusable,
}

fn comments_tail(post: &Value) -> Option<&Value> {
    post.get("comments")
        .and_then(Value::as_array)
        .and_then(|comments| comments.last())
        .filter(|c| c.is_object())
}

fn looks_like_comment(value: &Value) -> bool {
    value.as_object().is_some_and(|map| {
        ["text", "content", "comment", "body"]
            .iter()
            .any(|field| map.get(*field).is_some_and(Value::is_string))
    })
}

impl<'a> CommentResponse<'a> {
    /// Pick the variant by which fields are present.
    pub fn classify(payload: &'a Value) -> Self {
        if let Some(tail) = payload.get("post").and_then(comments_tail) {
            return Self::PostWithComments(tail);
        }
        if let Some(comment) = payload.get("comment").filter(|c| c.is_object()) {
            return Self::Comment(comment);
        }
        if let Some(tail) = comments_tail(payload) {
            return Self::PostWithComments(tail);
        }
        if looks_like_comment(payload) {
            return Self::Bare(payload);
        }
        Self::Unusable
    }

    /// Raw comment object carried by this response, if any.
    pub fn raw_comment(&self) -> Option<&'a Value> {
        match self {
            Self::PostWithComments(c) | Self::Comment(c) | Self::Bare(c) => Some(c),
            Self::Unusable => None,
        }
    }
}

/// A confirmed comment plus the raw object to append to the post's raw mirror.
#[derive(Debug, Clone)]
pub struct ConfirmedComment {
    pub comment: NormalizedComment,
    pub raw: Value,
}

/// Build the comment to append after a successful create call.
///
/// Whatever the server omitted is filled from what we submitted: the text,
/// the current time and the viewer as author.
pub fn confirm_comment(
    normalizer: &Normalizer,
    response: CommentResponse<'_>,
    submitted: &str,
    viewer: &NormalizedUser,
) -> ConfirmedComment {
    let Some(raw) = response.raw_comment() else {
        return synthesize_comment(submitted, viewer);
    };

    let mut comment = normalizer.adapt_comment(raw);
    if comment.text.is_empty() {
        comment.text = submitted.to_string();
    }
    if comment.created_at.is_empty() {
        comment.created_at = now_iso();
    }
    let has_author = ["user", "author"]
        .iter()
        .any(|field| raw.get(*field).is_some_and(|v| !v.is_null()));
    if !has_author {
        comment.author = viewer.clone();
    }

    let mut raw = raw.clone();
    if let Some(map) = raw.as_object_mut() {
        if !map.contains_key("_id") && !map.contains_key("id") {
            map.insert("_id".into(), Value::String(comment.id.clone()));
        }
        if !has_author {
            map.insert("user".into(), user_to_raw(viewer));
        }
    }

    ConfirmedComment { comment, raw }
}

/// Comment built entirely from local state.
pub fn synthesize_comment(text: &str, viewer: &NormalizedUser) -> ConfirmedComment {
    let comment = NormalizedComment {
        id: fallback_id("comment"),
        text: text.to_string(),
        created_at: now_iso(),
        author: viewer.clone(),
    };
    let raw = json!({
        "_id": comment.id,
        "text": comment.text,
        "createdAt": comment.created_at,
        "user": user_to_raw(viewer),
    });
    ConfirmedComment { comment, raw }
}

/// Inverse of `adapt_user`, used when writing into raw mirrors.
pub fn user_to_raw(user: &NormalizedUser) -> Value {
    let mut raw = json!({
        "_id": user.id,
        "name": user.name,
        "avatar": user.avatar,
    });
    if let (Some(map), Some(username)) = (raw.as_object_mut(), user.username.as_ref()) {
        map.insert("username".into(), Value::String(username.clone()));
    }
    raw
}
