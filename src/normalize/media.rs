// SPDX-License-Identifier: MPL-2.0

//! Media URL gathering for raw posts.
//!
//! The backend has used several field names for the same media over time, so
//! candidates are collected from all of them, absolutized against the API
//! base and deduplicated in first-seen order.

use crate::config::MAX_GALLERY_ITEMS;
use crate::model::{MediaItem, MediaKind};
use serde_json::Value;
use std::collections::HashSet;

/// Fields that may hold a URL when a media entry is an object.
const URL_FIELDS: &[&str] = &["url", "src", "path", "location", "secure_url"];

/// Image fields on the post itself, in discovery order.
const IMAGE_FIELDS: &[&str] = &["images", "image", "mediaUrl", "coverPhoto"];

/// Video fields on the post itself, in discovery order.
const VIDEO_FIELDS: &[&str] = &["videos", "video"];

/// Prefix `url` with the API base unless it is already absolute.
///
/// Returns `None` for empty candidates.
pub fn absolutize(api_base: &str, url: &str) -> Option<String> {
    let url = url.trim();
    if url.is_empty() {
        return None;
    }
    if url.starts_with("http") || url.starts_with("blob:") {
        return Some(url.to_string());
    }
    let base = api_base.trim_end_matches('/');
    if url.starts_with('/') {
        Some(format!("{base}{url}"))
    } else {
        Some(format!("{base}/{url}"))
    }
}

/// Pull a URL out of a scalar or object media entry.
pub fn extract_url(value: &Value) -> Option<&str> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.as_str()),
        Value::Object(map) => URL_FIELDS
            .iter()
            .filter_map(|field| map.get(*field))
            .find_map(|v| v.as_str().filter(|s| !s.trim().is_empty())),
        _ => None,
    }
}

/// Declared kind of an object media entry (`type`, `kind` or `mimetype`).
fn declared_kind(value: &Value) -> Option<MediaKind> {
    let map = value.as_object()?;
    let declared = ["type", "kind", "mimetype", "mimeType"]
        .iter()
        .filter_map(|field| map.get(*field))
        .find_map(Value::as_str)?
        .to_ascii_lowercase();
    if declared.starts_with("video") {
        Some(MediaKind::Video)
    } else if declared.starts_with("image") {
        Some(MediaKind::Image)
    } else {
        None
    }
}

/// Visit each entry of a field that may be a single value or an array.
fn each_entry<'a>(value: &'a Value, mut f: impl FnMut(&'a Value)) {
    match value {
        Value::Array(items) => items.iter().for_each(&mut f),
        Value::Null => {}
        other => f(other),
    }
}

/// Media candidates split by kind, still relative and possibly duplicated.
#[derive(Default)]
struct Candidates<'a> {
    images: Vec<&'a str>,
    videos: Vec<&'a str>,
}

impl<'a> Candidates<'a> {
    fn push(&mut self, entry: &'a Value, default_kind: MediaKind) {
        let Some(url) = extract_url(entry) else {
            return;
        };
        match declared_kind(entry).unwrap_or(default_kind) {
            MediaKind::Image => self.images.push(url),
            MediaKind::Video => self.videos.push(url),
        }
    }

    fn gather(raw: &'a Value) -> Self {
        let mut candidates = Self::default();
        let Some(post) = raw.as_object() else {
            return candidates;
        };

        for field in IMAGE_FIELDS {
            if let Some(value) = post.get(*field) {
                each_entry(value, |entry| candidates.push(entry, MediaKind::Image));
            }
        }

        // `media` is either a URL, a list of entries, or an object with nested fields
        if let Some(media) = post.get("media") {
            match media {
                Value::Object(nested) if extract_url(media).is_none() => {
                    for field in IMAGE_FIELDS {
                        if let Some(value) = nested.get(*field) {
                            each_entry(value, |entry| candidates.push(entry, MediaKind::Image));
                        }
                    }
                    for field in VIDEO_FIELDS {
                        if let Some(value) = nested.get(*field) {
                            each_entry(value, |entry| candidates.push(entry, MediaKind::Video));
                        }
                    }
                }
                other => each_entry(other, |entry| candidates.push(entry, MediaKind::Image)),
            }
        }

        if let Some(files) = post.get("mediaFiles") {
            each_entry(files, |entry| candidates.push(entry, MediaKind::Image));
        }

        for field in VIDEO_FIELDS {
            if let Some(value) = post.get(*field) {
                each_entry(value, |entry| candidates.push(entry, MediaKind::Video));
            }
        }

        candidates
    }
}

fn dedup_absolute(api_base: &str, urls: &[&str]) -> Vec<String> {
    let mut seen = HashSet::new();
    urls.iter()
        .filter_map(|url| absolutize(api_base, url))
        .filter(|url| seen.insert(url.clone()))
        .collect()
}

/// Build the gallery and cover media for a raw post.
///
/// Videos come first, then images, truncated to ten entries. The cover is the
/// first video when there is one, else the first gallery entry.
pub fn build_gallery(api_base: &str, raw: &Value) -> (Option<MediaItem>, Vec<MediaItem>) {
    let candidates = Candidates::gather(raw);
    let videos = dedup_absolute(api_base, &candidates.videos);
    let images = dedup_absolute(api_base, &candidates.images);

    let gallery: Vec<MediaItem> = videos
        .into_iter()
        .map(MediaItem::video)
        .chain(images.into_iter().map(MediaItem::image))
        .take(MAX_GALLERY_ITEMS)
        .collect();

    // Videos lead the gallery, so the first entry is the first video if any
    let cover = gallery.first().cloned();
    (cover, gallery)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const BASE: &str = "https://x.test";

    #[test]
    fn test_absolutize() {
        assert_eq!(absolutize(BASE, "/a.jpg").as_deref(), Some("https://x.test/a.jpg"));
        assert_eq!(absolutize(BASE, "a.jpg").as_deref(), Some("https://x.test/a.jpg"));
        assert_eq!(
            absolutize(BASE, "https://cdn.test/a.jpg").as_deref(),
            Some("https://cdn.test/a.jpg")
        );
        assert_eq!(absolutize(BASE, "blob:abc").as_deref(), Some("blob:abc"));
        assert_eq!(absolutize(BASE, "  "), None);
    }

    #[test]
    fn test_video_first_and_image_dedup() {
        let raw = json!({ "images": ["/a.jpg", "/a.jpg"], "video": "/v.mp4" });
        let (cover, gallery) = build_gallery(BASE, &raw);
        assert_eq!(
            gallery,
            vec![
                MediaItem::video("https://x.test/v.mp4"),
                MediaItem::image("https://x.test/a.jpg"),
            ]
        );
        assert_eq!(cover, Some(MediaItem::video("https://x.test/v.mp4")));
    }

    #[test]
    fn test_alternate_fields_merge() {
        let raw = json!({
            "image": "/one.jpg",
            "media": { "images": [{ "url": "/two.jpg" }], "video": "/clip.mp4" },
            "mediaFiles": [{ "url": "/three.jpg" }, { "url": "/four.mp4", "type": "video/mp4" }],
            "coverPhoto": "/one.jpg"
        });
        let (cover, gallery) = build_gallery(BASE, &raw);
        let srcs: Vec<&str> = gallery.iter().map(|m| m.src.as_str()).collect();
        assert_eq!(
            srcs,
            vec![
                "https://x.test/clip.mp4",
                "https://x.test/four.mp4",
                "https://x.test/one.jpg",
                "https://x.test/two.jpg",
                "https://x.test/three.jpg",
            ]
        );
        assert!(cover.unwrap().is_video());
    }

    #[test]
    fn test_gallery_capped_at_ten() {
        let images: Vec<String> = (0..15).map(|i| format!("/{i}.jpg")).collect();
        let raw = json!({ "images": images });
        let (cover, gallery) = build_gallery(BASE, &raw);
        assert_eq!(gallery.len(), MAX_GALLERY_ITEMS);
        assert_eq!(cover.unwrap().src, "https://x.test/0.jpg");
    }

    #[test]
    fn test_malformed_candidates_dropped() {
        let raw = json!({ "images": [null, 3, "", { "alt": "nothing" }], "video": false });
        let (cover, gallery) = build_gallery(BASE, &raw);
        assert!(gallery.is_empty());
        assert!(cover.is_none());
    }
}
