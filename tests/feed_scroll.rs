// SPDX-License-Identifier: MPL-2.0

use async_trait::async_trait;
use plaza::video::PlaybackError;
use plaza::{
    ApiError, DetailTab, FeedApi, FeedController, NoticeQueue, Normalizer, PostDetail, Priority,
    VideoCoordinator, VideoSurface,
};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

struct Backend {
    posts: Vec<Value>,
}

#[async_trait]
impl FeedApi for Backend {
    async fn fetch_posts(&self) -> Result<Vec<Value>, ApiError> {
        Ok(self.posts.clone())
    }

    async fn fetch_single_post(&self, post_id: &str) -> Result<Value, ApiError> {
        self.posts
            .iter()
            .find(|p| p["_id"] == post_id)
            .cloned()
            .ok_or(ApiError::NotFound)
    }

    async fn fetch_me(&self) -> Result<Value, ApiError> {
        Ok(json!({ "_id": "viewer", "name": "Viewer", "username": "viewer" }))
    }

    async fn like_post(&self, _post_id: &str) -> Result<(), ApiError> {
        Ok(())
    }

    async fn comment_on_post(&self, _post_id: &str, text: &str) -> Result<Value, ApiError> {
        Ok(json!({ "_id": "c-server", "text": text }))
    }

    async fn delete_comment(&self, _post_id: &str, _comment_id: &str) -> Result<(), ApiError> {
        Ok(())
    }

    async fn delete_post(&self, _post_id: &str) -> Result<(), ApiError> {
        Ok(())
    }
}

fn backend(count: usize) -> Arc<Backend> {
    let posts = (0..count)
        .map(|i| {
            json!({
                "_id": format!("post-{i}"),
                "text": format!("hello {i}"),
                "user": { "_id": format!("author-{i}"), "name": "Author" },
                "images": [format!("/img/{i}.jpg")],
                "videos": [format!("/vid/{i}.mp4")],
                "likes": ["someone"],
                "comments": []
            })
        })
        .collect();
    Arc::new(Backend { posts })
}

#[derive(Default)]
struct Surface {
    center: f64,
    playing: AtomicBool,
}

impl VideoSurface for Surface {
    fn play(&self) -> Result<(), PlaybackError> {
        self.playing.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn pause(&self) {
        self.playing.store(false, Ordering::SeqCst);
    }

    fn vertical_center(&self) -> f64 {
        self.center
    }
}

#[tokio::test]
async fn test_scrolling_through_the_feed() {
    let feed = Arc::new(FeedController::new(
        backend(45),
        Normalizer::new("https://plaza.test/"),
        Arc::new(NoticeQueue::new()),
    ));
    feed.load_viewer().await.unwrap();

    assert_eq!(feed.load_more().await.unwrap(), 30);
    assert_eq!(feed.load_more().await.unwrap(), 10);
    assert_eq!(feed.load_more().await.unwrap(), 5);
    assert!(!feed.has_more());
    assert_eq!(feed.load_more().await.unwrap(), 0);

    let posts = feed.posts();
    assert_eq!(posts.len(), 45);
    let first = &posts[0];
    assert_eq!(first.media_gallery.len(), 2);
    assert!(first.media_gallery[0].is_video());
    assert_eq!(first.media_gallery[1].src, "https://plaza.test/img/0.jpg");
    assert_eq!(first.likes, 1);
    assert!(!first.liked);
}

#[tokio::test]
async fn test_detail_round_trip() {
    let feed = Arc::new(FeedController::new(
        backend(3),
        Normalizer::new("https://plaza.test"),
        Arc::new(NoticeQueue::new()),
    ));
    feed.load_viewer().await.unwrap();
    feed.load_more().await.unwrap();

    let videos = VideoCoordinator::new(600.0);
    let feed_surface = Arc::new(Surface {
        center: 300.0,
        ..Default::default()
    });
    let feed_video = videos.register(feed_surface.clone(), Priority::Normal);
    feed_video.report_visible();
    assert!(feed_surface.playing.load(Ordering::SeqCst));

    let post = feed.open_deep_link("post-1").await.unwrap();
    let mut detail = PostDetail::open(post, feed.clone(), Some(videos.clone()), 12);
    assert!(!feed_surface.playing.load(Ordering::SeqCst));

    let modal_surface = Arc::new(Surface {
        center: 100.0,
        ..Default::default()
    });
    let modal_video = videos.register(modal_surface.clone(), Priority::Modal);
    modal_video.report_visible();
    assert!(modal_video.is_playing());

    detail.toggle_like().await.unwrap();
    assert!(detail.post().liked);
    assert_eq!(detail.post().likes, 2);

    detail.set_tab(DetailTab::Likes);
    assert_eq!(detail.visible_likes().len(), 2);

    let comment = detail.add_comment("  nice  ").await.unwrap().unwrap();
    assert_eq!(comment.id, "c-server");
    assert_eq!(comment.text, "nice");
    assert_eq!(comment.author.id, "viewer");
    assert_eq!(feed.post("post-1").unwrap().comments.len(), 1);

    drop(modal_video);
    drop(detail);
    assert!(!videos.is_modal_open());
    assert!(feed_video.is_playing());
}
