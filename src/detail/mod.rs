// SPDX-License-Identifier: MPL-2.0

mod carousel;
mod likes;

pub use carousel::Carousel;
pub use likes::{LikesPager, ScrollMetrics};

use crate::feed::{FeedController, FeedError};
use crate::model::{MediaItem, NormalizedComment, NormalizedPost, NormalizedUser};
use crate::video::VideoCoordinator;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

/// Mutations the detail view borrows from whoever owns the post collection.
#[async_trait]
pub trait PostActions: Send + Sync {
    async fn toggle_like(&self, post_id: &str) -> Result<Arc<NormalizedPost>, FeedError>;

    async fn add_comment(
        &self,
        post_id: &str,
        text: &str,
    ) -> Result<Option<NormalizedComment>, FeedError>;

    async fn delete_comment(&self, post_id: &str, comment_id: &str) -> Result<(), FeedError>;

    /// Latest version of a post, `None` once it is gone.
    fn current(&self, post_id: &str) -> Option<Arc<NormalizedPost>>;
}

#[async_trait]
impl PostActions for FeedController {
    async fn toggle_like(&self, post_id: &str) -> Result<Arc<NormalizedPost>, FeedError> {
        FeedController::toggle_like(self, post_id).await
    }

    async fn add_comment(
        &self,
        post_id: &str,
        text: &str,
    ) -> Result<Option<NormalizedComment>, FeedError> {
        FeedController::add_comment(self, post_id, text).await
    }

    async fn delete_comment(&self, post_id: &str, comment_id: &str) -> Result<(), FeedError> {
        FeedController::delete_comment(self, post_id, comment_id).await
    }

    fn current(&self, post_id: &str) -> Option<Arc<NormalizedPost>> {
        self.post(post_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetailTab {
    #[default]
    Comments,
    Likes,
}

/// State behind the post modal: gallery carousel, liked-by list and comments.
///
/// Owns no network calls of its own. While it is alive the video coordinator
/// is in modal mode.
pub struct PostDetail {
    post: Arc<NormalizedPost>,
    actions: Arc<dyn PostActions>,
    videos: Option<Arc<VideoCoordinator>>,
    carousel: Carousel,
    likes: LikesPager,
    tab: DetailTab,
}

impl PostDetail {
    pub fn open(
        post: Arc<NormalizedPost>,
        actions: Arc<dyn PostActions>,
        videos: Option<Arc<VideoCoordinator>>,
        likes_page_size: usize,
    ) -> Self {
        if let Some(videos) = &videos {
            videos.set_modal_open(true);
        }
        Self {
            carousel: Carousel::new(post.media_gallery.len()),
            likes: LikesPager::new(likes_page_size),
            post,
            actions,
            videos,
            tab: DetailTab::default(),
        }
    }

    pub fn post(&self) -> &Arc<NormalizedPost> {
        &self.post
    }

    pub fn tab(&self) -> DetailTab {
        self.tab
    }

    pub fn set_tab(&mut self, tab: DetailTab) {
        if tab == DetailTab::Likes && self.tab != DetailTab::Likes {
            self.likes.reset();
        }
        self.tab = tab;
    }

    pub fn gallery(&self) -> &[MediaItem] {
        &self.post.media_gallery
    }

    pub fn carousel(&self) -> &Carousel {
        &self.carousel
    }

    pub fn carousel_mut(&mut self) -> &mut Carousel {
        &mut self.carousel
    }

    pub fn current_media(&self) -> Option<&MediaItem> {
        self.post.media_gallery.get(self.carousel.index())
    }

    pub fn comments(&self) -> &[NormalizedComment] {
        &self.post.comments
    }

    /// Liked-by users revealed so far.
    pub fn visible_likes(&self) -> &[NormalizedUser] {
        let total = self.post.liked_users.len();
        &self.post.liked_users[..self.likes.visible(total)]
    }

    pub fn has_more_likes(&self) -> bool {
        self.likes.has_more(self.post.liked_users.len())
    }

    pub fn load_more_likes(&mut self) -> bool {
        self.likes.load_more(self.post.liked_users.len())
    }

    pub fn on_likes_scroll(&mut self, metrics: ScrollMetrics, now: Instant) -> bool {
        self.likes
            .on_scroll(metrics, self.post.liked_users.len(), now)
    }

    fn replace_post(&mut self, post: Arc<NormalizedPost>) {
        self.carousel.resize(post.media_gallery.len());
        self.post = post;
    }

    /// Pick up the latest version of the post. Returns false once it is gone.
    pub fn sync(&mut self) -> bool {
        match self.actions.current(&self.post.id) {
            Some(post) => {
                self.replace_post(post);
                true
            }
            None => false,
        }
    }

    pub async fn toggle_like(&mut self) -> Result<(), FeedError> {
        let result = self.actions.toggle_like(&self.post.id).await;
        // Success or rollback, the owner now has the truth
        self.sync();
        result.map(|_| ())
    }

    pub async fn add_comment(&mut self, text: &str) -> Result<Option<NormalizedComment>, FeedError> {
        let comment = self.actions.add_comment(&self.post.id, text).await?;
        self.sync();
        Ok(comment)
    }

    pub async fn delete_comment(&mut self, comment_id: &str) -> Result<(), FeedError> {
        self.actions.delete_comment(&self.post.id, comment_id).await?;
        self.sync();
        Ok(())
    }
}

impl Drop for PostDetail {
    fn drop(&mut self) {
        if let Some(videos) = &self.videos {
            videos.set_modal_open(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::FakeApi;
    use crate::normalize::Normalizer;
    use crate::notice::NoticeQueue;
    use serde_json::json;

    async fn feed_with(post: serde_json::Value) -> Arc<FeedController> {
        let api = Arc::new(FakeApi::with_posts(vec![post]));
        let feed = Arc::new(FeedController::new(
            api,
            Normalizer::new("https://x.test"),
            Arc::new(NoticeQueue::new()),
        ));
        feed.load_more().await.unwrap();
        feed.load_viewer().await.unwrap();
        feed
    }

    #[tokio::test]
    async fn test_likes_revealed_in_chunks() {
        let likes: Vec<String> = (0..30).map(|i| format!("u{i}")).collect();
        let feed = feed_with(json!({ "_id": "a", "likes": likes })).await;
        let post = feed.post("a").unwrap();
        let mut detail = PostDetail::open(post, feed.clone(), None, 12);

        detail.set_tab(DetailTab::Likes);
        assert_eq!(detail.visible_likes().len(), 12);
        assert!(detail.load_more_likes());
        assert!(detail.load_more_likes());
        assert_eq!(detail.visible_likes().len(), 30);
        assert!(!detail.has_more_likes());
    }

    #[tokio::test]
    async fn test_mutations_go_through_feed() {
        let feed = feed_with(json!({
            "_id": "a",
            "images": ["/1.jpg", "/2.jpg"],
            "likes": []
        }))
        .await;
        let mut detail = PostDetail::open(feed.post("a").unwrap(), feed.clone(), None, 12);
        assert!(detail.carousel().has_controls());

        detail.toggle_like().await.unwrap();
        assert!(detail.post().liked);
        assert!(feed.post("a").unwrap().liked);

        let comment = detail.add_comment("hey").await.unwrap().unwrap();
        assert_eq!(detail.comments().len(), 1);

        detail.delete_comment(&comment.id).await.unwrap();
        assert!(detail.comments().is_empty());
    }

    #[tokio::test]
    async fn test_sync_reports_deleted_post() {
        let feed = feed_with(json!({ "_id": "a" })).await;
        let mut detail = PostDetail::open(feed.post("a").unwrap(), feed.clone(), None, 12);
        feed.delete_post("a").await.unwrap();
        assert!(!detail.sync());
    }

    #[tokio::test]
    async fn test_modal_mode_follows_detail_lifetime() {
        let feed = feed_with(json!({ "_id": "a" })).await;
        let videos = VideoCoordinator::new(800.0);
        let detail = PostDetail::open(
            feed.post("a").unwrap(),
            feed.clone(),
            Some(videos.clone()),
            12,
        );
        assert!(videos.is_modal_open());
        drop(detail);
        assert!(!videos.is_modal_open());
    }
}
