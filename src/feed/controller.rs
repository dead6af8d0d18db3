// SPDX-License-Identifier: MPL-2.0

use super::locks::PostLocks;
use super::pager::Pager;
use crate::api::{ApiError, FeedApi};
use crate::config::UNKNOWN_AUTHOR_NAME;
use crate::model::{NormalizedComment, NormalizedPost, NormalizedUser, resolve_id, same_id_str};
use crate::normalize::{CommentResponse, Normalizer, confirm_comment, user_to_raw};
use crate::notice::{self, Notice, Notifier};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Snapshot of the feed. Replaced as a whole on every change.
pub type PostList = Arc<Vec<Arc<NormalizedPost>>>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("viewer is not signed in")]
    NoViewer,
    #[error("post {0} is not in the feed")]
    PostNotFound(String),
    #[error("feed was unmounted")]
    Unmounted,
}

/// Compensating change applied when a mutation's network call fails.
///
/// Each variant is the inverse of one mutation, applied to the post as it is
/// when the failure lands so changes made meanwhile survive.
enum Undo {
    /// Set `user`'s like on a post back to `liked`
    Like {
        post_id: String,
        user: NormalizedUser,
        liked: bool,
    },
    /// Re-add a removed post at its old position
    Reinsert {
        index: usize,
        post: Arc<NormalizedPost>,
    },
}

#[derive(Default)]
struct FeedState {
    posts: PostList,
    pager: Pager,
    viewer: Option<NormalizedUser>,
    /// Post shown in the detail view
    open_post: Option<String>,
    /// Post id requested through a link, cleared once it fails to resolve
    deep_link: Option<String>,
}

fn find_index(posts: &[Arc<NormalizedPost>], post_id: &str) -> Option<usize> {
    posts.iter().position(|p| same_id_str(&p.id, post_id))
}

/// Whether a raw like entry refers to `user_id`.
fn raw_is_user(entry: &Value, user_id: &str) -> bool {
    resolve_id(entry).is_some_and(|id| same_id_str(&id, user_id))
        || entry
            .get("username")
            .and_then(Value::as_str)
            .is_some_and(|username| same_id_str(username, user_id))
}

/// Whether a raw comment carries `comment_id` in its current or legacy id field.
fn raw_comment_has_id(comment: &Value, comment_id: &str) -> bool {
    ["_id", "id"]
        .iter()
        .filter_map(|field| comment.get(*field))
        .filter_map(resolve_id)
        .any(|id| same_id_str(&id, comment_id))
}

/// `post` with `user`'s like set to `liked`, in both the model and the raw mirror.
///
/// `liked` on the result is derived for `viewer_id`, which need not be `user`.
fn with_like(
    post: &NormalizedPost,
    user: &NormalizedUser,
    liked: bool,
    viewer_id: Option<&str>,
) -> NormalizedPost {
    let mut next = post.clone();
    next.liked_users.retain(|u| !u.matches(&user.id));
    if liked {
        next.liked_users.push(user.clone());
    }
    next.likes = next.liked_users.len();
    next.liked = viewer_id.is_some_and(|viewer| next.is_liked_by(viewer));

    if let Some(map) = next.raw.as_object_mut() {
        let likes = map
            .entry("likes")
            .or_insert_with(|| Value::Array(Vec::new()));
        if !likes.is_array() {
            *likes = Value::Array(Vec::new());
        }
        if let Value::Array(likes) = likes {
            likes.retain(|entry| !raw_is_user(entry, &user.id));
            if liked {
                likes.push(user_to_raw(user));
            }
        }
    }

    next
}

/// Owns the feed's post collection, its windowed pagination and the
/// optimistic mutations the cards and detail view trigger.
///
/// Every change replaces the collection as a whole and is published to
/// subscribers. Mutations on one post are serialized; loads and mutations
/// interleave freely and merge by id.
pub struct FeedController {
    api: Arc<dyn FeedApi>,
    normalizer: Normalizer,
    notifier: Arc<dyn Notifier>,
    state: RwLock<FeedState>,
    posts_tx: watch::Sender<PostList>,
    locks: PostLocks,
    mounted: AtomicBool,
}

impl FeedController {
    pub fn new(api: Arc<dyn FeedApi>, normalizer: Normalizer, notifier: Arc<dyn Notifier>) -> Self {
        let (posts_tx, _) = watch::channel(PostList::default());
        Self {
            api,
            normalizer,
            notifier,
            state: RwLock::new(FeedState::default()),
            posts_tx,
            locks: PostLocks::new(),
            mounted: AtomicBool::new(true),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, FeedState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, FeedState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &mut FeedState, posts: Vec<Arc<NormalizedPost>>) {
        let list = Arc::new(posts);
        state.posts = list.clone();
        self.posts_tx.send_replace(list);
    }

    pub fn posts(&self) -> PostList {
        self.read().posts.clone()
    }

    pub fn post(&self, post_id: &str) -> Option<Arc<NormalizedPost>> {
        let state = self.read();
        find_index(&state.posts, post_id).map(|i| state.posts[i].clone())
    }

    pub fn len(&self) -> usize {
        self.read().posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Receive every replacement of the collection.
    pub fn subscribe(&self) -> watch::Receiver<PostList> {
        self.posts_tx.subscribe()
    }

    pub fn has_more(&self) -> bool {
        self.read().pager.has_more()
    }

    pub fn is_loading(&self) -> bool {
        self.read().pager.is_loading()
    }

    pub fn viewer(&self) -> Option<NormalizedUser> {
        self.read().viewer.clone()
    }

    pub fn deep_link(&self) -> Option<String> {
        self.read().deep_link.clone()
    }

    /// Stop applying results; anything still in flight is dropped when it lands.
    pub fn unmount(&self) {
        self.mounted.store(false, Ordering::SeqCst);
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }

    fn ensure_mounted(&self) -> Result<(), FeedError> {
        if self.is_mounted() {
            Ok(())
        } else {
            Err(FeedError::Unmounted)
        }
    }

    fn notify_error(&self, message: &str) {
        if self.is_mounted() {
            self.notifier.notify(Notice::error(message));
        }
    }

    /// Append `incoming` posts whose ids are not already present.
    ///
    /// First seen wins, so a post that reappears keeps its position and any
    /// local changes.
    fn merge(
        &self,
        state: &mut FeedState,
        incoming: impl IntoIterator<Item = NormalizedPost>,
    ) -> usize {
        let mut seen: HashSet<String> = state.posts.iter().map(|p| p.id.to_lowercase()).collect();
        let mut next = state.posts.to_vec();
        let before = next.len();

        for post in incoming {
            if seen.insert(post.id.to_lowercase()) {
                next.push(Arc::new(post));
            }
        }

        let added = next.len() - before;
        if added > 0 {
            self.publish(state, next);
        }
        added
    }

    /// Load the next window of posts. Returns how many new posts were added.
    ///
    /// Does nothing while a load is in flight or once the feed is exhausted.
    pub async fn load_more(&self) -> Result<usize, FeedError> {
        let Some(ticket) = self.write().pager.begin() else {
            return Ok(0);
        };
        debug!(page = ticket.page, "loading feed window");

        let result = self.api.fetch_posts().await;
        if let Err(e) = self.ensure_mounted() {
            self.write().pager.fail(ticket);
            return Err(e);
        }

        let all = match result {
            Ok(all) => all,
            Err(e) => {
                self.write().pager.fail(ticket);
                warn!(page = ticket.page, error = %e, "failed to load feed window");
                self.notify_error(notice::MSG_FEED_LOAD_FAILED);
                return Err(e.into());
            }
        };

        let chunk = Pager::slice(&all, ticket.page);
        let mut state = self.write();
        if !state.pager.finish(ticket, chunk.len()) {
            debug!(page = ticket.page, "dropping window loaded before refresh");
            return Ok(0);
        }

        let viewer_id = state.viewer.as_ref().map(|v| v.id.clone());
        let adapted = chunk
            .iter()
            .map(|raw| self.normalizer.adapt_post(raw, viewer_id.as_deref()));
        let added = self.merge(&mut state, adapted);

        debug!(
            page = ticket.page,
            chunk = chunk.len(),
            added,
            has_more = state.pager.has_more(),
            "feed window loaded"
        );
        Ok(added)
    }

    /// Drop everything and load the first window again.
    pub async fn refresh(&self) -> Result<usize, FeedError> {
        {
            let mut state = self.write();
            state.pager.reset();
            self.publish(&mut state, Vec::new());
        }
        self.load_more().await
    }

    /// Re-adapt `post` from its raw payload for `viewer_id`, keeping ids stable.
    fn rederive(&self, post: &NormalizedPost, viewer_id: Option<&str>) -> NormalizedPost {
        let mut fresh = self.normalizer.adapt_post(&post.raw, viewer_id);
        fresh.id = post.id.clone();
        // Comments without a server id get new fallback ids on every adaptation
        if fresh.comments.len() == post.comments.len() {
            for (fresh, old) in fresh.comments.iter_mut().zip(&post.comments) {
                fresh.id = old.id.clone();
            }
        }
        fresh
    }

    /// Change the viewer and re-derive every post's like state from its raw payload.
    pub fn set_viewer(&self, viewer: Option<NormalizedUser>) {
        let mut state = self.write();
        let unchanged = match (&state.viewer, &viewer) {
            (Some(old), Some(new)) => same_id_str(&old.id, &new.id),
            (None, None) => true,
            _ => false,
        };
        state.viewer = viewer;
        if unchanged {
            return;
        }

        let viewer_id = state.viewer.as_ref().map(|v| v.id.clone());
        debug!(viewer = ?viewer_id, posts = state.posts.len(), "re-deriving feed for viewer");
        let next = state
            .posts
            .iter()
            .map(|p| Arc::new(self.rederive(p, viewer_id.as_deref())))
            .collect();
        self.publish(&mut state, next);
    }

    /// Fetch the signed-in user and reconcile the feed against them.
    pub async fn load_viewer(&self) -> Result<NormalizedUser, FeedError> {
        let raw = self
            .api
            .fetch_me()
            .await
            .inspect_err(|e| warn!(error = %e, "failed to fetch current user"))?;
        self.ensure_mounted()?;

        let viewer = self.normalizer.adapt_user(&raw, UNKNOWN_AUTHOR_NAME);
        self.set_viewer(Some(viewer.clone()));
        Ok(viewer)
    }

    fn require_viewer(&self) -> Result<NormalizedUser, FeedError> {
        self.viewer().ok_or_else(|| {
            self.notify_error(notice::MSG_SIGN_IN_REQUIRED);
            FeedError::NoViewer
        })
    }

    /// Undo a failed optimistic mutation and tell the user.
    ///
    /// The single recovery path for every optimistic mutation.
    fn fail_mutation(&self, undo: Undo, message: &str) {
        if !self.is_mounted() {
            return;
        }

        let mut state = self.write();
        let viewer_id = state.viewer.as_ref().map(|v| v.id.clone());
        let mut next = state.posts.to_vec();
        let applied = match undo {
            Undo::Like {
                post_id,
                user,
                liked,
            } => match find_index(&next, &post_id) {
                Some(index) => {
                    let reverted = with_like(&next[index], &user, liked, viewer_id.as_deref());
                    next[index] = Arc::new(reverted);
                    true
                }
                None => false,
            },
            Undo::Reinsert { index, post } => {
                if find_index(&next, &post.id).is_none() {
                    // The viewer may have changed while the post was gone
                    let restored = self.rederive(&post, viewer_id.as_deref());
                    next.insert(index.min(next.len()), Arc::new(restored));
                    true
                } else {
                    false
                }
            }
        };
        if applied {
            self.publish(&mut state, next);
        } else {
            debug!("nothing to roll back, post changed meanwhile");
        }
        drop(state);

        self.notifier.notify(Notice::error(message));
    }

    /// Flip the viewer's like on a post, then tell the server.
    ///
    /// The change shows immediately and is rolled back if the call fails.
    pub async fn toggle_like(&self, post_id: &str) -> Result<Arc<NormalizedPost>, FeedError> {
        let viewer = self.require_viewer()?;
        let _guard = self.locks.acquire(post_id).await;

        let (undo, updated) = {
            let mut state = self.write();
            let index = find_index(&state.posts, post_id)
                .ok_or_else(|| FeedError::PostNotFound(post_id.to_string()))?;
            let current = state.posts[index].clone();
            let was_liked = current.is_liked_by(&viewer.id);
            let updated = with_like(&current, &viewer, !was_liked, Some(viewer.id.as_str()));
            let updated = Arc::new(updated);
            let mut next = state.posts.to_vec();
            next[index] = updated.clone();
            self.publish(&mut state, next);
            let undo = Undo::Like {
                post_id: current.id.clone(),
                user: viewer,
                liked: was_liked,
            };
            (undo, updated)
        };
        debug!(post_id, liked = updated.liked, likes = updated.likes, "like applied locally");

        match self.api.like_post(&updated.id).await {
            Ok(()) => Ok(updated),
            Err(e) => {
                warn!(post_id, error = %e, "like failed, rolling back");
                self.fail_mutation(undo, notice::MSG_LIKE_FAILED);
                Err(e.into())
            }
        }
    }

    /// Post a comment and append what the server confirms.
    ///
    /// Blank text is ignored. Returns the appended comment.
    pub async fn add_comment(
        &self,
        post_id: &str,
        text: &str,
    ) -> Result<Option<NormalizedComment>, FeedError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }
        let viewer = self.require_viewer()?;
        let _guard = self.locks.acquire(post_id).await;

        let result = self.api.comment_on_post(post_id, text).await;
        let payload = match result {
            Ok(payload) => payload,
            Err(e) => {
                warn!(post_id, error = %e, "failed to add comment");
                self.notify_error(notice::MSG_COMMENT_FAILED);
                return Err(e.into());
            }
        };
        self.ensure_mounted()?;

        let response = CommentResponse::classify(&payload);
        let confirmed = confirm_comment(&self.normalizer, response, text, &viewer);

        let mut state = self.write();
        match find_index(&state.posts, post_id) {
            Some(index) => {
                let mut post = (*state.posts[index]).clone();
                post.comments.push(confirmed.comment.clone());
                if let Some(map) = post.raw.as_object_mut() {
                    let comments = map
                        .entry("comments")
                        .or_insert_with(|| Value::Array(Vec::new()));
                    match comments {
                        Value::Array(comments) => comments.push(confirmed.raw),
                        other => *other = Value::Array(vec![confirmed.raw]),
                    }
                }
                let mut next = state.posts.to_vec();
                next[index] = Arc::new(post);
                self.publish(&mut state, next);
            }
            None => debug!(post_id, "commented post is no longer in the feed"),
        }

        Ok(Some(confirmed.comment))
    }

    /// Delete a comment on the server, then drop it locally.
    pub async fn delete_comment(&self, post_id: &str, comment_id: &str) -> Result<(), FeedError> {
        let _guard = self.locks.acquire(post_id).await;

        if let Err(e) = self.api.delete_comment(post_id, comment_id).await {
            warn!(post_id, comment_id, error = %e, "failed to delete comment");
            self.notify_error(notice::MSG_COMMENT_DELETE_FAILED);
            return Err(e.into());
        }
        self.ensure_mounted()?;

        let mut state = self.write();
        let Some(index) = find_index(&state.posts, post_id) else {
            return Ok(());
        };
        let mut post = (*state.posts[index]).clone();
        post.comments.retain(|c| !same_id_str(&c.id, comment_id));
        if let Some(comments) = post.raw.get_mut("comments").and_then(Value::as_array_mut) {
            comments.retain(|c| !raw_comment_has_id(c, comment_id));
        }
        let mut next = state.posts.to_vec();
        next[index] = Arc::new(post);
        self.publish(&mut state, next);
        Ok(())
    }

    /// Remove a post right away and delete it on the server.
    ///
    /// Closes the detail view if it shows this post. A failed call puts the
    /// post back where it was.
    pub async fn delete_post(&self, post_id: &str) -> Result<(), FeedError> {
        let _guard = self.locks.acquire(post_id).await;

        let undo = {
            let mut state = self.write();
            let index = find_index(&state.posts, post_id)
                .ok_or_else(|| FeedError::PostNotFound(post_id.to_string()))?;
            let mut next = state.posts.to_vec();
            let post = next.remove(index);
            let was_open = state
                .open_post
                .as_deref()
                .is_some_and(|open| same_id_str(open, &post.id));
            if was_open {
                state.open_post = None;
                state.deep_link = None;
            }
            self.publish(&mut state, next);
            Undo::Reinsert { index, post }
        };

        match self.api.delete_post(post_id).await {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(post_id, error = %e, "failed to delete post, restoring it");
                self.fail_mutation(undo, notice::MSG_POST_DELETE_FAILED);
                Err(e.into())
            }
        }
    }

    /// Show a post from the feed in the detail view.
    pub fn open_post(&self, post_id: &str) -> Option<Arc<NormalizedPost>> {
        let mut state = self.write();
        let post = find_index(&state.posts, post_id).map(|i| state.posts[i].clone())?;
        state.open_post = Some(post.id.clone());
        Some(post)
    }

    pub fn close_post(&self) {
        let mut state = self.write();
        state.open_post = None;
        state.deep_link = None;
    }

    /// The post currently shown in the detail view, as it is now.
    pub fn opened_post(&self) -> Option<Arc<NormalizedPost>> {
        let state = self.read();
        let open = state.open_post.as_deref()?;
        find_index(&state.posts, open).map(|i| state.posts[i].clone())
    }

    /// Open a post by id from a link, fetching it if the feed does not have it.
    ///
    /// A link that cannot be resolved is cleared so it is not retried.
    pub async fn open_deep_link(&self, post_id: &str) -> Result<Arc<NormalizedPost>, FeedError> {
        self.write().deep_link = Some(post_id.to_string());
        if let Some(post) = self.open_post(post_id) {
            return Ok(post);
        }

        let result = self.api.fetch_single_post(post_id).await;
        self.ensure_mounted()?;

        let raw = match result {
            Ok(raw) => raw,
            Err(e) => {
                warn!(post_id, error = %e, "linked post could not be loaded");
                self.write().deep_link = None;
                self.notify_error(notice::MSG_POST_NOT_FOUND);
                return Err(e.into());
            }
        };

        let mut state = self.write();
        let viewer_id = state.viewer.as_ref().map(|v| v.id.clone());
        let adapted = self.normalizer.adapt_post(&raw, viewer_id.as_deref());
        let id = adapted.id.clone();
        self.merge(&mut state, [adapted]);

        let post = find_index(&state.posts, &id)
            .map(|i| state.posts[i].clone())
            .ok_or(FeedError::PostNotFound(id))?;
        state.open_post = Some(post.id.clone());
        Ok(post)
    }
}
