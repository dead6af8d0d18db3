// SPDX-License-Identifier: MPL-2.0

//! Headless core of the Plaza social client: the infinite-scroll feed with
//! optimistic mutations, the post detail view state, and the coordinator
//! that keeps a single video playing at a time.

pub mod api;
pub mod config;
pub mod detail;
pub mod feed;
pub mod model;
pub mod normalize;
pub mod notice;
pub mod runtime;
pub mod state;
pub mod video;

pub use api::{ApiError, FeedApi, PlazaClient};
pub use config::Config;
pub use detail::{DetailTab, PostActions, PostDetail};
pub use feed::{FeedController, FeedError};
pub use model::{MediaItem, MediaKind, NormalizedComment, NormalizedPost, NormalizedUser};
pub use normalize::Normalizer;
pub use notice::{Notice, NoticeKind, NoticeQueue, Notifier};
pub use video::{Priority, Registration, VideoCoordinator, VideoSurface};
