// SPDX-License-Identifier: MPL-2.0

//! Short-lived user-facing notifications (toasts).

use std::collections::VecDeque;
use std::sync::Mutex;

pub const MSG_FEED_LOAD_FAILED: &str = "Couldn't load posts. Pull to try again.";
pub const MSG_LIKE_FAILED: &str = "Couldn't update your like.";
pub const MSG_COMMENT_FAILED: &str = "Couldn't post your comment.";
pub const MSG_COMMENT_DELETE_FAILED: &str = "Couldn't delete the comment.";
pub const MSG_POST_DELETE_FAILED: &str = "Couldn't delete the post.";
pub const MSG_POST_NOT_FOUND: &str = "This post is no longer available.";
pub const MSG_SIGN_IN_REQUIRED: &str = "Sign in to do that.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Info,
            message: message.into(),
        }
    }
}

/// Sink the UI shell implements to show toasts.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Buffers notices until the shell drains them.
#[derive(Default)]
pub struct NoticeQueue {
    pending: Mutex<VecDeque<Notice>>,
}

impl NoticeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Vec<Notice> {
        self.pending
            .lock()
            .map(|mut pending| pending.drain(..).collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.pending.lock().map(|p| p.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Notifier for NoticeQueue {
    fn notify(&self, notice: Notice) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.push_back(notice);
        }
    }
}
