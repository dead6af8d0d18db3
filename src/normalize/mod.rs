// SPDX-License-Identifier: MPL-2.0

mod adapt;
mod comment_response;
mod media;

pub use adapt::{Normalizer, content_id, fallback_id, now_iso};
pub use comment_response::{
    CommentResponse, ConfirmedComment, confirm_comment, synthesize_comment, user_to_raw,
};
pub use media::{absolutize, build_gallery};
