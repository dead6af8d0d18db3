// SPDX-License-Identifier: MPL-2.0

mod controller;
mod locks;
mod pager;

pub use controller::{FeedController, FeedError, PostList};
pub use locks::PostLocks;
pub use pager::{PageTicket, Pager};
