// SPDX-License-Identifier: MPL-2.0

mod coordinator;

pub use coordinator::{
    PlaybackError, Priority, Registration, VideoCoordinator, VideoId, VideoSurface,
};
