// SPDX-License-Identifier: MPL-2.0

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("autoplay was blocked")]
    Blocked,
    #[error("playback failed: {0}")]
    Failed(String),
}

/// A video element some view has mounted.
///
/// Implemented by the rendering layer; the coordinator only tells it to play
/// or pause and asks where it sits.
pub trait VideoSurface: Send + Sync {
    fn play(&self) -> Result<(), PlaybackError>;
    fn pause(&self);
    /// Vertical centre of the element in viewport pixels, measured from the top
    fn vertical_center(&self) -> f64;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Priority {
    /// Feed card
    Normal,
    /// Post detail carousel; wins while the modal is open
    Modal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VideoId(u64);

struct Entry {
    surface: Arc<dyn VideoSurface>,
    priority: Priority,
    visible: bool,
}

enum Action {
    Pause(Arc<dyn VideoSurface>),
    Play(VideoId, Arc<dyn VideoSurface>),
}

struct Registry {
    entries: HashMap<VideoId, Entry>,
    playing: Option<VideoId>,
    modal_open: bool,
    autoplay: bool,
    viewport_height: f64,
    next_id: u64,
}

impl Registry {
    fn pause_current(&mut self, actions: &mut Vec<Action>) {
        if let Some(entry) = self.playing.take().and_then(|id| self.entries.get(&id)) {
            actions.push(Action::Pause(entry.surface.clone()));
        }
    }

    /// Pick the visible candidate closest to the viewport centre.
    fn select(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();
        if !self.autoplay {
            self.pause_current(&mut actions);
            return actions;
        }

        let center = self.viewport_height / 2.0;
        let modal_open = self.modal_open;
        let best = self
            .entries
            .iter()
            .filter(|(_, e)| e.visible && (!modal_open || e.priority == Priority::Modal))
            .map(|(id, e)| (*id, (e.surface.vertical_center() - center).abs()))
            .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));

        match best {
            None => self.pause_current(&mut actions),
            Some((id, _)) if self.playing == Some(id) => {}
            Some((id, distance)) => {
                self.pause_current(&mut actions);
                if let Some(entry) = self.entries.get(&id) {
                    debug!(?id, distance, "switching playback");
                    self.playing = Some(id);
                    actions.push(Action::Play(id, entry.surface.clone()));
                }
            }
        }
        actions
    }
}

/// Makes sure at most one video plays across the whole app.
///
/// Created once at startup and shared by every view that mounts videos. On
/// each visibility change the visible video nearest the viewport centre
/// plays; while the post modal is open only modal videos are considered.
///
/// Surfaces are called after the registry lock is released, so a surface may
/// call back into the coordinator from `play` or `pause`.
pub struct VideoCoordinator {
    registry: Mutex<Registry>,
}

impl VideoCoordinator {
    pub fn new(viewport_height: f64) -> Arc<Self> {
        Arc::new(Self {
            registry: Mutex::new(Registry {
                entries: HashMap::new(),
                playing: None,
                modal_open: false,
                autoplay: true,
                viewport_height,
                next_id: 0,
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn run(&self, actions: Vec<Action>) {
        for action in actions {
            match action {
                Action::Pause(surface) => surface.pause(),
                Action::Play(id, surface) => {
                    // A pause above may have unregistered it or started another
                    let still_current = {
                        let registry = self.lock();
                        registry.playing == Some(id) && registry.entries.contains_key(&id)
                    };
                    if !still_current {
                        debug!(?id, "skipping playback of a video that is gone");
                        continue;
                    }
                    if let Err(e) = surface.play() {
                        warn!(?id, error = %e, "video playback did not start");
                    }
                }
            }
        }
    }

    /// Track a newly mounted video. It starts hidden.
    ///
    /// The returned registration unregisters the video when dropped.
    pub fn register(
        self: &Arc<Self>,
        surface: Arc<dyn VideoSurface>,
        priority: Priority,
    ) -> Registration {
        let id = {
            let mut registry = self.lock();
            let id = VideoId(registry.next_id);
            registry.next_id += 1;
            registry.entries.insert(
                id,
                Entry {
                    surface,
                    priority,
                    visible: false,
                },
            );
            id
        };
        debug!(?id, ?priority, "video registered");
        Registration {
            id,
            coordinator: Arc::downgrade(self),
        }
    }

    /// Forget a video. If it was playing it is paused and nothing else starts
    /// until the next visibility change.
    pub fn unregister(&self, id: VideoId) {
        let removed = {
            let mut registry = self.lock();
            let entry = registry.entries.remove(&id);
            if registry.playing == Some(id) {
                registry.playing = None;
                entry.map(|e| e.surface)
            } else {
                None
            }
        };
        if let Some(surface) = removed {
            surface.pause();
        }
        debug!(?id, "video unregistered");
    }

    pub fn update_visibility(&self, id: VideoId, visible: bool) {
        let actions = {
            let mut registry = self.lock();
            match registry.entries.get_mut(&id) {
                Some(entry) => entry.visible = visible,
                None => {
                    debug!(?id, "visibility update for unknown video");
                    return;
                }
            }
            registry.select()
        };
        self.run(actions);
    }

    /// Opening pauses every feed video at once so a modal video can take over.
    pub fn set_modal_open(&self, open: bool) {
        let actions = {
            let mut registry = self.lock();
            registry.modal_open = open;
            let mut actions = Vec::new();
            if open {
                for entry in registry.entries.values() {
                    if entry.priority == Priority::Normal {
                        actions.push(Action::Pause(entry.surface.clone()));
                    }
                }
                let playing_normal = registry
                    .playing
                    .and_then(|id| registry.entries.get(&id))
                    .is_some_and(|e| e.priority == Priority::Normal);
                if playing_normal {
                    registry.playing = None;
                }
            }
            actions.extend(registry.select());
            actions
        };
        self.run(actions);
    }

    pub fn set_viewport_height(&self, height: f64) {
        let actions = {
            let mut registry = self.lock();
            registry.viewport_height = height;
            registry.select()
        };
        self.run(actions);
    }

    /// With autoplay off nothing is started and the current video is paused.
    pub fn set_autoplay(&self, enabled: bool) {
        let actions = {
            let mut registry = self.lock();
            registry.autoplay = enabled;
            registry.select()
        };
        self.run(actions);
    }

    /// Pause everything, e.g. on navigation.
    pub fn pause_all(&self) {
        let surfaces: Vec<Arc<dyn VideoSurface>> = {
            let mut registry = self.lock();
            registry.playing = None;
            registry.entries.values().map(|e| e.surface.clone()).collect()
        };
        for surface in surfaces {
            surface.pause();
        }
    }

    /// Stop all playback and forget every video.
    pub fn shutdown(&self) {
        self.pause_all();
        self.lock().entries.clear();
        debug!("video coordinator shut down");
    }

    pub fn playing(&self) -> Option<VideoId> {
        self.lock().playing
    }

    pub fn is_modal_open(&self) -> bool {
        self.lock().modal_open
    }

    pub fn registered(&self) -> usize {
        self.lock().entries.len()
    }
}

/// A mounted video's link to the coordinator.
///
/// Views report visibility through it; dropping it unregisters the video.
pub struct Registration {
    id: VideoId,
    coordinator: Weak<VideoCoordinator>,
}

impl Registration {
    pub fn id(&self) -> VideoId {
        self.id
    }

    pub fn report_visible(&self) {
        if let Some(coordinator) = self.coordinator.upgrade() {
            coordinator.update_visibility(self.id, true);
        }
    }

    pub fn report_hidden(&self) {
        if let Some(coordinator) = self.coordinator.upgrade() {
            coordinator.update_visibility(self.id, false);
        }
    }

    pub fn is_playing(&self) -> bool {
        self.coordinator
            .upgrade()
            .is_some_and(|c| c.playing() == Some(self.id))
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        if let Some(coordinator) = self.coordinator.upgrade() {
            coordinator.unregister(self.id);
        }
    }
}
