//! The audio transport the coordinator drives.
//!
//! Decoding and rendering live behind this trait. The coordinator is its
//! only caller and treats every command as fire-and-forget: a new seek
//! supersedes any in-flight one.

use serde::{Deserialize, Serialize};

/// Transport lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlayerState {
    #[default]
    Idle,
    Buffering,
    Ready,
    Ended,
}

/// Notifications emitted by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportEvent {
    /// Playback moved to another queue item.
    ItemTransitioned { index: usize },
    /// Position jumped (seek, item change, or error recovery).
    PositionDiscontinuity,
    StateChanged(PlayerState),
    IsPlayingChanged(bool),
}

/// One queued media item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueItem {
    pub uri: String,
}

pub trait Transport {
    fn set_queue(&mut self, items: Vec<QueueItem>);
    fn prepare(&mut self);
    fn play(&mut self);
    fn pause(&mut self);
    /// Seek to `position_ms` inside queue item `item_index`.
    fn seek_to_item(&mut self, item_index: usize, position_ms: u64);
    /// Seek within the current item.
    fn seek_to(&mut self, position_ms: u64);
    fn set_speed(&mut self, factor: f32);

    fn current_item_index(&self) -> usize;
    /// Position inside the current item.
    fn current_position_ms(&self) -> u64;
    /// Duration of the current item; zero when unknown.
    fn duration_ms(&self) -> u64;
    fn is_playing(&self) -> bool;
}
