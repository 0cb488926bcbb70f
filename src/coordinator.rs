//! PlaybackCoordinator - drives the transport over a chapter timeline.
//!
//! The coordinator is the single writer of the observable playback state
//! (current chapter, chapter list, position). Consumers read it through
//! [`PlaybackCoordinator::snapshot`] or receive a fresh
//! [`PlaybackSnapshot`] on every change via [`PlaybackCoordinator::subscribe`].
//!
//! Nothing here runs on its own: transport events are fed in through
//! [`PlaybackCoordinator::handle_event`], and an external ticker calls
//! [`PlaybackCoordinator::tick`] about once a second while playing.

use crate::config::PlaybackConfig;
use crate::library::Audiobook;
use crate::persistence::{KeyValueStore, ResumeState, ResumeStore};
use crate::timeline::{Chapter, ChapterTimeline, TimelineMode};
use crate::transport::{PlayerState, QueueItem, Transport, TransportEvent};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Read-only view of the playback state.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSnapshot {
    pub state: PlayerState,
    pub is_playing: bool,
    pub book_id: Option<String>,
    pub mode: TimelineMode,
    pub chapters: Arc<[Chapter]>,
    pub chapter_index: usize,
    pub chapter_name: Option<String>,
    /// Position on the book's global timeline.
    pub position_ms: u64,
    pub duration_ms: u64,
}

pub struct PlaybackCoordinator<T, S> {
    transport: T,
    resume: ResumeStore<S>,
    config: PlaybackConfig,

    book: Option<Audiobook>,
    timeline: ChapterTimeline,
    chapters: Arc<[Chapter]>,
    state: PlayerState,
    is_playing: bool,
    chapter_index: usize,
    position_ms: u64,

    last_persist: Option<Instant>,
    subscribers: Vec<Sender<PlaybackSnapshot>>,
}

impl<T: Transport, S: KeyValueStore> PlaybackCoordinator<T, S> {
    pub fn new(transport: T, store: S, config: PlaybackConfig) -> Self {
        Self {
            transport,
            resume: ResumeStore::new(store),
            config,
            book: None,
            timeline: ChapterTimeline::default(),
            chapters: Arc::from(Vec::new()),
            state: PlayerState::Idle,
            is_playing: false,
            chapter_index: 0,
            position_ms: 0,
            last_persist: None,
            subscribers: Vec::new(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn resume_store(&self) -> &ResumeStore<S> {
        &self.resume
    }

    pub fn timeline(&self) -> &ChapterTimeline {
        &self.timeline
    }

    pub fn book(&self) -> Option<&Audiobook> {
        self.book.as_ref()
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            state: self.state,
            is_playing: self.is_playing,
            book_id: self.book.as_ref().map(|b| b.id.clone()),
            mode: self.timeline.mode(),
            chapters: Arc::clone(&self.chapters),
            chapter_index: self.chapter_index,
            chapter_name: self.current_chapter_name(),
            position_ms: self.position_ms,
            duration_ms: self.duration_ms(),
        }
    }

    /// Receive a snapshot now and after every observable change.
    pub fn subscribe(&mut self) -> Receiver<PlaybackSnapshot> {
        let (tx, rx) = unbounded();
        // A fresh channel cannot be disconnected.
        let _ = tx.send(self.snapshot());
        self.subscribers.push(tx);
        rx
    }

    fn publish(&mut self) {
        if self.subscribers.is_empty() {
            return;
        }
        let snapshot = self.snapshot();
        self.subscribers
            .retain(|tx| tx.send(snapshot.clone()).is_ok());
    }

    fn current_chapter_name(&self) -> Option<String> {
        self.book.as_ref()?;
        Some(
            self.timeline
                .chapter(self.chapter_index)
                .map(|c| c.name.clone())
                .unwrap_or_else(|| format!("File {}", self.chapter_index + 1)),
        )
    }

    fn duration_ms(&self) -> u64 {
        match self.timeline.duration_ms() {
            0 => self.transport.duration_ms(),
            total => total,
        }
    }

    /// Load `book` and position the transport at a chapter and offset.
    ///
    /// `embedded_chapters` is the single file's chapter list, parsed by the
    /// caller off the playback path; it is ignored unless the book is one
    /// file of an embedded-chapter container. With `auto_play` false the
    /// position is restored but playback stays paused.
    pub fn start(
        &mut self,
        book: Audiobook,
        chapter_index: usize,
        position_ms: u64,
        embedded_chapters: Option<Vec<Chapter>>,
        auto_play: bool,
    ) {
        let embedded = embedded_chapters
            .filter(|_| book.chaptered_file(&self.config.embedded_chapter_extensions).is_some());
        self.timeline = ChapterTimeline::build(&book.files, embedded);
        self.chapters = Arc::from(self.timeline.chapters());

        let target = self.timeline.resume_target(chapter_index, position_ms);
        info!(
            book = %book.id,
            mode = ?self.timeline.mode(),
            chapters = self.timeline.len(),
            file_index = target.file_index,
            position_ms = target.position_ms,
            auto_play,
            "starting audiobook"
        );

        let items = book
            .files
            .iter()
            .map(|f| QueueItem { uri: f.uri.clone() })
            .collect();
        self.transport.set_queue(items);
        self.transport
            .seek_to_item(target.file_index, target.position_ms);
        self.transport.prepare();
        if auto_play {
            self.transport.play();
        } else {
            self.transport.pause();
        }

        self.book = Some(book);
        self.is_playing = auto_play;
        self.position_ms = self
            .timeline
            .global_position(target.file_index, target.position_ms);
        self.chapter_index = self.chapter_at(target.file_index, self.position_ms);
        self.last_persist = Some(Instant::now());
        self.publish();
    }

    /// Start `book` from its own saved progress and play.
    pub fn play_book(&mut self, book: Audiobook, embedded_chapters: Option<Vec<Chapter>>) {
        let progress = self.resume.book_progress(&book.id).unwrap_or_else(|e| {
            warn!(book = %book.id, error = %e, "cannot read saved progress");
            ResumeState {
                audiobook_id: book.id.clone(),
                chapter_index: 0,
                position_ms: 0,
            }
        });
        self.start(
            book,
            progress.chapter_index as usize,
            progress.position_ms,
            embedded_chapters,
            true,
        );
    }

    /// Reopen the most recently played book, paused at its saved position.
    ///
    /// `embedded_chapters` is asked for the matched book's chapter list. Returns
    /// the restored state, or `None` when nothing was saved or the saved
    /// book is not in `books`.
    pub fn restore_last_played<F>(
        &mut self,
        books: &[Audiobook],
        embedded_chapters: F,
    ) -> Option<ResumeState>
    where
        F: FnOnce(&Audiobook) -> Option<Vec<Chapter>>,
    {
        let last = match self.resume.last_played() {
            Ok(last) => last?,
            Err(e) => {
                warn!(error = %e, "cannot read last played state");
                return None;
            }
        };
        let Some(book) = books.iter().find(|b| b.id == last.audiobook_id) else {
            debug!(book = %last.audiobook_id, "last played book no longer in library");
            return None;
        };

        let chapters = embedded_chapters(book);
        self.start(
            book.clone(),
            last.chapter_index as usize,
            last.position_ms,
            chapters,
            false,
        );
        Some(last)
    }

    /// Chapter for a transport position. File boundaries map items one to
    /// one; embedded chapters need the position.
    fn chapter_at(&self, file_index: usize, global_ms: u64) -> usize {
        match self.timeline.mode() {
            TimelineMode::FileBoundary => {
                file_index.min(self.timeline.len().saturating_sub(1))
            }
            TimelineMode::IntraFile => self.timeline.position_to_chapter(global_ms).index,
        }
    }

    fn transport_global_position(&self) -> u64 {
        self.timeline.global_position(
            self.transport.current_item_index(),
            self.transport.current_position_ms(),
        )
    }

    /// Feed one transport notification.
    pub fn handle_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::ItemTransitioned { index } => {
                self.position_ms = self.transport_global_position();
                self.chapter_index = self.chapter_at(index, self.position_ms);
                debug!(index, chapter = self.chapter_index, "item transition");
                self.publish();
            }
            TransportEvent::PositionDiscontinuity => {
                self.position_ms = self.transport_global_position();
                self.chapter_index =
                    self.chapter_at(self.transport.current_item_index(), self.position_ms);
                self.publish();
            }
            TransportEvent::StateChanged(state) => {
                if state != self.state {
                    self.state = state;
                    self.publish();
                }
            }
            TransportEvent::IsPlayingChanged(playing) => self.set_playing(playing),
        }
    }

    fn set_playing(&mut self, playing: bool) {
        if playing == self.is_playing {
            return;
        }
        let was_playing = self.is_playing;
        self.is_playing = playing;
        if was_playing && !playing {
            self.position_ms = self.transport_global_position();
            self.persist(Instant::now());
        }
        self.publish();
    }

    /// Progress update; call about once a second while playing.
    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    pub fn tick_at(&mut self, now: Instant) {
        if self.book.is_none() {
            return;
        }
        let playing = self.transport.is_playing();
        if playing != self.is_playing {
            self.set_playing(playing);
        }

        let position = self.transport_global_position();
        let chapter = self.chapter_at(self.transport.current_item_index(), position);
        let changed = position != self.position_ms || chapter != self.chapter_index;
        if chapter != self.chapter_index {
            debug!(from = self.chapter_index, to = chapter, "chapter changed");
            self.chapter_index = chapter;
        }
        self.position_ms = position;

        if self.is_playing {
            let due = self
                .last_persist
                .is_none_or(|last| now.duration_since(last) >= self.config.persist_interval());
            if due {
                self.persist(now);
            }
        }
        if changed {
            self.publish();
        }
    }

    /// Write resume state for the current book. Failures are logged only.
    fn persist(&mut self, now: Instant) {
        let Some(book) = &self.book else {
            return;
        };
        let state = ResumeState {
            audiobook_id: book.id.clone(),
            chapter_index: self.chapter_index as u32,
            position_ms: self
                .position_ms
                .saturating_sub(self.timeline.chapter_to_position(self.chapter_index)),
        };
        if let Err(e) = self.resume.save(&state) {
            warn!(book = %state.audiobook_id, error = %e, "dropping resume state write");
        }
        self.last_persist = Some(now);
    }

    pub fn play(&mut self) {
        if self.book.is_some() {
            self.transport.play();
            self.set_playing(true);
        }
    }

    pub fn pause(&mut self) {
        if self.book.is_some() {
            self.transport.pause();
            self.set_playing(false);
        }
    }

    /// Seek on the global timeline; clamped to `[0, duration)`.
    pub fn seek_to(&mut self, global_ms: u64) {
        if self.book.is_none() {
            return;
        }
        let global = self.timeline.check_position(global_ms).unwrap_or_else(|e| {
            debug!(error = %e, "clamping seek");
            self.timeline.clamp_position(global_ms)
        });
        let target = self.timeline.seek_target(global);
        match self.timeline.mode() {
            TimelineMode::FileBoundary => self
                .transport
                .seek_to_item(target.file_index, target.position_ms),
            TimelineMode::IntraFile => self.transport.seek_to(target.position_ms),
        }
        self.position_ms = global;
        self.chapter_index = self.chapter_at(target.file_index, global);
        self.publish();
    }

    pub fn skip_forward(&mut self) {
        self.seek_to(self.position_ms.saturating_add(self.config.skip_interval_ms));
    }

    pub fn skip_backward(&mut self) {
        self.seek_to(self.position_ms.saturating_sub(self.config.skip_interval_ms));
    }

    /// Jump to the start of a chapter; the index is clamped into range.
    pub fn seek_to_chapter(&mut self, index: usize) {
        if self.book.is_none() || self.timeline.is_empty() {
            return;
        }
        let target = self.timeline.chapter_seek_target(index);
        match self.timeline.mode() {
            TimelineMode::FileBoundary => self
                .transport
                .seek_to_item(target.file_index, target.position_ms),
            TimelineMode::IntraFile => self.transport.seek_to(target.position_ms),
        }
        self.chapter_index = index.min(self.timeline.len() - 1);
        self.position_ms = self.timeline.chapter_to_position(self.chapter_index);
        self.publish();
    }

    pub fn set_speed(&mut self, factor: f32) {
        if !factor.is_finite() || factor <= 0.0 {
            warn!(factor, "ignoring invalid playback speed");
            return;
        }
        self.transport.set_speed(factor);
    }
}
