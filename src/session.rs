use crate::audio::{AudioDecoder, AudioOutput};
use crate::config::Settings;
use crate::display::{Display, truncate_chars};
use crate::error::NotFoundError;
use crate::input::{InputEvent, InputSource};
use crate::library::MetadataReader;
use crate::model::{PlayStatus, SecondRow, Track};
use crate::playlist::Playlist;
use crate::transport::{TransportHandle, TransportState};
use crate::worker::{WorkerOutcome, spawn_worker};
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub const NOTE: char = '\u{266a}';
pub const FAREWELL: &str = "Good Bye!";

/// Current position in the playlist. Always sits on a populated index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionCursor {
    index: u32,
}

impl SessionCursor {
    /// Starts at the first populated index; `None` for an empty playlist.
    pub fn new(playlist: &Playlist) -> Option<Self> {
        playlist.first_index().map(|index| Self { index })
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    /// Moves to the next populated index. Returns false, without moving, at
    /// the last one.
    pub fn try_next(&mut self, playlist: &Playlist) -> bool {
        match playlist.index_after(self.index) {
            Some(index) => {
                self.index = index;
                true
            }
            None => false,
        }
    }

    pub fn try_previous(&mut self, playlist: &Playlist) -> bool {
        match playlist.index_before(self.index) {
            Some(index) => {
                self.index = index;
                true
            }
            None => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub poll_interval: Duration,
    pub second_row: SecondRow,
    pub farewell: Duration,
    pub title_width: usize,
}

impl SessionOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            poll_interval: settings.input_poll(),
            second_row: settings.second_row,
            farewell: settings.farewell(),
            title_width: settings.title_width,
        }
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionReport {
    /// Every track that was started, in order.
    pub played: Vec<PathBuf>,
    pub failed: usize,
}

pub struct Session {
    playlist: Playlist,
    transport: TransportHandle,
    decoder: Arc<dyn AudioDecoder>,
    output: Arc<dyn AudioOutput>,
    metadata: Box<dyn MetadataReader>,
    options: SessionOptions,
    second_row: SecondRow,
}

impl Session {
    pub fn new(
        playlist: Playlist,
        decoder: Arc<dyn AudioDecoder>,
        output: Arc<dyn AudioOutput>,
        metadata: Box<dyn MetadataReader>,
        options: SessionOptions,
    ) -> Self {
        let second_row = options.second_row;
        Self {
            playlist,
            transport: TransportState::shared(),
            decoder,
            output,
            metadata,
            options,
            second_row,
        }
    }

    pub fn transport(&self) -> TransportHandle {
        Arc::clone(&self.transport)
    }

    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    /// Plays the playlist from its first index until it runs out or a quit
    /// arrives.
    pub fn run(
        &mut self,
        input: &mut dyn InputSource,
        display: &mut dyn Display,
    ) -> Result<SessionReport> {
        let mut report = SessionReport::default();
        let Some(mut cursor) = SessionCursor::new(&self.playlist) else {
            info!("playlist is empty, nothing to play");
            self.farewell(display);
            return Ok(report);
        };

        loop {
            let track = match self.resolve(cursor.index()) {
                Ok(track) => track,
                Err(err) => {
                    debug!(error = %err, "session index left the playlist");
                    break;
                }
            };
            info!(index = cursor.index(), path = %track.path.display(), "starting track");
            report.played.push(track.path.clone());
            self.transport.load(track.clone());
            self.show_now_playing(display, &track);

            let handle = spawn_worker(
                track,
                Arc::clone(&self.transport),
                Arc::clone(&self.decoder),
                Arc::clone(&self.output),
            )
            .context("failed to start playback worker")?;

            if let Err(err) = self.pump_input(&mut cursor, &handle, input, display) {
                self.transport.request_quit();
                let _ = handle.join();
                return Err(err);
            }

            match handle.join() {
                Ok(WorkerOutcome::Failed(_)) => report.failed += 1,
                Ok(_) => {}
                Err(_) => {
                    error!("playback worker panicked");
                    report.failed += 1;
                }
            }

            match self.transport.acknowledge_finished() {
                PlayStatus::Quitting => {
                    info!("quit requested");
                    break;
                }
                PlayStatus::NextRequested | PlayStatus::PreviousRequested => {}
                PlayStatus::Playing | PlayStatus::Paused => {
                    if !cursor.try_next(&self.playlist) {
                        info!("reached the end of the playlist");
                        break;
                    }
                }
            }
        }

        self.farewell(display);
        info!(
            played = report.played.len(),
            failed = report.failed,
            "session finished"
        );
        Ok(report)
    }

    /// Resolves metadata on first use and stores the result back in the
    /// playlist.
    fn resolve(&mut self, index: u32) -> Result<Track, NotFoundError> {
        let track = self.playlist.get(index)?;
        if track.is_resolved() {
            return Ok(track.clone());
        }
        let path = track.path.clone();
        let metadata = self.metadata.resolve(&path);
        let resolved = Track::with_metadata(path, metadata);
        self.playlist.insert_or_replace(index, resolved.clone());
        Ok(resolved)
    }

    fn pump_input(
        &mut self,
        cursor: &mut SessionCursor,
        worker: &JoinHandle<WorkerOutcome>,
        input: &mut dyn InputSource,
        display: &mut dyn Display,
    ) -> Result<()> {
        while !self.transport.is_finished() && !worker.is_finished() {
            let event = input
                .poll(self.options.poll_interval)
                .context("failed to read input")?;
            if let Some(event) = event {
                self.handle_event(event, cursor, display);
            }
        }
        Ok(())
    }

    pub fn handle_event(
        &mut self,
        event: InputEvent,
        cursor: &mut SessionCursor,
        display: &mut dyn Display,
    ) {
        match event {
            InputEvent::PlayPause => {
                let status = self.transport.toggle_pause();
                debug!(?status, "play/pause");
            }
            InputEvent::Next => {
                if cursor.try_next(&self.playlist) {
                    debug!(index = cursor.index(), "skip forward");
                    self.transport.request_next();
                } else {
                    debug!("already at the last track");
                }
            }
            InputEvent::Previous => {
                if cursor.try_previous(&self.playlist) {
                    debug!(index = cursor.index(), "skip back");
                    self.transport.request_previous();
                } else {
                    debug!("already at the first track");
                }
            }
            InputEvent::Quit => self.transport.request_quit(),
            InputEvent::ToggleSecondaryInfo => {
                self.second_row = self.second_row.toggle();
                if let Some(track) = self.transport.current() {
                    show(display, 1, "");
                    show(display, 1, &self.second_line(&track));
                }
            }
        }
    }

    fn show_now_playing(&self, display: &mut dyn Display, track: &Track) {
        let title = truncate_chars(&track.title(), self.options.title_width);
        clear(display);
        show(display, 0, &format!("{NOTE}{title}"));
        show(display, 1, &self.second_line(track));
    }

    fn second_line(&self, track: &Track) -> String {
        track
            .metadata
            .as_ref()
            .map(|metadata| metadata.second_row(self.second_row).to_string())
            .unwrap_or_default()
    }

    fn farewell(&self, display: &mut dyn Display) {
        clear(display);
        show(display, 0, FAREWELL);
        thread::sleep(self.options.farewell);
        clear(display);
    }
}

// A broken display must not stop playback, so panel errors are only logged.
fn show(display: &mut dyn Display, line: usize, text: &str) {
    if let Err(err) = display.show(line, text) {
        warn!(line, error = %err, "display update failed");
    }
}

fn clear(display: &mut dyn Display) {
    if let Err(err) = display.clear() {
        warn!(error = %err, "display clear failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn playlist(indices: &[u32]) -> Playlist {
        let mut playlist = Playlist::new();
        for index in indices {
            playlist.insert_or_replace(*index, Track::new(format!("{index}.mp3")));
        }
        playlist
    }

    #[test]
    fn cursor_starts_at_first_populated_index() {
        let playlist = playlist(&[4, 2, 9]);
        let cursor = SessionCursor::new(&playlist).expect("cursor");
        assert_eq!(cursor.index(), 2);
        assert!(SessionCursor::new(&Playlist::new()).is_none());
    }

    #[test]
    fn cursor_steps_over_gaps() {
        let playlist = playlist(&[1, 5, 6]);
        let mut cursor = SessionCursor::new(&playlist).expect("cursor");
        assert!(cursor.try_next(&playlist));
        assert_eq!(cursor.index(), 5);
        assert!(cursor.try_previous(&playlist));
        assert_eq!(cursor.index(), 1);
    }

    #[test]
    fn denied_skips_leave_the_cursor_alone() {
        let playlist = playlist(&[1, 2]);
        let mut cursor = SessionCursor::new(&playlist).expect("cursor");
        assert!(!cursor.try_previous(&playlist));
        assert_eq!(cursor.index(), 1);

        assert!(cursor.try_next(&playlist));
        assert!(!cursor.try_next(&playlist));
        assert_eq!(cursor.index(), 2);
    }

    #[test]
    fn default_options_follow_default_settings() {
        let options = SessionOptions::default();
        assert_eq!(options.poll_interval, Duration::from_millis(33));
        assert_eq!(options.title_width, 15);
        assert_eq!(options.second_row, SecondRow::Artist);
    }

    proptest! {
        #[test]
        fn skip_spam_never_leaves_the_populated_range(
            indices in proptest::collection::btree_set(0_u32..64, 1..12),
            skips in proptest::collection::vec(any::<bool>(), 0..200),
        ) {
            let indices: Vec<u32> = indices.into_iter().collect();
            let playlist = playlist(&indices);
            let first = indices[0];
            let last = indices[indices.len() - 1];

            let mut cursor = SessionCursor::new(&playlist).expect("cursor");
            for forward in skips {
                if forward {
                    cursor.try_next(&playlist);
                } else {
                    cursor.try_previous(&playlist);
                }
                prop_assert!(cursor.index() >= first && cursor.index() <= last);
                prop_assert!(playlist.lookup(cursor.index()).is_some());
            }
        }
    }
}
