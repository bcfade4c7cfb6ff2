use crate::model::{PlayStatus, Track};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Inner {
    status: PlayStatus,
    finished: bool,
    current: Option<Track>,
}

#[derive(Debug, Default)]
pub struct TransportState {
    inner: Mutex<Inner>,
    changed: Condvar,
}

pub type TransportHandle = Arc<TransportState>;

impl TransportState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> TransportHandle {
        Arc::new(Self::new())
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // The guarded fields are plain values that every method leaves
        // consistent, so a panicked holder does not invalidate them.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Resumes a paused worker. A pending skip or quit is left in place.
    pub fn request_play(&self) {
        let mut inner = self.lock();
        if inner.status.stops_track() {
            return;
        }
        inner.status = PlayStatus::Playing;
        self.changed.notify_all();
    }

    pub fn request_pause(&self) {
        let mut inner = self.lock();
        if !inner.status.stops_track() {
            inner.status = PlayStatus::Paused;
        }
    }

    /// Flips between `Playing` and `Paused`. Any other status is left alone.
    pub fn toggle_pause(&self) -> PlayStatus {
        let mut inner = self.lock();
        match inner.status {
            PlayStatus::Paused => {
                inner.status = PlayStatus::Playing;
                self.changed.notify_all();
            }
            PlayStatus::Playing => inner.status = PlayStatus::Paused,
            _ => {}
        }
        inner.status
    }

    pub fn request_next(&self) {
        self.request_stop(PlayStatus::NextRequested);
    }

    pub fn request_previous(&self) {
        self.request_stop(PlayStatus::PreviousRequested);
    }

    pub fn request_quit(&self) {
        self.request_stop(PlayStatus::Quitting);
    }

    fn request_stop(&self, status: PlayStatus) {
        let mut inner = self.lock();
        if inner.status == PlayStatus::Quitting {
            return;
        }
        inner.status = status;
        inner.finished = true;
        // A paused worker has to wake up to see the request.
        self.changed.notify_all();
    }

    /// Worker suspension point: blocks while paused and returns the status
    /// that released it.
    pub fn await_resume_if_paused(&self) -> PlayStatus {
        let mut inner = self.lock();
        while inner.status == PlayStatus::Paused {
            inner = self
                .changed
                .wait(inner)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
        inner.status
    }

    /// Called by the worker once its loop has exited. A normal completion
    /// resets a pause so the next track starts running, unless a skip or quit
    /// is already pending.
    pub fn mark_finished(&self, normal_completion: bool) {
        let mut inner = self.lock();
        inner.finished = true;
        if normal_completion && !inner.status.stops_track() {
            inner.status = PlayStatus::Playing;
        }
        self.changed.notify_all();
    }

    pub fn status(&self) -> PlayStatus {
        self.lock().status
    }

    pub fn is_finished(&self) -> bool {
        self.lock().finished
    }

    /// Controller side of a track boundary: reads the status that ended the
    /// track, clears `finished` and turns a consumed skip back into
    /// `Playing`. `Quitting` is kept.
    pub fn acknowledge_finished(&self) -> PlayStatus {
        let mut inner = self.lock();
        let status = inner.status;
        inner.finished = false;
        inner.current = None;
        if status != PlayStatus::Quitting {
            inner.status = PlayStatus::Playing;
        }
        status
    }

    pub fn load(&self, track: Track) {
        let mut inner = self.lock();
        inner.current = Some(track);
        inner.finished = false;
    }

    pub fn current(&self) -> Option<Track> {
        self.lock().current.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prop_assert;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    fn spawn_waiter(state: &TransportHandle) -> mpsc::Receiver<PlayStatus> {
        let (tx, rx) = mpsc::channel();
        let state = Arc::clone(state);
        thread::spawn(move || {
            let status = state.await_resume_if_paused();
            let _ = tx.send(status);
        });
        rx
    }

    #[test]
    fn skip_requests_set_finished() {
        let state = TransportState::new();
        state.request_next();
        assert!(state.is_finished());
        assert_eq!(state.status(), PlayStatus::NextRequested);

        assert_eq!(state.acknowledge_finished(), PlayStatus::NextRequested);
        assert!(!state.is_finished());
        assert_eq!(state.status(), PlayStatus::Playing);

        state.request_previous();
        assert!(state.is_finished());
        assert_eq!(state.status(), PlayStatus::PreviousRequested);
    }

    #[test]
    fn pause_does_not_mark_finished() {
        let state = TransportState::new();
        state.request_pause();
        assert_eq!(state.status(), PlayStatus::Paused);
        assert!(!state.is_finished());
        state.request_play();
        assert_eq!(state.status(), PlayStatus::Playing);
    }

    #[test]
    fn toggle_pause_ignores_pending_skip() {
        let state = TransportState::new();
        assert_eq!(state.toggle_pause(), PlayStatus::Paused);
        assert_eq!(state.toggle_pause(), PlayStatus::Playing);
        state.request_next();
        assert_eq!(state.toggle_pause(), PlayStatus::NextRequested);
    }

    #[test]
    fn normal_completion_clears_pause() {
        let state = TransportState::new();
        state.request_pause();
        state.mark_finished(true);
        assert!(state.is_finished());
        assert_eq!(state.status(), PlayStatus::Playing);
    }

    #[test]
    fn completion_does_not_override_pending_skip() {
        let state = TransportState::new();
        state.request_previous();
        state.mark_finished(true);
        assert_eq!(state.status(), PlayStatus::PreviousRequested);
    }

    #[test]
    fn interrupted_completion_keeps_status() {
        let state = TransportState::new();
        state.request_pause();
        state.mark_finished(false);
        assert_eq!(state.status(), PlayStatus::Paused);
    }

    #[test]
    fn quit_is_terminal() {
        let state = TransportState::new();
        state.request_quit();
        state.request_next();
        state.request_pause();
        state.request_play();
        assert_eq!(state.status(), PlayStatus::Quitting);
        assert_eq!(state.acknowledge_finished(), PlayStatus::Quitting);
        assert_eq!(state.status(), PlayStatus::Quitting);
    }

    #[test]
    fn quit_releases_a_paused_waiter() {
        let state = TransportState::shared();
        state.request_pause();
        let rx = spawn_waiter(&state);
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());

        state.request_quit();
        let released = rx
            .recv_timeout(Duration::from_secs(2))
            .expect("waiter should be released");
        assert_eq!(released, PlayStatus::Quitting);
    }

    #[test]
    fn next_releases_a_paused_waiter() {
        let state = TransportState::shared();
        state.request_pause();
        let rx = spawn_waiter(&state);
        state.request_next();
        let released = rx
            .recv_timeout(Duration::from_secs(2))
            .expect("waiter should be released");
        assert_eq!(released, PlayStatus::NextRequested);
    }

    #[test]
    fn pause_after_next_keeps_the_skip() {
        let state = TransportState::shared();
        state.request_next();
        state.request_pause();
        assert_eq!(state.status(), PlayStatus::NextRequested);
        assert!(state.is_finished());

        let rx = spawn_waiter(&state);
        let released = rx
            .recv_timeout(Duration::from_secs(2))
            .expect("worker must not block on a pending skip");
        assert_eq!(released, PlayStatus::NextRequested);
    }

    #[test]
    fn play_after_previous_keeps_the_skip() {
        let state = TransportState::new();
        state.request_previous();
        state.request_play();
        assert_eq!(state.status(), PlayStatus::PreviousRequested);
        assert_eq!(state.acknowledge_finished(), PlayStatus::PreviousRequested);
    }

    #[test]
    fn skip_after_completion_is_reported_once() {
        let state = TransportState::new();
        state.mark_finished(true);
        state.request_next();
        assert_eq!(state.acknowledge_finished(), PlayStatus::NextRequested);
        assert_eq!(state.status(), PlayStatus::Playing);
        assert!(!state.is_finished());
    }

    #[test]
    fn load_sets_current_and_acknowledge_clears_it() {
        let state = TransportState::new();
        state.load(Track::new("a.mp3"));
        assert_eq!(state.current().map(|t| t.path), Some("a.mp3".into()));
        state.mark_finished(true);
        state.acknowledge_finished();
        assert_eq!(state.current(), None);
    }

    proptest::proptest! {
        #![proptest_config(proptest::prelude::ProptestConfig::with_cases(48))]

        // Any interleaving of pause/play requests that ends in `request_play`
        // must leave a worker blocked at the suspension point able to run.
        #[test]
        fn pause_play_sequences_never_strand_the_worker(
            ops in proptest::collection::vec(proptest::bool::ANY, 1..24),
            waiters in 1usize..4,
        ) {
            let state = TransportState::shared();
            let mut receivers = Vec::new();
            for (step, pause) in ops.iter().enumerate() {
                if *pause {
                    state.request_pause();
                } else {
                    state.request_play();
                }
                if step % 5 == 0 && receivers.len() < waiters {
                    receivers.push(spawn_waiter(&state));
                }
            }
            while receivers.len() < waiters {
                receivers.push(spawn_waiter(&state));
            }
            state.request_play();

            for rx in receivers {
                let released = rx.recv_timeout(Duration::from_secs(2));
                prop_assert!(released.is_ok(), "worker stayed blocked");
            }
        }
    }
}
