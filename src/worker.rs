use crate::audio::{AudioDecoder, AudioOutput};
use crate::error::TrackError;
use crate::model::{PlayStatus, Track};
use crate::transport::{TransportHandle, TransportState};
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

#[derive(Debug)]
pub enum WorkerOutcome {
    /// The decoder reached end of stream.
    Completed { chunks: usize },
    /// A skip or quit request ended the track.
    Interrupted { status: PlayStatus, chunks: usize },
    /// The track could not be played; the session moves past it.
    Failed(TrackError),
}

impl WorkerOutcome {
    /// Whether the loop ended on its own rather than through a request.
    pub fn ended_on_its_own(&self) -> bool {
        !matches!(self, Self::Interrupted { .. })
    }
}

pub fn spawn_worker(
    track: Track,
    transport: TransportHandle,
    decoder: Arc<dyn AudioDecoder>,
    output: Arc<dyn AudioOutput>,
) -> io::Result<JoinHandle<WorkerOutcome>> {
    thread::Builder::new()
        .name(String::from("playback"))
        .spawn(move || play_track(&track, &transport, decoder.as_ref(), output.as_ref()))
}

/// Runs the decode/output loop for `track` and marks the transport finished
/// however the loop ends.
pub fn play_track(
    track: &Track,
    transport: &TransportState,
    decoder: &dyn AudioDecoder,
    output: &dyn AudioOutput,
) -> WorkerOutcome {
    let outcome = run_loop(track, transport, decoder, output);
    match &outcome {
        WorkerOutcome::Completed { chunks } => {
            debug!(path = %track.path.display(), chunks, "track completed");
        }
        WorkerOutcome::Interrupted { status, chunks } => {
            debug!(path = %track.path.display(), ?status, chunks, "track interrupted");
        }
        WorkerOutcome::Failed(err) => {
            warn!(path = %track.path.display(), error = %err, "skipping unplayable track");
        }
    }
    transport.mark_finished(outcome.ended_on_its_own());
    outcome
}

fn run_loop(
    track: &Track,
    transport: &TransportState,
    decoder: &dyn AudioDecoder,
    output: &dyn AudioOutput,
) -> WorkerOutcome {
    let mut stream = match decoder.open(&track.path) {
        Ok(stream) => stream,
        Err(err) => return WorkerOutcome::Failed(err.into()),
    };
    let mut sink = match output.open(stream.format()) {
        Ok(sink) => sink,
        Err(err) => return WorkerOutcome::Failed(err.into()),
    };

    let mut chunks = 0;
    loop {
        let status = transport.await_resume_if_paused();
        if status.stops_track() {
            sink.stop();
            return WorkerOutcome::Interrupted { status, chunks };
        }

        let chunk = match stream.next_chunk() {
            Ok(Some(chunk)) => chunk,
            Ok(None) => {
                if let Err(err) = sink.finish() {
                    sink.stop();
                    return WorkerOutcome::Failed(err.into());
                }
                return WorkerOutcome::Completed { chunks };
            }
            Err(err) => {
                sink.stop();
                return WorkerOutcome::Failed(err.into());
            }
        };
        if let Err(err) = sink.write(&chunk) {
            sink.stop();
            return WorkerOutcome::Failed(err.into());
        }
        chunks += 1;

        let status = transport.status();
        if status.stops_track() {
            sink.stop();
            return WorkerOutcome::Interrupted { status, chunks };
        }
    }
}
