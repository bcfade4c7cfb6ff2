use super::{AudioChunk, AudioOutput, OutputSink, StreamFormat};
use crate::error::SinkError;
use rodio::buffer::SamplesBuffer;
use rodio::cpal::traits::{DeviceTrait, HostTrait};
use rodio::mixer::Mixer;
use rodio::{OutputStream, OutputStreamBuilder, Sink};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const WRITE_POLL: Duration = Duration::from_millis(4);
/// Slack on top of the queued audio before a device that stopped pulling
/// samples counts as stalled.
const STALL_GRACE: Duration = Duration::from_millis(500);

/// The opened system audio stream. It has to outlive every sink created from
/// it and stays on the thread that opened it.
pub struct OutputDevice {
    stream: OutputStream,
    name: String,
}

impl OutputDevice {
    pub fn open(requested: Option<&str>) -> Result<Self, SinkError> {
        let (mut stream, name) = quietly(|| open_stream(requested))?;
        stream.log_on_drop(false);
        debug!(device = %name, "audio output opened");
        Ok(Self { stream, name })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn output(&self, queue_depth: usize) -> RodioOutput {
        RodioOutput {
            mixer: self.stream.mixer().clone(),
            queue_depth: queue_depth.max(1),
        }
    }
}

fn open_stream(requested: Option<&str>) -> Result<(OutputStream, String), SinkError> {
    let host = rodio::cpal::default_host();
    if let Some(requested) = requested {
        let device = host
            .output_devices()
            .map_err(|err| SinkError::NoDevice(err.to_string()))?
            .find(|candidate| candidate.name().ok().as_deref() == Some(requested))
            .ok_or_else(|| SinkError::DeviceNotFound(requested.to_string()))?;
        let stream = OutputStreamBuilder::from_device(device)
            .map_err(|err| SinkError::Stream(err.to_string()))?
            .with_error_callback(|err| warn!(error = %err, "audio stream error"))
            .open_stream_or_fallback()
            .map_err(|err| SinkError::Stream(err.to_string()))?;
        return Ok((stream, requested.to_string()));
    }

    let default_err = match OutputStreamBuilder::from_default_device()
        .map_err(|err| err.to_string())
        .and_then(|builder| {
            builder
                .with_error_callback(|err| warn!(error = %err, "audio stream error"))
                .open_stream_or_fallback()
                .map_err(|err| err.to_string())
        }) {
        Ok(stream) => return Ok((stream, String::from("System default output"))),
        Err(err) => err,
    };
    warn!(error = %default_err, "default audio output failed, trying other devices");

    let mut candidates: Vec<String> = host
        .output_devices()
        .ok()
        .into_iter()
        .flatten()
        .filter_map(|device| device.name().ok())
        .collect();
    candidates.sort_by_cached_key(|name| {
        let lower = name.to_ascii_lowercase();
        let rank = if lower.contains("pulse") {
            0_u8
        } else if lower.contains("pipewire") {
            1_u8
        } else if lower.contains("default") {
            2_u8
        } else {
            3_u8
        };
        (rank, lower)
    });
    candidates.dedup();

    for candidate in candidates {
        let Some(device) = host
            .output_devices()
            .ok()
            .into_iter()
            .flatten()
            .find(|entry| entry.name().ok().as_deref() == Some(candidate.as_str()))
        else {
            continue;
        };
        let opened = OutputStreamBuilder::from_device(device)
            .ok()
            .and_then(|builder| {
                builder
                    .with_error_callback(|err| warn!(error = %err, "audio stream error"))
                    .open_stream_or_fallback()
                    .ok()
            });
        if let Some(stream) = opened {
            return Ok((stream, candidate));
        }
    }

    Err(SinkError::NoDevice(format!(
        "unable to start any audio output stream after default failed: {default_err}"
    )))
}

/// Creates one rodio sink per track on a shared mixer.
#[derive(Clone)]
pub struct RodioOutput {
    mixer: Mixer,
    queue_depth: usize,
}

impl AudioOutput for RodioOutput {
    fn open(&self, _format: StreamFormat) -> Result<Box<dyn OutputSink>, SinkError> {
        Ok(Box::new(RodioSink {
            sink: Sink::connect_new(&self.mixer),
            pacing: QueuePacing::new(self.queue_depth),
        }))
    }
}

struct RodioSink {
    sink: Sink,
    pacing: QueuePacing,
}

impl OutputSink for RodioSink {
    fn write(&mut self, chunk: &AudioChunk) -> Result<(), SinkError> {
        if chunk.format.channels == 0 || chunk.format.sample_rate == 0 {
            return Err(SinkError::Write(format!(
                "invalid stream format {}ch @ {}Hz",
                chunk.format.channels, chunk.format.sample_rate
            )));
        }
        self.sink.append(SamplesBuffer::new(
            chunk.format.channels,
            chunk.format.sample_rate,
            chunk.samples.clone(),
        ));
        self.pacing.record(chunk);
        let sink = &self.sink;
        self.pacing.wait_for_room(|| sink.len())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        let sink = &self.sink;
        self.pacing.wait_until_drained(|| sink.empty())
    }

    fn stop(&mut self) {
        self.sink.stop();
    }
}

/// Keeps the output queue at `queue_depth` chunks, giving up once the queue
/// has not moved for longer than the audio it holds.
#[derive(Debug, Clone, Copy)]
struct QueuePacing {
    queue_depth: usize,
    last_chunk: Duration,
}

impl QueuePacing {
    fn new(queue_depth: usize) -> Self {
        Self {
            queue_depth: queue_depth.max(1),
            last_chunk: Duration::ZERO,
        }
    }

    fn record(&mut self, chunk: &AudioChunk) {
        self.last_chunk = chunk.duration();
    }

    fn limit(&self) -> Duration {
        let queued = u32::try_from(self.queue_depth + 1).unwrap_or(u32::MAX);
        self.last_chunk
            .saturating_mul(queued)
            .saturating_add(STALL_GRACE)
    }

    fn wait_for_room(&self, mut queued: impl FnMut() -> usize) -> Result<(), SinkError> {
        let limit = self.limit();
        if poll_until(limit, || queued() <= self.queue_depth) {
            Ok(())
        } else {
            Err(SinkError::Stalled(limit))
        }
    }

    fn wait_until_drained(&self, mut empty: impl FnMut() -> bool) -> Result<(), SinkError> {
        let limit = self.limit();
        if poll_until(limit, &mut empty) {
            Ok(())
        } else {
            Err(SinkError::Stalled(limit))
        }
    }
}

fn poll_until(limit: Duration, mut ready: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + limit;
    while !ready() {
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(WRITE_POLL);
    }
    true
}

/// Points stderr at /dev/null until dropped. ALSA and JACK print probe noise
/// there while devices are opened.
#[cfg(unix)]
struct StderrMute {
    saved: libc::c_int,
}

#[cfg(unix)]
impl StderrMute {
    fn engage() -> Option<Self> {
        let saved = unsafe { libc::dup(libc::STDERR_FILENO) };
        if saved < 0 {
            return None;
        }
        let devnull = unsafe { libc::open(c"/dev/null".as_ptr(), libc::O_WRONLY) };
        if devnull >= 0 {
            unsafe {
                libc::dup2(devnull, libc::STDERR_FILENO);
                libc::close(devnull);
            }
        }
        Some(Self { saved })
    }
}

#[cfg(unix)]
impl Drop for StderrMute {
    fn drop(&mut self) {
        unsafe {
            libc::dup2(self.saved, libc::STDERR_FILENO);
            libc::close(self.saved);
        }
    }
}

fn quietly<T>(operation: impl FnOnce() -> T) -> T {
    #[cfg(unix)]
    let _mute = StderrMute::engage();
    operation()
}
