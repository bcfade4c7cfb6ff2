mod decode;
mod output;

pub use decode::SymphoniaDecoder;
pub use output::{OutputDevice, RodioOutput};

use crate::error::{DecodeError, SinkError};
use std::path::Path;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamFormat {
    pub channels: u16,
    pub sample_rate: u32,
}

/// One decoded packet of interleaved samples.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioChunk {
    pub format: StreamFormat,
    pub samples: Vec<f32>,
}

impl AudioChunk {
    pub fn new(format: StreamFormat, samples: Vec<f32>) -> Self {
        Self { format, samples }
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / usize::from(self.format.channels.max(1))
    }

    pub fn duration(&self) -> Duration {
        let rate = self.format.sample_rate.max(1);
        Duration::from_secs_f64(self.frames() as f64 / f64::from(rate))
    }
}

pub trait AudioDecoder: Send + Sync {
    fn open(&self, path: &Path) -> Result<Box<dyn DecodedStream>, DecodeError>;
}

pub trait DecodedStream: Send {
    fn format(&self) -> StreamFormat;
    /// Next chunk of audio, `None` at end of stream.
    fn next_chunk(&mut self) -> Result<Option<AudioChunk>, DecodeError>;
}

pub trait AudioOutput: Send + Sync {
    fn open(&self, format: StreamFormat) -> Result<Box<dyn OutputSink>, SinkError>;
}

pub trait OutputSink: Send {
    /// Queues `chunk`, blocking while the output is already full.
    fn write(&mut self, chunk: &AudioChunk) -> Result<(), SinkError>;
    /// Blocks until everything written so far has been played.
    fn finish(&mut self) -> Result<(), SinkError>;
    /// Drops whatever is still queued.
    fn stop(&mut self);
}

/// Output that plays nothing. When paced it takes as long as the audio would.
#[derive(Debug, Clone, Copy)]
pub struct NullOutput {
    paced: bool,
}

impl NullOutput {
    pub fn new() -> Self {
        Self { paced: true }
    }

    pub fn unpaced() -> Self {
        Self { paced: false }
    }
}

impl Default for NullOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioOutput for NullOutput {
    fn open(&self, _format: StreamFormat) -> Result<Box<dyn OutputSink>, SinkError> {
        Ok(Box::new(NullSink { paced: self.paced }))
    }
}

struct NullSink {
    paced: bool,
}

impl OutputSink for NullSink {
    fn write(&mut self, chunk: &AudioChunk) -> Result<(), SinkError> {
        if self.paced {
            thread::sleep(chunk.duration());
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        Ok(())
    }

    fn stop(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    const STEREO_44K: StreamFormat = StreamFormat {
        channels: 2,
        sample_rate: 44_100,
    };

    #[test]
    fn chunk_duration_counts_frames_not_samples() {
        let chunk = AudioChunk::new(STEREO_44K, vec![0.0; 1152 * 2]);
        assert_eq!(chunk.frames(), 1152);
        let millis = chunk.duration().as_secs_f64() * 1000.0;
        assert!((millis - 26.12).abs() < 0.1, "unexpected duration {millis}");
    }

    #[test]
    fn zero_format_does_not_divide_by_zero() {
        let chunk = AudioChunk::new(
            StreamFormat {
                channels: 0,
                sample_rate: 0,
            },
            vec![0.0; 4],
        );
        assert_eq!(chunk.frames(), 4);
        assert_eq!(chunk.duration(), Duration::from_secs(4));
    }

    #[test]
    fn paced_null_output_takes_the_chunk_duration() {
        let mut sink = NullOutput::new().open(STEREO_44K).expect("open");
        let chunk = AudioChunk::new(STEREO_44K, vec![0.0; 4410 * 2]);
        let started = Instant::now();
        sink.write(&chunk).expect("write");
        assert!(started.elapsed() >= Duration::from_millis(95));
    }

    #[test]
    fn unpaced_null_output_returns_immediately() {
        let mut sink = NullOutput::unpaced().open(STEREO_44K).expect("open");
        let chunk = AudioChunk::new(STEREO_44K, vec![0.0; 44_100 * 2]);
        let started = Instant::now();
        sink.write(&chunk).expect("write");
        sink.finish().expect("finish");
        assert!(started.elapsed() < Duration::from_millis(500));
    }
}
