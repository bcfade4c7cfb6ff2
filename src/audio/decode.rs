use super::{AudioChunk, AudioDecoder, DecodedStream, StreamFormat};
use crate::error::DecodeError;
use std::ffi::OsStr;
use std::fs::File;
use std::path::{Path, PathBuf};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, Decoder, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::{MediaSourceStream, MediaSourceStreamOptions};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};

/// Consecutive undecodable packets tolerated before the track is abandoned.
const MAX_CORRUPT_PACKETS: usize = 32;

#[derive(Debug, Clone, Copy, Default)]
pub struct SymphoniaDecoder;

impl SymphoniaDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl AudioDecoder for SymphoniaDecoder {
    fn open(&self, path: &Path) -> Result<Box<dyn DecodedStream>, DecodeError> {
        let file = File::open(path).map_err(|source| DecodeError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let source = MediaSourceStream::new(Box::new(file), MediaSourceStreamOptions::default());

        let mut hint = Hint::new();
        if let Some(extension) = path.extension().and_then(OsStr::to_str) {
            hint.with_extension(extension);
        }

        let probed = get_probe()
            .format(
                &hint,
                source,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|err| DecodeError::Probe {
                path: path.to_path_buf(),
                reason: err.to_string(),
            })?;
        let reader = probed.format;

        let Some(track) = reader
            .tracks()
            .iter()
            .find(|track| track.codec_params.codec != CODEC_TYPE_NULL)
        else {
            return Err(DecodeError::NoTrack(path.to_path_buf()));
        };
        let track_id = track.id;
        let channels = track
            .codec_params
            .channels
            .map(|channels| channels.count() as u16)
            .unwrap_or(2);
        let sample_rate = track.codec_params.sample_rate.unwrap_or(44_100);

        let decoder = get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|err| DecodeError::UnsupportedCodec {
                path: path.to_path_buf(),
                reason: err.to_string(),
            })?;

        Ok(Box::new(SymphoniaStream {
            path: path.to_path_buf(),
            reader,
            decoder,
            track_id,
            format: StreamFormat {
                channels,
                sample_rate,
            },
        }))
    }
}

struct SymphoniaStream {
    path: PathBuf,
    reader: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    format: StreamFormat,
}

fn read_error(path: &Path, err: impl ToString) -> DecodeError {
    DecodeError::Read {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}

impl DecodedStream for SymphoniaStream {
    fn format(&self) -> StreamFormat {
        self.format
    }

    fn next_chunk(&mut self) -> Result<Option<AudioChunk>, DecodeError> {
        let mut corrupt = 0;
        loop {
            let packet = match self.reader.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(err))
                    if err.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    return Ok(None);
                }
                Err(SymphoniaError::ResetRequired) => {
                    self.decoder.reset();
                    continue;
                }
                Err(err) => return Err(read_error(&self.path, err)),
            };
            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(reason)) => {
                    corrupt += 1;
                    if corrupt > MAX_CORRUPT_PACKETS {
                        return Err(read_error(&self.path, reason));
                    }
                    continue;
                }
                Err(err) => return Err(read_error(&self.path, err)),
            };
            if decoded.frames() == 0 {
                continue;
            }

            let spec = *decoded.spec();
            let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
            buffer.copy_interleaved_ref(decoded);

            let format = StreamFormat {
                channels: spec.channels.count() as u16,
                sample_rate: spec.rate,
            };
            self.format = format;
            return Ok(Some(AudioChunk::new(format, buffer.samples().to_vec())));
        }
    }
}
