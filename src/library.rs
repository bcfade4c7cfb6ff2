use crate::model::{RawTags, Track, TrackMetadata, clean_tag_value};
use crate::playlist::Playlist;
use lofty::file::TaggedFileExt;
use lofty::probe::Probe;
use lofty::tag::Accessor;
use std::ffi::OsStr;
use std::fs::File;
use std::path::{Path, PathBuf};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSourceStream, MediaSourceStreamOptions};
use symphonia::core::meta::{MetadataOptions, StandardTagKey};
use symphonia::core::probe::Hint;
use symphonia::default::get_probe;
use tracing::debug;
use walkdir::WalkDir;

const AUDIO_EXTENSIONS: &[&str] = &["mp3", "flac", "wav", "ogg", "m4a", "aac", "opus"];

pub trait MetadataReader {
    fn resolve(&self, path: &Path) -> TrackMetadata;
}

/// Reads embedded tags with symphonia and falls back to lofty.
#[derive(Debug, Clone, Copy, Default)]
pub struct TagReader;

impl MetadataReader for TagReader {
    fn resolve(&self, path: &Path) -> TrackMetadata {
        let mut raw = symphonia_tags(path);
        if raw.is_empty() {
            raw = lofty_tags(path);
        }
        if raw.is_empty() {
            debug!(path = %path.display(), "no tags found");
        }
        TrackMetadata::from_tags(path, raw)
    }
}

/// Builds the session playlist from command-line arguments. Argument `n`
/// lands at index `n`; a directory expands to its audio files in path order.
pub fn playlist_from_args<P: AsRef<Path>>(args: &[P]) -> Playlist {
    let mut playlist = Playlist::new();
    let mut index = 1_u32;
    for arg in args {
        let path = arg.as_ref();
        if path.is_dir() {
            for track in scan_folder(path) {
                playlist.insert_or_replace(index, Track::new(track));
                index += 1;
            }
        } else {
            playlist.insert_or_replace(index, Track::new(path));
            index += 1;
        }
    }
    playlist
}

pub fn scan_folder(root: &Path) -> Vec<PathBuf> {
    let mut tracks: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file() && is_audio(entry.path()))
        .map(|entry| entry.into_path())
        .collect();
    tracks.sort();
    tracks
}

fn symphonia_tags(path: &Path) -> RawTags {
    let Ok(file) = File::open(path) else {
        return RawTags::default();
    };
    let source = MediaSourceStream::new(Box::new(file), MediaSourceStreamOptions::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(OsStr::to_str) {
        hint.with_extension(extension);
    }

    let Ok(mut probed) = get_probe().format(
        &hint,
        source,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    ) else {
        return RawTags::default();
    };

    // ID3v2 ahead of the audio frames ends up in the probe metadata, other
    // containers report through the format reader.
    let from_probe = probed
        .metadata
        .get()
        .and_then(|metadata| metadata.current().map(|revision| raw_tags(revision.tags())));
    if let Some(raw) = from_probe.filter(|raw| !raw.is_empty()) {
        return raw;
    }

    let metadata = probed.format.metadata();
    let Some(revision) = metadata.current() else {
        return RawTags::default();
    };
    raw_tags(revision.tags())
}

fn raw_tags(tags: &[symphonia::core::meta::Tag]) -> RawTags {
    RawTags {
        title: tag_value(tags, StandardTagKey::TrackTitle, &["title"]),
        artist: tag_value(
            tags,
            StandardTagKey::Artist,
            &["artist", "albumartist", "album_artist"],
        ),
        album: tag_value(tags, StandardTagKey::Album, &["album"]),
        genre: tag_value(tags, StandardTagKey::Genre, &["genre"]),
    }
}

fn lofty_tags(path: &Path) -> RawTags {
    let Ok(tagged) = Probe::open(path).and_then(|probe| probe.read()) else {
        return RawTags::default();
    };
    let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag()) else {
        return RawTags::default();
    };

    let non_empty = |value: Option<std::borrow::Cow<'_, str>>| {
        value.and_then(|value| clean_tag_value(&value))
    };
    RawTags {
        title: non_empty(tag.title()),
        artist: non_empty(tag.artist()),
        album: non_empty(tag.album()),
        genre: non_empty(tag.genre()),
    }
}

fn tag_value(
    tags: &[symphonia::core::meta::Tag],
    standard_key: StandardTagKey,
    fallback_keys: &[&str],
) -> Option<String> {
    let from_standard = tags
        .iter()
        .find(|tag| tag.std_key == Some(standard_key))
        .map(|tag| tag.value.to_string());

    let from_fallback = || {
        tags.iter()
            .find(|tag| {
                fallback_keys
                    .iter()
                    .any(|key| tag.key.eq_ignore_ascii_case(key))
            })
            .map(|tag| tag.value.to_string())
    };

    from_standard
        .or_else(from_fallback)
        .and_then(|value| clean_tag_value(&value))
}

fn is_audio(path: &Path) -> bool {
    let ext = path.extension().and_then(OsStr::to_str).unwrap_or_default();
    AUDIO_EXTENSIONS
        .iter()
        .any(|supported| ext.eq_ignore_ascii_case(supported))
}
