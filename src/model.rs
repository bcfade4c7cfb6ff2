use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

pub const UNKNOWN: &str = "UNKNOWN";

/// Transport status shared between the controller and the playback worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayStatus {
    #[default]
    Playing,
    Paused,
    NextRequested,
    PreviousRequested,
    Quitting,
}

impl PlayStatus {
    /// True for the statuses that end the current track early.
    pub fn stops_track(self) -> bool {
        matches!(
            self,
            Self::NextRequested | Self::PreviousRequested | Self::Quitting
        )
    }
}

/// Which metadata field the second display row shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SecondRow {
    #[default]
    Artist,
    Album,
}

impl SecondRow {
    pub fn toggle(self) -> Self {
        match self {
            Self::Artist => Self::Album,
            Self::Album => Self::Artist,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackMetadata {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub genre: String,
}

impl TrackMetadata {
    /// Metadata used when a file carries no readable tags at all.
    pub fn unknown(path: &Path) -> Self {
        Self::from_tags(path, RawTags::default())
    }

    /// Applies the display fallbacks: an empty title becomes the file stem,
    /// every other empty field becomes `UNKNOWN`.
    pub fn from_tags(path: &Path, raw: RawTags) -> Self {
        let title = raw
            .title
            .as_deref()
            .and_then(clean_tag_value)
            .unwrap_or_else(|| file_stem_title(path));

        Self {
            title,
            artist: or_unknown(raw.artist.as_deref()),
            album: or_unknown(raw.album.as_deref()),
            genre: or_unknown(raw.genre.as_deref()),
        }
    }

    pub fn second_row(&self, row: SecondRow) -> &str {
        match row {
            SecondRow::Artist => &self.artist,
            SecondRow::Album => &self.album,
        }
    }
}

/// Tag values exactly as a metadata source reported them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTags {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub genre: Option<String>,
}

impl RawTags {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.artist.is_none() && self.album.is_none() && self.genre.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub path: PathBuf,
    pub metadata: Option<TrackMetadata>,
}

impl Track {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            metadata: None,
        }
    }

    pub fn with_metadata(path: impl Into<PathBuf>, metadata: TrackMetadata) -> Self {
        Self {
            path: path.into(),
            metadata: Some(metadata),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.metadata.is_some()
    }

    /// Title to show for this track, resolved or not.
    pub fn title(&self) -> String {
        self.metadata
            .as_ref()
            .map(|metadata| metadata.title.clone())
            .unwrap_or_else(|| file_stem_title(&self.path))
    }
}

/// Trims a tag value and keeps only its first line; blank values are dropped.
pub fn clean_tag_value(value: &str) -> Option<String> {
    let first_line = value
        .split(['\n', '\r', '\0'])
        .map(str::trim)
        .find(|line| !line.is_empty())?;
    Some(first_line.to_string())
}

fn or_unknown(value: Option<&str>) -> String {
    value
        .and_then(clean_tag_value)
        .unwrap_or_else(|| UNKNOWN.to_string())
}

fn file_stem_title(path: &Path) -> String {
    path.file_stem()
        .and_then(OsStr::to_str)
        .filter(|stem| !stem.trim().is_empty())
        .unwrap_or(UNKNOWN)
        .to_string()
}
