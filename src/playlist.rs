use crate::error::NotFoundError;
use crate::model::Track;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::path::PathBuf;

/// Index-ordered track list. Indices are positive and may have gaps.
#[derive(Debug, Clone, Default)]
pub struct Playlist {
    entries: BTreeMap<u32, Track>,
}

impl Playlist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a playlist with the paths at indices `1..=n` in order.
    pub fn from_paths<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut playlist = Self::new();
        for (index, path) in (1..).zip(paths) {
            playlist.insert_or_replace(index, Track::new(path));
        }
        playlist
    }

    /// Inserts `track` at `index`, returning the track it replaced.
    pub fn insert_or_replace(&mut self, index: u32, track: Track) -> Option<Track> {
        self.entries.insert(index, track)
    }

    pub fn lookup(&self, index: u32) -> Option<&Track> {
        self.entries.get(&index)
    }

    pub fn get(&self, index: u32) -> Result<&Track, NotFoundError> {
        self.lookup(index).ok_or(NotFoundError { index })
    }

    pub fn first_index(&self) -> Option<u32> {
        self.entries.keys().next().copied()
    }

    pub fn last_index(&self) -> Option<u32> {
        self.entries.keys().next_back().copied()
    }

    /// Smallest populated index strictly greater than `index`.
    pub fn index_after(&self, index: u32) -> Option<u32> {
        self.entries
            .range((Bound::Excluded(index), Bound::Unbounded))
            .next()
            .map(|(idx, _)| *idx)
    }

    /// Largest populated index strictly smaller than `index`.
    pub fn index_before(&self, index: u32) -> Option<u32> {
        self.entries.range(..index).next_back().map(|(idx, _)| *idx)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &Track)> {
        self.entries.iter().map(|(idx, track)| (*idx, track))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prop_assert_eq;
    use std::collections::HashMap;

    #[test]
    fn replacing_an_index_returns_the_old_track() {
        let mut playlist = Playlist::new();
        assert_eq!(playlist.insert_or_replace(2, Track::new("a.mp3")), None);
        let old = playlist
            .insert_or_replace(2, Track::new("b.mp3"))
            .expect("old track");
        assert_eq!(old.path, PathBuf::from("a.mp3"));
        assert_eq!(playlist.len(), 1);
        assert_eq!(playlist.lookup(2).map(|t| t.path.clone()), Some(PathBuf::from("b.mp3")));
    }

    #[test]
    fn iteration_is_by_ascending_index_regardless_of_insert_order() {
        let mut playlist = Playlist::new();
        playlist.insert_or_replace(7, Track::new("c"));
        playlist.insert_or_replace(1, Track::new("a"));
        playlist.insert_or_replace(4, Track::new("b"));

        let order: Vec<u32> = playlist.iter().map(|(idx, _)| idx).collect();
        assert_eq!(order, vec![1, 4, 7]);
        assert_eq!(playlist.first_index(), Some(1));
        assert_eq!(playlist.last_index(), Some(7));
    }

    #[test]
    fn neighbours_skip_gaps() {
        let mut playlist = Playlist::new();
        playlist.insert_or_replace(1, Track::new("a"));
        playlist.insert_or_replace(5, Track::new("b"));

        assert_eq!(playlist.index_after(1), Some(5));
        assert_eq!(playlist.index_after(3), Some(5));
        assert_eq!(playlist.index_after(5), None);
        assert_eq!(playlist.index_before(5), Some(1));
        assert_eq!(playlist.index_before(1), None);
    }

    #[test]
    fn missing_index_is_not_found() {
        let playlist = Playlist::from_paths(["a.mp3", "b.mp3"]);
        assert!(playlist.lookup(3).is_none());
        assert_eq!(playlist.get(3).unwrap_err(), NotFoundError { index: 3 });
        assert_eq!(
            playlist.get(2).map(|t| t.path.clone()),
            Ok(PathBuf::from("b.mp3"))
        );
    }

    proptest::proptest! {
        #[test]
        fn lookup_returns_latest_insert(ops in proptest::collection::vec((1u32..40, 0u16..1000), 0..120)) {
            let mut playlist = Playlist::new();
            let mut expected: HashMap<u32, String> = HashMap::new();
            for (index, tag) in ops {
                let name = format!("track_{tag}.mp3");
                playlist.insert_or_replace(index, Track::new(&name));
                expected.insert(index, name);
            }

            for index in 0..45 {
                let found = playlist.lookup(index).map(|t| t.path.to_string_lossy().to_string());
                prop_assert_eq!(found, expected.get(&index).cloned());
            }
            prop_assert_eq!(playlist.len(), expected.len());
        }
    }
}
