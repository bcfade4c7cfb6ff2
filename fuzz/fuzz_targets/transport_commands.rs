#![no_main]

use lcdplay::model::{PlayStatus, Track};
use lcdplay::playlist::Playlist;
use lcdplay::session::SessionCursor;
use lcdplay::transport::TransportState;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some((&len, commands)) = data.split_first() else {
        return;
    };

    let mut playlist = Playlist::new();
    for idx in 0..u32::from(len % 16).max(1) {
        // Every other slot stays empty so skips have gaps to step over.
        playlist.insert_or_replace(idx * 2 + 1, Track::new(format!("track_{idx}.mp3")));
    }
    let first = playlist.first_index().unwrap_or_default();
    let last = playlist.last_index().unwrap_or_default();
    let Some(mut cursor) = SessionCursor::new(&playlist) else {
        return;
    };
    let transport = TransportState::new();

    for byte in commands {
        match byte % 7 {
            0 => {
                transport.toggle_pause();
            }
            1 => {
                if cursor.try_next(&playlist) {
                    transport.request_next();
                }
            }
            2 => {
                if cursor.try_previous(&playlist) {
                    transport.request_previous();
                }
            }
            3 => transport.mark_finished(true),
            4 => transport.mark_finished(false),
            5 => {
                if transport.acknowledge_finished() == PlayStatus::Quitting {
                    assert_eq!(transport.status(), PlayStatus::Quitting);
                }
            }
            _ => transport.request_quit(),
        }
        assert!(cursor.index() >= first && cursor.index() <= last);
        if transport.status() == PlayStatus::Quitting {
            transport.request_play();
            assert_eq!(transport.status(), PlayStatus::Quitting);
        }
    }
});
