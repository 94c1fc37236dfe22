//! Playlist export
//!
//! - [`to_text`]: `title | stream URL` per resolved item, one per line
//! - [`to_m3u`]: extended M3U for IPTV and media players
//! - [`failure_report`]: `title → detail` per failed item, for display
//!
//! Failed items are never written to the playable formats.

use crate::models::Playlist;

/// Output format for the playable export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Text,
    M3u,
}

impl ExportFormat {
    pub fn render(&self, playlist: &Playlist) -> String {
        match self {
            ExportFormat::Text => to_text(playlist),
            ExportFormat::M3u => to_m3u(playlist),
        }
    }
}

/// Newline-delimited `title | stream URL` pairs
pub fn to_text(playlist: &Playlist) -> String {
    playlist
        .resolved()
        .map(|item| format!("{} | {}\n", single_line(&item.title), item.stream_url))
        .collect()
}

/// Extended M3U with one `#EXTINF` entry per resolved item
pub fn to_m3u(playlist: &Playlist) -> String {
    let mut m3u = String::from("#EXTM3U\n");

    for (index, item) in playlist.resolved().enumerate() {
        let mut extinf = format!("#EXTINF:-1 tvg-chno=\"{}\"", index + 1);
        if let Some(height) = item.height {
            extinf.push_str(&format!(" tvg-quality=\"{height}p\""));
        }
        extinf.push_str(&format!(",{}\n", single_line(&item.title)));

        m3u.push_str(&extinf);
        m3u.push_str(&format!("{}\n", item.stream_url));
    }

    m3u
}

/// `title → detail` lines for every failed item
pub fn failure_report(playlist: &Playlist) -> String {
    playlist
        .failed()
        .map(|item| format!("{} → {}\n", single_line(&item.title), single_line(&item.detail)))
        .collect()
}

fn single_line(text: &str) -> String {
    text.split(['\r', '\n']).filter(|s| !s.is_empty()).collect::<Vec<_>>().join(" ")
}
