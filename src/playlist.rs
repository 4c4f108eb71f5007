//! Playlist fetching and entry normalization.
//!
//! yt-dlp dumps playlists as JSON with a platform-dependent entry shape:
//! YouTube flat listings give lightweight stubs, SoundCloud full dumps give
//! rich track objects with different field names. Raw entries stay untyped
//! `Value` maps; `normalize_entries` reconciles them into one canonical shape.

use serde::Deserialize;
use serde_json::Value;

use crate::error::ArchiveError;
use crate::platform::{Platform, YOUTUBE_WATCH_URL};
use crate::ytdlp::YtDlp;

const UNTITLED: &str = "(untitled)";
const UNKNOWN_UPLOADER: &str = "Unknown";

/// Playlist object as dumped by `yt-dlp -J`. Only the title and the raw
/// entry list are read; everything else in the dump is ignored.
#[derive(Debug, Deserialize)]
pub struct RawPlaylist {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    entries: Option<Vec<Value>>,
}

impl RawPlaylist {
    pub fn entries(&self) -> &[Value] {
        self.entries.as_deref().unwrap_or_default()
    }
}

/// Canonical, platform-independent track record consumed by the downloader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedEntry {
    pub video_id: String,
    pub title: String,
    pub uploader: String,
    pub video_url: String,
}

/// Dumps the playlist metadata through yt-dlp.
pub fn fetch_playlist(
    tool: &YtDlp,
    playlist_url: &str,
    platform: Platform,
) -> Result<RawPlaylist, ArchiveError> {
    let mut args: Vec<&str> = platform.playlist_dump_args().to_vec();
    args.push(playlist_url);

    let output = tool.run(&args)?;
    if !output.success() {
        return Err(ArchiveError::ToolInvocation(
            output.error_message("yt-dlp failed to read playlist"),
        ));
    }

    let payload = isolate_json(&output.stdout).ok_or_else(|| {
        ArchiveError::ToolInvocation("yt-dlp playlist output was not valid JSON".to_string())
    })?;
    serde_json::from_value(payload).map_err(|err| {
        ArchiveError::ToolInvocation(format!("unexpected playlist JSON shape: {err}"))
    })
}

/// Finds the JSON payload in the tool's stdout. yt-dlp normally prints the
/// dump as a single line, but some configurations interleave diagnostic
/// lines, so after a whole-stream parse fails we scan lines from the end.
fn isolate_json(stdout: &str) -> Option<Value> {
    let trimmed = stdout.trim();
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Some(value);
    }
    stdout.lines().rev().find_map(|line| {
        let line = line.trim();
        if line.starts_with('{') || line.starts_with('[') {
            serde_json::from_str(line).ok()
        } else {
            None
        }
    })
}

/// Maps raw playlist entries into `NormalizedEntry` records, preserving
/// playlist order. Entries without a usable id are dropped.
pub fn normalize_entries(entries: &[Value], platform: Platform) -> Vec<NormalizedEntry> {
    entries
        .iter()
        .filter_map(|entry| normalize_entry(entry, platform))
        .collect()
}

fn normalize_entry(entry: &Value, platform: Platform) -> Option<NormalizedEntry> {
    let video_id = entry_id(entry)?;

    let title = first_nonempty(entry, platform.title_fields())
        .unwrap_or(UNTITLED)
        .to_string();
    let uploader = first_nonempty(entry, platform.uploader_fields())
        .unwrap_or(UNKNOWN_UPLOADER)
        .to_string();

    let video_url = match platform {
        Platform::Youtube => format!("{YOUTUBE_WATCH_URL}{video_id}"),
        Platform::Soundcloud => first_nonempty(entry, &["url", "webpage_url"])
            .map(str::to_string)
            .unwrap_or_else(|| format!("https://soundcloud.com/unknown/{video_id}")),
    };

    Some(NormalizedEntry {
        video_id,
        title,
        uploader,
        video_url,
    })
}

/// SoundCloud ids are numeric in full dumps; YouTube ids are strings.
fn entry_id(entry: &Value) -> Option<String> {
    match entry.get("id")? {
        Value::String(id) if !id.trim().is_empty() => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

/// First field in `fields` that holds a non-empty string, in order.
fn first_nonempty<'a>(entry: &'a Value, fields: &[&str]) -> Option<&'a str> {
    fields.iter().find_map(|field| {
        entry
            .get(*field)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    })
}
