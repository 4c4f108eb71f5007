//! Audio extraction through yt-dlp and final filename resolution.
//!
//! Tracks are first written under an id-keyed temporary name (unique during
//! the write regardless of metadata), then renamed to a human-readable name
//! derived from the track's title and uploader.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ArchiveError;
use crate::platform::Platform;
use crate::ytdlp::YtDlp;

/// Optional display metadata used to pick the final filename. With no title
/// the id-keyed temporary name is kept as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrackLabel<'a> {
    pub title: Option<&'a str>,
    pub uploader: Option<&'a str>,
    pub video_id: Option<&'a str>,
}

/// Downloads one track as mp3 at maximum quality and returns the final path.
pub fn download_audio(
    tool: &YtDlp,
    video_url: &str,
    output_dir: &Path,
    label: TrackLabel<'_>,
    platform: Platform,
) -> Result<PathBuf, ArchiveError> {
    fs::create_dir_all(output_dir)?;

    let template = output_dir.join("%(id)s.%(ext)s");
    let mut args: Vec<String> = vec![
        "-x".into(),
        "--audio-format".into(),
        "mp3".into(),
        "--audio-quality".into(),
        "0".into(),
    ];
    for arg in platform.audio_format_args() {
        args.push((*arg).into());
    }
    args.push("-o".into());
    args.push(template.to_string_lossy().into_owned());
    args.push("--print".into());
    args.push("after_move:filepath".into());
    args.push(video_url.into());

    let output = tool.run(&args)?;
    if !output.success() {
        return Err(ArchiveError::ToolInvocation(
            output.error_message("yt-dlp failed to download audio"),
        ));
    }

    // The final output line is the resulting file path (--print after_move).
    let reported = output
        .stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .next_back()
        .ok_or_else(|| {
            ArchiveError::ToolInvocation("yt-dlp did not report a file path".to_string())
        })?;
    let original = PathBuf::from(reported);

    let Some(title) = label.title else {
        return Ok(original);
    };

    let target = resolve_target_path(output_dir, &original, title, label.uploader, label.video_id);
    if target != original {
        fs::rename(&original, &target)?;
    }
    Ok(target)
}

/// Picks the final filename for a downloaded track.
///
/// A title that already contains a hyphen is assumed to encode
/// "artist - track" and is used verbatim; otherwise the uploader is prefixed
/// when known. On collision the track id is appended to the stem; without an
/// id the id-keyed temporary name is kept so no existing file is overwritten.
fn resolve_target_path(
    output_dir: &Path,
    original: &Path,
    title: &str,
    uploader: Option<&str>,
    video_id: Option<&str>,
) -> PathBuf {
    let ext = original
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();

    let stem = if title.contains('-') {
        title.to_string()
    } else if let Some(uploader) = uploader {
        format!("{uploader} - {title}")
    } else {
        title.to_string()
    };

    let candidate = output_dir.join(format!("{stem}{ext}"));
    if candidate.exists() && candidate != original {
        return match video_id {
            Some(id) => output_dir.join(format!("{stem}_{id}{ext}")),
            None => original.to_path_buf(),
        };
    }
    candidate
}
