#![forbid(unsafe_code)]

//! Command-line entry point: downloads every track of a YouTube or SoundCloud
//! playlist as audio and records each download in the local catalog so later
//! runs only fetch what is new.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use playlist_archiver::catalog::{CatalogStore, VideoRow};
use playlist_archiver::downloader::{TrackLabel, download_audio};
use playlist_archiver::platform::{Platform, extract_playlist_id};
use playlist_archiver::playlist::{fetch_playlist, normalize_entries};
use playlist_archiver::ytdlp::YtDlp;

#[derive(Parser, Debug)]
#[command(
    name = "archive_playlist",
    about = "Download playlist audio with yt-dlp and record it in a local catalog"
)]
struct Args {
    /// YouTube or SoundCloud playlist URL.
    #[arg(long, env = "ARCHIVER_PLAYLIST_URL")]
    playlist_url: String,

    /// Catalog database file.
    #[arg(long, env = "ARCHIVER_DB_PATH", default_value = "catalog.db")]
    db_path: PathBuf,

    /// Directory to store audio files.
    #[arg(long, env = "ARCHIVER_DOWNLOAD_DIR", default_value = "downloads")]
    download_dir: PathBuf,
}

#[derive(Debug, Default, PartialEq, Eq)]
struct RunStats {
    downloaded: usize,
    skipped: usize,
    failed: usize,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run(&args, &YtDlp::new()).await {
        Ok(stats) => {
            println!();
            println!(
                "Run complete: {} downloaded, {} skipped, {} failed",
                stats.downloaded, stats.skipped, stats.failed
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

/// One full pass over the playlist. Setup failures (URL classification,
/// catalog access, playlist fetch) abort the run; per-entry failures are
/// logged and counted so a single bad track never aborts the batch. The
/// catalog connection is released when `catalog` drops, on every exit path.
async fn run(args: &Args, tool: &YtDlp) -> Result<RunStats> {
    let platform = Platform::detect(&args.playlist_url)?;
    let playlist_id = extract_playlist_id(&args.playlist_url)?;
    tool.ensure_available()?;

    let catalog = CatalogStore::open(&args.db_path)
        .await
        .context("opening catalog database")?;
    catalog
        .ensure_schema()
        .await
        .context("initializing catalog schema")?;
    catalog
        .upsert_playlist(&playlist_id, &args.playlist_url, None)
        .await
        .context("recording playlist")?;
    let existing = catalog
        .existing_video_ids(&playlist_id)
        .await
        .context("loading recorded downloads")?;

    let playlist =
        fetch_playlist(tool, &args.playlist_url, platform).context("fetching playlist")?;
    if let Some(title) = playlist.title.as_deref() {
        // The first upsert ran before the fetch, so refresh the title now
        // that the playlist metadata is known.
        catalog
            .upsert_playlist(&playlist_id, &args.playlist_url, Some(title))
            .await
            .context("refreshing playlist title")?;
    }

    let entries = normalize_entries(playlist.entries(), platform);
    println!("Found {} entries in playlist {}", entries.len(), playlist_id);

    let mut stats = RunStats::default();
    let total = entries.len();
    for (index, entry) in entries.iter().enumerate() {
        let current = index + 1;
        if existing.contains(&entry.video_id) {
            println!(
                "[{current}/{total}] Skipping {} (already recorded)",
                entry.video_id
            );
            stats.skipped += 1;
            continue;
        }

        println!("[{current}/{total}] Downloading {}", entry.video_id);
        let label = TrackLabel {
            title: Some(&entry.title),
            uploader: Some(&entry.uploader),
            video_id: Some(&entry.video_id),
        };
        let file_path =
            match download_audio(tool, &entry.video_url, &args.download_dir, label, platform) {
                Ok(path) => path,
                Err(err) => {
                    eprintln!("  Warning: failed to download {}: {err}", entry.video_id);
                    stats.failed += 1;
                    continue;
                }
            };

        // The recorded title is the filename stem actually written to disk,
        // not the source metadata title.
        let title = file_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| entry.video_id.clone());
        let video = VideoRow {
            playlist_id: playlist_id.clone(),
            video_id: entry.video_id.clone(),
            title,
            video_url: entry.video_url.clone(),
            downloaded_at: Utc::now().to_rfc3339(),
            file_path: file_path.to_string_lossy().into_owned(),
        };
        match catalog.insert_video(&video).await {
            Ok(()) => stats.downloaded += 1,
            Err(err) => {
                eprintln!("  Warning: failed to record {}: {err}", entry.video_id);
                stats.failed += 1;
            }
        }
    }

    Ok(stats)
}
