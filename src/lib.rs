#![forbid(unsafe_code)]

//! Library behind the `archive_playlist` binary: classify a playlist URL,
//! fetch and normalize its entries through yt-dlp, download each track as
//! audio, and record what was downloaded in a local libsql catalog.

pub mod catalog;
pub mod downloader;
pub mod error;
pub mod platform;
pub mod playlist;
pub mod ytdlp;

pub use error::ArchiveError;
