//! Source platform detection and playlist id extraction.
//!
//! Everything platform-specific in the crate (metadata field precedence,
//! yt-dlp argument sets, URL construction) hangs off the `Platform` enum so
//! that supporting a third platform means extending one table per component.

use url::Url;

use crate::error::ArchiveError;

pub const YOUTUBE_WATCH_URL: &str = "https://www.youtube.com/watch?v=";

/// Closed set of supported source platforms.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Platform {
    Youtube,
    Soundcloud,
}

impl Platform {
    /// Classifies a playlist URL by its host.
    pub fn detect(playlist_url: &str) -> Result<Self, ArchiveError> {
        let parsed = Url::parse(playlist_url).map_err(|err| {
            ArchiveError::InvalidPlaylistUrl(format!("{playlist_url}: {err}"))
        })?;
        let host = parsed.host_str().unwrap_or_default().to_ascii_lowercase();

        if host.contains("youtube.com") || host.contains("youtu.be") {
            Ok(Platform::Youtube)
        } else if host.contains("soundcloud.com") {
            Ok(Platform::Soundcloud)
        } else {
            Err(ArchiveError::InvalidPlaylistUrl(
                "unsupported platform; URL must be from YouTube or SoundCloud".to_string(),
            ))
        }
    }

    /// Title field precedence when normalizing a raw entry.
    pub fn title_fields(self) -> &'static [&'static str] {
        match self {
            Platform::Youtube => &["title"],
            Platform::Soundcloud => &["title", "track", "display_name"],
        }
    }

    /// Uploader field precedence when normalizing a raw entry.
    pub fn uploader_fields(self) -> &'static [&'static str] {
        match self {
            Platform::Youtube => &["uploader", "channel"],
            Platform::Soundcloud => &["uploader", "creator", "artist", "channel"],
        }
    }

    /// Arguments for the playlist dump. YouTube uses a flat listing because
    /// full detail is fetched again per-video at download time; SoundCloud
    /// flat entries omit track titles, so it gets the full dump.
    pub fn playlist_dump_args(self) -> &'static [&'static str] {
        match self {
            Platform::Youtube => &["--flat-playlist", "-J"],
            Platform::Soundcloud => &["-J"],
        }
    }

    /// Extra download arguments. YouTube needs an explicit format selector
    /// for best audio; SoundCloud exposes a single stream.
    pub fn audio_format_args(self) -> &'static [&'static str] {
        match self {
            Platform::Youtube => &["-f", "bestaudio"],
            Platform::Soundcloud => &[],
        }
    }
}

/// Extracts the stable playlist identifier used to key catalog rows.
///
/// YouTube playlists carry a `list` query parameter; SoundCloud has no stable
/// short id available from the URL alone, so the URL itself is the identifier.
pub fn extract_playlist_id(playlist_url: &str) -> Result<String, ArchiveError> {
    match Platform::detect(playlist_url)? {
        Platform::Youtube => {
            let parsed = Url::parse(playlist_url).map_err(|err| {
                ArchiveError::InvalidPlaylistUrl(format!("{playlist_url}: {err}"))
            })?;
            parsed
                .query_pairs()
                .find(|(key, _)| key == "list")
                .map(|(_, value)| value.into_owned())
                .filter(|value| !value.is_empty())
                .ok_or_else(|| {
                    ArchiveError::InvalidPlaylistUrl(
                        "YouTube playlist URL must include a 'list' query parameter".to_string(),
                    )
                })
        }
        Platform::Soundcloud => Ok(playlist_url.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_youtube_hosts() {
        for url in [
            "https://www.youtube.com/playlist?list=PL123",
            "https://music.youtube.com/playlist?list=PL123",
            "https://youtu.be/abc?list=PL123",
        ] {
            assert_eq!(Platform::detect(url).unwrap(), Platform::Youtube);
        }
    }

    #[test]
    fn detects_soundcloud_hosts() {
        let url = "https://soundcloud.com/artist/sets/mix";
        assert_eq!(Platform::detect(url).unwrap(), Platform::Soundcloud);
    }

    #[test]
    fn rejects_unsupported_hosts() {
        let err = Platform::detect("https://vimeo.com/playlist?list=1").unwrap_err();
        assert!(matches!(err, ArchiveError::InvalidPlaylistUrl(_)));
    }

    #[test]
    fn rejects_malformed_urls() {
        let err = Platform::detect("not a url").unwrap_err();
        assert!(matches!(err, ArchiveError::InvalidPlaylistUrl(_)));
    }

    #[test]
    fn extracts_youtube_list_parameter() {
        let id = extract_playlist_id(
            "https://www.youtube.com/playlist?index=3&list=PLxyz42",
        )
        .unwrap();
        assert_eq!(id, "PLxyz42");
    }

    #[test]
    fn youtube_url_without_list_fails() {
        let err = extract_playlist_id("https://www.youtube.com/watch?v=abc").unwrap_err();
        assert!(matches!(err, ArchiveError::InvalidPlaylistUrl(_)));
    }

    #[test]
    fn youtube_url_with_empty_list_fails() {
        let err = extract_playlist_id("https://www.youtube.com/playlist?list=").unwrap_err();
        assert!(matches!(err, ArchiveError::InvalidPlaylistUrl(_)));
    }

    #[test]
    fn soundcloud_id_is_the_url_itself() {
        let url = "https://soundcloud.com/artist/sets/summer-mix";
        assert_eq!(extract_playlist_id(url).unwrap(), url);
    }
}
