//! # Backend Kinds
//!
//! The families of resources a player knows how to route, and the URL
//! recognition table for each of them.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::error;

/// A family of media resources served by one kind of backend.
///
/// Use [`BackendKind::Custom`] for backends the built-in tables do not know
/// about; such kinds only match through their factory's own `can_handle`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    YouTube,
    SoundCloud,
    Vimeo,
    Facebook,
    Streamable,
    Vidme,
    Wistia,
    Twitch,
    DailyMotion,
    /// Plain audio/video files and HLS/DASH manifests
    File,
    Custom(String),
}

impl BackendKind {
    /// Hosted kinds in the order they are tried. `File` is not listed: it
    /// is the fallback.
    pub const DEFAULT_ORDER: [BackendKind; 9] = [
        BackendKind::YouTube,
        BackendKind::SoundCloud,
        BackendKind::Vimeo,
        BackendKind::Facebook,
        BackendKind::Streamable,
        BackendKind::Vidme,
        BackendKind::Wistia,
        BackendKind::Twitch,
        BackendKind::DailyMotion,
    ];

    /// Returns `true` if the built-in recognition table for this kind
    /// accepts `url`.
    pub fn matches(&self, url: &str) -> bool {
        match self {
            BackendKind::YouTube => is_match(&YOUTUBE, url),
            BackendKind::SoundCloud => is_match(&SOUNDCLOUD, url),
            BackendKind::Vimeo => is_match(&VIMEO, url),
            BackendKind::Facebook => is_match(&FACEBOOK, url),
            BackendKind::Streamable => is_match(&STREAMABLE, url),
            BackendKind::Vidme => is_match(&VIDME, url),
            BackendKind::Wistia => is_match(&WISTIA, url),
            BackendKind::Twitch => is_match(&TWITCH_VIDEO, url) || is_match(&TWITCH_CHANNEL, url),
            BackendKind::DailyMotion => is_match(&DAILYMOTION, url),
            BackendKind::File => {
                is_match(&AUDIO_EXTENSIONS, url)
                    || is_match(&VIDEO_EXTENSIONS, url)
                    || is_match(&HLS_EXTENSIONS, url)
                    || is_match(&DASH_EXTENSIONS, url)
            }
            BackendKind::Custom(_) => false,
        }
    }

    /// Stable lowercase name, as used in configuration.
    pub fn name(&self) -> &str {
        match self {
            BackendKind::YouTube => "youtube",
            BackendKind::SoundCloud => "soundcloud",
            BackendKind::Vimeo => "vimeo",
            BackendKind::Facebook => "facebook",
            BackendKind::Streamable => "streamable",
            BackendKind::Vidme => "vidme",
            BackendKind::Wistia => "wistia",
            BackendKind::Twitch => "twitch",
            BackendKind::DailyMotion => "dailymotion",
            BackendKind::File => "file",
            BackendKind::Custom(name) => name,
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

type Pattern = Lazy<Option<Regex>>;

/// Compiles a built-in pattern. One that fails to compile matches nothing.
fn pattern(re: &str) -> Option<Regex> {
    match Regex::new(re) {
        Ok(regex) => Some(regex),
        Err(err) => {
            error!(pattern = re, error = %err, "Invalid built-in URL pattern");
            None
        }
    }
}

fn is_match(pattern: &Pattern, url: &str) -> bool {
    pattern.iter().any(|regex| regex.is_match(url))
}

static YOUTUBE: Pattern = Lazy::new(|| {
    pattern(
        r"(?:youtu\.be/|youtube\.com/(?:embed/|v/|watch\?v=|watch\?.+&v=))(?:\w|-){11}|youtube\.com/playlist\?list=",
    )
});
static SOUNDCLOUD: Pattern = Lazy::new(|| pattern(r"(?:soundcloud\.com|snd\.sc)/.+$"));
static VIMEO: Pattern = Lazy::new(|| pattern(r"vimeo\.com/.+"));
static FACEBOOK: Pattern =
    Lazy::new(|| pattern(r"facebook\.com/(?:[^/?].+/)?video(?:s|\.php)[/?].*$"));
static STREAMABLE: Pattern = Lazy::new(|| pattern(r"streamable\.com/[a-z0-9]+$"));
static VIDME: Pattern = Lazy::new(|| pattern(r"vid\.me/[a-z0-9]+$"));
static WISTIA: Pattern = Lazy::new(|| pattern(r"(?:wistia\.com|wi\.st)/(?:medias|embed)/.*$"));
static TWITCH_VIDEO: Pattern = Lazy::new(|| pattern(r"(?:www\.)?twitch\.tv/videos/\d+(?:$|\?)"));
static TWITCH_CHANNEL: Pattern =
    Lazy::new(|| pattern(r"(?:www\.|go\.)?twitch\.tv/[a-z0-9_]+(?:$|\?)"));
static DAILYMOTION: Pattern = Lazy::new(|| {
    pattern(
        r"^(?:https?:)?(?://)?(?:www\.)?(?:dailymotion\.com(?:/embed)?/video|dai\.ly)/[a-zA-Z0-9]+(?:_[\w-]+)?$",
    )
});
static AUDIO_EXTENSIONS: Pattern = Lazy::new(|| {
    pattern(r"(?i)\.(?:m4a|mp4a|mpga|mp2|mp2a|mp3|m2a|m3a|wav|weba|aac|oga|spx|flac|opus)(?:$|\?)")
});
static VIDEO_EXTENSIONS: Pattern =
    Lazy::new(|| pattern(r"(?i)\.(?:mp4|og[gv]|webm|mov|m4v)(?:$|\?)"));
static HLS_EXTENSIONS: Pattern = Lazy::new(|| pattern(r"(?i)\.m3u8(?:$|\?)"));
static DASH_EXTENSIONS: Pattern = Lazy::new(|| pattern(r"(?i)\.mpd(?:$|\?)"));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_built_in_patterns_compile() {
        let patterns: [&Pattern; 14] = [
            &YOUTUBE,
            &SOUNDCLOUD,
            &VIMEO,
            &FACEBOOK,
            &STREAMABLE,
            &VIDME,
            &WISTIA,
            &TWITCH_VIDEO,
            &TWITCH_CHANNEL,
            &DAILYMOTION,
            &AUDIO_EXTENSIONS,
            &VIDEO_EXTENSIONS,
            &HLS_EXTENSIONS,
            &DASH_EXTENSIONS,
        ];
        for compiled in patterns {
            assert!(compiled.is_some());
        }
    }

    #[test]
    fn test_invalid_pattern_matches_nothing() {
        let broken: Pattern = Lazy::new(|| pattern(r"(unclosed"));
        assert!(broken.is_none());
        assert!(!is_match(&broken, "https://example.com/(unclosed"));
    }

    #[test]
    fn test_youtube_urls() {
        let kind = BackendKind::YouTube;
        assert!(kind.matches("https://www.youtube.com/watch?v=oUFJJNQGwhk"));
        assert!(kind.matches("https://youtu.be/oUFJJNQGwhk"));
        assert!(kind.matches("https://www.youtube.com/embed/oUFJJNQGwhk"));
        assert!(kind.matches("https://www.youtube.com/watch?feature=share&v=oUFJJNQGwhk"));
        assert!(kind.matches("https://www.youtube.com/playlist?list=PLRfhDHeBTBJ7MU5DX4P_oBIRN457ah9v"));
        assert!(!kind.matches("https://www.youtube.com/watch?v=short"));
        assert!(!kind.matches("https://vimeo.com/90509568"));
    }

    #[test]
    fn test_hosted_urls() {
        assert!(BackendKind::SoundCloud.matches("https://soundcloud.com/miami-nights-1984/accelerated"));
        assert!(BackendKind::SoundCloud.matches("https://snd.sc/abc"));
        assert!(BackendKind::Vimeo.matches("https://vimeo.com/90509568"));
        assert!(BackendKind::Facebook.matches("https://www.facebook.com/facebook/videos/10153231379946729/"));
        assert!(BackendKind::Streamable.matches("https://streamable.com/moo"));
        assert!(BackendKind::Vidme.matches("https://vid.me/5fQd"));
        assert!(!BackendKind::Vidme.matches("https://vid.me/5FQD"));
        assert!(BackendKind::Wistia.matches("https://home.wistia.com/medias/e4a27b971d"));
        assert!(BackendKind::Twitch.matches("https://www.twitch.tv/videos/106400740"));
        assert!(BackendKind::Twitch.matches("https://www.twitch.tv/kronovi"));
        assert!(BackendKind::DailyMotion.matches("https://www.dailymotion.com/video/x5e9eog"));
        assert!(BackendKind::DailyMotion.matches("https://dai.ly/x5e9eog"));
        assert!(!BackendKind::DailyMotion.matches("https://example.com/video/x5e9eog"));
    }

    #[test]
    fn test_file_urls() {
        let kind = BackendKind::File;
        assert!(kind.matches("https://example.com/song.mp3"));
        assert!(kind.matches("https://example.com/movie.MP4"));
        assert!(kind.matches("https://example.com/movie.webm?token=abc"));
        assert!(kind.matches("https://example.com/live/index.m3u8"));
        assert!(kind.matches("https://example.com/manifest.mpd"));
        assert!(kind.matches("/home/user/Music/track.flac"));
        assert!(!kind.matches("https://example.com/page.html"));
        assert!(!kind.matches("https://example.com/song.mp3.html"));
    }

    #[test]
    fn test_custom_kinds_match_nothing() {
        assert!(!BackendKind::Custom("mixcloud".into()).matches("https://www.mixcloud.com/x/y/"));
    }

    #[test]
    fn test_names_round_trip_through_serde() {
        assert_eq!(BackendKind::DailyMotion.to_string(), "dailymotion");
        assert_eq!(BackendKind::Custom("mixcloud".into()).name(), "mixcloud");
        assert_eq!(serde_json::to_string(&BackendKind::YouTube).unwrap(), "\"youtube\"");
        let kind: BackendKind = serde_json::from_str("\"vimeo\"").unwrap();
        assert_eq!(kind, BackendKind::Vimeo);
    }

    #[test]
    fn test_default_order_excludes_fallback() {
        assert!(!BackendKind::DEFAULT_ORDER.contains(&BackendKind::File));
        assert_eq!(BackendKind::DEFAULT_ORDER[0], BackendKind::YouTube);
    }
}
