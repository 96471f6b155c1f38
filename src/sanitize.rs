//! Platform-aware filename sanitization

use crate::types::Track;

/// Characters Windows refuses in file names
const WINDOWS_FORBIDDEN: &[char] = &['<', '>', ':', '"', '\\', '/', '|', '?', '*'];

/// Filename rules to sanitize for
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlatformFamily {
    /// Forbids a fixed character set; offending characters are stripped
    Windows,
    /// Only the path separator is special; it is swapped for a backslash
    Unix,
}

impl PlatformFamily {
    /// The family of the platform this binary was built for
    pub fn current() -> Self {
        if cfg!(windows) {
            PlatformFamily::Windows
        } else {
            PlatformFamily::Unix
        }
    }

    fn clean(self, text: &str) -> String {
        match self {
            PlatformFamily::Windows => text
                .chars()
                .filter(|c| !WINDOWS_FORBIDDEN.contains(c))
                .collect(),
            PlatformFamily::Unix => text.replace('/', "\\"),
        }
    }
}

/// Sanitize `title` and `artist` for `family`
pub fn sanitize_for(family: PlatformFamily, title: &str, artist: &str) -> (String, String) {
    (family.clean(title), family.clean(artist))
}

/// Sanitize `title` and `artist` for the current platform
pub fn sanitize(title: &str, artist: &str) -> (String, String) {
    sanitize_for(PlatformFamily::current(), title, artist)
}

/// File name a track is written to: `"{title} - {artist}.{extension}"` after sanitization
pub fn destination_file_name(track: &Track, extension: &str) -> String {
    let (title, artist) = sanitize(&track.title, &track.artist);
    format!("{title} - {artist}.{}", extension.trim_start_matches('.'))
}
