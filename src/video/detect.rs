//! Media type detection by file extension.
//!
//! Mirrors what a `mimetypes`-style lookup would answer for a path: a MIME
//! type string when the extension is known, `None` otherwise. Unknown types
//! are never treated as video.

use std::path::Path;

/// Top-level MIME category of a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Image,
    Audio,
    Text,
    Application,
}

impl MediaKind {
    fn from_mime(mime: &str) -> Option<Self> {
        match mime.split('/').next()? {
            "video" => Some(Self::Video),
            "image" => Some(Self::Image),
            "audio" => Some(Self::Audio),
            "text" => Some(Self::Text),
            "application" => Some(Self::Application),
            _ => None,
        }
    }
}

const MIME_TABLE: &[(&str, &str)] = &[
    // video
    ("mp4", "video/mp4"),
    ("m4v", "video/mp4"),
    ("mov", "video/quicktime"),
    ("qt", "video/quicktime"),
    ("avi", "video/x-msvideo"),
    ("mkv", "video/x-matroska"),
    ("webm", "video/webm"),
    ("flv", "video/x-flv"),
    ("wmv", "video/x-ms-wmv"),
    ("asf", "video/x-ms-asf"),
    ("mpg", "video/mpeg"),
    ("mpeg", "video/mpeg"),
    ("mpe", "video/mpeg"),
    ("m1v", "video/mpeg"),
    ("ts", "video/mp2t"),
    ("mts", "video/mp2t"),
    ("m2ts", "video/mp2t"),
    ("3gp", "video/3gpp"),
    ("3g2", "video/3gpp2"),
    ("ogv", "video/ogg"),
    ("vob", "video/dvd"),
    // image
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("bmp", "image/bmp"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
    ("webp", "image/webp"),
    // audio
    ("mp3", "audio/mpeg"),
    ("wav", "audio/x-wav"),
    ("flac", "audio/flac"),
    ("ogg", "audio/ogg"),
    ("m4a", "audio/mp4"),
    ("aac", "audio/aac"),
    // text
    ("txt", "text/plain"),
    ("md", "text/markdown"),
    ("csv", "text/csv"),
    ("html", "text/html"),
    ("htm", "text/html"),
    // application
    ("json", "application/json"),
    ("pdf", "application/pdf"),
    ("zip", "application/zip"),
    ("toml", "application/toml"),
];

/// Guess the MIME type of a path from its extension (case-insensitive)
pub fn guess_mime<P: AsRef<Path>>(path: P) -> Option<&'static str> {
    let ext = path.as_ref().extension()?.to_str()?.to_lowercase();
    MIME_TABLE
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, mime)| *mime)
}

/// Guess the top-level media category of a path, `None` when unknown
pub fn guess_kind<P: AsRef<Path>>(path: P) -> Option<MediaKind> {
    guess_mime(path).and_then(MediaKind::from_mime)
}

/// True only when the path is classified as video
pub fn is_video<P: AsRef<Path>>(path: P) -> bool {
    guess_kind(path) == Some(MediaKind::Video)
}
