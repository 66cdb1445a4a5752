//! Extra-media column contract — JSON text encoding and fail-soft decoding.
//!
//! The list of additional media URIs is stored as a single TEXT column holding
//! a JSON array of strings. Writing always produces that form. Reading accepts
//! anything: rows written by the single-image app have no value at all, and
//! hand-edited or half-migrated rows may hold garbage. None of that may block
//! access to the rest of the card, so every unreadable value becomes an empty
//! list, with the reason kept visible as [`MediaDecode::Fallback`].

use serde::{Deserialize, Serialize};

/// Why a persisted extra-media value was replaced by an empty list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// NULL, or the column predates the multi-media schema.
    Missing,
    /// Empty or whitespace-only text.
    Empty,
    /// The column holds a non-text value (integer, real, blob).
    NotText,
    /// The text is not valid JSON.
    Malformed(String),
    /// Valid JSON, but not an array of strings.
    NotAStringList,
}

impl std::fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing => f.write_str("missing"),
            Self::Empty => f.write_str("empty"),
            Self::NotText => f.write_str("not text"),
            Self::Malformed(e) => write!(f, "malformed JSON: {e}"),
            Self::NotAStringList => f.write_str("not a list of strings"),
        }
    }
}

/// Outcome of decoding the extra-media column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaDecode {
    Decoded(Vec<String>),
    Fallback(FallbackReason),
}

impl MediaDecode {
    /// The decoded URIs, or an empty list for any fallback.
    pub fn into_uris(self) -> Vec<String> {
        match self {
            Self::Decoded(uris) => uris,
            Self::Fallback(_) => Vec::new(),
        }
    }
}

/// Encode an ordered URI list into its column form.
pub fn encode_extra_media(uris: &[String]) -> Result<String, serde_json::Error> {
    serde_json::to_string(uris)
}

/// Decode the column's text value. Never fails.
pub fn decode_extra_media(raw: Option<&str>) -> MediaDecode {
    let Some(raw) = raw else {
        return MediaDecode::Fallback(FallbackReason::Missing);
    };
    if raw.trim().is_empty() {
        return MediaDecode::Fallback(FallbackReason::Empty);
    }

    let value: serde_json::Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => return MediaDecode::Fallback(FallbackReason::Malformed(e.to_string())),
    };

    match value {
        serde_json::Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                serde_json::Value::String(s) => Some(s),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()
            .map(MediaDecode::Decoded)
            .unwrap_or(MediaDecode::Fallback(FallbackReason::NotAStringList)),
        _ => MediaDecode::Fallback(FallbackReason::NotAStringList),
    }
}

/// Rendering hint for a media URI, sniffed from its file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
    Unknown,
}

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "m4v", "webm", "mkv", "avi", "3gp"];
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "heic", "heif", "bmp"];

impl MediaKind {
    /// Classify a URI by extension, ignoring any query string or fragment.
    pub fn from_uri(uri: &str) -> Self {
        let path = uri.split(['?', '#']).next().unwrap_or(uri);
        let file = path.rsplit('/').next().unwrap_or(path);
        let Some((_, ext)) = file.rsplit_once('.') else {
            return Self::Unknown;
        };
        let ext = ext.to_ascii_lowercase();

        if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Self::Video
        } else if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Self::Image
        } else {
            Self::Unknown
        }
    }
}
