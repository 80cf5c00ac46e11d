use serde::{Deserialize, Serialize};

pub const METADATA_PREFIX: &str = "metadata-";
pub const METADATA_SUFFIX: &str = ".json";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundKind {
    System,
    Custom,
}

impl BackgroundKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackgroundKind::System => "system",
            BackgroundKind::Custom => "custom",
        }
    }
}

/// Sidecar schema. `filename` and `custom_name` are required; any other
/// fields (category, duration, ...) pass through untouched.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BackgroundMeta {
    pub filename: String,
    #[serde(rename = "customName")]
    pub custom_name: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One catalog entry. Serializes as `{ ...metadataFields, type, url }`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BackgroundRecord {
    pub id: String,
    #[serde(rename = "customName")]
    pub custom_name: String,
    pub filename: String,
    #[serde(rename = "type")]
    pub kind: BackgroundKind,
    pub url: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

pub fn metadata_file_name(id: &str) -> String {
    format!("{}{}{}", METADATA_PREFIX, id, METADATA_SUFFIX)
}

/// Extracts `<id>` from a `metadata-<id>.json` file name.
pub fn id_from_metadata_name(name: &str) -> Option<&str> {
    let id = name
        .strip_prefix(METADATA_PREFIX)?
        .strip_suffix(METADATA_SUFFIX)?;
    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}

/// Ids and asset filenames become single path components under the asset
/// roots, so anything that could escape a directory is rejected.
pub fn is_safe_component(value: &str) -> bool {
    if value.is_empty() || value == "." || value == ".." {
        return false;
    }
    !value.chars().any(|ch| ch == '/' || ch == '\\' || ch == '\0')
}

pub fn url_escape(input: &str) -> String {
    let mut out = String::new();
    for byte in input.as_bytes() {
        match byte {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'-'
            | b'_'
            | b'.'
            | b'~' => out.push(*byte as char),
            b' ' => out.push_str("%20"),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

/// Derives the playback URL for a record of the given class.
pub fn playback_url(kind: BackgroundKind, id: &str, filename: &str) -> String {
    match kind {
        BackgroundKind::System => format!("/assets/{}", url_escape(filename)),
        BackgroundKind::Custom => {
            format!("/custom-assets/{}/{}", url_escape(id), url_escape(filename))
        }
    }
}
