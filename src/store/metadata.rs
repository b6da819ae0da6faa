use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Creation timestamp in the format clients expect (`2024-01-31 13:05:59`).
pub fn default_timestamp() -> String {
    Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryMetadata {
    #[serde(default = "default_timestamp")]
    pub date_created: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl Default for LibraryMetadata {
    fn default() -> Self {
        Self {
            date_created: default_timestamp(),
            description: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMetadata {
    #[serde(default = "default_timestamp")]
    pub date_created: String,
    #[serde(default)]
    pub source: Option<String>,
}

impl Default for DocumentMetadata {
    fn default() -> Self {
        Self {
            date_created: default_timestamp(),
            source: None,
        }
    }
}

/// Chunk metadata always names the owning document; the store relies on it to
/// resolve which document a chunk lands in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub doc_id: String,
    #[serde(default = "default_timestamp")]
    pub date_created: String,
    #[serde(default)]
    pub page_number: Option<u32>,
    #[serde(default)]
    pub summary: Option<String>,
}

impl ChunkMetadata {
    pub fn new(doc_id: impl Into<String>) -> Self {
        Self {
            doc_id: doc_id.into(),
            date_created: default_timestamp(),
            page_number: None,
            summary: None,
        }
    }
}
