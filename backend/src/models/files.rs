use std::fs::Metadata;

use serde::Serialize;

use crate::format::{format_size, format_system_time};

/// One row of a directory listing.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub name: String,
    pub size: String,
    pub is_dir: bool,
    pub mod_time: String,
    /// Path relative to the shared directory, `/`-separated.
    pub path: String,
}

impl FileEntry {
    pub fn from_metadata(name: String, path: String, metadata: &Metadata) -> Self {
        let mod_time = metadata
            .modified()
            .map(format_system_time)
            .unwrap_or_default();
        Self {
            name,
            size: format_size(metadata.len()),
            is_dir: metadata.is_dir(),
            mod_time,
            path,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub file: String,
}
