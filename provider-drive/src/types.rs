//! Drive API wire types
//!
//! Data structures for (de)serializing Drive API v3 requests and responses.

use serde::{Deserialize, Serialize};

/// MIME type that marks a node as a folder
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Drive API file resource
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    /// Store-assigned ID
    pub id: String,

    /// Node name
    pub name: String,

    /// MIME type; folders use [`FOLDER_MIME_TYPE`]
    pub mime_type: String,

    /// Size in bytes as a decimal string (omitted for folders)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,

    /// Modification time (RFC 3339)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<String>,

    /// MD5 checksum (for files)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub md5_checksum: Option<String>,
}

impl DriveFile {
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME_TYPE
    }
}

/// Drive API files.list response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilesListResponse {
    /// Files on this page
    #[serde(default)]
    pub files: Vec<DriveFile>,

    /// Token for next page; absent on the last page
    pub next_page_token: Option<String>,
}

/// Metadata body for files.create (folders and resumable upload initiation)
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNodeRequest {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub parents: Vec<String>,
}

/// Minimal files.create response when only `fields=id` is requested
#[derive(Debug, Deserialize)]
pub struct CreatedNodeResponse {
    pub id: String,
}
