//! # Cache Index
//!
//! In-memory mapping from remote names to remote store IDs, persisted between
//! runs to avoid re-querying the remote for objects already known.
//!
//! Entries are **hints, not guarantees**: the remote may have changed since an
//! entry was recorded. A cache hit is taken at face value on read paths; any
//! code about to mutate the remote re-checks existence first, and a full
//! rebuild from a fresh remote enumeration recovers from out-of-band changes.
//!
//! ## Wire format
//!
//! The persisted form is a JSON document with two string-keyed maps:
//!
//! ```json
//! {
//!   "folders": { "root:SessionLogs": "fold-1", "fold-1:20241126_100200": "fold-2" },
//!   "files":   { "fold-2:session_log.json": { "id": "file-9", "uploaded_at": "..." } }
//! }
//! ```
//!
//! Composite keys join the two components with `:` and are split on the
//! *first* `:` when decoding; remote IDs never contain `:`, object names may.
//! The literal parent `root` marks a folder with no recorded parent.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::warn;

use crate::session::SessionId;

const ROOT_SENTINEL: &str = "root";
const KEY_SEPARATOR: char = ':';

/// Parent of a cached folder mapping.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ParentRef {
    /// No recorded parent; the folder was looked up store-wide.
    Root,
    /// A parent folder with a known remote id.
    Folder(String),
}

impl ParentRef {
    fn encode(&self) -> &str {
        match self {
            ParentRef::Root => ROOT_SENTINEL,
            ParentRef::Folder(id) => id,
        }
    }

    fn decode(raw: &str) -> Self {
        if raw == ROOT_SENTINEL {
            ParentRef::Root
        } else {
            ParentRef::Folder(raw.to_string())
        }
    }
}

/// Key of a folder mapping: parent scope plus folder name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FolderKey {
    pub parent: ParentRef,
    pub name: String,
}

impl FolderKey {
    /// A folder looked up without a parent constraint.
    pub fn root(name: impl Into<String>) -> Self {
        FolderKey {
            parent: ParentRef::Root,
            name: name.into(),
        }
    }

    /// A folder under a known parent id.
    pub fn under(parent_id: impl Into<String>, name: impl Into<String>) -> Self {
        FolderKey {
            parent: ParentRef::Folder(parent_id.into()),
            name: name.into(),
        }
    }

    fn encode(&self) -> String {
        format!("{}{}{}", self.parent.encode(), KEY_SEPARATOR, self.name)
    }

    fn decode(raw: &str) -> Option<Self> {
        let (parent, name) = raw.split_once(KEY_SEPARATOR)?;
        Some(FolderKey {
            parent: ParentRef::decode(parent),
            name: name.to_string(),
        })
    }
}

/// Key of a file mapping: containing folder id plus file name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileKey {
    pub folder_id: String,
    pub name: String,
}

impl FileKey {
    pub fn new(folder_id: impl Into<String>, name: impl Into<String>) -> Self {
        FileKey {
            folder_id: folder_id.into(),
            name: name.into(),
        }
    }

    fn encode(&self) -> String {
        format!("{}{}{}", self.folder_id, KEY_SEPARATOR, self.name)
    }

    fn decode(raw: &str) -> Option<Self> {
        let (folder_id, name) = raw.split_once(KEY_SEPARATOR)?;
        Some(FileKey {
            folder_id: folder_id.to_string(),
            name: name.to_string(),
        })
    }
}

/// Value of a file mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Remote file id
    pub id: String,
    /// When the entry was recorded; later wins when merging
    #[serde(rename = "uploaded_at")]
    pub modified_at: DateTime<Utc>,
}

/// The in-memory cache index.
///
/// `BTreeMap` keeps the persisted document key-ordered, so successive saves of
/// the same state are byte-identical.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheIndex {
    folders: BTreeMap<FolderKey, String>,
    files: BTreeMap<FileKey, FileEntry>,
}

impl CacheIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a folder id hint.
    pub fn lookup_folder(&self, key: &FolderKey) -> Option<&str> {
        self.folders.get(key).map(String::as_str)
    }

    /// Look up a file entry hint.
    pub fn lookup_file(&self, key: &FileKey) -> Option<&FileEntry> {
        self.files.get(key)
    }

    /// Record a confirmed folder id, replacing any previous mapping.
    pub fn record_folder(&mut self, key: FolderKey, id: impl Into<String>) {
        self.folders.insert(key, id.into());
    }

    /// Record a confirmed file, replacing any previous mapping.
    pub fn record_file(
        &mut self,
        key: FileKey,
        id: impl Into<String>,
        modified_at: DateTime<Utc>,
    ) {
        self.files.insert(
            key,
            FileEntry {
                id: id.into(),
                modified_at,
            },
        );
    }

    pub fn folder_count(&self) -> usize {
        self.folders.len()
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.folders.is_empty() && self.files.is_empty()
    }

    /// Key-wise union of two indices, `self` taking precedence.
    ///
    /// Folder mappings have no timestamp, so on conflict `self`'s id is kept.
    /// File mappings keep whichever side has the later `modified_at`; exact
    /// ties keep `self`'s entry.
    pub fn merge(mut self, other: CacheIndex) -> CacheIndex {
        for (key, id) in other.folders {
            self.folders.entry(key).or_insert(id);
        }
        for (key, entry) in other.files {
            match self.files.get(&key) {
                Some(existing) if existing.modified_at >= entry.modified_at => {}
                _ => {
                    self.files.insert(key, entry);
                }
            }
        }
        self
    }

    /// Session ids whose folder mapping sits directly under `parent_id`.
    ///
    /// Folder names that do not parse as session ids are skipped.
    pub fn sessions_under(&self, parent_id: &str) -> BTreeSet<SessionId> {
        self.folders
            .iter()
            .filter(|(key, _)| matches!(&key.parent, ParentRef::Folder(id) if id == parent_id))
            .filter_map(|(key, _)| SessionId::parse(&key.name).ok())
            .collect()
    }
}

#[derive(Serialize, Deserialize, Default)]
struct CacheDocument {
    #[serde(default)]
    folders: BTreeMap<String, String>,
    #[serde(default)]
    files: BTreeMap<String, FileEntry>,
}

impl Serialize for CacheIndex {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let doc = CacheDocument {
            folders: self
                .folders
                .iter()
                .map(|(key, id)| (key.encode(), id.clone()))
                .collect(),
            files: self
                .files
                .iter()
                .map(|(key, entry)| (key.encode(), entry.clone()))
                .collect(),
        };
        doc.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CacheIndex {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let doc = CacheDocument::deserialize(deserializer)?;
        let mut index = CacheIndex::new();
        for (raw, id) in doc.folders {
            match FolderKey::decode(&raw) {
                Some(key) => index.folders.insert(key, id),
                None => return Err(D::Error::custom(format!("malformed folder key {:?}", raw))),
            };
        }
        for (raw, entry) in doc.files {
            match FileKey::decode(&raw) {
                Some(key) => index.files.insert(key, entry),
                None => return Err(D::Error::custom(format!("malformed file key {:?}", raw))),
            };
        }
        Ok(index)
    }
}

impl CacheIndex {
    /// Decode a persisted document, treating malformed input as an empty
    /// index. A corrupt cache only costs re-queries, never a failed run.
    pub fn decode_lossy(data: &[u8]) -> CacheIndex {
        match serde_json::from_slice(data) {
            Ok(index) => index,
            Err(e) => {
                warn!(error = %e, "cache document did not parse; starting from an empty index");
                CacheIndex::new()
            }
        }
    }
}
