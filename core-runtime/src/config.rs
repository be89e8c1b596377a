//! # Configuration Management
//!
//! Builder-based configuration for the sync engine. The builder collects the
//! tunable settings and the injected bridge handles, then validates everything
//! up front so a misconfigured engine fails at construction rather than
//! mid-run.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .base_dir("./logs")
//!     .remote_root("SessionLogs")
//!     .object_store(Arc::new(connector))
//!     .build()?;
//! ```
//!
//! With the `desktop-shims` feature enabled, the file system and clock
//! default to the native `bridge-desktop` implementations; other hosts must
//! inject their own. The object store is always injected explicitly because
//! constructing it requires an access token this crate never sees.

use std::path::PathBuf;
use std::sync::Arc;

use bridge_traits::storage::{FileSystemAccess, ObjectStore};
use bridge_traits::time::Clock;

use crate::error::{Error, Result};

/// Tunable settings for the sync engine.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// Base directory holding one subdirectory per session
    pub base_dir: PathBuf,

    /// Well-known record file name inside each session directory
    pub record_name: String,

    /// Name of the remote root folder holding one subfolder per session
    pub remote_root: String,

    /// Name of the remote folder holding the mirrored cache index
    pub cache_folder_name: String,

    /// File name of the persisted cache index, both locally and remotely
    pub cache_file_name: String,

    /// Whether to mirror the cache index into the remote store
    pub mirror_cache_remotely: bool,

    /// Page size for remote listings (the store caps this at 1000)
    pub page_size: u32,

    /// Hard cap on listing pages per enumeration, against a misbehaving
    /// remote that keeps returning cursors
    pub max_list_pages: u32,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("./logs"),
            record_name: "session_log.json".to_string(),
            remote_root: "SessionLogs".to_string(),
            cache_folder_name: "cache".to_string(),
            cache_file_name: "sync_cache.json".to_string(),
            mirror_cache_remotely: true,
            page_size: 1000,
            max_list_pages: 64,
        }
    }
}

impl SyncSettings {
    /// Validate settings, failing fast on anything the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.base_dir.as_os_str().is_empty() {
            return Err(Error::Config("base_dir must not be empty".to_string()));
        }

        for (field, value) in [
            ("record_name", &self.record_name),
            ("remote_root", &self.remote_root),
            ("cache_folder_name", &self.cache_folder_name),
            ("cache_file_name", &self.cache_file_name),
        ] {
            if value.is_empty() {
                return Err(Error::Config(format!("{} must not be empty", field)));
            }
            if value.contains('/') || value.contains('\\') {
                return Err(Error::Config(format!(
                    "{} must be a plain name, got {:?}",
                    field, value
                )));
            }
        }

        if self.page_size == 0 || self.page_size > 1000 {
            return Err(Error::Config(format!(
                "page_size must be in 1..=1000, got {}",
                self.page_size
            )));
        }

        if self.max_list_pages == 0 {
            return Err(Error::Config(
                "max_list_pages must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

/// Validated engine configuration: settings plus injected bridges.
#[derive(Clone)]
pub struct CoreConfig {
    pub settings: SyncSettings,
    pub file_system: Arc<dyn FileSystemAccess>,
    pub clock: Arc<dyn Clock>,
    pub object_store: Arc<dyn ObjectStore>,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("settings", &self.settings)
            .field("file_system", &"<dyn FileSystemAccess>")
            .field("clock", &"<dyn Clock>")
            .field("object_store", &"<dyn ObjectStore>")
            .finish()
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }
}

/// Builder for [`CoreConfig`].
#[derive(Default)]
pub struct CoreConfigBuilder {
    settings: Option<SyncSettings>,
    base_dir: Option<PathBuf>,
    record_name: Option<String>,
    remote_root: Option<String>,
    mirror_cache_remotely: Option<bool>,
    file_system: Option<Arc<dyn FileSystemAccess>>,
    clock: Option<Arc<dyn Clock>>,
    object_store: Option<Arc<dyn ObjectStore>>,
}

impl CoreConfigBuilder {
    /// Replace the whole settings block at once.
    pub fn settings(mut self, settings: SyncSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Base directory for local session storage.
    pub fn base_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.base_dir = Some(path.into());
        self
    }

    /// Well-known record file name.
    pub fn record_name(mut self, name: impl Into<String>) -> Self {
        self.record_name = Some(name.into());
        self
    }

    /// Remote root folder name.
    pub fn remote_root(mut self, name: impl Into<String>) -> Self {
        self.remote_root = Some(name.into());
        self
    }

    /// Enable or disable the remote cache mirror.
    pub fn mirror_cache_remotely(mut self, enabled: bool) -> Self {
        self.mirror_cache_remotely = Some(enabled);
        self
    }

    /// Inject a file system implementation.
    pub fn file_system(mut self, fs: Arc<dyn FileSystemAccess>) -> Self {
        self.file_system = Some(fs);
        self
    }

    /// Inject a time source.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Inject the remote object store handle (always required).
    pub fn object_store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.object_store = Some(store);
        self
    }

    /// Validate and build the configuration.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for invalid settings and
    /// `Error::CapabilityMissing` for bridges that were neither injected nor
    /// available as desktop defaults.
    pub fn build(self) -> Result<CoreConfig> {
        let mut settings = self.settings.unwrap_or_default();
        if let Some(base_dir) = self.base_dir {
            settings.base_dir = base_dir;
        }
        if let Some(record_name) = self.record_name {
            settings.record_name = record_name;
        }
        if let Some(remote_root) = self.remote_root {
            settings.remote_root = remote_root;
        }
        if let Some(mirror) = self.mirror_cache_remotely {
            settings.mirror_cache_remotely = mirror;
        }
        settings.validate()?;

        let file_system = self
            .file_system
            .or_else(default_file_system)
            .ok_or_else(|| Error::CapabilityMissing {
                capability: "FileSystemAccess".to_string(),
                message: "No file system implementation provided. \
                          Desktop: enable the desktop-shims feature. \
                          Other hosts: inject a platform adapter."
                    .to_string(),
            })?;

        let clock = self
            .clock
            .or_else(default_clock)
            .ok_or_else(|| Error::CapabilityMissing {
                capability: "Clock".to_string(),
                message: "No clock implementation provided.".to_string(),
            })?;

        let object_store = self.object_store.ok_or_else(|| Error::CapabilityMissing {
            capability: "ObjectStore".to_string(),
            message: "No remote store handle provided. Construct a connector \
                      with an authenticated transport and inject it."
                .to_string(),
        })?;

        Ok(CoreConfig {
            settings,
            file_system,
            clock,
            object_store,
        })
    }
}

#[cfg(feature = "desktop-shims")]
fn default_file_system() -> Option<Arc<dyn FileSystemAccess>> {
    Some(Arc::new(bridge_desktop::TokioFileSystem::new()))
}

#[cfg(not(feature = "desktop-shims"))]
fn default_file_system() -> Option<Arc<dyn FileSystemAccess>> {
    None
}

#[cfg(feature = "desktop-shims")]
fn default_clock() -> Option<Arc<dyn Clock>> {
    Some(Arc::new(bridge_traits::time::SystemClock))
}

#[cfg(not(feature = "desktop-shims"))]
fn default_clock() -> Option<Arc<dyn Clock>> {
    None
}
