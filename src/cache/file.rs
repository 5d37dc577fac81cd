//! File-backed token store.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::auth::TokenBundle;
use crate::cache::TokenStore;
use crate::error::TrackerError;

/// Token bundle stored as a JSON file.
///
/// Saves go through a sibling `.tmp` file that is renamed over the target, so
/// a reader sees either the previous bundle or the new one.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Create a store backed by `path`. The file need not exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the cache file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and validate the cache file.
    pub fn try_load(&self) -> Result<Option<TokenBundle>, TrackerError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&self.path).map_err(|e| {
            TrackerError::CacheUnavailable(format!("read {}: {e}", self.path.display()))
        })?;
        let bundle: TokenBundle = serde_json::from_str(&contents).map_err(|e| {
            TrackerError::CacheUnavailable(format!("parse {}: {e}", self.path.display()))
        })?;
        if !bundle.is_complete() {
            return Err(TrackerError::CacheUnavailable(format!(
                "{} holds an incomplete bundle",
                self.path.display()
            )));
        }
        Ok(Some(bundle))
    }

    /// Write the cache file, reporting failures.
    pub fn try_save(&self, bundle: &TokenBundle) -> Result<(), TrackerError> {
        if !bundle.is_complete() {
            return Err(TrackerError::CacheUnavailable(
                "refusing to persist an incomplete bundle".to_string(),
            ));
        }
        let unavailable =
            |e: std::io::Error| TrackerError::CacheUnavailable(format!("{}: {e}", self.path.display()));

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(unavailable)?;
        }

        let contents = serde_json::to_vec(bundle)?;
        let tmp_path = self.tmp_path();
        {
            let mut file = fs::File::create(&tmp_path).map_err(unavailable)?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                file.set_permissions(fs::Permissions::from_mode(0o600))
                    .map_err(unavailable)?;
            }
            file.write_all(&contents).map_err(unavailable)?;
            file.sync_all().map_err(unavailable)?;
        }

        fs::rename(&tmp_path, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            unavailable(e)
        })
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "tokens.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Option<TokenBundle> {
        match self.try_load() {
            Ok(Some(bundle)) => {
                debug!(path = %self.path.display(), "Loaded cached tokens");
                Some(bundle)
            }
            Ok(None) => {
                debug!(path = %self.path.display(), "No cached tokens");
                None
            }
            Err(e) => {
                warn!("Ignoring token cache: {e}");
                None
            }
        }
    }

    fn save(&self, bundle: &TokenBundle) {
        match self.try_save(bundle) {
            Ok(()) => debug!(path = %self.path.display(), "Saved tokens to cache"),
            Err(e) => warn!("Could not save tokens: {e}"),
        }
    }
}
