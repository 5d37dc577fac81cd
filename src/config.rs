//! Default locations and intervals.
//!
//! Cache and data files live under the platform data directory, e.g.
//! `~/.local/share/mapit-tracker/` on Linux.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::TrackerError;

/// Application name used for data directory paths
pub const APP_NAME: &str = "mapit-tracker";

/// Token cache file name
pub const TOKEN_FILE: &str = "tokens.json";

/// Reading database file name
pub const DATABASE_FILE: &str = "readings.db";

/// Poll interval of `watch` mode.
pub const WATCH_INTERVAL: Duration = Duration::from_secs(5);

/// Poll interval of `checker` mode.
pub const CHECKER_INTERVAL: Duration = Duration::from_secs(1);

/// Records exported by default.
pub const EXPORT_LIMIT: usize = 1000;

/// Per-user data directory for this application.
pub fn data_dir() -> Result<PathBuf, TrackerError> {
    let base = dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .ok_or_else(|| TrackerError::CacheUnavailable("Could not find a data directory".to_string()))?;
    Ok(base.join(APP_NAME))
}

/// Default token cache path.
pub fn token_cache_path() -> Result<PathBuf, TrackerError> {
    Ok(data_dir()?.join(TOKEN_FILE))
}

/// Default reading database path.
pub fn database_path() -> Result<PathBuf, TrackerError> {
    Ok(data_dir()?.join(DATABASE_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths_share_data_dir() {
        if let (Ok(tokens), Ok(db)) = (token_cache_path(), database_path()) {
            assert_eq!(tokens.parent(), db.parent());
            assert!(tokens.ends_with("mapit-tracker/tokens.json"));
        }
    }
}
