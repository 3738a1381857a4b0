//! Application directories anchored to a single `.gridsurv` folder.
//!
//! The settings file and the `logs/` folder live under the OS config directory.
//! Set `GRIDSURV_CONFIG_HOME` to relocate both for tests or portable setups.

use std::path::PathBuf;

use directories::BaseDirs;
use thiserror::Error;

/// Name of the application directory that lives under the config root.
pub const APP_DIR_NAME: &str = ".gridsurv";
/// Environment variable that overrides the config root.
pub const CONFIG_HOME_ENV: &str = "GRIDSURV_CONFIG_HOME";
const LOGS_DIR_NAME: &str = "logs";

#[derive(Debug, Error)]
pub enum AppDirError {
    #[error("No suitable base config directory available for application files")]
    NoBaseDir,
    #[error("Failed to create application directory at {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Return the `.gridsurv` directory, creating it if needed.
pub fn app_root_dir() -> Result<PathBuf, AppDirError> {
    let base = config_base_dir().ok_or(AppDirError::NoBaseDir)?;
    ensure_dir(base.join(APP_DIR_NAME))
}

/// Return `.gridsurv/logs`, creating it if needed.
pub fn logs_dir() -> Result<PathBuf, AppDirError> {
    ensure_dir(app_root_dir()?.join(LOGS_DIR_NAME))
}

fn config_base_dir() -> Option<PathBuf> {
    let override_dir = std::env::var_os(CONFIG_HOME_ENV).map(PathBuf::from);
    resolve_base(override_dir, || {
        BaseDirs::new().map(|dirs| dirs.config_dir().to_path_buf())
    })
}

/// A non-empty override wins over the platform default.
fn resolve_base(
    override_dir: Option<PathBuf>,
    platform: impl FnOnce() -> Option<PathBuf>,
) -> Option<PathBuf> {
    match override_dir {
        Some(path) if !path.as_os_str().is_empty() => Some(path),
        _ => platform(),
    }
}

fn ensure_dir(path: PathBuf) -> Result<PathBuf, AppDirError> {
    std::fs::create_dir_all(&path).map_err(|source| AppDirError::CreateDir {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn override_wins_unless_empty() {
        let platform = || Some(PathBuf::from("/platform"));
        assert_eq!(
            resolve_base(Some(PathBuf::from("/custom")), platform),
            Some(PathBuf::from("/custom"))
        );
        assert_eq!(
            resolve_base(Some(PathBuf::new()), platform),
            Some(PathBuf::from("/platform"))
        );
        assert_eq!(resolve_base(None, || None), None);
    }

    #[test]
    fn ensure_dir_creates_nested_folders() {
        let base = tempdir().unwrap();
        let logs = ensure_dir(base.path().join(APP_DIR_NAME).join(LOGS_DIR_NAME)).unwrap();
        assert!(logs.is_dir());
        assert!(logs.starts_with(base.path().join(APP_DIR_NAME)));
    }
}
