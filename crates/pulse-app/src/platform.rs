//! Per-user directories for configuration, datasets, and logs.

use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("could not determine the OS configuration directory")]
    NoConfigDir,

    #[error("failed to create {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

const APP_NAME: &str = "pulse-globe";

/// Where the globe keeps its files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformDirs {
    /// Holds `config.ron`.
    pub config_dir: PathBuf,
    /// Default home of datasets and textures.
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl PlatformDirs {
    /// OS-conventional locations (XDG, Known Folders, Library). Nothing is
    /// created on disk.
    pub fn resolve() -> Result<Self, PlatformError> {
        let config_base = dirs::config_dir().ok_or(PlatformError::NoConfigDir)?;
        let app_config = config_base.join(APP_NAME);
        let data_dir = dirs::data_dir()
            .map(|dir| dir.join(APP_NAME))
            .unwrap_or_else(|| app_config.join("data"));

        Ok(Self {
            log_dir: app_config.join("logs"),
            config_dir: app_config,
            data_dir,
        })
    }

    /// Everything under `root`, for tests and portable installs.
    pub fn with_root(root: &Path) -> Self {
        let app_dir = root.join(APP_NAME);
        Self {
            config_dir: app_dir.join("config"),
            data_dir: app_dir.join("data"),
            log_dir: app_dir.join("logs"),
        }
    }

    pub fn create_dirs(&self) -> Result<(), PlatformError> {
        for dir in [&self.config_dir, &self.data_dir, &self.log_dir] {
            std::fs::create_dir_all(dir).map_err(|source| PlatformError::Io {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(())
    }

    pub fn resolve_and_create() -> Result<Self, PlatformError> {
        let dirs = Self::resolve()?;
        dirs.create_dirs()?;
        Ok(dirs)
    }

    /// Resolve a configured path: absolute paths are kept, relative ones are
    /// taken relative to `data_dir` when they exist there.
    pub fn data_path(&self, configured: &Path) -> PathBuf {
        if configured.is_absolute() || configured.exists() {
            return configured.to_path_buf();
        }
        let candidate = self.data_dir.join(configured);
        if candidate.exists() {
            candidate
        } else {
            configured.to_path_buf()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_root_layout() {
        let root = Path::new("/tmp/pulse-test");
        let dirs = PlatformDirs::with_root(root);
        assert_eq!(dirs.config_dir, root.join("pulse-globe/config"));
        assert_eq!(dirs.data_dir, root.join("pulse-globe/data"));
        assert_eq!(dirs.log_dir, root.join("pulse-globe/logs"));
    }

    #[test]
    fn test_create_dirs() {
        let temp = tempfile::tempdir().unwrap();
        let dirs = PlatformDirs::with_root(temp.path());
        dirs.create_dirs().unwrap();
        assert!(dirs.config_dir.is_dir());
        assert!(dirs.data_dir.is_dir());
        assert!(dirs.log_dir.is_dir());
    }

    #[test]
    fn test_create_dirs_reports_path() {
        let temp = tempfile::tempdir().unwrap();
        let blocker = temp.path().join("pulse-globe");
        std::fs::write(&blocker, b"file, not a directory").unwrap();
        let err = PlatformDirs::with_root(temp.path()).create_dirs().unwrap_err();
        assert!(matches!(err, PlatformError::Io { .. }));
    }

    #[test]
    fn test_data_path_prefers_data_dir() {
        let temp = tempfile::tempdir().unwrap();
        let dirs = PlatformDirs::with_root(temp.path());
        dirs.create_dirs().unwrap();
        std::fs::write(dirs.data_dir.join("features-test.json"), b"[]").unwrap();

        let relative = Path::new("features-test.json");
        assert_eq!(dirs.data_path(relative), dirs.data_dir.join(relative));
        let missing = Path::new("missing-test.json");
        assert_eq!(dirs.data_path(missing), missing);
    }

    #[test]
    fn test_resolve_uses_app_name() {
        if let Ok(dirs) = PlatformDirs::resolve() {
            assert!(dirs.config_dir.ends_with(APP_NAME));
            assert!(dirs.log_dir.starts_with(&dirs.config_dir));
        }
    }
}
