//! Session data reset.
//!
//! Every server start begins from an empty knowledge base: uploaded files
//! and the SQLite database from the previous run are removed before the
//! store is opened.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::Config;

/// Remove uploads and database files, then recreate `uploads_dir`.
///
/// A database file that cannot be removed (e.g. held open by another
/// process) is logged and left in place; callers empty the store after
/// opening it.
pub fn clear_session_data(config: &Config) -> Result<()> {
    let uploads = &config.data.uploads_dir;
    match fs::remove_dir_all(uploads) {
        Ok(()) => info!(path = %uploads.display(), "removed uploads directory"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => {
            return Err(e)
                .with_context(|| format!("Failed to remove {}", uploads.display()));
        }
    }

    for path in database_files(&config.data.db_path) {
        match fs::remove_file(&path) {
            Ok(()) => info!(path = %path.display(), "removed database file"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "could not remove database file"),
        }
    }

    fs::create_dir_all(uploads)
        .with_context(|| format!("Failed to create {}", uploads.display()))?;
    Ok(())
}

/// The database file plus its WAL and shared-memory siblings.
fn database_files(db_path: &Path) -> Vec<PathBuf> {
    let mut files = vec![db_path.to_path_buf()];
    for suffix in ["-wal", "-shm"] {
        let mut name = db_path.as_os_str().to_os_string();
        name.push(suffix);
        files.push(PathBuf::from(name));
    }
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_in(root: &Path) -> Config {
        let mut config = Config::default();
        config.data.uploads_dir = root.join("uploads");
        config.data.db_path = root.join("arag.sqlite");
        config
    }

    #[test]
    fn removes_uploads_and_database_files() {
        let tmp = TempDir::new().unwrap();
        let config = config_in(tmp.path());
        fs::create_dir_all(config.data.uploads_dir.join("nested")).unwrap();
        fs::write(config.data.uploads_dir.join("old.txt"), "stale").unwrap();
        fs::write(&config.data.db_path, "db").unwrap();
        fs::write(tmp.path().join("arag.sqlite-wal"), "wal").unwrap();

        clear_session_data(&config).unwrap();

        assert!(config.data.uploads_dir.is_dir());
        assert_eq!(fs::read_dir(&config.data.uploads_dir).unwrap().count(), 0);
        assert!(!config.data.db_path.exists());
        assert!(!tmp.path().join("arag.sqlite-wal").exists());
    }

    #[test]
    fn missing_paths_are_fine() {
        let tmp = TempDir::new().unwrap();
        let config = config_in(tmp.path());

        clear_session_data(&config).unwrap();
        clear_session_data(&config).unwrap();

        assert!(config.data.uploads_dir.is_dir());
    }

    #[test]
    fn sibling_names_append_suffixes() {
        let files = database_files(Path::new("/data/arag.sqlite"));
        assert_eq!(
            files,
            vec![
                PathBuf::from("/data/arag.sqlite"),
                PathBuf::from("/data/arag.sqlite-wal"),
                PathBuf::from("/data/arag.sqlite-shm"),
            ]
        );
    }
}
