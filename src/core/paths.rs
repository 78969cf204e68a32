// src/core/paths.rs

use crate::constants::{PRINCIPALS_FILENAME, PROFILES_DIR, PROGEN_DIR, PROJECTS_DIR};
use lazy_static::lazy_static;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;

lazy_static! {
    static ref PROGEN_CONFIG_DIR: Mutex<Option<PathBuf>> = Mutex::new(None);
}

#[derive(Error, Debug)]
pub enum PathError {
    #[error("Could not find system config directory.")]
    ConfigDirNotFound,
    #[error("Could not create config directory at '{path}': {source}")]
    ConfigDirCreation {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Returns the path to the configuration directory (`~/.config/progen`).
/// Creates it if it doesn't exist.
///
/// This function is memoized: the first call computes and caches the path,
/// subsequent calls return the cached value instantly.
pub fn get_config_dir() -> Result<PathBuf, PathError> {
    let mut cached_path_guard = PROGEN_CONFIG_DIR.lock().unwrap();

    if let Some(path) = &*cached_path_guard {
        return Ok(path.clone());
    }

    let config_path = dirs::config_dir()
        .ok_or(PathError::ConfigDirNotFound)?
        .join(PROGEN_DIR);

    if !config_path.exists() {
        fs::create_dir_all(&config_path).map_err(|e| PathError::ConfigDirCreation {
            path: config_path.display().to_string(),
            source: e,
        })?;
    }

    *cached_path_guard = Some(config_path.clone());

    Ok(config_path)
}

/// Directory holding one JSON file per profile.
pub fn get_profiles_dir() -> Result<PathBuf, PathError> {
    ensure_subdir(PROFILES_DIR)
}

/// Directory holding one JSON file per project.
pub fn get_projects_dir() -> Result<PathBuf, PathError> {
    ensure_subdir(PROJECTS_DIR)
}

/// Path to the security principal catalog file.
pub fn get_principals_path() -> Result<PathBuf, PathError> {
    get_config_dir().map(|dir| dir.join(PRINCIPALS_FILENAME))
}

fn ensure_subdir(name: &str) -> Result<PathBuf, PathError> {
    let dir = get_config_dir()?.join(name);
    if !dir.exists() {
        fs::create_dir_all(&dir).map_err(|e| PathError::ConfigDirCreation {
            path: dir.display().to_string(),
            source: e,
        })?;
    }
    Ok(dir)
}
