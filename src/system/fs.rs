// src/system/fs.rs
//
// Filesystem seam for the planner. Everything the diff and apply passes
// need from disk goes through `DirectoryOps`, so tests run against an
// in-memory double and the production path stays thin.

use std::fs;
use std::io;
use std::path::Path;
use walkdir::WalkDir;

pub trait DirectoryOps {
    fn exists(&self, path: &Path) -> bool;
    fn create_dir(&self, path: &Path) -> io::Result<()>;
    fn remove_dir_all(&self, path: &Path) -> io::Result<()>;
    /// True when the directory holds at least one file, at any depth.
    fn contains_files(&self, path: &Path) -> bool;
    /// Paths of the files inside the directory, at any depth, relative to
    /// it. For confirmation listings.
    fn list_files(&self, path: &Path) -> Vec<String>;
    /// Names of the immediate subdirectories.
    fn list_dirs(&self, path: &Path) -> Vec<String>;
}

/// Production implementation over `std::fs`.
pub struct StdFs;

impl DirectoryOps for StdFs {
    fn exists(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn create_dir(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::remove_dir_all(path)
    }

    fn contains_files(&self, path: &Path) -> bool {
        WalkDir::new(path)
            .into_iter()
            .filter_map(Result::ok)
            .any(|entry| entry.file_type().is_file())
    }

    fn list_files(&self, path: &Path) -> Vec<String> {
        let mut names: Vec<String> = WalkDir::new(path)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| {
                entry
                    .path()
                    .strip_prefix(path)
                    .unwrap_or(entry.path())
                    .to_string_lossy()
                    .into_owned()
            })
            .collect();
        names.sort();
        names
    }

    fn list_dirs(&self, path: &Path) -> Vec<String> {
        let Ok(entries) = fs::read_dir(path) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(Result::ok)
            .filter(|e| e.path().is_dir())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}
