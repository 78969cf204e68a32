// src/system/store.rs
//
// JSON persistence for profiles and projects. One file per entity,
// `<id>.json`, under the user's config directory.

use crate::core::paths::{self, PathError};
use crate::models::{ProfileSchema, Project};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Filesystem Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Path error: {0}")]
    Path(#[from] PathError),
    #[error("Failed to parse '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to serialize '{name}': {source}")]
    Serialize {
        name: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Profile '{id}' not found.")]
    ProfileNotFound { id: String },
    #[error("Project '{id}' not found.")]
    ProjectNotFound { id: String },
}

type StoreResult<T> = Result<T, StoreError>;

fn entity_path(dir: &Path, id: &str) -> PathBuf {
    dir.join(format!("{}.json", id))
}

/// Loads every parseable entity in `dir`. Corrupt files are skipped with a
/// warning instead of failing the whole listing.
fn list_entities<T: DeserializeOwned>(dir: &Path) -> StoreResult<Vec<T>> {
    let mut out = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let content = fs::read_to_string(&path)?;
        match serde_json::from_str(&content) {
            Ok(entity) => out.push(entity),
            Err(e) => log::warn!("skipping unreadable file '{}': {}", path.display(), e),
        }
    }
    Ok(out)
}

fn load_entity<T: DeserializeOwned>(path: &Path) -> StoreResult<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let entity = serde_json::from_str(&content).map_err(|source| StoreError::Parse {
        path: path.display().to_string(),
        source,
    })?;
    Ok(Some(entity))
}

fn save_entity<T: Serialize>(path: &Path, name: &str, entity: &T) -> StoreResult<()> {
    let json = serde_json::to_string_pretty(entity).map_err(|source| StoreError::Serialize {
        name: name.to_string(),
        source,
    })?;
    fs::write(path, json)?;
    Ok(())
}

// --- PROFILES ---

pub fn list_profiles() -> StoreResult<Vec<ProfileSchema>> {
    let mut profiles: Vec<ProfileSchema> = list_entities(&paths::get_profiles_dir()?)?;
    profiles.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(profiles)
}

/// Loads a profile by id, falling back to a case-insensitive name match.
pub fn load_profile(id_or_name: &str) -> StoreResult<ProfileSchema> {
    let dir = paths::get_profiles_dir()?;
    if let Some(profile) = load_entity(&entity_path(&dir, id_or_name))? {
        return Ok(profile);
    }
    list_profiles()?
        .into_iter()
        .find(|p| p.name.eq_ignore_ascii_case(id_or_name))
        .ok_or_else(|| StoreError::ProfileNotFound {
            id: id_or_name.to_string(),
        })
}

pub fn save_profile(profile: &ProfileSchema) -> StoreResult<()> {
    let dir = paths::get_profiles_dir()?;
    save_entity(&entity_path(&dir, &profile.id), &profile.name, profile)
}

// --- PROJECTS ---

pub fn list_projects() -> StoreResult<Vec<Project>> {
    let mut projects: Vec<Project> = list_entities(&paths::get_projects_dir()?)?;
    projects.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(projects)
}

pub fn load_project(id_or_name: &str) -> StoreResult<Project> {
    let dir = paths::get_projects_dir()?;
    if let Some(project) = load_entity(&entity_path(&dir, id_or_name))? {
        return Ok(project);
    }
    list_projects()?
        .into_iter()
        .find(|p| p.name.eq_ignore_ascii_case(id_or_name))
        .ok_or_else(|| StoreError::ProjectNotFound {
            id: id_or_name.to_string(),
        })
}

pub fn save_project(project: &Project) -> StoreResult<()> {
    let dir = paths::get_projects_dir()?;
    save_entity(&entity_path(&dir, &project.id), &project.name, project)
}
