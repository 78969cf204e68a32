// src/system/principals.rs
//
// The identity picker catalog. A plain JSON file maintained by the
// administrator; a missing file is an empty catalog, not an error.

use crate::core::paths;
use crate::models::{PrincipalCatalog, SecurityPrincipal};
use anyhow::{Context, Result};
use std::fs;

pub fn load_catalog() -> Result<PrincipalCatalog> {
    let path = paths::get_principals_path()?;
    if !path.exists() {
        return Ok(PrincipalCatalog::default());
    }
    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read '{}'", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse '{}'", path.display()))
}

/// Case-insensitive substring search over names, domains and descriptions,
/// groups first.
pub fn search<'a>(catalog: &'a PrincipalCatalog, query: &str) -> Vec<&'a SecurityPrincipal> {
    let query = query.to_lowercase();
    catalog
        .groups
        .iter()
        .chain(&catalog.users)
        .filter(|p| {
            p.name.to_lowercase().contains(&query)
                || p.description.to_lowercase().contains(&query)
                || p.domain
                    .as_deref()
                    .is_some_and(|d| d.to_lowercase().contains(&query))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PrincipalKind;

    fn catalog() -> PrincipalCatalog {
        PrincipalCatalog {
            groups: vec![SecurityPrincipal {
                name: "Architects".into(),
                domain: Some("AGK".into()),
                description: "Архитектурный отдел".into(),
                kind: PrincipalKind::Group,
            }],
            users: vec![SecurityPrincipal {
                name: "ivanov".into(),
                domain: Some("AGK".into()),
                description: "ГИП".into(),
                kind: PrincipalKind::User,
            }],
        }
    }

    #[test]
    fn search_matches_name_and_description() {
        let c = catalog();
        assert_eq!(search(&c, "arch").len(), 1);
        assert_eq!(search(&c, "гип").len(), 1);
        assert_eq!(search(&c, "agk").len(), 2);
        assert!(search(&c, "nobody").is_empty());
    }

    #[test]
    fn empty_query_returns_everyone() {
        assert_eq!(search(&catalog(), "").len(), 2);
    }
}
