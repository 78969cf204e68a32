// src/core/naming.rs
//
// Resolves `{Scope.Attribute}` tokens in naming formulas against a node's
// inherited context and the project's own attributes. Resolution never
// fails: an unknown token renders as the visible `!Scope.Attribute!`
// marker so a broken formula still produces a previewable tree.

use crate::models::{Context, ContextValue, Project};
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use thiserror::Error;

lazy_static! {
    static ref TOKEN_RE: Regex = Regex::new(r"\{([\w.]+)\}").unwrap();
}

/// Characters that cannot appear in a Windows path component.
const ILLEGAL_NAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

#[derive(Error, Debug, PartialEq, Eq)]
pub enum NameError {
    #[error("Name is empty")]
    Empty,
    #[error("Name contains the invalid character '{0}'")]
    IllegalCharacter(char),
}

/// Expands every `{Token}` in `formula`. A blank formula resolves to an
/// empty string; the caller falls back to the node's pre-existing name
/// (the synthetic project root relies on this).
pub fn resolve_formula(formula: &str, context: &Context, project: Option<&Project>) -> String {
    if formula.trim().is_empty() {
        return String::new();
    }

    TOKEN_RE
        .replace_all(formula, |caps: &Captures<'_>| {
            let token = &caps[1];
            resolve_token(token, context, project)
                .unwrap_or_else(|| format!("!{}!", token))
        })
        .into_owned()
}

/// Resolves one token path. Order: `Project` intrinsics, project attribute
/// values, nested context records, flat context keys.
fn resolve_token(token: &str, context: &Context, project: Option<&Project>) -> Option<String> {
    let mut parts = token.splitn(2, '.');
    let scope = parts.next().unwrap_or_default();
    let attr = parts.next();

    if let (Some(attr), Some(project)) = (attr, project) {
        if scope.eq_ignore_ascii_case("Project") {
            if attr.eq_ignore_ascii_case("Name") {
                return Some(project.name.clone());
            }
            if attr.eq_ignore_ascii_case("Id") {
                return Some(project.id.clone());
            }
            if attr.eq_ignore_ascii_case("RootPath") {
                return Some(project.root_path.display().to_string());
            }
            if let Some(value) = project.attribute_values.get(attr) {
                return Some(value.display());
            }
        }
    }

    if let Some(attr) = attr {
        if let Some(ContextValue::Record(record)) = context.get(scope) {
            if let Some(value) = record.get(attr) {
                return Some(value.clone());
            }
        }
    }

    // Flat fallback: the whole token as a scalar key ("ProjectCode",
    // or a pre-flattened "Stages.Code").
    match context.get(token) {
        Some(ContextValue::Scalar(value)) => Some(value.clone()),
        _ => None,
    }
}

/// Checks that a resolved name is usable as a single path component.
pub fn validate_name(name: &str) -> Result<(), NameError> {
    if name.trim().is_empty() {
        return Err(NameError::Empty);
    }
    for ch in name.chars() {
        if ch.is_control() || ILLEGAL_NAME_CHARS.contains(&ch) {
            return Err(NameError::IllegalCharacter(ch));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AttrValue;
    use std::path::PathBuf;

    fn sample_context() -> Context {
        let mut ctx = Context::new();
        ctx.insert("ProjectCode".into(), ContextValue::Scalar("AGK-01".into()));
        ctx.insert("Stages".into(), ContextValue::item("П", "Проектная"));
        ctx
    }

    #[test]
    fn resolves_nested_record_tokens() {
        let ctx = sample_context();
        let out = resolve_formula("{Stages.Code}_{Stages.Name}", &ctx, None);
        assert_eq!(out, "П_Проектная");
    }

    #[test]
    fn resolves_flat_scalar_tokens() {
        let ctx = sample_context();
        assert_eq!(resolve_formula("{ProjectCode}", &ctx, None), "AGK-01");
    }

    #[test]
    fn unresolved_token_renders_marker_and_never_panics() {
        let ctx = Context::new();
        assert_eq!(resolve_formula("{Missing.Thing}", &ctx, None), "!Missing.Thing!");
        assert_eq!(resolve_formula("{Nope}", &ctx, None), "!Nope!");
    }

    #[test]
    fn repeated_resolution_is_stable() {
        let ctx = sample_context();
        let first = resolve_formula("{ProjectCode}-{Stages.Code}-{Gone.X}", &ctx, None);
        let second = resolve_formula("{ProjectCode}-{Stages.Code}-{Gone.X}", &ctx, None);
        assert_eq!(first, second);
        assert_eq!(first, "AGK-01-П-!Gone.X!");
    }

    #[test]
    fn blank_formula_resolves_empty() {
        assert_eq!(resolve_formula("   ", &Context::new(), None), "");
        assert_eq!(resolve_formula("", &Context::new(), None), "");
    }

    #[test]
    fn project_intrinsics_and_attributes() {
        let mut project = Project::new("Bridge", "p1", PathBuf::from("/srv/projects"));
        project.attribute_values.insert(
            "StartDate".into(),
            AttrValue::Date(chrono::NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()),
        );

        let ctx = Context::new();
        assert_eq!(
            resolve_formula("{Project.Name}", &ctx, Some(&project)),
            "Bridge"
        );
        assert_eq!(
            resolve_formula("{Project.StartDate}", &ctx, Some(&project)),
            "2024-05-01"
        );
        assert_eq!(
            resolve_formula("{Project.RootPath}", &ctx, Some(&project)),
            "/srv/projects"
        );
    }

    #[test]
    fn validate_name_rejects_empty_and_illegal() {
        assert_eq!(validate_name(""), Err(NameError::Empty));
        assert_eq!(validate_name("  "), Err(NameError::Empty));
        assert_eq!(
            validate_name("a/b"),
            Err(NameError::IllegalCharacter('/'))
        );
        assert_eq!(
            validate_name("x?y"),
            Err(NameError::IllegalCharacter('?'))
        );
        assert!(validate_name("П_Проектная документация").is_ok());
    }
}
