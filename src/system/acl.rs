// src/system/acl.rs
//
// Permission seam. Committing a node's rule set breaks inheritance and
// normalizes the explicit entries to exactly the planned list, and the
// executing principal keeps full control so the tool cannot lock itself
// out of a tree it just built.

use crate::models::{AccessRights, AclApplyMode, AclRule, InheritanceMode};
use anyhow::Result;
use std::path::Path;

pub trait AclCommitter {
    /// Applies `rules` to `path`. `DoNotTouch` must leave the directory
    /// unchanged regardless of the rule list.
    fn set_directory_acl(
        &self,
        path: &Path,
        rules: &[AclRule],
        inheritance: InheritanceMode,
        mode: AclApplyMode,
    ) -> Result<()>;

    /// Explicit entries currently on the directory, for display with the
    /// `from_disk` provenance flag.
    fn get_directory_acl(&self, path: &Path) -> Result<Vec<AclRule>>;
}

/// Logs the planned permission changes without touching the directory.
/// The default committer on platforms without a native ACL backend.
pub struct DryRunAcl;

impl AclCommitter for DryRunAcl {
    fn set_directory_acl(
        &self,
        path: &Path,
        rules: &[AclRule],
        inheritance: InheritanceMode,
        mode: AclApplyMode,
    ) -> Result<()> {
        if mode == AclApplyMode::DoNotTouch {
            log::debug!("acl {}: left untouched", path.display());
            return Ok(());
        }
        log::info!(
            "acl {}: {:?}/{:?}, keeping full control for the executing principal",
            path.display(),
            inheritance,
            mode
        );
        for rule in rules {
            log::info!(
                "acl {}: {} {} [{}]",
                path.display(),
                if rule.deny { "deny" } else { "allow" },
                rule.identity,
                describe_rights(rule.rights)
            );
        }
        Ok(())
    }

    fn get_directory_acl(&self, _path: &Path) -> Result<Vec<AclRule>> {
        Ok(Vec::new())
    }
}

/// Human-readable rights list for logs and the preview tree.
pub fn describe_rights(rights: AccessRights) -> String {
    if rights.contains(AccessRights::FULL_CONTROL) {
        return "FullControl".to_string();
    }
    let mut parts = Vec::new();
    if rights.contains(AccessRights::MODIFY) {
        parts.push("Modify");
    }
    if rights.contains(AccessRights::WRITE) {
        parts.push("Write");
    }
    if rights.contains(AccessRights::READ) {
        parts.push("Read");
    }
    if parts.is_empty() {
        parts.push("None");
    }
    parts.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_control_swallows_everything_else() {
        let all = AccessRights::FULL_CONTROL | AccessRights::READ;
        assert_eq!(describe_rights(all), "FullControl");
    }

    #[test]
    fn partial_rights_list_in_fixed_order() {
        let rw = AccessRights::READ | AccessRights::WRITE;
        assert_eq!(describe_rights(rw), "Write, Read");
        assert_eq!(describe_rights(AccessRights::empty()), "None");
    }

    #[test]
    fn dry_run_never_fails() {
        let committer = DryRunAcl;
        let rules = vec![AclRule::new("AGK\\GIP", AccessRights::MODIFY, false)];
        assert!(committer
            .set_directory_acl(
                Path::new("/tmp/x"),
                &rules,
                InheritanceMode::BreakClear,
                AclApplyMode::Normalize
            )
            .is_ok());
        assert!(committer
            .set_directory_acl(
                Path::new("/tmp/x"),
                &rules,
                InheritanceMode::Keep,
                AclApplyMode::DoNotTouch
            )
            .is_ok());
        assert!(committer.get_directory_acl(Path::new("/tmp/x")).unwrap().is_empty());
    }
}
