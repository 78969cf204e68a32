// src/core/planner.rs
//
// Reconciles a generated tree against the directories on disk and turns
// the result into an ordered execution plan. Phases are strict:
// deletions deepest-first, then creations shallowest-first, then
// permissions on the new directories, then permission refreshes on nodes
// the user re-touched.

use crate::models::{AclApplyMode, AclRule, GeneratedNode, InheritanceMode, NodeOperation};
use crate::system::acl::AclCommitter;
use crate::system::fs::DirectoryOps;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlanError {
    #[error("the plan deletes directories but deletion was not confirmed")]
    DeletionsNotConfirmed,
    #[error("failed to {action} '{path}'")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to apply permissions to '{path}'")]
    Acl {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

/// One step of the plan, detached from the tree so execution does not
/// borrow it.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedAction {
    pub path: PathBuf,
    pub name: String,
    pub operation: NodeOperation,
    pub rules: Vec<AclRule>,
}

#[derive(Debug, Default)]
pub struct ExecutionPlan {
    /// Deepest paths first, so children go before their parents.
    pub deletions: Vec<PlannedAction>,
    /// Shallowest paths first, so parents go before their children.
    pub creations: Vec<PlannedAction>,
    /// Permission-only refreshes, applied after all creations.
    pub acl_updates: Vec<PlannedAction>,
}

impl ExecutionPlan {
    pub fn is_empty(&self) -> bool {
        self.deletions.is_empty() && self.creations.is_empty() && self.acl_updates.is_empty()
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ExecutionReport {
    pub created: usize,
    pub deleted: usize,
    pub acl_applied: usize,
}

/// Re-derives `exists` and `operation` for every node from the current
/// disk state, and grafts on-disk subdirectories that no template level
/// accounts for into the tree as delete-marked ghost nodes.
///
/// A node already marked `Delete` stays `Delete`; exclusion decisions
/// survive refreshes until the user re-includes the node.
pub fn refresh_status(node: &mut GeneratedNode, fs: &dyn DirectoryOps) {
    node.exists = fs.exists(&node.full_path);

    if node.operation != NodeOperation::Delete {
        node.operation = derive_operation(node);
    }

    for child in &mut node.children {
        refresh_status(child, fs);
    }

    if node.exists && node.operation != NodeOperation::Delete {
        graft_orphans(node, fs);
    }
}

/// Flips inclusion for a whole subtree and re-derives each operation.
/// Re-including a node thaws a frozen `Delete`.
pub fn set_included(node: &mut GeneratedNode, included: bool) {
    node.included = included;
    node.operation = derive_operation(node);
    for child in &mut node.children {
        set_included(child, included);
    }
}

fn derive_operation(node: &GeneratedNode) -> NodeOperation {
    if !node.included {
        if node.exists {
            NodeOperation::Delete
        } else {
            NodeOperation::None
        }
    } else if !node.exists {
        NodeOperation::Create
    } else if node.acl_dirty {
        NodeOperation::UpdateAcl
    } else {
        NodeOperation::None
    }
}

/// On-disk subdirectories with no counterpart in the generated children
/// become ghost nodes marked for deletion. Matching is case-insensitive,
/// so a renamed-in-case directory is not treated as foreign.
fn graft_orphans(node: &mut GeneratedNode, fs: &dyn DirectoryOps) {
    let known: Vec<String> = node
        .children
        .iter()
        .map(|c| c.name.to_lowercase())
        .collect();

    for dir_name in fs.list_dirs(&node.full_path) {
        if known.contains(&dir_name.to_lowercase()) {
            continue;
        }
        let ghost = ghost_subtree(&dir_name, node.full_path.join(&dir_name), fs);
        log::debug!("unmanaged directory found: {}", ghost.full_path.display());
        node.children.push(ghost);
    }
}

/// Delete-marked ghost for one unmanaged directory, with every on-disk
/// descendant carried as a nested ghost so the preview shows the full
/// extent of the removal.
fn ghost_subtree(name: &str, path: PathBuf, fs: &dyn DirectoryOps) -> GeneratedNode {
    let mut ghost = GeneratedNode::new("Unmanaged", name, path);
    ghost.exists = true;
    ghost.included = false;
    ghost.operation = NodeOperation::Delete;
    for child_name in fs.list_dirs(&ghost.full_path) {
        let child_path = ghost.full_path.join(&child_name);
        ghost.children.push(ghost_subtree(&child_name, child_path, fs));
    }
    ghost
}

/// Flattens the tree into the three ordered phases.
pub fn build_plan(root: &GeneratedNode) -> ExecutionPlan {
    let mut deletions = Vec::new();
    let mut creations = Vec::new();
    let mut acl_updates = Vec::new();
    collect(root, &mut deletions, &mut creations, &mut acl_updates);

    deletions.sort_by_key(|a: &PlannedAction| std::cmp::Reverse(a.path.components().count()));
    creations.sort_by_key(|a: &PlannedAction| a.path.components().count());
    acl_updates.sort_by_key(|a: &PlannedAction| a.path.components().count());

    ExecutionPlan {
        deletions,
        creations,
        acl_updates,
    }
}

fn collect(
    node: &GeneratedNode,
    deletions: &mut Vec<PlannedAction>,
    creations: &mut Vec<PlannedAction>,
    acl_updates: &mut Vec<PlannedAction>,
) {
    let action = PlannedAction {
        path: node.full_path.clone(),
        name: node.name.clone(),
        operation: node.operation,
        rules: node.planned_acl.clone(),
    };
    match node.operation {
        NodeOperation::Delete => {
            deletions.push(action);
            // Removing the directory removes everything under it.
            return;
        }
        NodeOperation::Create => creations.push(action),
        NodeOperation::UpdateAcl => acl_updates.push(action),
        NodeOperation::None | NodeOperation::Rename => {}
    }
    for child in &node.children {
        collect(child, deletions, creations, acl_updates);
    }
}

/// A delete-marked directory that still holds files, with the listing for
/// the confirmation prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteFolderInfo {
    pub path: PathBuf,
    pub files: Vec<String>,
}

/// Delete-marked directories that still hold files. Reported only at the
/// highest deleted ancestor; descent stops at the first `Delete` in a
/// branch.
pub fn folders_with_files(node: &GeneratedNode, fs: &dyn DirectoryOps) -> Vec<DeleteFolderInfo> {
    let mut out = Vec::new();
    collect_nonempty(node, fs, &mut out);
    out
}

fn collect_nonempty(node: &GeneratedNode, fs: &dyn DirectoryOps, out: &mut Vec<DeleteFolderInfo>) {
    if node.operation == NodeOperation::Delete {
        if node.exists && fs.contains_files(&node.full_path) {
            out.push(DeleteFolderInfo {
                path: node.full_path.clone(),
                files: fs.list_files(&node.full_path),
            });
        }
        return;
    }
    for child in &node.children {
        collect_nonempty(child, fs, out);
    }
}

/// Runs the plan. Any deletion requires `deletions_confirmed`; the first
/// failed step aborts the run and surfaces the failing path.
pub fn execute(
    plan: &ExecutionPlan,
    fs: &dyn DirectoryOps,
    acl: &dyn AclCommitter,
    deletions_confirmed: bool,
) -> Result<ExecutionReport, PlanError> {
    if !plan.deletions.is_empty() && !deletions_confirmed {
        return Err(PlanError::DeletionsNotConfirmed);
    }

    let mut report = ExecutionReport::default();

    for action in &plan.deletions {
        if !fs.exists(&action.path) {
            continue;
        }
        fs.remove_dir_all(&action.path).map_err(|source| PlanError::Io {
            action: "delete",
            path: action.path.clone(),
            source,
        })?;
        report.deleted += 1;
    }

    for action in &plan.creations {
        fs.create_dir(&action.path).map_err(|source| PlanError::Io {
            action: "create",
            path: action.path.clone(),
            source,
        })?;
        report.created += 1;
    }

    // Every new directory gets a commit even when the resolved rule set is
    // empty: breaking inheritance with no explicit entries is the "nobody
    // but the executing principal" state, not a no-op.
    for action in plan.creations.iter().chain(&plan.acl_updates) {
        acl.set_directory_acl(
            &action.path,
            &action.rules,
            InheritanceMode::BreakClear,
            AclApplyMode::Normalize,
        )
        .map_err(|source| PlanError::Acl {
            path: action.path.clone(),
            source,
        })?;
        report.acl_applied += 1;
    }

    Ok(report)
}

/// The tree as it should be persisted after a successful apply: deleted
/// subtrees dropped, every surviving node settled as existing and clean.
/// `None` when the root itself was deleted.
pub fn clone_without_deleted(node: &GeneratedNode) -> Option<GeneratedNode> {
    if node.operation == NodeOperation::Delete {
        return None;
    }
    let mut clone = node.clone();
    clone.children = node
        .children
        .iter()
        .filter_map(clone_without_deleted)
        .collect();
    clone.exists = true;
    clone.operation = NodeOperation::None;
    clone.acl_dirty = false;
    Some(clone)
}
