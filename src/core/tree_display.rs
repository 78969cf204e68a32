// src/core/tree_display.rs

use crate::models::{GeneratedNode, NodeOperation};
use crate::system::acl::describe_rights;
use colored::Colorize;

/// Displays the generated tree with per-node operation markers.
pub fn display_tree(root: &GeneratedNode, show_acl: bool) {
    println!("{}{}", root.name.bold(), marker(root));
    print_annotations(root, "", show_acl);
    let count = root.children.len();
    for (i, child) in root.children.iter().enumerate() {
        print_node(child, "", i == count - 1, show_acl);
    }
}

/// Recursive function to print a tree node and its descendants.
fn print_node(node: &GeneratedNode, prefix: &str, is_last: bool, show_acl: bool) {
    let connector = if is_last { "└─" } else { "├─" };
    println!("{}{}{}{}", prefix, connector, node.name, marker(node));

    // Prepare the prefix for the children of this node
    let child_prefix = format!("{}{}", prefix, if is_last { "   " } else { "│  " });
    print_annotations(node, &child_prefix, show_acl);

    let count = node.children.len();
    for (i, child) in node.children.iter().enumerate() {
        print_node(child, &child_prefix, i == count - 1, show_acl);
    }
}

fn marker(node: &GeneratedNode) -> String {
    if node.validation_error.is_some() {
        return format!(" {}", "[!]".red().bold());
    }
    match node.operation {
        NodeOperation::Create => format!(" {}", "[+]".green()),
        NodeOperation::Delete => format!(" {}", "[-]".red()),
        NodeOperation::UpdateAcl => format!(" {}", "[~]".yellow()),
        NodeOperation::Rename | NodeOperation::None => String::new(),
    }
}

fn print_annotations(node: &GeneratedNode, prefix: &str, show_acl: bool) {
    if let Some(error) = &node.validation_error {
        println!("{}   {}", prefix, error.red());
    }
    if show_acl {
        for rule in &node.planned_acl {
            let kind = if rule.deny { "deny" } else { "allow" };
            println!(
                "{}   {} {} {} ({})",
                prefix,
                "·".dimmed(),
                kind,
                rule.identity,
                describe_rights(rule.rights).dimmed()
            );
        }
    }
}
