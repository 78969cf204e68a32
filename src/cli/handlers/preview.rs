use crate::core::{generator, planner, tree_display};
use crate::models::NodeOperation;
use crate::system::fs::StdFs;
use crate::system::store;
use anyhow::Result;
use clap::Parser;
use colored::Colorize;

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Shows the planned structure for a project without touching the disk."
)]
struct PreviewArgs {
    /// The project to preview, by name or id.
    project: String,

    /// Override the project's profile, by name or id.
    #[arg(long)]
    profile: Option<String>,

    /// Show the planned permission rules under every folder.
    #[arg(long, short)]
    acl: bool,
}

pub fn handle(args: Vec<String>) -> Result<()> {
    let preview_args = PreviewArgs::try_parse_from(&args)?;

    let project = store::load_project(&preview_args.project)?;
    let profile_ref = preview_args
        .profile
        .as_deref()
        .unwrap_or(&project.profile_id);
    let profile = store::load_profile(profile_ref)?;

    let mut root = generator::generate(&project, &profile);
    planner::refresh_status(&mut root, &StdFs);

    println!(
        "{}",
        format!(t!("preview.header"), name = project.name.cyan())
    );
    tree_display::display_tree(&root, preview_args.acl);

    println!(
        "\n{}",
        format!(
            t!("preview.summary"),
            created = root.count_by_operation(NodeOperation::Create),
            deleted = root.count_by_operation(NodeOperation::Delete),
            unchanged = root.count_by_operation(NodeOperation::None)
        )
    );
    if preview_args.acl {
        println!("{}", t!("preview.acl_note").dimmed());
    }
    if root.has_validation_errors() {
        anyhow::bail!(t!("preview.validation_errors"));
    }
    Ok(())
}
