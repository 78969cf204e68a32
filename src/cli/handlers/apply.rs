use crate::core::{generator, planner};
use crate::system::acl::DryRunAcl;
use crate::system::fs::StdFs;
use crate::system::store;
use anyhow::{bail, Result};
use chrono::Utc;
use clap::Parser;
use colored::Colorize;
use dialoguer::Confirm;

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Creates, deletes and re-permissions directories to match the planned structure."
)]
struct ApplyArgs {
    /// The project to apply, by name or id.
    project: String,

    /// Override the project's profile, by name or id.
    #[arg(long)]
    profile: Option<String>,

    /// Confirm deletions without prompting.
    #[arg(long, short)]
    yes: bool,
}

pub fn handle(args: Vec<String>) -> Result<()> {
    let apply_args = ApplyArgs::try_parse_from(&args)?;

    let mut project = store::load_project(&apply_args.project)?;
    let profile_ref = apply_args
        .profile
        .as_deref()
        .unwrap_or(&project.profile_id);
    let profile = store::load_profile(profile_ref)?;

    let fs = StdFs;
    let mut root = generator::generate(&project, &profile);
    planner::refresh_status(&mut root, &fs);

    if root.has_validation_errors() {
        bail!(t!("preview.validation_errors"));
    }

    let plan = planner::build_plan(&root);
    if plan.is_empty() {
        println!("{}", t!("apply.nothing_to_do"));
        return Ok(());
    }

    let mut confirmed = plan.deletions.is_empty() || apply_args.yes;
    if !confirmed {
        let nonempty = planner::folders_with_files(&root, &fs);
        if !nonempty.is_empty() {
            println!("{}", t!("apply.deletions_header").yellow().bold());
            for info in &nonempty {
                println!(
                    "  {} {}",
                    info.path.display().to_string().yellow(),
                    format!(t!("apply.deletions_file_count"), count = info.files.len()).dimmed()
                );
            }
        }
        confirmed = Confirm::new()
            .with_prompt(t!("apply.confirm_deletions"))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("{}", t!("apply.cancelled"));
            return Ok(());
        }
    }

    let report = planner::execute(&plan, &fs, &DryRunAcl, confirmed)?;
    println!(
        "{}",
        format!(
            t!("apply.success"),
            name = project.name.cyan(),
            created = report.created,
            deleted = report.deleted,
            acl = report.acl_applied
        )
    );

    project.saved_structure = planner::clone_without_deleted(&root);
    project.state.last_generated = Some(Utc::now());
    project.state.dirty = false;
    store::save_project(&project)?;
    println!("{}", t!("apply.saved").green());

    Ok(())
}
