use crate::core::paths;
use crate::system::store;
use anyhow::Result;
use clap::Parser;
use colored::Colorize;

#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true, about = "Lists the saved projects.")]
struct ProjectsArgs {
    /// Show project ids alongside names.
    #[arg(long, short)]
    ids: bool,
}

pub fn handle(args: Vec<String>) -> Result<()> {
    let projects_args = ProjectsArgs::try_parse_from(&args)?;

    let projects = store::list_projects()?;
    if projects.is_empty() {
        let path = paths::get_projects_dir()?;
        println!("{}", format!(t!("projects.empty"), path = path.display()));
        return Ok(());
    }

    println!("{}", t!("projects.header").bold());
    for project in projects {
        let generated = match project.state.last_generated {
            Some(ts) => format!("applied {}", ts.format("%Y-%m-%d %H:%M")),
            None => "never applied".to_string(),
        };
        if projects_args.ids {
            println!(
                "  {} {} [{}] {}",
                project.name.cyan(),
                format!("[{}]", project.id).dimmed(),
                project.root_path.display(),
                generated.dimmed()
            );
        } else {
            println!(
                "  {} [{}] {}",
                project.name.cyan(),
                project.root_path.display(),
                generated.dimmed()
            );
        }
    }
    Ok(())
}
