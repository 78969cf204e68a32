use crate::core::paths;
use crate::system::store;
use anyhow::Result;
use clap::Parser;
use colored::Colorize;

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Lists the available generation profiles."
)]
struct ProfilesArgs {
    /// Show profile ids alongside names.
    #[arg(long, short)]
    ids: bool,
}

pub fn handle(args: Vec<String>) -> Result<()> {
    let profiles_args = ProfilesArgs::try_parse_from(&args)?;

    let profiles = store::list_profiles()?;
    if profiles.is_empty() {
        let path = paths::get_profiles_dir()?;
        println!("{}", format!(t!("profiles.empty"), path = path.display()));
        return Ok(());
    }

    println!("{}", t!("profiles.header").bold());
    for profile in profiles {
        let levels = profile.structure.root_nodes.len();
        let detail = format!(
            "v{} · {} dictionaries · {} root level(s)",
            profile.version,
            profile.dictionaries.len(),
            levels
        );
        if profiles_args.ids {
            println!(
                "  {} {} {}",
                profile.name.cyan(),
                format!("[{}]", profile.id).dimmed(),
                detail.dimmed()
            );
        } else {
            println!("  {} {}", profile.name.cyan(), detail.dimmed());
        }
    }
    Ok(())
}
