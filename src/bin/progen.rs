// src/bin/progen.rs

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use progen::cli::{handlers, Cli};

/// Defines a system command, its aliases, and its handler function.
struct CommandDefinition {
    name: &'static str,
    aliases: &'static [&'static str],
    handler: fn(Vec<String>) -> Result<()>,
}

/// The single source of truth for all commands. To add a new command,
/// add an entry to this static array.
static COMMAND_REGISTRY: &[CommandDefinition] = &[
    CommandDefinition {
        name: "apply",
        aliases: &[],
        handler: handlers::apply::handle,
    },
    CommandDefinition {
        name: "preview",
        aliases: &["plan"],
        handler: handlers::preview::handle,
    },
    CommandDefinition {
        name: "profiles",
        aliases: &[],
        handler: handlers::profiles::handle,
    },
    CommandDefinition {
        name: "projects",
        aliases: &["ls"],
        handler: handlers::projects::handle,
    },
];

fn find_command(name: &str) -> Option<&'static CommandDefinition> {
    COMMAND_REGISTRY
        .iter()
        .find(|cmd| cmd.name == name || cmd.aliases.contains(&name))
}

fn main() {
    env_logger::init();

    if let Err(e) = run_cli(Cli::parse()) {
        eprintln!("\n{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run_cli(cli: Cli) -> Result<()> {
    log::debug!("CLI args parsed: {:?}", cli);

    let mut args = cli.args.into_iter();
    let Some(action_name) = args.next() else {
        println!("Usage: progen <profiles|projects|preview|apply> [options]");
        println!("Run 'progen <command> --help' for details.");
        return Ok(());
    };

    match find_command(&action_name) {
        Some(command) => (command.handler)(args.collect()),
        None => anyhow::bail!(
            "Unknown command '{}'. Available commands: profiles, projects, preview, apply.",
            action_name
        ),
    }
}
