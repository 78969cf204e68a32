use clap::Parser;

pub mod handlers;

/// progen: profile-driven directory structure and permission generator.
#[derive(Parser, Debug)]
#[command(author, version, about)]
#[command(disable_help_subcommand = true)]
#[command(trailing_var_arg = true)]
pub struct Cli {
    /// The command followed by its arguments.
    #[arg()]
    pub args: Vec<String>,
}
