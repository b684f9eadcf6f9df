//! Command-line interface wiring for the `cardsheet` binary.
//!
//! This module owns the clap definitions and delegates execution to
//! one submodule per command.

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

pub mod common;
pub mod inspect;
pub mod logging;
pub mod plan;
pub mod render;
pub mod utils;

/// Parsed CLI entrypoint for the `cardsheet` binary.
#[derive(Parser, Debug)]
#[command(
    name = "cardsheet",
    version,
    about = "Merge CSV records and lay them out as printable rarity cards"
)]
pub struct Cli {
    /// Increase diagnostic output (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
    /// Command to execute.
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the merged columns, loaded files and per-row rarity.
    Inspect(inspect::InspectArgs),
    /// Compute the sheet layout without drawing it.
    Plan(plan::PlanArgs),
    /// Draw the selected records to a PDF or a directory of PNGs.
    Render(render::RenderArgs),
}

/// Execute the requested command.
pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Inspect(args) => inspect::handle(args),
        Command::Plan(args) => plan::handle(args),
        Command::Render(args) => render::handle(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_render_flags() {
        let cli = Cli::try_parse_from([
            "cardsheet",
            "-vv",
            "render",
            "a.csv",
            "b.csv",
            "--only",
            "1,2",
            "--rows",
            "1..3",
            "--format",
            "png",
            "--dpi",
            "96",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Render(args) => {
                assert_eq!(args.selection.files.len(), 2);
                assert_eq!(args.selection.file_indices, vec![1, 2]);
                assert_eq!(args.selection.rows.as_deref(), Some("1..3"));
                assert_eq!(args.format, common::OutputFormatArg::Png);
                assert_eq!(args.dpi, 96);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn requires_at_least_one_file() {
        assert!(Cli::try_parse_from(["cardsheet", "plan"]).is_err());
    }
}
