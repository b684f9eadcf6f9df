use anyhow::Result;
use clap::Parser;

mod cli;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli::logging::init_logging(cli.verbose)?;
    cli::run(cli)
}
