mod cli;
mod demo;
mod run;

use anyhow::Result;
use cli::Command;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    match cli.command {
        Some(Command::CheckConfig(args)) => run::check_config(args),
        None => run::run(cli.run),
    }
}
