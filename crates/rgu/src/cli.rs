use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use engineconfig::ScreenSize;

#[derive(Parser, Debug)]
#[command(
    name = "rgu",
    author,
    version,
    about = "Frame compositor runner",
    arg_required_else_help = false
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Engine configuration file (TOML).
    #[arg(long, value_name = "PATH", env = "RGU_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the logical resolution (e.g. `640x480`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size)]
    pub size: Option<ScreenSize>,

    /// Override the frame rate (minimum 10).
    #[arg(long, value_name = "FPS")]
    pub fps: Option<u32>,

    /// Allow dropping composites when the frame schedule falls behind.
    #[arg(long)]
    pub frame_skip: bool,

    /// Run the demo on the CPU backend for the given number of frames, without
    /// opening a window.
    #[arg(long, value_name = "FRAMES")]
    pub headless: Option<i64>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Parse a configuration file and print the resolved settings.
    CheckConfig(CheckConfigArgs),
}

#[derive(Args, Debug)]
pub struct CheckConfigArgs {
    /// Configuration file to validate.
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Print JSON instead of TOML.
    #[arg(long)]
    pub json: bool,
}

pub fn parse() -> Cli {
    Cli::parse()
}

fn parse_size(value: &str) -> Result<ScreenSize, String> {
    value.parse::<ScreenSize>().map_err(|err| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_overrides() {
        let cli = Cli::try_parse_from([
            "rgu",
            "--size",
            "800x600",
            "--fps",
            "30",
            "--frame-skip",
            "--headless",
            "120",
        ])
        .unwrap();
        assert_eq!(cli.run.size, Some(ScreenSize::new(800, 600)));
        assert_eq!(cli.run.fps, Some(30));
        assert!(cli.run.frame_skip);
        assert_eq!(cli.run.headless, Some(120));
        assert!(cli.command.is_none());
    }

    #[test]
    fn rejects_malformed_size() {
        assert!(Cli::try_parse_from(["rgu", "--size", "800by600"]).is_err());
    }

    #[test]
    fn parses_check_config() {
        let cli = Cli::try_parse_from(["rgu", "check-config", "engine.toml", "--json"]).unwrap();
        match cli.command {
            Some(Command::CheckConfig(args)) => {
                assert_eq!(args.path, PathBuf::from("engine.toml"));
                assert!(args.json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
