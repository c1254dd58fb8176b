//! Attenuation calculator command line

use anyhow::Result;
use clap::{Parser, Subcommand};

use attenuation_calc::commands::{run_download, run_trajectory, DownloadArgs, TrajectoryArgs};

#[derive(Parser, Debug)]
#[command(version, about = "Path loss between a ground trajectory and relay satellites")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download TLEs for a list of satellites
    Download(DownloadArgs),
    /// Compute attenuation along a trajectory
    Trajectory(TrajectoryArgs),
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let result: Result<()> = match cli.command {
        Command::Download(args) => run_download(args),
        Command::Trajectory(args) => run_trajectory(args),
    };

    if let Err(e) = result {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}
