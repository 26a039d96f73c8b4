//! Tilegrab CLI - capture a destination as a grid of map images.

mod commands;
mod error;

use clap::{Parser, Subcommand};

use commands::capture::CaptureArgs;

#[derive(Parser)]
#[command(name = "tilegrab")]
#[command(version)]
#[command(about = "Capture a map of a destination as a grid of image tiles", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    capture: CaptureArgs,
}

#[derive(Subcommand)]
enum Command {
    /// Create the configuration file and print its location
    Init,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Some(Command::Init) => commands::init::run(),
        None => commands::capture::run(cli.capture).await,
    };

    if let Err(e) = result {
        e.exit();
    }
}
