//! `nw`: a local terminal harness for the Nachtwache game engine.
//!
//! The real deployment sits behind a chat platform; this binary stands
//! in for that layer so a full game can be watched (and the engine
//! exercised) from a terminal.

mod commands;

use std::process;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "nw",
    about = "Nachtwache: a Mafia party game engine for chat groups",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the role catalog
    Roles,
    /// Run a fully automated local game and print the transcript
    Simulate {
        /// RNG seed; the same seed replays the same game
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Number of scripted human stand-ins (2..)
        #[arg(long, default_value_t = 2)]
        humans: usize,
        /// Number of automated participants
        #[arg(long, default_value_t = 3)]
        bots: usize,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Roles => commands::roles::run(),
        Commands::Simulate { seed, humans, bots } => commands::simulate::run(seed, humans, bots),
    };
    if let Err(message) = result {
        eprintln!("error: {message}");
        process::exit(1);
    }
}
