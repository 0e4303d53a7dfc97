use std::{net::SocketAddr, time::Duration};

use clap::{Args, Parser, Subcommand};

/// Well-known address the chooser binds and the solver connects to.
pub const DEFAULT_ADDR: &str = "127.0.0.1:5555";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Pick a secret number and answer the solver's guesses with hints.
    Chooser(ChooserArgs),
    /// Connect to a chooser and binary-search for its secret number.
    Solver(SolverArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ChooserArgs {
    /// Smallest number the secret may be.
    #[arg(allow_negative_numbers = true)]
    pub min: i64,

    /// Largest number the secret may be.
    #[arg(allow_negative_numbers = true)]
    pub max: i64,

    /// Socket address to accept the solver on. Use port 0 for an ephemeral port.
    #[arg(long, default_value = DEFAULT_ADDR)]
    pub listen: SocketAddr,

    /// Use this secret instead of a random one.
    #[arg(long, allow_negative_numbers = true)]
    pub secret: Option<i64>,

    /// Seed for the random secret, for reproducible games.
    #[arg(long, conflicts_with = "secret")]
    pub seed: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct SolverArgs {
    /// Address of the chooser to connect to.
    #[arg(long, default_value = DEFAULT_ADDR)]
    pub server: SocketAddr,

    /// Pause between receiving a hint and sending the next guess, in milliseconds.
    #[arg(long, default_value_t = 500)]
    pub delay_ms: u64,
}

impl SolverArgs {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}
