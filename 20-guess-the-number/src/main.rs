use anyhow::Result;
use clap::Parser;

use guess_the_number::{
    chooser,
    cli::{Cli, Command},
    solver,
};

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // Help and version go to stdout and succeed; usage mistakes exit 1.
            let _ = err.print();
            std::process::exit(if err.use_stderr() { 1 } else { 0 });
        }
    };

    init_tracing();
    match cli.command {
        Command::Chooser(args) => chooser::run(args).await?,
        Command::Solver(args) => solver::run(args).await?,
    }

    Ok(())
}
