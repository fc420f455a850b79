use clap::Parser;
use filetagging::args::Cli;
use filetagging::run::{run, Exit};
use std::io;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    // Logs go to stderr so they never mix with command output.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let working_dir = match std::env::current_dir() {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("error: cannot determine working directory: {}", e);
            return ExitCode::from(Exit::Usage.code());
        }
    };

    match run(&cli, working_dir, io::stdout().lock(), io::stderr()) {
        Ok(exit) => ExitCode::from(exit.code()),
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(Exit::Usage.code())
        }
    }
}
