use clap::Parser;
use coopledger::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
