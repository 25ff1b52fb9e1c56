use clap::Parser;
use kestrel::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
