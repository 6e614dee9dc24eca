use anyhow::Result;
use clap::Parser;
use retime::{CLIArguments, Command, analyse_main, retime_main};

fn main() -> Result<()> {
    let args = CLIArguments::parse();

    let log_level = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_writer(std::io::stderr)
        .init();

    match args.command {
        Command::Retime(args) => retime_main(args),
        Command::Analyse(args) => analyse_main(args),
    }
}
