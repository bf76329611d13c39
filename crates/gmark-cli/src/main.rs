use std::error::Error;
use std::process::ExitCode;

use clap::{CommandFactory, Parser, Subcommand};
use gmark_core::GmarkError;

use commands::{
    report::{self, ReportArgs},
    run::{self, RunArgs},
};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "gmark", about = "Graph macro-benchmark harness CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Benchmark the algorithm catalogue against an execution backend.
    Run(RunArgs),
    /// Summarize and compare completed run directories.
    Report(ReportArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let (subcommand, result) = match cli.command {
        Command::Run(args) => ("run", run::run(&args)),
        Command::Report(args) => ("report", report::run(&args)),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            if is_usage_error(err.as_ref()) {
                print_usage(subcommand);
                return ExitCode::from(2);
            }
            ExitCode::FAILURE
        }
    }
}

fn is_usage_error(err: &(dyn Error + 'static)) -> bool {
    err.downcast_ref::<GmarkError>()
        .is_some_and(GmarkError::is_usage)
}

fn print_usage(subcommand: &str) {
    let mut command = Cli::command();
    if let Some(sub) = command.find_subcommand_mut(subcommand) {
        eprintln!("{}", sub.render_long_help());
    }
}
