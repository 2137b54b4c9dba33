// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell

//! mwp analyzer CLI.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "mwp")]
#[command(author, version, about = "Certify polynomial growth bounds of imperative programs")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a source file and report a bound per function
    Analyze {
        /// Source file to analyze
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Reject functions containing unsupported syntax
        #[arg(long)]
        strict: bool,

        /// Always run to completion, even when infinity is detected early
        #[arg(long)]
        fin: bool,

        /// Suppress all log output
        #[arg(long, conflicts_with_all = ["info", "debug"])]
        silent: bool,

        /// Log analysis progress
        #[arg(long, conflicts_with = "debug")]
        info: bool,

        /// Log in full detail
        #[arg(long)]
        debug: bool,

        /// Omit timestamps from log output
        #[arg(long)]
        no_time: bool,

        /// Do not write the JSON result file
        #[arg(long)]
        no_save: bool,

        /// Directory for the JSON result file
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,
    },
}

fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            input,
            strict,
            fin,
            silent,
            info,
            debug,
            no_time,
            no_save,
            output,
        } => {
            init_logging(silent, info, debug, no_time);
            let options = commands::AnalyzeOptions {
                strict,
                fin,
                no_save,
                output,
            };
            commands::analyze(&input, &options)
        }
    }
}

fn init_logging(silent: bool, info: bool, debug: bool, no_time: bool) {
    use tracing_subscriber::filter::LevelFilter;

    let level = if silent {
        LevelFilter::OFF
    } else if debug {
        LevelFilter::DEBUG
    } else if info {
        LevelFilter::INFO
    } else {
        LevelFilter::WARN
    };

    let builder = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false);
    if no_time {
        builder.without_time().init();
    } else {
        builder.init();
    }
}
