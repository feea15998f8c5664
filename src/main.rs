// Allow dead code for items that are part of the public API but only used in tests
#![allow(dead_code)]

mod cmd;
mod config;
mod conv;
mod data;
mod input;
mod json_schema;
mod migrator;
mod parser;
mod progress;
mod reader;
mod report;
mod schema;
mod session;
mod sink;
mod target;

use clap::Parser;
use cmd::Cli;

fn main() {
    let cli = Cli::parse();

    if let Err(e) = cmd::run(cli) {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
