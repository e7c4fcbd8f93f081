//! world2tiled - Command-line tool converting world snapshots into Tiled maps

use std::process::ExitCode;

use world2tiled::cli;

fn main() -> ExitCode {
    cli::run()
}
