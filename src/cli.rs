//! Command-line interface implementation

use clap::{Parser, Subcommand};
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use crate::missing::DEFAULT_PLACEHOLDER_IMAGE;
use crate::pipeline::{run as run_pipeline, ConvertOptions};

/// Exit codes
const EXIT_SUCCESS: u8 = 0;
const EXIT_ERROR: u8 = 1;
const EXIT_INVALID_ARGS: u8 = 2;

/// world2tiled - Convert game world snapshots into Tiled map documents
#[derive(Parser)]
#[command(name = "world2tiled")]
#[command(about = "world2tiled - Convert game world snapshots into Tiled map documents")]
#[command(version)]
pub struct Cli {
    /// Only report warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Report debug events
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert a world snapshot into a map and a generated tileset
    Convert {
        /// World snapshot file (JSON)
        world: PathBuf,

        /// Conversion config holding the id tables and wire offsets
        #[arg(short, long)]
        config: PathBuf,

        /// Tileset definition file or glob pattern, searched in order.
        /// May be given more than once
        #[arg(short, long = "tileset", required = true)]
        tilesets: Vec<String>,

        /// Directory receiving {world}.json
        #[arg(long, default_value = ".")]
        map_dir: PathBuf,

        /// Directory receiving the generated tileset {world}.json
        #[arg(long, default_value = ".")]
        tileset_dir: PathBuf,

        /// Image reference given to every generated tile
        #[arg(long, default_value = DEFAULT_PLACEHOLDER_IMAGE)]
        placeholder_image: String,

        /// Write minified JSON instead of four-space indentation
        #[arg(long)]
        compact: bool,
    },
}

/// Default log directive for the selected verbosity.
fn log_directive(quiet: bool, verbose: bool) -> &'static str {
    if quiet {
        "warn"
    } else if verbose {
        "debug"
    } else {
        "info"
    }
}

/// Install the stderr subscriber. `RUST_LOG` overrides the flags.
fn init_logging(quiet: bool, verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_directive(quiet, verbose)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_target(false)
        .try_init()
        .ok();
}

/// Run the CLI application
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);

    match cli.command {
        Commands::Convert {
            world,
            config,
            tilesets,
            map_dir,
            tileset_dir,
            placeholder_image,
            compact,
        } => run_convert(ConvertOptions {
            world,
            config,
            tilesets,
            map_dir,
            tileset_dir,
            placeholder_image,
            compact,
        }),
    }
}

/// Execute the convert command
fn run_convert(options: ConvertOptions) -> ExitCode {
    for (label, path) in [("world", &options.world), ("config", &options.config)] {
        if !path.is_file() {
            eprintln!("Error: Cannot open {} file '{}'", label, path.display());
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    }

    match run_pipeline(&options) {
        Ok(report) => {
            println!(
                "Saved: {} ({} objects, {} connectors, {} generated tiles)",
                report.map_path.display(),
                report.stats.objects,
                report.stats.connectors,
                report.stats.missing_tiles
            );
            println!("Saved: {}", report.tileset_path.display());
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}
