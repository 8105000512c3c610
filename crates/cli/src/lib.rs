mod clear;
mod dump;
mod refs;
mod stats;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use symdex_core::{FileRepository, IndexConfig};

#[derive(Parser)]
#[command(
    name = "symdex",
    version,
    about = "Inspect a persisted C/C++ symbol index",
    long_about = "Symdex keeps per-file declaration, include and instantiation indices and a \
                  global reference index in an on-disk repository. These commands read and \
                  maintain that repository without parsing any source."
)]
pub struct Cli {
    /// Repository directory. Defaults to SYMDEX_INDEX_DIR or ~/.symdex/index.
    #[arg(long, global = true, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Count the stored containers of a unit by kind
    Stats {
        /// Repository unit, usually one per project
        #[arg(value_name = "UNIT")]
        unit: String,
    },
    /// Print one stored per-file container as JSON
    #[command(
        long_about = "Loads a declarations, includes or instantiations container and prints its \
                            stored form. Objects behind the handles are not persisted, so only \
                            handles are shown."
    )]
    Dump {
        #[arg(value_name = "UNIT")]
        unit: String,
        /// File id the container belongs to
        #[arg(value_name = "FILE_ID")]
        file: u32,
        #[arg(long, default_value = "declarations", value_parser = ["declarations", "includes", "instantiations"])]
        kind: String,
    },
    /// Summarize the global reference index
    Refs {
        /// Print the whole index as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Empty the global reference index and persist the empty state
    ClearRefs,
}

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = IndexConfig::from_env();
    if let Some(dir) = cli.dir {
        config.index_dir = dir;
    }
    let _guard = symdex_core::logging::init_logging("cli", &config, false);
    tracing::info!("Using repository at {}", config.index_dir.display());
    let repository = FileRepository::new(config.index_dir.clone());

    match cli.command {
        Commands::Stats { unit } => stats::run(&repository, &unit),
        Commands::Dump { unit, file, kind } => dump::run(&repository, &config, &unit, file, &kind),
        Commands::Refs { json } => refs::run(repository, config, json),
        Commands::ClearRefs => clear::run(repository, config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dump_defaults_to_declarations() {
        let cli = Cli::try_parse_from(["symdex", "dump", "proj", "7"]).unwrap();
        match cli.command {
            Commands::Dump { unit, file, kind } => {
                assert_eq!(unit, "proj");
                assert_eq!(file, 7);
                assert_eq!(kind, "declarations");
            }
            _ => panic!("expected dump"),
        }
    }

    #[test]
    fn test_dir_is_global_and_kind_is_checked() {
        let cli = Cli::try_parse_from(["symdex", "refs", "--json", "--dir", "/tmp/idx"]).unwrap();
        assert_eq!(cli.dir, Some(PathBuf::from("/tmp/idx")));
        assert!(matches!(cli.command, Commands::Refs { json: true }));

        assert!(Cli::try_parse_from(["symdex", "dump", "proj", "7", "--kind", "references"]).is_err());
    }
}
