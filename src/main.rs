use std::io;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Command, FromArgMatches, Parser, Subcommand, ValueEnum};
use mnist_export::export::{run_export, ExportConfig};
use mnist_export::inspect::{run_inspect, InspectOptions};
use mnist_export::mnist_dataset::{LocalSource, MirrorSource, Source, Split};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Defaults to `export` with default settings
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch MNIST and write normalized f32 arrays as raw .mat files
    Export(ExportArgs),
    /// Read exported files back and draw one digit
    Inspect {
        #[arg(long, default_value = ".")]
        dir: PathBuf,
        #[arg(long, value_enum, default_value_t = Split::Train)]
        split: Split,
        #[arg(long, default_value_t = 0)]
        index: usize,
        /// Also save the digit as a PNG
        #[arg(long)]
        png: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, ValueEnum)]
enum SourceKind {
    Mirror,
    Local,
}

#[derive(Debug, PartialEq, Args)]
struct ExportArgs {
    #[arg(long, value_enum, default_value_t = SourceKind::Mirror)]
    source: SourceKind,
    /// Directory holding the decompressed IDX files (local source)
    #[arg(long, default_value = "data/")]
    data_dir: PathBuf,
    /// Download cache (mirror source), defaults to the platform cache directory
    #[arg(long)]
    cache_dir: Option<PathBuf>,
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
    /// Write a JSON manifest of the exported arrays
    #[arg(long)]
    manifest: Option<PathBuf>,
}

impl ExportArgs {
    /// The settings of a bare `export`, taken from the `#[arg]` defaults.
    fn defaults() -> clap::error::Result<ExportArgs> {
        let matches =
            ExportArgs::augment_args(Command::new("export")).try_get_matches_from(["export"])?;
        ExportArgs::from_arg_matches(&matches)
    }

    fn into_config(self) -> ExportConfig {
        let source = match self.source {
            SourceKind::Mirror => Source::Mirror(MirrorSource::new(
                self.cache_dir.unwrap_or_else(MirrorSource::default_cache_dir),
            )),
            SourceKind::Local => Source::Local(LocalSource::new(self.data_dir)),
        };
        ExportConfig {
            source,
            out_dir: self.out_dir,
            manifest: self.manifest,
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut stdout = io::stdout().lock();
    let command = match cli.command {
        Some(command) => command,
        None => Commands::Export(ExportArgs::defaults()?),
    };
    match command {
        Commands::Export(args) => {
            let config = args.into_config();
            run_export(&config, &mut stdout).context("exporting MNIST")?;
        }
        Commands::Inspect {
            dir,
            split,
            index,
            png,
        } => {
            let options = InspectOptions {
                dir,
                split,
                index,
                png,
            };
            run_inspect(&options, &mut stdout)
                .with_context(|| format!("inspecting export in {}", options.dir.display()))?;
        }
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_invocation_matches_plain_export() {
        let cli = Cli::parse_from(["mnist-export", "export"]);
        let Some(Commands::Export(parsed)) = cli.command else {
            panic!("expected the export subcommand");
        };
        let defaults = ExportArgs::defaults().unwrap();
        assert_eq!(defaults, parsed);
        assert_eq!(defaults.source, SourceKind::Mirror);
        assert_eq!(defaults.data_dir, PathBuf::from("data/"));
        assert_eq!(defaults.out_dir, PathBuf::from("."));
        assert_eq!(defaults.cache_dir, None);
    }

    #[test]
    fn no_subcommand_parses() {
        assert!(Cli::parse_from(["mnist-export"]).command.is_none());
    }
}
