use clap::{Args, Parser, Subcommand};
use ndos_compress::Compression;
use std::ops::Deref;
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;

#[derive(Debug, Parser)]
#[command(name = "ndos", version)]
#[command(about = "Restructure experiment output into the N-DOS layout and archive each session", long_about = None)]
pub struct Cli {
    /// More logging (repeat for trace output)
    #[arg(short, long, global = true, action = clap::ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,
    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
    #[command(subcommand)]
    pub command: Commands,
}
impl Cli {
    /// Default log level, before `RUST_LOG` is applied.
    pub fn level(&self) -> LevelFilter {
        match (self.quiet, self.verbose) {
            (true, _) => LevelFilter::WARN,
            (false, 0) => LevelFilter::INFO,
            (false, 1) => LevelFilter::DEBUG,
            (false, _) => LevelFilter::TRACE,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create an empty project skeleton
    Init(InitArgs),
    /// Move files into raw_data/<Subject>/<Session>/raw, then archive each session
    Restructure(RestructureArgs),
    /// Archive every session already under raw_data
    Archive(ArchiveArgs),
}

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Project root
    pub root: PathBuf,
    /// Rewrite the README even if one exists
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Args)]
pub struct RestructureArgs {
    /// Source folder to scan
    #[arg(long)]
    pub src: PathBuf,
    /// Project root
    #[arg(long)]
    pub dst: PathBuf,
    /// Regex for the Subject identifier (first non-empty capture is used)
    #[arg(long, value_name = "REGEX")]
    pub subject_pattern: Option<String>,
    /// Regex for the Session identifier (first non-empty capture is used)
    #[arg(long, value_name = "REGEX")]
    pub session_pattern: Option<String>,
    /// Only print planned moves
    #[arg(long)]
    pub dry_run: bool,
    /// Skip the archiving step
    #[arg(long)]
    pub no_compress: bool,
    #[command(flatten)]
    pub archive: ArchiveOptions,
}

#[derive(Debug, Args)]
pub struct ArchiveArgs {
    /// Project root
    pub root: PathBuf,
    #[command(flatten)]
    pub archive: ArchiveOptions,
}

#[derive(Debug, Args)]
pub struct ArchiveOptions {
    /// Archive compression: gzip, bzip2 or none
    #[arg(long, value_name = "FORMAT", value_parser = parse_compression)]
    pub compression: Option<Compression>,
    /// Configuration file, applied over the user and project files
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

fn parse_compression(value: &str) -> Result<Compression, String> {
    value.parse::<Compression>().map_err(|err| err.deref().to_string())
}
