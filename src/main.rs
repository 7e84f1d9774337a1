mod cli;
mod error;
mod logging;

use crate::cli::{ArchiveArgs, ArchiveOptions, Cli, Commands, InitArgs, RestructureArgs};
use crate::error::{ErrorKind, Result};
use clap::Parser;
use exn::ResultExt;
use ndos_config::{Config, Loader};
use ndos_library::{Action, Archiver, Classifier, Restructurer, create_project};
use std::path::Path;
use std::process::ExitCode;
use tracing::{debug, error, info};

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_logger(cli.level());

    let result = match cli.command {
        Commands::Init(args) => init(args),
        Commands::Restructure(args) => restructure(args),
        Commands::Archive(args) => archive(args),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:?}");
            ExitCode::FAILURE
        },
    }
}

fn init(args: InitArgs) -> Result<()> {
    let touched = create_project(&args.root, args.force).or_raise(|| ErrorKind::Init)?;
    debug!(?touched, "scaffold written");
    println!("[OK] Created/updated N-DOS scaffold at: {}", args.root.display());
    Ok(())
}

fn restructure(args: RestructureArgs) -> Result<()> {
    let mut config = load_config(&args.dst, &args.archive)?;
    if let Some(subject) = args.subject_pattern {
        config.patterns.subject = subject;
    }
    if let Some(session) = args.session_pattern {
        config.patterns.session = session;
    }
    let classifier = Classifier::from_config(&config).or_raise(|| ErrorKind::Config)?;

    let restructurer =
        Restructurer::new(&args.src, &args.dst, classifier, args.dry_run).or_raise(|| ErrorKind::Restructure)?;
    for action in restructurer {
        match action.or_raise(|| ErrorKind::Restructure)? {
            Action::Planned { from, to, .. } => println!("[DRY] {} -> {}", from.display(), to.display()),
            Action::Moved { from, to, .. } => println!("[MOVE] {} -> {}", from.display(), to.display()),
        }
    }

    if args.dry_run || args.no_compress || !config.archive.enabled {
        info!(dry_run = args.dry_run, "skipping archives");
        return Ok(());
    }
    run_archiver(&args.dst, &config)
}

fn archive(args: ArchiveArgs) -> Result<()> {
    let config = load_config(&args.root, &args.archive)?;
    run_archiver(&args.root, &config)
}

fn run_archiver(root: &Path, config: &Config) -> Result<()> {
    Archiver::new(root, config.archive.compression)
        .or_raise(|| ErrorKind::Archive)?
        .run(|archived| println!("[TAR] {}", archived.path.display()))
        .or_raise(|| ErrorKind::Archive)?;
    Ok(())
}

/// User config, then `<root>/ndos.toml`, then `--config`, then the
/// environment, then `--compression`.
fn load_config(root: &Path, options: &ArchiveOptions) -> Result<Config> {
    let mut loader = Loader::new().with_user_config().with_project(root);
    if let Some(file) = &options.config {
        loader = loader.with_file(file);
    }
    let mut config = loader.load().or_raise(|| ErrorKind::Config)?;
    if let Some(compression) = options.compression {
        config.archive.compression = compression;
    }
    Ok(config)
}
