//! Application entry logic shared by the binary and the integration tests.

use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::batch::{run_hash_pass, HashPassOptions, WorkerPool};
use crate::cli::{Cli, Commands, DupesArgs, HashArgs, IngestArgs, OutputFormat, ScanArgs, WalkArgs};
use crate::config::Config;
use crate::duplicates::{DuplicateFinder, DuplicateGroup, FinderConfig, ScanSummary};
use crate::error::ExitCode;
use crate::logging::init_logging;
use crate::output::{write_run_report, write_scan_report, CsvOutput, JsonOutput, JsonRunReport};
use crate::progress::{Progress, ProgressCallback};
use crate::scanner::{Hasher, Walker};
use crate::signal::{install_handler, ShutdownHandler};
use crate::store::Repository;

/// Run one CLI invocation and return the process exit code.
///
/// # Errors
///
/// Returns an error for invalid configuration, unreachable paths, repository
/// failures, or an interrupted scan.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    init_logging(cli.verbose, cli.quiet);
    if cli.no_color {
        yansi::disable();
    }

    let config = Config::load(cli.config.as_deref())?;
    let handler = install_handler().context("Failed to install signal handler")?;

    match cli.command {
        Commands::Scan(args) => run_scan(args, config, &handler, cli.quiet),
        Commands::Ingest(args) => run_ingest(args, config, &handler, cli.quiet),
        Commands::Hash(args) => run_hash(args, config, &handler, cli.quiet),
        Commands::Dupes(args) => run_dupes(args, config, &handler, cli.quiet),
    }
}

/// Apply the walk flags on top of the loaded configuration.
fn apply_walk_args(config: &mut Config, walk: &WalkArgs) {
    config.follow_symlinks |= walk.follow_symlinks;
    config.skip_hidden |= walk.skip_hidden;
    config
        .ignore_patterns
        .extend(walk.ignore_patterns.iter().cloned());
}

fn progress_for(quiet: bool, output: OutputFormat) -> Arc<Progress> {
    Arc::new(Progress::new(quiet || output != OutputFormat::Text))
}

fn run_scan(
    args: ScanArgs,
    mut config: Config,
    handler: &ShutdownHandler,
    quiet: bool,
) -> Result<ExitCode> {
    apply_walk_args(&mut config, &args.walk);
    if let Some(min_size) = args.min_size {
        config.min_size = min_size;
    }
    if let Some(mode) = args.mode {
        config.verify_mode = mode;
    }
    if let Some(threads) = args.io_threads {
        config.io_threads = threads;
    }
    config.validate()?;

    let finder_config = FinderConfig::default()
        .with_io_threads(config.io_threads)
        .with_strict(args.strict)
        .with_min_size(config.min_size)
        .with_mode(config.verify_mode)
        .with_walker_config(config.walker_config(args.walk.max_size))
        .with_shutdown_flag(handler.get_flag())
        .with_progress_callback(progress_for(quiet, args.output) as Arc<dyn ProgressCallback>);

    let finder = DuplicateFinder::with_hasher(finder_config, Hasher::with_params(config.hash_params()));
    let (groups, summary) = finder.find_duplicates(&args.walk.path)?;

    let exit_code = ExitCode::for_scan(groups.len(), &summary);
    write_groups(args.output, &groups, &summary, exit_code, quiet)?;
    Ok(exit_code)
}

fn run_ingest(
    args: IngestArgs,
    mut config: Config,
    handler: &ShutdownHandler,
    quiet: bool,
) -> Result<ExitCode> {
    apply_walk_args(&mut config, &args.walk);
    config.validate()?;

    let root = &args.walk.path;
    if !root.is_dir() {
        anyhow::bail!("Not a directory: {}", root.display());
    }

    let mut walker_config = config.walker_config(args.walk.max_size);
    walker_config.min_size = Some(config.min_size);
    let walker = Walker::new(root, walker_config).with_shutdown_flag(handler.get_flag());

    let progress = Progress::new(quiet);
    progress.on_phase_start("walking", 0);
    let mut records = Vec::new();
    let mut walk_errors = 0usize;
    for result in walker.walk() {
        match result {
            Ok(record) => {
                progress.on_progress(records.len() + 1, record.path.to_string_lossy().as_ref());
                records.push(record);
            }
            Err(e) => {
                log::warn!("{}", e);
                walk_errors += 1;
            }
        }
    }
    progress.on_phase_end("walking");

    if handler.is_shutdown_requested() {
        log::info!("Ingest interrupted, nothing stored");
        return Ok(ExitCode::Interrupted);
    }

    let mut repo = open_repository(&args.db)?;
    let written = repo
        .insert_records(&records)
        .context("Failed to store records")?;
    let total = repo.count_records()?;
    let hashed = repo.count_fingerprinted()?;
    log::info!("Ingested {} records into {}", written, args.db.display());

    if !quiet {
        let mut stdout = io::stdout().lock();
        writeln!(
            stdout,
            "Stored {} records ({} in store, {} already fingerprinted)",
            written, total, hashed
        )?;
        if walk_errors > 0 {
            writeln!(stdout, "{} entries could not be read", walk_errors)?;
        }
    }

    Ok(if walk_errors > 0 {
        ExitCode::PartialSuccess
    } else {
        ExitCode::Success
    })
}

fn run_hash(
    args: HashArgs,
    mut config: Config,
    handler: &ShutdownHandler,
    quiet: bool,
) -> Result<ExitCode> {
    if args.output == OutputFormat::Csv {
        anyhow::bail!("CSV output is only available for duplicate reports");
    }
    if let Some(strategy) = args.strategy {
        config.strategy = strategy;
    }
    if let Some(workers) = args.worker_count {
        config.worker_count = workers;
    }
    if let Some(batch_size) = args.batch_size {
        config.batch_size = batch_size;
    }
    if let Some(secs) = args.batch_timeout {
        config.batch_timeout_secs = Some(secs);
    }
    if let Some(min_size) = args.min_size {
        config.min_size = min_size;
    }
    if args.no_smart {
        config.smart_selection = false;
    }
    config.validate()?;

    if !args.db.exists() {
        anyhow::bail!("Database not found: {}", args.db.display());
    }

    let pool = WorkerPool::new(config.pool_config())?
        .with_shutdown_flag(handler.get_flag())
        .with_progress_callback(progress_for(quiet, args.output) as Arc<dyn ProgressCallback>);

    let options = HashPassOptions {
        min_size: config.min_size,
        max_size: args.max_size,
        limit: args.limit,
        smart: config.smart_selection,
        strategy: config.strategy,
    };
    let report = run_hash_pass(&pool, &args.db, Hasher::with_params(config.hash_params()), &options)?;
    for warning in &report.run.warnings {
        log::warn!("{}", warning);
    }

    let exit_code = ExitCode::for_run(&report.run);
    let mut stdout = io::stdout().lock();
    match args.output {
        OutputFormat::Json => JsonRunReport::new(&report, exit_code).write_to(&mut stdout, true)?,
        OutputFormat::Text if !quiet => write_run_report(&mut stdout, &report)?,
        OutputFormat::Text | OutputFormat::Csv => {}
    }
    Ok(exit_code)
}

fn run_dupes(
    args: DupesArgs,
    mut config: Config,
    handler: &ShutdownHandler,
    quiet: bool,
) -> Result<ExitCode> {
    if let Some(min_size) = args.min_size {
        config.min_size = min_size;
    }
    if let Some(mode) = args.mode {
        config.verify_mode = mode;
    }
    if let Some(threads) = args.io_threads {
        config.io_threads = threads;
    }
    config.validate()?;

    if !args.db.exists() {
        anyhow::bail!("Database not found: {}", args.db.display());
    }
    let repo = open_repository(&args.db)?;
    let mut records: Vec<_> = repo
        .duplicate_candidates_by_size(config.min_size)?
        .into_values()
        .flatten()
        .collect();
    drop(repo);
    records.sort_by(|a, b| a.path.cmp(&b.path));
    log::info!("Loaded {} stored candidates", records.len());

    let finder_config = FinderConfig::default()
        .with_io_threads(config.io_threads)
        .with_min_size(config.min_size)
        .with_mode(config.verify_mode)
        .with_shutdown_flag(handler.get_flag())
        .with_progress_callback(progress_for(quiet, args.output) as Arc<dyn ProgressCallback>);
    let finder = DuplicateFinder::with_hasher(finder_config, Hasher::with_params(config.hash_params()));
    let (groups, summary) = finder.find_duplicates_from_records(records)?;

    let exit_code = ExitCode::for_scan(groups.len(), &summary);
    write_groups(args.output, &groups, &summary, exit_code, quiet)?;
    Ok(exit_code)
}

fn open_repository(path: &Path) -> Result<Repository> {
    Repository::open(path).with_context(|| format!("Failed to open database {}", path.display()))
}

fn write_groups(
    format: OutputFormat,
    groups: &[DuplicateGroup],
    summary: &ScanSummary,
    exit_code: ExitCode,
    quiet: bool,
) -> Result<()> {
    let mut stdout = io::stdout().lock();
    match format {
        OutputFormat::Json => JsonOutput::new(groups, summary, exit_code).write_to(&mut stdout, true)?,
        OutputFormat::Csv => CsvOutput::new(groups).write_to(&mut stdout)?,
        OutputFormat::Text if !quiet => write_scan_report(&mut stdout, groups, summary)?,
        OutputFormat::Text => {}
    }
    stdout.flush()?;
    Ok(())
}
