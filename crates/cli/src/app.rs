//! The conversion run: discovery, conversion, post-check.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::Context;
use mp3cator_core::{
    default_concurrency, load_config, validate_config, BatchProcessor, CandidateScan, Catalog,
    Config, Converter, ConverterError, DeletionOutcome, FfmpegConverter, OutputPolicy, PostCheck,
    PostCheckReport, ProcessorConfig,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cli::Args;
use crate::error::CliError;
use crate::progress::ProgressGuard;

const PROGRESS_BUFFER: usize = 256;
const WRITE_PROBE_NAME: &str = ".mp3cator-write-test";

/// Settings of one run, after flags have been layered over configuration.
#[derive(Debug)]
struct RunPlan {
    root: PathBuf,
    policy: OutputPolicy,
    config: Config,
    threads: Option<usize>,
}

impl RunPlan {
    fn source_extension(&self) -> &'static str {
        self.config.conversion.source_format.extension()
    }

    fn target_extension(&self) -> &'static str {
        self.config.conversion.target_format.extension()
    }
}

pub async fn run(args: Args, cancel: CancellationToken) -> Result<(), CliError> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(bitrate) = args.bitrate {
        config.conversion.bitrate = bitrate;
    }
    if let Some(threads) = args.threads {
        config.conversion.threads = Some(threads as usize);
    }
    validate_config(&config)?;
    debug!(?config, "Loaded configuration");

    let root = absolute(&args.folder_path)?;
    let catalog = Catalog::new(&root)?;

    let output_dir = match &args.output_dir {
        Some(dir) => {
            let dir = absolute(dir)?;
            prepare_output_dir(&dir)?;
            println!("Using custom output directory: {}", dir.display());
            if args.restructure {
                println!("Note: --output-dir overrides --restructure flag.");
            }
            Some(dir)
        }
        None => None,
    };

    let plan = RunPlan {
        root,
        policy: OutputPolicy::select(output_dir, args.restructure),
        threads: config.conversion.threads,
        config,
    };
    info!(
        root = %plan.root.display(),
        policy = plan.policy.name(),
        "Starting run"
    );

    let converter = FfmpegConverter::new(plan.config.converter.clone());
    match converter.validate().await {
        Ok(()) => {}
        Err(e @ ConverterError::DependenciesMissing { .. }) => return Err(CliError::Dependency(e)),
        Err(e) => return Err(anyhow::Error::new(e).context("Dependency check failed").into()),
    }

    println!(
        "Scanning '{}' for .{} files...",
        args.folder_path.display(),
        plan.source_extension()
    );
    let scan = scan(&catalog, &plan, &cancel).await?;

    if scan.is_empty() {
        println!(
            "No .{} files found in '{}' or its subdirectories.",
            plan.source_extension(),
            args.folder_path.display()
        );
        return Ok(());
    }

    if scan.skipped > 0 {
        println!(
            "Found {} total .{} file(s). Skipping {} because a corresponding .{} already exists.",
            scan.total_sources,
            plan.source_extension(),
            scan.skipped,
            plan.target_extension()
        );
    }

    if scan.candidates.is_empty() {
        println!("No new .{} files to convert.", plan.source_extension());
        if args.post_check {
            println!("Proceeding to post-check as requested...");
            post_check(&plan, args.delete, args.dry_run, &cancel).await?;
        }
        return Ok(());
    }

    let thread_message = match plan.threads {
        Some(threads) => format!("up to {} threads", threads),
        None => format!(
            "the default number of threads (optimized for {} cores)",
            default_concurrency()
        ),
    };
    println!(
        "\nReady to convert {} file(s). Starting parallel conversion using {}...\n",
        scan.candidates.len(),
        thread_message
    );

    if args.dry_run {
        println!("Dry run, nothing will be written. Would convert:");
        for candidate in &scan.candidates {
            println!(
                "  - {} -> {}",
                relative(&candidate.source, &plan.root).display(),
                candidate.output.display()
            );
        }
    }

    let processor_config = ProcessorConfig::default()
        .with_max_conversions(plan.threads.unwrap_or_else(default_concurrency))
        .with_target_format(plan.config.conversion.target_format)
        .with_bitrate(plan.config.conversion.bitrate)
        .with_dry_run(args.dry_run);
    let processor = BatchProcessor::new(processor_config, converter);

    let total = scan.candidates.len();
    let progress = ProgressGuard::new(total as u64, args.verbose);
    let (progress_tx, progress_rx) = mpsc::channel(PROGRESS_BUFFER);
    let follower = progress.follow(progress_rx);

    let report = processor
        .run(scan.candidates, cancel.clone(), Some(progress_tx))
        .await;
    let _ = follower.await;

    if report.cancelled {
        return Err(CliError::Interrupted);
    }
    progress.finish();

    println!(
        "\nConversion complete. {}/{} files converted successfully.",
        report.succeeded, total
    );

    if args.post_check {
        post_check(&plan, args.delete, args.dry_run, &cancel).await?;
    }

    Ok(())
}

/// Runs discovery off the async runtime; an interrupt abandons it.
async fn scan(
    catalog: &Catalog,
    plan: &RunPlan,
    cancel: &CancellationToken,
) -> Result<CandidateScan, CliError> {
    let catalog = catalog.clone();
    let policy = plan.policy.clone();
    let source = plan.source_extension();
    let target = plan.target_extension();

    let task = tokio::task::spawn_blocking(move || {
        catalog.identify_candidates(source, target, &policy)
    });

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(CliError::Interrupted),
        joined = task => Ok(joined.context("Scan task failed")??),
    }
}

/// Rescans the tree and prints the report. An interrupt, before or during the
/// scan or between deletions, ends the run as interrupted.
async fn post_check(
    plan: &RunPlan,
    delete: bool,
    dry_run: bool,
    cancel: &CancellationToken,
) -> Result<(), CliError> {
    if cancel.is_cancelled() {
        return Err(CliError::Interrupted);
    }

    let root = plan.root.clone();
    let policy = plan.policy.clone();
    let source = plan.source_extension();
    let target = plan.target_extension();
    let token = cancel.clone();

    let task = tokio::task::spawn_blocking(move || {
        PostCheck::new(root, policy, source, target)?
            .with_dry_run(dry_run)
            .with_cancellation(token)
            .run(delete)
    });

    let report = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(CliError::Interrupted),
        joined = task => joined.context("Post-check task failed")??,
    };

    print_post_check(&report, plan);
    if matches!(report.deletion, DeletionOutcome::Interrupted { .. }) {
        return Err(CliError::Interrupted);
    }
    Ok(())
}

fn print_post_check(report: &PostCheckReport, plan: &RunPlan) {
    let source = plan.source_extension();
    let target = plan.target_extension();

    println!("\n--- Post-Conversion Check ---");
    println!(
        "Found {} total .{} file(s) and {} total .{} file(s).",
        report.source_count, source, report.target_count, target
    );

    if report.is_complete() {
        println!(
            "\nSuccess! All .{} files appear to have a corresponding .{} file.",
            source, target
        );
    } else {
        println!(
            "\nWarning: Found {} .{} file(s) without a corresponding .{}:",
            report.unconverted.len(),
            source,
            target
        );
        for path in report.unconverted_relative(&plan.root) {
            println!("  - {}", path.display());
        }
    }

    match &report.deletion {
        DeletionOutcome::NotRequested => {}
        DeletionOutcome::NothingToDelete => println!("No .{} files found to delete.", source),
        DeletionOutcome::SkippedUnconverted { .. } => {
            println!("\nSkipping deletion because some files were not converted.")
        }
        DeletionOutcome::SkippedDryRun { total } => {
            println!("Dry run, not deleting {} original .{} file(s).", total, source)
        }
        DeletionOutcome::Interrupted { deleted, total } => {
            println!(
                "Deletion interrupted after {}/{} .{} files.",
                deleted, total, source
            )
        }
        DeletionOutcome::Completed {
            deleted,
            total,
            failures,
        } => {
            for failure in failures {
                println!(
                    "  -> Error deleting {}: {}",
                    relative(&failure.path, &plan.root).display(),
                    failure.error
                );
            }
            println!(
                "Successfully deleted {}/{} .{} files.",
                deleted, total, source
            );
        }
    }
    println!("--- End of Check ---");
}

/// Creates the output directory and checks that files can be written to it.
fn prepare_output_dir(dir: &Path) -> Result<(), CliError> {
    let output_error = |source| CliError::OutputDirectory {
        path: dir.to_path_buf(),
        source,
    };

    fs::create_dir_all(dir).map_err(output_error)?;

    let probe = dir.join(WRITE_PROBE_NAME);
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&probe)
        .map_err(output_error)?;
    fs::remove_file(&probe).map_err(output_error)?;

    Ok(())
}

fn absolute(path: &Path) -> Result<PathBuf, CliError> {
    std::path::absolute(path)
        .with_context(|| format!("Cannot resolve path '{}'", path.display()))
        .map_err(CliError::from)
}

fn relative<'a>(path: &'a Path, root: &Path) -> &'a Path {
    path.strip_prefix(root).unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_prepare_output_dir_creates_missing_dirs() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("a").join("b");

        prepare_output_dir(&out).unwrap();

        assert!(out.is_dir());
        assert!(!out.join(WRITE_PROBE_NAME).exists());
    }

    #[test]
    fn test_prepare_output_dir_rejects_a_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("taken");
        fs::write(&file, b"").unwrap();

        let result = prepare_output_dir(&file);
        assert!(matches!(result, Err(CliError::OutputDirectory { .. })));
    }

    #[test]
    fn test_relative() {
        assert_eq!(
            relative(Path::new("/music/a/b.ogg"), Path::new("/music")),
            Path::new("a/b.ogg")
        );
        assert_eq!(
            relative(Path::new("/other/b.ogg"), Path::new("/music")),
            Path::new("/other/b.ogg")
        );
    }
}
