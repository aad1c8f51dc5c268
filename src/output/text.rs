//! Human-readable terminal summaries.

use std::io::{self, Write};

use bytesize::ByteSize;
use yansi::Paint;

use crate::batch::HashPassReport;
use crate::duplicates::{DuplicateGroup, ScanSummary};

/// Print every group followed by the scan summary.
///
/// # Errors
///
/// Propagates write failures.
pub fn write_scan_report<W: Write>(
    writer: &mut W,
    groups: &[DuplicateGroup],
    summary: &ScanSummary,
) -> io::Result<()> {
    for (idx, group) in groups.iter().enumerate() {
        writeln!(
            writer,
            "{} {} x {} ({} wasted) {}",
            format!("[{}]", idx + 1).bold(),
            group.count(),
            ByteSize::b(group.size),
            ByteSize::b(group.wasted_space()).yellow(),
            short_hash(&group.hash).dim()
        )?;
        for file in &group.files {
            writeln!(writer, "    {}", file.path.display())?;
        }
    }

    writeln!(writer)?;
    writeln!(
        writer,
        "Scanned {} files ({}) in {:.2?}",
        summary.total_files,
        summary.total_size_display(),
        summary.scan_duration
    )?;
    if groups.is_empty() {
        writeln!(writer, "{}", "No duplicates found.".green())?;
    } else {
        writeln!(
            writer,
            "Found {} groups, {} duplicate files, {} reclaimable ({:.1}%)",
            summary.duplicate_groups.bold(),
            summary.duplicate_files,
            summary.reclaimable_display().yellow().bold(),
            summary.wasted_percentage()
        )?;
    }
    if summary.has_errors() {
        writeln!(
            writer,
            "{}",
            format!("{} files could not be read", summary.scan_errors.len()).red()
        )?;
    }
    Ok(())
}

/// Print the outcome of a hash pass.
///
/// # Errors
///
/// Propagates write failures.
pub fn write_run_report<W: Write>(writer: &mut W, report: &HashPassReport) -> io::Result<()> {
    let selection = &report.selection;
    let run = &report.run;

    writeln!(
        writer,
        "Selected {} of {} unhashed records ({:.1}% skipped as unique size)",
        selection.candidates_kept,
        selection.total_eligible,
        selection.percent_skipped()
    )?;
    if selection.deferred_by_limit > 0 {
        writeln!(
            writer,
            "{} more left for a later pass by the record limit",
            selection.deferred_by_limit
        )?;
    }
    writeln!(
        writer,
        "{} batches in {} of {} waves, {:.2?}",
        run.total_batches, run.waves_run, run.waves_planned, run.duration
    )?;
    writeln!(
        writer,
        "Processed {}: {} hashed, {} skipped, {} failed",
        run.totals.processed.bold(),
        run.totals.succeeded.green(),
        run.totals.skipped.yellow(),
        run.totals.failed.red()
    )?;
    for failure in &run.failed_batches {
        writeln!(
            writer,
            "  {} batch {} ({} of {} items unaccounted): {}",
            "failed".red().bold(),
            failure.batch_index,
            failure.failed_items,
            failure.items,
            failure.reason
        )?;
    }
    for warning in &run.warnings {
        writeln!(writer, "  {} {}", "warning:".yellow().bold(), warning)?;
    }
    if run.interrupted {
        writeln!(
            writer,
            "{}",
            format!("Interrupted: {} batches never dispatched", run.batches_pending).red()
        )?;
    }
    Ok(())
}

fn short_hash(hash: &str) -> &str {
    hash.get(..12).unwrap_or(hash)
}
