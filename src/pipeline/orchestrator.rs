//! Batch orchestration
//!
//! One run goes through three phases: a single-threaded planning phase
//! (extract metadata, parse the track list, reserve collision-free output
//! paths), a skip filter, and the concurrent encode phase. Keeping the
//! path planner out of the worker pool means collision suffixes are
//! assigned deterministically in input order.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::album;
use crate::config::Settings;
use crate::discovery;
use crate::error::{Result, SplitError};
use crate::pipeline::job::EncodeJob;
use crate::pipeline::pool;
use crate::pipeline::report::{BatchReport, Outcome, OutcomeCollector, Stage};
use crate::plan::{should_skip, PathPlanner};
use crate::tools::Toolset;

/// Run the whole batch with the production toolset
pub fn run(settings: &Settings) -> Result<BatchReport> {
    let tools = Toolset::process(&settings.lame_preset);
    run_with_tools(settings, &tools)
}

/// Run the whole batch with a caller-provided toolset
pub fn run_with_tools(settings: &Settings, tools: &Toolset) -> Result<BatchReport> {
    let inputs = discovery::collect_inputs(settings)?;
    if inputs.is_empty() {
        info!("Nothing to do");
        return Ok(BatchReport::default());
    }

    info!("Splitting {} album container(s)", inputs.len());

    let mut collector = OutcomeCollector::new();
    let mut planner = PathPlanner::new(settings, tools.encoder.extension());
    let mut jobs: Vec<EncodeJob> = Vec::new();

    for input in &inputs {
        match prepare_album(settings, tools, &mut planner, input) {
            Ok(prepared) => {
                // Selected numbers the album lacks are failures, not
                // silent no-ops
                for number in prepared.missing_tracks {
                    collector.record(Outcome::failed(
                        input.clone(),
                        Some(number),
                        Stage::Extract,
                        SplitError::planning(
                            input,
                            format!("requested track {} not present in the album", number),
                        ),
                    ));
                    if !settings.continue_on_error {
                        return Ok(collector.finalize());
                    }
                }
                jobs.extend(prepared.jobs);
            }
            Err(e) => {
                collector.record(Outcome::failed(input.clone(), None, Stage::Extract, e));
                if !settings.continue_on_error {
                    // Planning stops here; nothing has been encoded yet
                    return Ok(collector.finalize());
                }
            }
        }
    }

    let mut pending = Vec::with_capacity(jobs.len());
    let mut skipped = Vec::new();
    for job in jobs {
        if should_skip(&job.plan, &job.album.path, settings.skip_newer) {
            skipped.push(job);
        } else {
            pending.push(job);
        }
    }

    if settings.dry_run {
        return Ok(run_dry_run(pending, skipped, collector));
    }

    for job in skipped {
        collector.record(job.mark_skipped());
    }
    pool::run_jobs(pending, tools, settings, &mut collector);

    Ok(collector.finalize())
}

/// Jobs for one album, plus any selected track numbers the album lacks
struct AlbumPlan {
    jobs: Vec<EncodeJob>,
    missing_tracks: Vec<u32>,
}

/// Turn one album container into its encode jobs
fn prepare_album(
    settings: &Settings,
    tools: &Toolset,
    planner: &mut PathPlanner,
    input: &Path,
) -> Result<AlbumPlan> {
    let album = Arc::new(album::extract(tools.reader.as_ref(), input)?);
    let tracks = album::parse_track_list(
        &album.track_list,
        album.sample_rate,
        album.total_samples,
        &album.path,
    )?;

    // Tag numbering reflects the full album even when --tracks selects a
    // subset, so "track 5 of 12" stays true
    let track_total = tracks.len() as u32;
    debug!("{}: {} track(s)", input.display(), track_total);

    let missing_tracks = match &settings.track_filter {
        Some(filter) => filter.missing_from(tracks.iter().map(|t| t.index)),
        None => Vec::new(),
    };

    let mut jobs = Vec::new();
    for track in tracks {
        if let Some(filter) = &settings.track_filter {
            if !filter.contains(track.index) {
                continue;
            }
        }
        let plan = planner.plan(&album, &track);
        jobs.push(EncodeJob::new(Arc::clone(&album), track, plan, track_total));
    }
    Ok(AlbumPlan {
        jobs,
        missing_tracks,
    })
}

/// List what the batch would do without encoding anything, then report
/// everything as skipped
fn run_dry_run(
    pending: Vec<EncodeJob>,
    skipped: Vec<EncodeJob>,
    mut collector: OutcomeCollector,
) -> BatchReport {
    println!();
    println!("=== DRY RUN ===");
    println!();

    for job in &skipped {
        println!("SKIP   {}", job.plan.path.display());
    }
    for job in &pending {
        println!(
            "ENCODE {} track {:>2} -> {}",
            job.album.path.display(),
            job.track.index,
            job.plan.path.display()
        );
    }

    println!();
    println!(
        "Would encode {} track(s), skip {}",
        pending.len(),
        skipped.len()
    );

    for job in skipped.into_iter().chain(pending) {
        collector.record(job.mark_skipped());
    }
    collector.finalize()
}
