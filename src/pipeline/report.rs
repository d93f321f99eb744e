//! Outcome collection and the final batch report
//!
//! Workers never touch the collector directly: outcomes travel over a
//! channel and a single consumer records them, so no locking is needed.
//! Failures keep their arrival order for the end-of-run listing.

use std::fmt;
use std::path::PathBuf;

use tracing::error;

use crate::error::SplitError;

/// Pipeline step a failure is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Metadata extraction or track-list parsing
    Extract,
    Decode,
    Encode,
    /// Tag/art injection and the final rename
    Tag,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Extract => "extract",
            Stage::Decode => "decode",
            Stage::Encode => "encode",
            Stage::Tag => "tag",
        }
    }
}

/// Terminal outcome of one track job, or of one album that failed before
/// its tracks were planned
#[derive(Debug)]
pub struct Outcome {
    /// Source container
    pub album: PathBuf,
    /// Track number; None when the album failed before track planning
    pub track: Option<u32>,
    pub status: OutcomeStatus,
}

#[derive(Debug)]
pub enum OutcomeStatus {
    Succeeded,
    Skipped,
    Failed { stage: Stage, cause: SplitError },
}

impl Outcome {
    pub fn succeeded(album: PathBuf, track: u32) -> Self {
        Self {
            album,
            track: Some(track),
            status: OutcomeStatus::Succeeded,
        }
    }

    pub fn skipped(album: PathBuf, track: u32) -> Self {
        Self {
            album,
            track: Some(track),
            status: OutcomeStatus::Skipped,
        }
    }

    pub fn failed(album: PathBuf, track: Option<u32>, stage: Stage, cause: SplitError) -> Self {
        Self {
            album,
            track,
            status: OutcomeStatus::Failed { stage, cause },
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.status, OutcomeStatus::Failed { .. })
    }
}

/// One recorded failure, kept in arrival order
#[derive(Debug)]
pub struct FailureRecord {
    pub album: PathBuf,
    /// None when the failure predates track planning
    pub track: Option<u32>,
    pub stage: Stage,
    pub cause: String,
}

impl fmt::Display for FailureRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.track {
            Some(track) => write!(
                f,
                "{} track {} [{}]: {}",
                self.album.display(),
                track,
                self.stage.as_str(),
                self.cause
            ),
            None => write!(
                f,
                "{} [{}]: {}",
                self.album.display(),
                self.stage.as_str(),
                self.cause
            ),
        }
    }
}

/// Final tally of a batch run
#[derive(Debug, Default)]
pub struct BatchReport {
    pub success_count: usize,
    pub skip_count: usize,
    pub failure_count: usize,
    pub failures: Vec<FailureRecord>,
}

impl BatchReport {
    /// Exit-status policy: the process exits zero iff nothing failed
    pub fn exit_ok(&self) -> bool {
        self.failure_count == 0
    }
}

/// Single-consumer aggregator of job outcomes
#[derive(Debug, Default)]
pub struct OutcomeCollector {
    report: BatchReport,
}

impl OutcomeCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: Outcome) {
        match outcome.status {
            OutcomeStatus::Succeeded => self.report.success_count += 1,
            OutcomeStatus::Skipped => self.report.skip_count += 1,
            OutcomeStatus::Failed { stage, cause } => {
                match outcome.track {
                    Some(track) => error!(
                        "Failed {} track {} ({}): {}",
                        outcome.album.display(),
                        track,
                        stage.as_str(),
                        cause
                    ),
                    None => error!(
                        "Failed {} ({}): {}",
                        outcome.album.display(),
                        stage.as_str(),
                        cause
                    ),
                }
                self.report.failure_count += 1;
                self.report.failures.push(FailureRecord {
                    album: outcome.album,
                    track: outcome.track,
                    stage,
                    cause: cause.to_string(),
                });
            }
        }
    }

    pub fn finalize(self) -> BatchReport {
        self.report
    }
}
