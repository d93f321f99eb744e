//! A single track encode, from decoded PCM to a tagged file in place
//!
//! Jobs write to a `.part` sibling and only rename onto the final path
//! once the audio and tags are complete, so an interrupted run never
//! leaves a truncated file where a finished one belongs.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::SplitError;
use crate::pipeline::pool::HaltControl;
use crate::pipeline::report::{Outcome, Stage};
use crate::tools::Toolset;
use crate::types::{AlbumSource, OutputPlan, TrackDescriptor, TrackTags};

/// Lifecycle of one track encode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Planned,
    Skipped,
    Running,
    Succeeded,
    Failed,
}

/// One track bound to its source album, destination and tags
pub struct EncodeJob {
    pub album: Arc<AlbumSource>,
    pub track: TrackDescriptor,
    pub plan: OutputPlan,
    tags: TrackTags,
    state: JobState,
}

impl EncodeJob {
    pub fn new(
        album: Arc<AlbumSource>,
        track: TrackDescriptor,
        plan: OutputPlan,
        track_total: u32,
    ) -> Self {
        let tags = TrackTags::for_track(&album, &track, track_total);
        Self {
            album,
            track,
            plan,
            tags,
            state: JobState::Planned,
        }
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Resolve the job without running it, because the destination is
    /// already up to date
    pub fn mark_skipped(mut self) -> Outcome {
        self.state = JobState::Skipped;
        debug!("Skipping {} (up to date)", self.plan.path.display());
        Outcome::skipped(self.album.path.clone(), self.track.index)
    }

    /// Run the decode, encode and tag stages to a terminal state
    pub fn run(mut self, tools: &Toolset, halt: &HaltControl) -> Outcome {
        self.state = JobState::Running;
        debug!(
            "Encoding {} track {} -> {}",
            self.album.path.display(),
            self.track.index,
            self.plan.path.display()
        );

        match self.execute(tools, halt) {
            Ok(()) => {
                self.state = JobState::Succeeded;
                Outcome::succeeded(self.album.path.clone(), self.track.index)
            }
            Err((stage, cause)) => {
                self.state = JobState::Failed;
                Outcome::failed(self.album.path.clone(), Some(self.track.index), stage, cause)
            }
        }
    }

    fn execute(
        &mut self,
        tools: &Toolset,
        halt: &HaltControl,
    ) -> std::result::Result<(), (Stage, SplitError)> {
        if halt.should_abandon() {
            return Err((
                Stage::Decode,
                SplitError::Interrupted("batch halted before decode".to_string()),
            ));
        }

        // Sibling jobs may create the same album directory concurrently;
        // create_dir_all tolerates that.
        fs::create_dir_all(&self.plan.directory)
            .map_err(|e| (Stage::Encode, SplitError::filesystem(&self.plan.directory, e)))?;

        let temp = temp_path(&self.plan.path);
        let result = self.pipeline(tools, halt, &temp);
        if result.is_err() {
            // Never leave a partial artifact behind
            let _ = fs::remove_file(&temp);
        }
        result
    }

    fn pipeline(
        &mut self,
        tools: &Toolset,
        halt: &HaltControl,
        temp: &Path,
    ) -> std::result::Result<(), (Stage, SplitError)> {
        let mut stream = tools
            .decoder
            .decode_range(&self.album.path, self.track.start_sample, self.track.end_sample)
            .map_err(|e| (Stage::Decode, e))?;

        // An encode error returns before finish; dropping the stream
        // shuts the decoder down.
        tools
            .encoder
            .encode(&mut stream, temp)
            .map_err(|e| (Stage::Encode, e))?;
        stream.finish().map_err(|e| (Stage::Decode, e))?;

        if halt.should_abandon() {
            return Err((
                Stage::Tag,
                SplitError::Interrupted("batch halted before tagging".to_string()),
            ));
        }

        tools
            .encoder
            .write_tags(temp, &self.tags, &self.album.pictures)
            .map_err(|e| (Stage::Tag, e))?;
        fs::rename(temp, &self.plan.path)
            .map_err(|e| (Stage::Tag, SplitError::filesystem(&self.plan.path, e)))?;

        info!("Encoded {}", self.plan.path.display());
        Ok(())
    }
}

/// `.part` sibling of the final path, in the same directory so the
/// finishing rename never crosses filesystems
fn temp_path(final_path: &Path) -> PathBuf {
    let mut name = final_path.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}
