//! Skip-newer policy
//!
//! Decides per planned output whether prior work can be reused. A pure
//! timestamp comparison: neither file is opened or decoded.

use std::fs;
use std::path::Path;
use std::time::SystemTime;

use tracing::debug;

use crate::types::OutputPlan;

/// True iff skipping is enabled, the destination exists, and its mtime is
/// strictly newer than the source container's.
///
/// Any stat failure (missing destination, unreadable source, filesystems
/// without mtimes) means the track is encoded normally.
pub fn should_skip(plan: &OutputPlan, source: &Path, skip_newer: bool) -> bool {
    if !skip_newer {
        return false;
    }
    let dest_mtime = match modified(&plan.path) {
        Some(t) => t,
        None => return false,
    };
    let source_mtime = match modified(source) {
        Some(t) => t,
        None => return false,
    };
    if dest_mtime > source_mtime {
        debug!(
            "Skipping {}: destination is newer than {}",
            plan.path.display(),
            source.display()
        );
        true
    } else {
        false
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}
