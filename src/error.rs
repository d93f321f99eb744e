//! Unified error types for flacsplit
//!
//! Error strategy:
//! - Per-album and per-track errors (unreadable container, bad cuesheet,
//!   tool exit status): recoverable, recorded and the batch continues or
//!   halts according to --continue-on-error
//! - System errors (bad configuration, stdin I/O): fatal, abort the run
//!
//! Errors carry the offending path or tool name so the final failure list
//! is actionable without re-running at higher verbosity.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for flacsplit operations
#[derive(Debug, Error)]
pub enum SplitError {
    // =========================================================================
    // Recoverable errors - recorded per album/track, batch policy decides
    // =========================================================================
    #[error("Failed to parse track list in '{path}': {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("Invalid track boundaries in '{path}': {reason}")]
    Planning { path: PathBuf, reason: String },

    #[error("{tool} failed: {reason}")]
    Process { tool: String, reason: String },

    #[error("Cannot write output to '{path}': {reason}")]
    Filesystem { path: PathBuf, reason: String },

    #[error("Job interrupted: {0}")]
    Interrupted(String),

    #[error("File not found: '{0}'")]
    FileNotFound(PathBuf),

    // =========================================================================
    // Fatal errors - abort the entire run
    // =========================================================================
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for flacsplit operations
pub type Result<T> = std::result::Result<T, SplitError>;

impl SplitError {
    /// Returns true if this error is scoped to one album or track
    /// (record it, let the continue-on-error policy decide) rather than
    /// fatal for the whole run.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SplitError::Parse { .. }
                | SplitError::Planning { .. }
                | SplitError::Process { .. }
                | SplitError::Filesystem { .. }
                | SplitError::Interrupted(_)
                | SplitError::FileNotFound(_)
        )
    }

    /// Create a parse error for a container's track list or tags
    pub fn parse(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        SplitError::Parse {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a planning error for boundary-invariant violations
    pub fn planning(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        SplitError::Planning {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a process error for an external tool failure
    pub fn process(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        SplitError::Process {
            tool: tool.into(),
            reason: reason.into(),
        }
    }

    /// Create a filesystem error, translating common ErrorKinds into
    /// messages that name the actual problem
    pub fn filesystem(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        let path = path.into();
        let reason = match err.kind() {
            std::io::ErrorKind::PermissionDenied => {
                format!(
                    "Permission denied. Check that you have write access to {}",
                    path.display()
                )
            }
            std::io::ErrorKind::NotFound => {
                format!(
                    "Directory does not exist: {}",
                    path.parent()
                        .map(|p| p.display().to_string())
                        .unwrap_or_default()
                )
            }
            _ => err.to_string(),
        };
        SplitError::Filesystem { path, reason }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_album_errors_are_recoverable() {
        assert!(SplitError::parse("/a.flac", "no cuesheet").is_recoverable());
        assert!(SplitError::planning("/a.flac", "gap").is_recoverable());
        assert!(SplitError::process("flac", "exit 1").is_recoverable());
        assert!(SplitError::FileNotFound(PathBuf::from("/a.flac")).is_recoverable());
    }

    #[test]
    fn test_config_and_io_errors_are_fatal() {
        assert!(!SplitError::Config("bad track list".into()).is_recoverable());
        let io = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        assert!(!SplitError::Io(io).is_recoverable());
    }

    #[test]
    fn test_filesystem_error_names_missing_parent() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "nope");
        let err = SplitError::filesystem("/missing/dir/file.mp3", io);
        assert!(err.to_string().contains("/missing/dir"));
    }
}
