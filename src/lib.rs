//! flacsplit - Batch FLAC album splitter
//!
//! A command-line utility that splits single-file FLAC album rips into
//! per-track MP3s along the boundaries of the embedded cuesheet, tagging
//! each track from the album metadata and cover art.
//!
//! # Architecture
//!
//! The library is organized into several key modules:
//!
//! - `config`: CLI argument parsing and runtime settings
//! - `discovery`: expanding the input list into album containers
//! - `album`: metadata extraction and cuesheet parsing
//! - `plan`: output path planning and the skip-newer filter
//! - `tools`: external tool integration (metaflac, flac, lame)
//! - `pipeline`: concurrent encode orchestration and reporting
//!
//! # Example
//!
//! ```no_run
//! use flacsplit::{config::Settings, pipeline};
//!
//! let settings = Settings::default();
//! let report = pipeline::run(&settings).expect("Split failed");
//! println!("Encoded {} tracks", report.success_count);
//! ```

pub mod album;
pub mod config;
pub mod discovery;
pub mod error;
pub mod pipeline;
pub mod plan;
pub mod tools;
pub mod types;

// Re-export key types at crate root
pub use error::{Result, SplitError};
pub use pipeline::BatchReport;
pub use types::{AlbumSource, OutputPlan, TrackDescriptor};
