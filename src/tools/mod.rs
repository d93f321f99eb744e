//! External tool integration
//!
//! Capability traits plus two implementations: `process` drives the real
//! metaflac/flac/lame binaries, `fake` is the deterministic in-memory
//! variant the test suite runs against.

pub mod fake;
pub mod process;
pub mod traits;

pub use traits::{AudioStream, ContainerDump, Decoder, Encoder, TagReader};

use std::sync::Arc;

/// The three capabilities a batch run needs, cheaply cloneable so every
/// worker can hold its own handle
#[derive(Clone)]
pub struct Toolset {
    pub reader: Arc<dyn TagReader>,
    pub decoder: Arc<dyn Decoder>,
    pub encoder: Arc<dyn Encoder>,
}

impl Toolset {
    /// Production toolset backed by the external binaries
    pub fn process(lame_preset: &str) -> Self {
        Self {
            reader: Arc::new(process::MetaflacReader::new()),
            decoder: Arc::new(process::FlacDecoder::new()),
            encoder: Arc::new(process::LameEncoder::new(lame_preset)),
        }
    }
}
