//! Capability traits for the external tools
//!
//! The pipeline needs three capabilities: reading container metadata,
//! decoding a sample range, and encoding plus tagging the result. Each is
//! a trait object so the flac/metaflac/lame processes can be swapped for
//! in-process fakes in tests.

use std::io::Read;
use std::path::Path;

use crate::error::Result;
use crate::types::{Picture, TagMap, TrackTags};

/// Everything one metadata pass pulls out of a container
#[derive(Debug, Clone, Default)]
pub struct ContainerDump {
    /// Tag mapping, keys uppercased
    pub tags: TagMap,
    /// Raw cuesheet text, when the container embeds one
    pub cuesheet: Option<String>,
    /// Embedded pictures in container order
    pub pictures: Vec<Picture>,
    /// Stream sample rate in Hz
    pub sample_rate: u32,
    /// Total samples in the stream
    pub total_samples: u64,
}

/// Reads tags, stream properties, pictures and cuesheet text from a
/// container
pub trait TagReader: Send + Sync {
    fn read(&self, path: &Path) -> Result<ContainerDump>;

    /// Tool name for diagnostics
    fn name(&self) -> &'static str;
}

/// A running decode whose bytes are consumed through `Read`.
///
/// `finish` must be called once the consumer is done: it surfaces the
/// producer's exit status, which a plain EOF cannot. Dropping a stream
/// without `finish` abandons the decode; implementations shut their
/// producer down rather than leak it.
pub trait AudioStream: Read + Send {
    fn finish(self: Box<Self>) -> Result<()>;
}

/// Decodes a sample range of a container into a raw audio byte stream
pub trait Decoder: Send + Sync {
    /// Start decoding `[start_sample, end_sample)` of `container`
    fn decode_range(
        &self,
        container: &Path,
        start_sample: u64,
        end_sample: u64,
    ) -> Result<Box<dyn AudioStream>>;

    fn name(&self) -> &'static str;
}

/// Encodes a raw audio stream to a file and injects tags and art
pub trait Encoder: Send + Sync {
    /// Encode `audio` to `dest`, blocking until the encoder is done
    fn encode(&self, audio: &mut dyn Read, dest: &Path) -> Result<()>;

    /// Write tags and pictures into an already-encoded file
    fn write_tags(&self, dest: &Path, tags: &TrackTags, pictures: &[Picture]) -> Result<()>;

    /// Extension of the files this encoder produces, without the dot
    fn extension(&self) -> &'static str;

    fn name(&self) -> &'static str;
}
