//! In-memory tool implementations for tests
//!
//! Deterministic stand-ins for metaflac/flac/lame: the reader serves
//! canned `ContainerDump`s, the decoder produces bytes derived from the
//! requested range, and the encoder writes a readable text rendition of
//! audio plus tags. Failure injection and a concurrency gauge let tests
//! drive the scheduler and error paths without any external binaries.

use std::collections::{HashMap, HashSet};
use std::fs::{File, OpenOptions};
use std::io::{self, Cursor, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::error::{Result, SplitError};
use crate::tools::traits::{AudioStream, ContainerDump, Decoder, Encoder, TagReader};
use crate::types::{Picture, TrackTags};

// =============================================================================
// Reader
// =============================================================================

/// Serves canned container dumps keyed by path
pub struct FakeTagReader {
    dumps: HashMap<PathBuf, ContainerDump>,
}

impl FakeTagReader {
    pub fn new(dumps: impl IntoIterator<Item = (PathBuf, ContainerDump)>) -> Self {
        Self {
            dumps: dumps.into_iter().collect(),
        }
    }
}

impl TagReader for FakeTagReader {
    fn read(&self, path: &Path) -> Result<ContainerDump> {
        self.dumps
            .get(path)
            .cloned()
            .ok_or_else(|| SplitError::parse(path, "no canned metadata for this path"))
    }

    fn name(&self) -> &'static str {
        "fake-reader"
    }
}

// =============================================================================
// Decoder
// =============================================================================

/// Counts how many decoded streams are open at once.
///
/// A stream opens at `decode_range` and closes at `finish` (or drop), so
/// the peak tracks how many jobs the scheduler really ran concurrently.
#[derive(Debug, Default)]
pub struct ConcurrencyGauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl ConcurrencyGauge {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Produces deterministic bytes for any requested range
pub struct FakeDecoder {
    fail_starts: HashSet<u64>,
    gauge: Option<Arc<ConcurrencyGauge>>,
}

impl FakeDecoder {
    pub fn new() -> Self {
        Self {
            fail_starts: HashSet::new(),
            gauge: None,
        }
    }

    /// Fail any decode whose range starts at one of `starts`
    pub fn failing_at(starts: impl IntoIterator<Item = u64>) -> Self {
        Self {
            fail_starts: starts.into_iter().collect(),
            gauge: None,
        }
    }

    pub fn with_gauge(gauge: Arc<ConcurrencyGauge>) -> Self {
        Self {
            fail_starts: HashSet::new(),
            gauge: Some(gauge),
        }
    }
}

impl Default for FakeDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FakeDecoder {
    fn decode_range(
        &self,
        container: &Path,
        start_sample: u64,
        end_sample: u64,
    ) -> Result<Box<dyn AudioStream>> {
        if self.fail_starts.contains(&start_sample) {
            return Err(SplitError::process(
                "fake-decoder",
                format!("injected failure at sample {}", start_sample),
            ));
        }
        if let Some(gauge) = &self.gauge {
            gauge.enter();
        }
        let data = format!(
            "PCM {} {} {}\n",
            container.display(),
            start_sample,
            end_sample
        );
        Ok(Box::new(FakeStream {
            data: Cursor::new(data.into_bytes()),
            gauge: self.gauge.clone(),
            closed: false,
        }))
    }

    fn name(&self) -> &'static str {
        "fake-decoder"
    }
}

struct FakeStream {
    data: Cursor<Vec<u8>>,
    gauge: Option<Arc<ConcurrencyGauge>>,
    closed: bool,
}

impl FakeStream {
    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            if let Some(gauge) = &self.gauge {
                gauge.exit();
            }
        }
    }
}

impl Read for FakeStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.data.read(buf)
    }
}

impl AudioStream for FakeStream {
    fn finish(mut self: Box<Self>) -> Result<()> {
        self.close();
        Ok(())
    }
}

impl Drop for FakeStream {
    fn drop(&mut self) {
        self.close();
    }
}

// =============================================================================
// Encoder
// =============================================================================

/// Writes `MP3\n` plus the input bytes; tags are appended as text lines
pub struct FakeEncoder {
    fail_names: HashSet<String>,
    delay: Option<Duration>,
}

impl FakeEncoder {
    pub fn new() -> Self {
        Self {
            fail_names: HashSet::new(),
            delay: None,
        }
    }

    /// Fail encodes whose final file name (without any temporary suffix)
    /// matches one of `names`
    pub fn failing_for(names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            fail_names: names.into_iter().map(Into::into).collect(),
            delay: None,
        }
    }

    /// Sleep during each encode so tests can observe overlap
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            fail_names: HashSet::new(),
            delay: Some(delay),
        }
    }

    fn should_fail(&self, dest: &Path) -> bool {
        let name = dest
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let name = name.strip_suffix(".part").unwrap_or(&name);
        self.fail_names.contains(name)
    }
}

impl Default for FakeEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder for FakeEncoder {
    fn encode(&self, audio: &mut dyn Read, dest: &Path) -> Result<()> {
        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }
        if self.should_fail(dest) {
            return Err(SplitError::process(
                "fake-encoder",
                format!("injected failure for {}", dest.display()),
            ));
        }

        let mut bytes = Vec::new();
        audio
            .read_to_end(&mut bytes)
            .map_err(|e| SplitError::process("fake-encoder", e.to_string()))?;

        let mut file = File::create(dest).map_err(|e| SplitError::filesystem(dest, e))?;
        file.write_all(b"MP3\n")
            .and_then(|_| file.write_all(&bytes))
            .map_err(|e| SplitError::filesystem(dest, e))?;
        Ok(())
    }

    fn write_tags(&self, dest: &Path, tags: &TrackTags, pictures: &[Picture]) -> Result<()> {
        let mut out = String::from("TAGS\n");
        if let Some(title) = &tags.title {
            out.push_str(&format!("TITLE={}\n", title));
        }
        if let Some(artist) = &tags.artist {
            out.push_str(&format!("ARTIST={}\n", artist));
        }
        if let Some(album) = &tags.album {
            out.push_str(&format!("ALBUM={}\n", album));
        }
        if let Some(date) = &tags.date {
            out.push_str(&format!("DATE={}\n", date));
        }
        if let Some(genre) = &tags.genre {
            out.push_str(&format!("GENRE={}\n", genre));
        }
        out.push_str(&format!("TRACK={}/{}\n", tags.track_number, tags.track_total));
        for picture in pictures {
            out.push_str(&format!(
                "PICTURE:{}:{}\n",
                picture.mime_type,
                picture.data.len()
            ));
        }

        let mut file = OpenOptions::new()
            .append(true)
            .open(dest)
            .map_err(|e| SplitError::filesystem(dest, e))?;
        file.write_all(out.as_bytes())
            .map_err(|e| SplitError::filesystem(dest, e))?;
        Ok(())
    }

    fn extension(&self) -> &'static str {
        "mp3"
    }

    fn name(&self) -> &'static str {
        "fake-encoder"
    }
}
