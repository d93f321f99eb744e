//! Tool implementations backed by external processes
//!
//! metaflac reads container metadata, flac decodes sample ranges, lame
//! encodes. Tag injection into the encoded file happens in-process via
//! lofty, so no id3 tool is shelled out to.

use std::fs;
use std::io::{self, Read};
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};

use lofty::{Accessor, MimeType, PictureType, Tag, TagExt, TagType};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::{Result, SplitError};
use crate::tools::traits::{AudioStream, ContainerDump, Decoder, Encoder, TagReader};
use crate::types::{Picture, TagMap, TrackTags};

// =============================================================================
// metaflac
// =============================================================================

/// Run metaflac with the given options against one file.
///
/// The exit status is returned unchecked: some probes (cuesheet export)
/// legitimately fail on files that simply lack the block.
fn run_metaflac(path: &Path, args: &[&str]) -> Result<std::process::Output> {
    if !path.exists() {
        return Err(SplitError::FileNotFound(path.to_path_buf()));
    }

    let mut cmd = Command::new("metaflac");
    for arg in args {
        cmd.arg(arg);
    }
    cmd.arg(path);

    debug!("Running: metaflac {} {}", args.join(" "), path.display());

    cmd.output()
        .map_err(|e| SplitError::process("metaflac", format!("failed to run metaflac: {}", e)))
}

/// Run metaflac and hand back its stdout, treating a non-zero exit as an
/// error with the captured stderr
fn metaflac_stdout(path: &Path, args: &[&str]) -> Result<String> {
    let output = run_metaflac(path, args)?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(SplitError::process(
            "metaflac",
            format!(
                "exit {} for {}: {}",
                output.status.code().unwrap_or(-1),
                path.display(),
                stderr.trim()
            ),
        ));
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Container metadata reader shelling out to metaflac
pub struct MetaflacReader;

impl MetaflacReader {
    pub fn new() -> Self {
        Self
    }

    fn read_stream_properties(&self, path: &Path) -> Result<(u32, u64)> {
        let output = metaflac_stdout(path, &["--show-sample-rate", "--show-total-samples"])?;
        let mut lines = output.lines();
        let sample_rate = lines.next().and_then(|l| l.trim().parse().ok());
        let total_samples = lines.next().and_then(|l| l.trim().parse().ok());
        match (sample_rate, total_samples) {
            (Some(rate), Some(total)) => Ok((rate, total)),
            _ => Err(SplitError::parse(
                path,
                format!("unreadable stream properties: {:?}", output.trim()),
            )),
        }
    }

    /// Cuesheet text: the CUESHEET tag when present (it usually carries
    /// titles), otherwise the exported cuesheet block. A non-zero exit on
    /// export means the container has neither.
    fn read_cuesheet(&self, path: &Path, tags: &TagMap) -> Result<Option<String>> {
        if let Some(text) = tags.get("CUESHEET") {
            return Ok(Some(text.clone()));
        }
        let output = run_metaflac(path, &["--export-cuesheet-to=-"])?;
        if !output.status.success() {
            debug!("No cuesheet block in {}", path.display());
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&output.stdout).to_string()))
    }

    fn read_pictures(&self, path: &Path) -> Result<Vec<Picture>> {
        let listing = metaflac_stdout(path, &["--list", "--block-type=PICTURE"])?;
        let mut pictures = Vec::new();
        for (number, mime_type) in parse_picture_blocks(&listing) {
            match self.export_picture(path, number) {
                Ok(data) => pictures.push(Picture { mime_type, data }),
                // Broken art should not sink the whole album
                Err(e) => warn!(
                    "Could not export picture block {} from {}: {}",
                    number,
                    path.display(),
                    e
                ),
            }
        }
        Ok(pictures)
    }

    fn export_picture(&self, path: &Path, block: u32) -> Result<Vec<u8>> {
        let temp = NamedTempFile::new()
            .map_err(|e| SplitError::process("metaflac", format!("no tempfile for picture: {}", e)))?;
        let block_arg = format!("--block-number={}", block);
        let export_arg = format!("--export-picture-to={}", temp.path().display());
        metaflac_stdout(path, &[&block_arg, &export_arg])?;
        fs::read(temp.path())
            .map_err(|e| SplitError::process("metaflac", format!("unreadable exported picture: {}", e)))
    }
}

impl Default for MetaflacReader {
    fn default() -> Self {
        Self::new()
    }
}

impl TagReader for MetaflacReader {
    fn read(&self, path: &Path) -> Result<ContainerDump> {
        let (sample_rate, total_samples) = self.read_stream_properties(path)?;
        let tags = parse_tag_dump(&metaflac_stdout(path, &["--export-tags-to=-"])?);
        let cuesheet = self.read_cuesheet(path, &tags)?;
        let pictures = self.read_pictures(path)?;

        Ok(ContainerDump {
            tags,
            cuesheet,
            pictures,
            sample_rate,
            total_samples,
        })
    }

    fn name(&self) -> &'static str {
        "metaflac"
    }
}

/// Parse `metaflac --export-tags-to=-` output into an uppercased tag map.
///
/// A line starts a new tag only when the text before its first `=` is
/// non-empty and free of whitespace; anything else continues the previous
/// value, so multi-line tags survive. Repeated keys keep the last value.
fn parse_tag_dump(dump: &str) -> TagMap {
    let mut tags = TagMap::new();
    let mut last_key: Option<String> = None;

    for raw_line in dump.lines() {
        let line = raw_line.trim_end_matches('\r');
        match split_tag_line(line) {
            Some((key, value)) => {
                let key = key.to_uppercase();
                tags.insert(key.clone(), value.to_string());
                last_key = Some(key);
            }
            None => {
                if let Some(key) = &last_key {
                    if let Some(existing) = tags.get_mut(key) {
                        existing.push('\n');
                        existing.push_str(line);
                    }
                }
            }
        }
    }
    tags
}

fn split_tag_line(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once('=')?;
    if key.is_empty() || key.chars().any(char::is_whitespace) {
        return None;
    }
    Some((key, value))
}

/// Pull (block number, MIME type) pairs out of `metaflac --list
/// --block-type=PICTURE` output
fn parse_picture_blocks(listing: &str) -> Vec<(u32, String)> {
    let mut blocks = Vec::new();
    let mut current: Option<u32> = None;

    for line in listing.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("METADATA block #") {
            current = rest.trim().parse().ok();
        } else if let Some(mime) = line.strip_prefix("MIME type:") {
            if let Some(number) = current.take() {
                blocks.push((number, mime.trim().to_string()));
            }
        }
    }
    blocks
}

// =============================================================================
// flac
// =============================================================================

/// Sample-range decoder shelling out to flac
pub struct FlacDecoder;

impl FlacDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FlacDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FlacDecoder {
    fn decode_range(
        &self,
        container: &Path,
        start_sample: u64,
        end_sample: u64,
    ) -> Result<Box<dyn AudioStream>> {
        if !container.exists() {
            return Err(SplitError::FileNotFound(container.to_path_buf()));
        }
        // Plain integers to --skip/--until are sample counts; --until is
        // exclusive, matching the descriptor's half-open range.
        let skip = format!("--skip={}", start_sample);
        let until = format!("--until={}", end_sample);

        debug!(
            "Running: flac --decode --totally-silent {} {} --output-name=- {}",
            skip,
            until,
            container.display()
        );

        let mut child = Command::new("flac")
            .arg("--decode")
            .arg("--totally-silent")
            .arg(&skip)
            .arg(&until)
            .arg("--output-name=-")
            .arg(container)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| SplitError::process("flac", format!("failed to start flac: {}", e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SplitError::process("flac", "no stdout pipe"))?;

        Ok(Box::new(ProcessStream {
            stdout: Some(stdout),
            child: Some(child),
            tool: "flac",
        }))
    }

    fn name(&self) -> &'static str {
        "flac"
    }
}

/// Byte stream of a running external process, read from its stdout.
///
/// `finish` reaps the child and checks its exit status; merely dropping
/// the stream kills and reaps it, so an abandoned decode cannot linger
/// as a zombie for the rest of the batch.
struct ProcessStream {
    stdout: Option<ChildStdout>,
    child: Option<Child>,
    tool: &'static str,
}

impl Read for ProcessStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.stdout.as_mut() {
            Some(stdout) => stdout.read(buf),
            None => Ok(0),
        }
    }
}

impl AudioStream for ProcessStream {
    fn finish(mut self: Box<Self>) -> Result<()> {
        // Close our end of the pipe so the producer cannot block on it,
        // then collect status and whatever it said on stderr.
        drop(self.stdout.take());
        let child = match self.child.take() {
            Some(child) => child,
            None => return Ok(()),
        };
        let output = child.wait_with_output().map_err(|e| {
            SplitError::process(self.tool, format!("failed to wait for {}: {}", self.tool, e))
        })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SplitError::process(
                self.tool,
                format!(
                    "exit {}: {}",
                    output.status.code().unwrap_or(-1),
                    stderr.trim()
                ),
            ));
        }
        Ok(())
    }
}

impl Drop for ProcessStream {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

// =============================================================================
// lame
// =============================================================================

/// MP3 encoder shelling out to lame, with in-process tag injection
pub struct LameEncoder {
    preset: String,
}

impl LameEncoder {
    pub fn new(preset: impl Into<String>) -> Self {
        Self {
            preset: preset.into(),
        }
    }
}

impl Encoder for LameEncoder {
    fn encode(&self, audio: &mut dyn Read, dest: &Path) -> Result<()> {
        debug!(
            "Running: lame --preset {} --silent - {}",
            self.preset,
            dest.display()
        );

        let mut child = Command::new("lame")
            .arg("--preset")
            .arg(&self.preset)
            .arg("--silent")
            .arg("-")
            .arg(dest)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| SplitError::process("lame", format!("failed to start lame: {}", e)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| SplitError::process("lame", "no stdin pipe"))?;
        // An early lame death surfaces as EPIPE here; its exit status is
        // the more useful signal, so the copy error waits its turn.
        let copied = io::copy(audio, &mut stdin);
        drop(stdin);

        let output = child
            .wait_with_output()
            .map_err(|e| SplitError::process("lame", format!("failed to wait for lame: {}", e)))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SplitError::process(
                "lame",
                format!(
                    "exit {}: {}",
                    output.status.code().unwrap_or(-1),
                    stderr.trim()
                ),
            ));
        }
        copied.map_err(|e| SplitError::process("lame", format!("failed to stream audio: {}", e)))?;
        Ok(())
    }

    fn write_tags(&self, dest: &Path, tags: &TrackTags, pictures: &[Picture]) -> Result<()> {
        let mut tag = Tag::new(TagType::Id3v2);

        if let Some(title) = &tags.title {
            tag.set_title(title.clone());
        }
        if let Some(artist) = &tags.artist {
            tag.set_artist(artist.clone());
        }
        if let Some(album) = &tags.album {
            tag.set_album(album.clone());
        }
        if let Some(genre) = &tags.genre {
            tag.set_genre(genre.clone());
        }
        if let Some(year) = tags.date.as_deref().and_then(leading_year) {
            tag.set_year(year);
        }
        tag.set_track(tags.track_number);
        tag.set_track_total(tags.track_total);

        for picture in pictures {
            tag.push_picture(lofty::Picture::new_unchecked(
                PictureType::CoverFront,
                Some(MimeType::from_str(&picture.mime_type)),
                None,
                picture.data.clone(),
            ));
        }

        tag.save_to_path(dest).map_err(|e| {
            SplitError::process(
                "lofty",
                format!("failed to write tags to {}: {}", dest.display(), e),
            )
        })
    }

    fn extension(&self) -> &'static str {
        "mp3"
    }

    fn name(&self) -> &'static str {
        "lame"
    }
}

/// Leading four-digit year of a DATE value like "1994-05-01"
fn leading_year(date: &str) -> Option<u32> {
    let digits: String = date.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.len() < 4 {
        return None;
    }
    digits[..4].parse().ok()
}
