//! Output path planning
//!
//! Pure computation, no I/O: the planner runs single-threaded before any
//! dispatch, so its collision table needs no synchronization. Every plan
//! handed out within one batch resolves to a distinct destination path.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use tracing::warn;

use crate::config::Settings;
use crate::types::{AlbumSource, OutputPlan, TrackDescriptor};

/// Characters FAT-style filesystems reject in names, beyond the path
/// separators that are substituted unconditionally
const FAT_UNSAFE: &[char] = &[':', '*', '?', '"', '<', '>', '|'];

/// Computes sanitized, collision-free destination paths for tracks.
///
/// Base names follow `NN Title (Performer)`, dropping the parenthetical
/// when no performer is known and falling back to `Track NN` for untitled
/// tracks. Collisions against already-planned paths get a numeric suffix
/// before the extension.
pub struct PathPlanner {
    output_dir: PathBuf,
    mirror_dirs: bool,
    input_root: Option<PathBuf>,
    album_subdir: bool,
    fat_safe: bool,
    max_name_len: Option<usize>,
    extension: &'static str,
    /// Every full path handed out so far in this batch
    taken: HashSet<PathBuf>,
}

impl PathPlanner {
    pub fn new(settings: &Settings, extension: &'static str) -> Self {
        Self {
            output_dir: settings.output_dir.clone(),
            mirror_dirs: settings.mirror_dirs,
            input_root: settings.input_root.clone(),
            album_subdir: settings.album_subdir,
            fat_safe: settings.fat_safe,
            max_name_len: settings.max_name_len,
            extension,
            taken: HashSet::new(),
        }
    }

    /// Compute the destination for one track and reserve it
    pub fn plan(&mut self, album: &AlbumSource, track: &TrackDescriptor) -> OutputPlan {
        let directory = self.directory_for(album);
        let base = self.base_name(album, track);
        let file_name = self.disambiguate(&directory, &base);
        let path = directory.join(&file_name);
        self.taken.insert(path.clone());
        OutputPlan {
            directory,
            file_name,
            path,
        }
    }

    /// Render, sanitize and truncate the base name (no extension)
    fn base_name(&self, album: &AlbumSource, track: &TrackDescriptor) -> String {
        let title = track.display_title();
        let performer = track
            .performer
            .as_deref()
            .or_else(|| album.album_performer());
        let raw = match performer {
            Some(p) => format!("{:02} {} ({})", track.index, title, p),
            None => format!("{:02} {}", track.index, title),
        };

        let mut name = self.sanitize(&raw);
        if let Some(max) = self.max_name_len {
            name = truncate_chars(&name, max);
            if self.fat_safe {
                // Truncation can expose a trailing space or dot again
                name.truncate(name.trim_end_matches(['.', ' ']).len());
            }
        }
        name
    }

    /// Substitute characters the destination filesystem cannot take.
    ///
    /// Path separators and NUL always become `_` and other control
    /// characters are dropped; FAT-reserved characters are substituted and
    /// trailing dots/spaces trimmed only under --fat-safe.
    fn sanitize(&self, raw: &str) -> String {
        let mut out = String::with_capacity(raw.len());
        for ch in raw.chars() {
            if ch == '/' || ch == '\\' || ch == '\0' {
                out.push('_');
            } else if ch.is_control() {
                continue;
            } else if self.fat_safe && FAT_UNSAFE.contains(&ch) {
                out.push('_');
            } else {
                out.push(ch);
            }
        }
        if self.fat_safe {
            out.truncate(out.trim_end_matches(['.', ' ']).len());
        }
        out
    }

    /// Append the extension, adding `-2`, `-3`, ... before it until the
    /// full path is unique within this batch. The disambiguated base still
    /// honors the truncation cap: the base shrinks to make room.
    fn disambiguate(&self, directory: &Path, base: &str) -> String {
        let candidate = format!("{}.{}", base, self.extension);
        if !self.taken.contains(&directory.join(&candidate)) {
            return candidate;
        }

        let mut n: u32 = 2;
        loop {
            let suffix = format!("-{}", n);
            let budget = match self.max_name_len {
                Some(max) => max.saturating_sub(suffix.len()),
                None => usize::MAX,
            };
            let candidate = format!("{}{}.{}", truncate_chars(base, budget), suffix, self.extension);
            if !self.taken.contains(&directory.join(&candidate)) {
                return candidate;
            }
            n += 1;
        }
    }

    /// Resolve the directory: output root, then the mirrored input-relative
    /// path, then the album-named subdirectory
    fn directory_for(&self, album: &AlbumSource) -> PathBuf {
        let mut dir = self.output_dir.clone();
        if self.mirror_dirs {
            if let Some(parent) = album.path.parent() {
                dir.push(self.relative_parent(parent));
            }
        }
        if self.album_subdir {
            let stem = album
                .path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();
            let stem = self.sanitize(&stem);
            if !stem.is_empty() {
                dir.push(stem);
            }
        }
        dir
    }

    /// Input directory made relative for mirroring.
    ///
    /// Prefers stripping --input-root; otherwise keeps only normal path
    /// components so absolute inputs nest under the output root instead of
    /// escaping it.
    fn relative_parent(&self, parent: &Path) -> PathBuf {
        if let Some(root) = &self.input_root {
            match parent.strip_prefix(root) {
                Ok(rel) => return rel.to_path_buf(),
                Err(_) => warn!(
                    "{} is outside --input-root {}; mirroring its full path",
                    parent.display(),
                    root.display()
                ),
            }
        }
        parent
            .components()
            .filter(|c| matches!(c, Component::Normal(_)))
            .collect()
    }
}

/// Cap a name at `max` characters (not bytes)
fn truncate_chars(name: &str, max: usize) -> String {
    name.chars().take(max).collect()
}
