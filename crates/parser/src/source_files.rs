//! Source file discovery shared by the file-based extractors
//!
//! Handles the path checks behind `validate` and `auto_detect`, the sorted
//! directory walk with include/exclude globs, and the per-file
//! fail-fast/ignore-errors loop used by every `parse`.

use glob::Pattern;
use infra_discovery_common::confidence;
use infra_discovery_common::{
    DiscoveryContext, DiscoveryError, DiscoveryOptions, DiscoveryReport, DiscoveryWarning,
    Result, WarningKind,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Directories never worth descending into
const SKIPPED_DIRS: &[&str] = &[".git", ".terraform", "node_modules", "target", ".venv"];

/// Extensions and content marker identifying one file format
#[derive(Clone, Copy)]
pub struct FileKind {
    /// Recognized file-name suffixes, without the leading dot
    pub extensions: &'static [&'static str],
}

impl FileKind {
    pub const fn new(extensions: &'static [&'static str]) -> Self {
        Self { extensions }
    }

    /// Whether the file name ends with one of the extensions
    pub fn matches(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        let lower = name.to_lowercase();
        self.extensions
            .iter()
            .any(|ext| lower.ends_with(&format!(".{ext}")))
    }
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .map(|name| SKIPPED_DIRS.contains(&name))
            .unwrap_or(false)
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<Pattern>> {
    patterns
        .iter()
        .map(|p| {
            Pattern::new(p)
                .map_err(|e| DiscoveryError::Config(format!("Invalid glob pattern '{p}': {e}")))
        })
        .collect()
}

fn pattern_matches(pattern: &Pattern, relative: &Path) -> bool {
    pattern.matches_path(relative)
        || relative
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| pattern.matches(n))
            .unwrap_or(false)
}

/// Candidate files under `root`, sorted by path.
///
/// A file path is returned as-is when its extension matches. For a
/// directory, every matching file passing the include/exclude globs is
/// returned. Fails with `InvalidPath` when `root` does not exist,
/// `UnsupportedFormat` for a single file with a foreign extension and
/// `NoFilesFound` when a directory holds no candidates.
pub fn collect(root: &Path, kinds: &[FileKind], options: &DiscoveryOptions) -> Result<Vec<PathBuf>> {
    if !root.exists() {
        return Err(DiscoveryError::InvalidPath(root.to_path_buf()));
    }

    if root.is_file() {
        if kinds.iter().any(|k| k.matches(root)) {
            return Ok(vec![root.to_path_buf()]);
        }
        return Err(DiscoveryError::UnsupportedFormat(format!(
            "{} does not have a supported extension",
            root.display()
        )));
    }

    let includes = compile_patterns(&options.include_patterns)?;
    let excludes = compile_patterns(&options.exclude_patterns)?;

    let mut files = Vec::new();
    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_skipped_dir(e))
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                continue;
            },
        };
        if !entry.file_type().is_file() || !kinds.iter().any(|k| k.matches(entry.path())) {
            continue;
        }

        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        if !includes.is_empty() && !includes.iter().any(|p| pattern_matches(p, relative)) {
            continue;
        }
        if excludes.iter().any(|p| pattern_matches(p, relative)) {
            debug!("Excluded {}", relative.display());
            continue;
        }
        files.push(entry.into_path());
    }

    files.sort();
    if files.is_empty() {
        return Err(DiscoveryError::NoFilesFound(root.to_path_buf()));
    }
    Ok(files)
}

/// Whether a file's content carries the format marker; unreadable files
/// never do
pub fn has_marker(path: &Path, marker: impl Fn(&str) -> bool) -> bool {
    fs::read_to_string(path)
        .map(|content| marker(&content))
        .unwrap_or(false)
}

/// Confidence that `path` holds this format. Never fails.
pub fn detect(path: &Path, kinds: &[FileKind], marker: impl Fn(&str) -> bool) -> (bool, f32) {
    let Ok(files) = collect(path, kinds, &DiscoveryOptions::default()) else {
        return (false, 0.0);
    };

    if path.is_file() {
        let confidence = confidence::file_confidence(has_marker(path, &marker));
        return (true, confidence);
    }

    let matching = files.iter().filter(|f| has_marker(f, &marker)).count();
    let confidence = confidence::directory_confidence(matching, files.len());
    (confidence > 0.0, confidence)
}

/// Cheap validation: candidates exist and at least one carries the marker
pub fn validate(path: &Path, kinds: &[FileKind], marker: impl Fn(&str) -> bool) -> Result<()> {
    let files = collect(path, kinds, &DiscoveryOptions::default())?;
    if files.iter().any(|f| has_marker(f, &marker)) {
        Ok(())
    } else {
        Err(DiscoveryError::UnsupportedFormat(format!(
            "no file under {} carries the expected format marker",
            path.display()
        )))
    }
}

/// Run `parse_file` over every file in order, merging each file's report.
///
/// A failing file aborts the pass unless `ignore_errors` is set, in which
/// case it contributes nothing but a `FailedFile` warning. Cancellation is
/// checked before every file and always aborts.
pub fn parse_each<F>(
    ctx: &DiscoveryContext,
    files: &[PathBuf],
    options: &DiscoveryOptions,
    report: &mut DiscoveryReport,
    mut parse_file: F,
) -> Result<()>
where
    F: FnMut(&Path) -> Result<DiscoveryReport>,
{
    for file in files {
        ctx.check()?;
        debug!("Parsing {}", file.display());

        match parse_file(file) {
            Ok(file_report) => {
                debug!(
                    file = %file.display(),
                    resources = file_report.infrastructure.len(),
                    "Parsed file"
                );
                report.merge(file_report);
            },
            Err(DiscoveryError::Cancelled) => return Err(DiscoveryError::Cancelled),
            Err(e) if options.ignore_errors => {
                warn!("Ignoring {}: {}", file.display(), e);
                report.warn(DiscoveryWarning::new(
                    file.display().to_string(),
                    WarningKind::FailedFile,
                    e.to_string(),
                ));
            },
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Read a file, mapping failures to a parse error naming the file
pub fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .map_err(|e| DiscoveryError::Parse(format!("Failed to read {}: {}", path.display(), e)))
}
