//! Cut-list normalizer
//!
//! Turns inline `--cuts` text, extended M3U playlists, `.cutlist` INI files
//! and legacy tab-separated split files into [`CutList`]s. Order is always
//! preserved.

pub mod ini;
pub mod m3u;
pub mod tsv;

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

use crate::domain::errors::DomainError;
use crate::domain::model::{CutList, CutPoint, CutUnit, TimeSpec};

/// Errors while reading or parsing a cut-list
#[derive(Debug, Error)]
pub enum CutListError {
    #[error("Cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}:{line}: {message}", path.display())]
    Syntax {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("{} is not an extended M3U playlist (missing #EXTM3U)", path.display())]
    MissingHeader { path: PathBuf },

    #[error("Unknown cut-list format: {}", path.display())]
    UnknownFormat { path: PathBuf },

    #[error("Invalid cut: {0}")]
    Invalid(String),
}

impl From<DomainError> for CutListError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::BadArgs(message) => CutListError::Invalid(message),
            other => CutListError::Invalid(other.to_string()),
        }
    }
}

/// One media file with the cuts a document assigns to it
#[derive(Debug, Clone, PartialEq)]
pub struct CutSource {
    pub input: PathBuf,
    pub cuts: CutList,
}

/// A parsed cut-list document
#[derive(Debug, Clone, PartialEq)]
pub enum CutListDocument {
    /// The document names its own media files
    PerFile(Vec<CutSource>),
    /// The document only holds cuts; they apply to the files given separately
    Shared(CutList),
}

/// Supported cut-list document kinds, by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CutListFormat {
    M3u,
    Ini,
    Tsv,
}

impl CutListFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_string_lossy().to_lowercase();
        match ext.as_str() {
            "m3u" | "m3u8" => Some(CutListFormat::M3u),
            "cutlist" => Some(CutListFormat::Ini),
            "tsv" | "splits" => Some(CutListFormat::Tsv),
            _ => None,
        }
    }
}

/// Whether a path names a cut-list document rather than media
pub fn is_cutlist_path(path: &Path) -> bool {
    CutListFormat::from_path(path).is_some()
}

/// Read and parse a cut-list document, choosing the parser by extension
pub fn load(path: &Path) -> Result<CutListDocument, CutListError> {
    let format = CutListFormat::from_path(path).ok_or_else(|| CutListError::UnknownFormat {
        path: path.to_path_buf(),
    })?;
    let text = std::fs::read_to_string(path).map_err(|source| CutListError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let base_dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    debug!("Parsing {:?} cut-list {}", format, path.display());

    match format {
        CutListFormat::M3u => m3u::parse(&text, base_dir, path).map(CutListDocument::PerFile),
        CutListFormat::Ini => ini::parse(&text, base_dir, path).map(|s| CutListDocument::PerFile(vec![s])),
        CutListFormat::Tsv => tsv::parse(&text, path).map(CutListDocument::Shared),
    }
}

/// Parse inline cuts such as `10-20,30-` or `1:00-1:30.5`
///
/// Either side of a pair may be empty. With [`CutUnit::Frames`] the values
/// are whole frame numbers. Empty text means the whole file.
pub fn parse_inline(text: &str, unit: CutUnit) -> Result<CutList, CutListError> {
    let mut points = Vec::new();
    for pair in text.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (start, end) = pair.split_once('-').ok_or_else(|| {
            CutListError::Invalid(format!("'{}' is not a START-END pair", pair))
        })?;
        points.push(CutPoint::new(
            parse_boundary(start, unit)?,
            parse_boundary(end, unit)?,
        )?);
    }
    Ok(CutList::new(unit, points)?)
}

fn parse_boundary(text: &str, unit: CutUnit) -> Result<Option<f64>, CutListError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    match unit {
        CutUnit::Seconds => Ok(Some(TimeSpec::parse(text)?.seconds)),
        CutUnit::Frames => text
            .parse::<u64>()
            .map(|frame| Some(frame as f64))
            .map_err(|_| CutListError::Invalid(format!("'{}' is not a frame number", text))),
    }
}

/// Expand directory arguments into the media files inside them
///
/// Files inside a directory are kept only when `claims` accepts them, and
/// come out in sorted order. Plain paths pass through untouched so a missing
/// file can still be reported as such.
pub fn expand_inputs<F>(paths: &[PathBuf], claims: F) -> Vec<PathBuf>
where
    F: Fn(&Path) -> bool,
{
    let mut expanded = Vec::new();
    for path in paths {
        if !path.is_dir() {
            expanded.push(path.clone());
            continue;
        }
        let mut found: Vec<PathBuf> = WalkDir::new(path)
            .follow_links(true)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|p| claims(p))
            .collect();
        found.sort();
        debug!("{}: {} media files", path.display(), found.len());
        expanded.extend(found);
    }
    expanded
}
