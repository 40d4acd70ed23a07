//! Legacy tab-separated split files: `start<TAB>label<TAB>end` in frames

use std::path::Path;

use super::CutListError;
use crate::domain::model::{CutList, CutPoint, CutUnit};

/// Parse a split file
///
/// A non-numeric start inherits the previous row's end; an end of `0` or a
/// non-numeric end leaves the segment open.
pub fn parse(text: &str, origin: &Path) -> Result<CutList, CutListError> {
    let mut points = Vec::new();
    let mut last_end: Option<u64> = None;

    for (index, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let columns: Vec<&str> = line.split('\t').collect();
        let [start, _label, end] = columns.as_slice() else {
            return Err(CutListError::Syntax {
                path: origin.to_path_buf(),
                line: index + 1,
                message: format!("expected 3 tab-separated columns, found {}", columns.len()),
            });
        };

        let start = start.trim().parse::<u64>().ok().or(last_end);
        let end = end.trim().parse::<u64>().ok().filter(|frame| *frame != 0);
        points.push(CutPoint::new(start.map(|f| f as f64), end.map(|f| f as f64))?);
        last_end = end;
    }

    Ok(CutList::new(CutUnit::Frames, points)?)
}
