//! Extended M3U playlists carrying VLC start/stop options

use std::path::{Path, PathBuf};

use tracing::{debug, error, warn};

use super::{CutListError, CutSource};
use crate::domain::model::{CutList, CutPoint, CutUnit, TimeSpec};

/// Options collected for the next media line
#[derive(Debug, Default)]
struct Entry {
    name: Option<String>,
    start: Option<f64>,
    stop: Option<f64>,
}

/// Parse a playlist into cuts grouped per media file
///
/// Files keep the order in which they first appear; cuts for one file keep
/// playlist order. Relative media paths resolve against `base_dir`.
pub fn parse(text: &str, base_dir: &Path, origin: &Path) -> Result<Vec<CutSource>, CutListError> {
    let mut lines = text.lines().enumerate();
    if !lines.any(|(_, line)| line.trim_start().starts_with("#EXTM3U")) {
        return Err(CutListError::MissingHeader {
            path: origin.to_path_buf(),
        });
    }

    let mut groups: Vec<(PathBuf, Vec<CutPoint>)> = Vec::new();
    let mut entry = Entry::default();

    for (index, raw) in lines {
        let number = index + 1;
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(info) = line.strip_prefix("#EXTINF:") {
            entry.name = info.split_once(',').map(|(_, name)| name.trim().to_string());
        } else if let Some(option) = line.strip_prefix("#EXTVLCOPT:") {
            let Some((key, value)) = option.split_once('=') else {
                warn!("{}:{}: ignoring option without value", origin.display(), number);
                continue;
            };
            let key = key.trim();
            if key != "start-time" && key != "stop-time" {
                debug!("{}:{}: ignoring option {}", origin.display(), number, key);
                continue;
            }
            // VLC writes stop-time=0 or negative values for "no stop"
            if key == "stop-time" && value.trim().parse::<f64>().map_or(false, |v| v <= 0.0) {
                error!("{}:{}: illegal stop-time={} ignored", origin.display(), number, value);
                continue;
            }
            let seconds = TimeSpec::parse(value)
                .map_err(|e| CutListError::Syntax {
                    path: origin.to_path_buf(),
                    line: number,
                    message: e.to_string(),
                })?
                .seconds;
            if key == "start-time" {
                entry.start = Some(seconds);
            } else {
                entry.stop = Some(seconds);
            }
        } else if line.starts_with('#') {
            warn!("{}:{}: line ignored", origin.display(), number);
            debug!("Unrecognized comment or metadata: {}", line);
        } else {
            let media = resolve(base_dir, line);
            let done = std::mem::take(&mut entry);
            if let Some(name) = &done.name {
                debug!("{}: entry '{}'", media.display(), name);
            }
            let position = match groups.iter().position(|(path, _)| *path == media) {
                Some(position) => position,
                None => {
                    groups.push((media, Vec::new()));
                    groups.len() - 1
                }
            };
            if done.start.is_some() || done.stop.is_some() {
                let point = CutPoint::new(Some(done.start.unwrap_or(0.0)), done.stop).map_err(|e| {
                    CutListError::Syntax {
                        path: origin.to_path_buf(),
                        line: number,
                        message: e.to_string(),
                    }
                })?;
                groups[position].1.push(point);
            }
        }
    }

    groups
        .into_iter()
        .map(|(input, points)| -> Result<CutSource, CutListError> {
            Ok(CutSource {
                input,
                cuts: CutList::new(CutUnit::Seconds, points)?,
            })
        })
        .collect()
}

fn resolve(base_dir: &Path, media: &str) -> PathBuf {
    let path = Path::new(media);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}
