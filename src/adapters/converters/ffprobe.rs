//! Frame rate lookup through ffprobe
//!
//! Frame cut-lists are converted to seconds for tools that cannot split on
//! frame numbers; the rate comes from the first video stream's
//! `avg_frame_rate`, with `r_frame_rate` as a fallback.

use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::domain::model::{CommandSpec, ProcessOutput};

#[derive(Debug, Deserialize)]
struct ProbeDocument {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
}

/// Builds the ffprobe invocation and reads the frame rate from its JSON
#[derive(Debug, Clone)]
pub struct FrameRateProbe {
    executable: String,
}

impl FrameRateProbe {
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    pub fn command(&self, path: &Path) -> CommandSpec {
        CommandSpec::new(&self.executable)
            .args(["-v", "error", "-show_streams", "-of", "json"])
            .arg(path.to_string_lossy())
    }

    /// Frames per second of the first video stream, if ffprobe reported one
    pub fn parse(&self, output: &ProcessOutput) -> Option<f64> {
        if output.exit_code != Some(0) {
            return None;
        }
        let document: ProbeDocument = match serde_json::from_slice(&output.stdout) {
            Ok(document) => document,
            Err(e) => {
                debug!("Unreadable ffprobe output: {}", e);
                return None;
            }
        };
        let video = document
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("video"))?;
        let rate = [&video.avg_frame_rate, &video.r_frame_rate]
            .into_iter()
            .flatten()
            .find_map(|rate| parse_rate(rate));
        rate
    }
}

/// `30000/1001`, `25/1` or a plain decimal; `0/0` means unknown
fn parse_rate(text: &str) -> Option<f64> {
    let rate = match text.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => text.trim().parse().ok()?,
    };
    (rate.is_finite() && rate > 0.0).then_some(rate)
}
