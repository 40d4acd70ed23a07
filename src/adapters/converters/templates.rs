//! Side-file renderers
//!
//! Each function turns normalized options into the text of one auxiliary
//! file. They touch neither the filesystem nor any process.

use crate::domain::errors::ConverterError;
use crate::domain::model::{Chapter, CutList, CutUnit};

/// OGM-style simple chapter list understood by mkvmerge and MP4Box
pub fn chapters_text(chapters: &[Chapter]) -> String {
    chapters
        .iter()
        .enumerate()
        .map(|(i, chapter)| {
            let n = i + 1;
            format!(
                "CHAPTER{n:02}={}\nCHAPTER{n:02}NAME={}\n",
                chapter.at.format_timestamp(),
                chapter.name
            )
        })
        .collect()
}

/// AsfBin marker list, one `<seconds> <name>` per line
pub fn asfbin_markers(chapters: &[Chapter]) -> String {
    chapters
        .iter()
        .map(|chapter| format!("{} {}\n", chapter.at.seconds, chapter.name))
        .collect()
}

/// mkvmerge `@file` option list: a JSON array of arguments
pub fn mkvmerge_options(args: &[String]) -> Result<String, ConverterError> {
    serde_json::to_string_pretty(args)
        .map_err(|e| ConverterError::InvalidInput(format!("cannot encode mkvmerge options: {}", e)))
}

/// AsfBin segment list: `<start>, <duration>` per line
///
/// AsfBin wants durations, not end points, and cannot express an open end.
pub fn asfbin_segments(cuts: &CutList) -> Result<String, ConverterError> {
    if cuts.unit != CutUnit::Seconds {
        return Err(ConverterError::Unsupported(
            "AsfBin only cuts on seconds".to_string(),
        ));
    }
    let mut text = String::new();
    for point in cuts.iter() {
        let start = point.start.unwrap_or(0.0);
        let end = point.end.ok_or_else(|| {
            ConverterError::Unsupported(format!(
                "AsfBin needs an end time for the segment starting at {}",
                cuts.format_value(start)
            ))
        })?;
        text.push_str(&format!(
            "{}, {}\n",
            cuts.format_value(start),
            cuts.format_value(end - start)
        ));
    }
    Ok(text)
}

/// AsfBin attribute list
pub fn asfbin_attributes(title: &str) -> String {
    format!("Title={}\n", title)
}

/// One AviDemux cut: load, mark, copy streams, save
#[derive(Debug, Clone, PartialEq)]
pub struct AviDemuxJob<'a> {
    pub input: &'a str,
    pub output: &'a str,
    pub start_seconds: f64,
    /// `None` runs to the end of the video
    pub end_seconds: Option<f64>,
    pub container: &'a str,
    pub container_options: &'a [&'a str],
}

fn tinypy_string(text: &str) -> String {
    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}

fn micros(seconds: f64) -> u64 {
    (seconds * 1_000_000.0).round() as u64
}

/// Tinypy script for `avidemux --run`
pub fn avidemux_script(job: &AviDemuxJob<'_>) -> String {
    let marker_b = match job.end_seconds {
        Some(end) => micros(end).to_string(),
        None => "adm.getVideoDuration()".to_string(),
    };
    let container_args: String = std::iter::once(tinypy_string(job.container))
        .chain(job.container_options.iter().map(|o| tinypy_string(o)))
        .collect::<Vec<_>>()
        .join(", ");

    let mut script = String::from("#PY  <- generated by splitter\n");
    script.push_str("adm = Avidemux()\n");
    script.push_str(&format!(
        "if not adm.loadVideo({}):\n    raise(\"Cannot load input\")\n",
        tinypy_string(job.input)
    ));
    script.push_str(&format!("adm.markerA = {}\n", micros(job.start_seconds)));
    script.push_str(&format!("adm.markerB = {}\n", marker_b));
    script.push_str("adm.videoCodec(\"Copy\")\n");
    script.push_str("adm.audioCodec(0, \"copy\")\n");
    script.push_str(&format!("adm.setContainer({})\n", container_args));
    script.push_str(&format!("adm.save({})\n", tinypy_string(job.output)));
    script
}
