//! FFmpeg adapter, splitting with the segment muxer

use std::path::Path;

use tracing::info;

use crate::domain::errors::ConverterError;
use crate::domain::model::*;
use crate::domain::output::StreamSelection;
use crate::ports::Converter;

const EXTENSIONS: &[&str] = &[
    ".MKV", ".MKA", ".MKS", ".WEBM", ".MP4", ".M4V", ".MOV", ".AVI", ".MPG", ".MPEG", ".TS",
    ".M2TS", ".MTS", ".OGM", ".OGV", ".FLV", ".DIVX", ".XVID", ".VOB", ".3GP", ".ASF", ".WMV",
    ".NUT", ".WAV", ".MXF",
];

const CAPABILITIES: &[Capability] = &[Capability::FrameSplit, Capability::Filters];

const FATAL: &[&str] = &[
    "Unrecognized option",
    "At least one output file must be specified",
    "Error opening filters!",
    "Output file is empty, nothing was encoded",
];

const WARNINGS: &[&str] = &[
    "deprecated pixel format used, make sure you did set range correctly",
    "DTS discontinuity",
    "Invalid timestamp",
    "Non-increasing DTS",
    "VBV buffer size not set, muxing may fail",
    "Press [q] to stop, [?] for help",
];

/// Containers whose streams cannot be copied into a segment muxer output
const NO_STREAM_COPY: &[&str] = &[".ASF", ".WMV"];

pub struct FFmpegConverter {
    descriptor: ToolCandidate,
    ffprobe: String,
}

impl FFmpegConverter {
    pub fn new(executable: impl Into<String>, ffprobe: impl Into<String>, rank: usize) -> Self {
        Self {
            descriptor: ToolCandidate {
                id: ConverterId::FFmpeg,
                executable: executable.into(),
                extensions: EXTENSIONS,
                capabilities: CAPABILITIES,
                invocation: Invocation::SingleCommand,
                rank,
            },
            ffprobe: ffprobe.into(),
        }
    }

    /// Every distinct nonzero boundary, ascending
    ///
    /// The segment muxer splits at points, so start/end pairs flatten into
    /// one sorted list.
    fn split_points(cuts: &CutList) -> Vec<String> {
        let mut points: Vec<f64> = cuts
            .iter()
            .flat_map(|p| [p.start, p.end])
            .flatten()
            .filter(|v| *v > 0.0)
            .collect();
        points.sort_by(|a, b| a.total_cmp(b));
        points.dedup();
        points.into_iter().map(|v| cuts.format_value(v)).collect()
    }

    fn output_extension(request: &ConvertRequest) -> String {
        match request.options.container {
            Some(container) => container.extension().to_string(),
            None => extension_upper(&request.input).unwrap_or_else(|| ".MKV".to_string()),
        }
    }
}

impl Converter for FFmpegConverter {
    fn descriptor(&self) -> &ToolCandidate {
        &self.descriptor
    }

    fn probe_command(&self, path: &Path) -> Result<CommandSpec, ConverterError> {
        Ok(CommandSpec::new(&self.ffprobe)
            .args(["-v", "error", "-show_format", "-show_streams"])
            .arg(path.to_string_lossy()))
    }

    /// ffprobe prints nothing of interest on failure; its exit status decides
    fn accept_probe(&self, output: &ProcessOutput) -> bool {
        output.exit_code == Some(0)
    }

    fn get_commands(
        &self,
        request: &ConvertRequest,
        _side_files: &mut SideFiles,
    ) -> Result<Vec<CommandSpec>, ConverterError> {
        let mut ext = Self::output_extension(request);
        let mut stream_copy = request.options.filters.is_empty();
        if NO_STREAM_COPY.contains(&ext.as_str()) {
            info!("Direct stream copy disabled for {} output", ext);
            ext = Container::Nut.extension().to_string();
            stream_copy = false;
        }

        let mut command = CommandSpec::new(&self.descriptor.executable)
            .arg("-nostdin")
            .arg("-i")
            .arg(request.input.to_string_lossy());
        if let Some(title) = &request.options.title {
            command = command.arg("-metadata").arg(format!("title={}", title));
        }

        let points = Self::split_points(&request.cuts);
        let output = if points.is_empty() {
            format!("{}_Remux{}", request.filepart(), ext)
        } else {
            let option = match request.cuts.unit {
                CutUnit::Seconds => "-segment_times",
                CutUnit::Frames => "-segment_frames",
            };
            command = command
                .args(["-f", "segment", "-map", "0", "-flags", "+global_header"])
                .arg(option)
                .arg(points.join(","));
            format!("{}-%03d{}", request.filepart(), ext)
        };

        if stream_copy {
            command = command.args(["-c:v", "copy", "-c:a", "copy"]);
        }
        command = command.args(request.options.filters.iter().cloned());
        Ok(vec![command.arg(request.output_path(&output))])
    }

    fn classify(&self, line: &str) -> Result<LineClass, ConverterError> {
        if line.starts_with("frame=") || line.starts_with("size=") {
            return Ok(LineClass::Progress);
        }
        if FATAL.iter().any(|f| line.contains(f)) {
            return Ok(LineClass::Fatal);
        }
        if WARNINGS.iter().any(|w| line.contains(w)) {
            return Ok(LineClass::Warning);
        }
        Ok(LineClass::Noise)
    }

    /// FFmpeg writes all diagnostics to stderr
    fn streams(&self) -> StreamSelection {
        StreamSelection::Stderr
    }
}
