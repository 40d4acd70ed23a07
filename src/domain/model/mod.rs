// Domain models - Core types and data structures

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;

/// Time specification with precision - represents time in seconds with fractional precision
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct TimeSpec {
    pub seconds: f64,
}

impl TimeSpec {
    /// Create a new TimeSpec from seconds
    pub fn from_seconds(seconds: f64) -> Self {
        Self { seconds }
    }

    /// Create a new TimeSpec from hours, minutes, seconds, milliseconds
    pub fn from_components(hours: u32, minutes: u32, seconds: u32, milliseconds: u32) -> Self {
        let total_seconds = hours as f64 * 3600.0
            + minutes as f64 * 60.0
            + seconds as f64
            + milliseconds as f64 / 1000.0;
        Self { seconds: total_seconds }
    }

    /// Convert to Duration
    pub fn to_duration(&self) -> Duration {
        Duration::from_secs_f64(self.seconds)
    }

    /// Parse time string in various formats
    pub fn parse(time_str: &str) -> Result<Self, DomainError> {
        let trimmed = time_str.trim();

        // Try parsing as seconds (float)
        if let Ok(seconds) = trimmed.parse::<f64>() {
            if seconds < 0.0 || !seconds.is_finite() {
                return Err(DomainError::BadArgs(format!(
                    "Time cannot be negative: {}",
                    trimmed
                )));
            }
            return Ok(Self::from_seconds(seconds));
        }

        let parts: Vec<&str> = trimmed.split(':').collect();
        let parse_minutes = |s: &str| {
            s.parse::<u32>()
                .map_err(|_| DomainError::BadArgs(format!("Invalid minutes in '{}'", trimmed)))
        };
        let parse_seconds = |s: &str| {
            let value = s
                .parse::<f64>()
                .map_err(|_| DomainError::BadArgs(format!("Invalid seconds in '{}'", trimmed)))?;
            if !(0.0..60.0).contains(&value) {
                return Err(DomainError::BadArgs(format!(
                    "Seconds must be less than 60 in '{}'",
                    trimmed
                )));
            }
            Ok(value)
        };

        match parts.as_slice() {
            [minutes, seconds] => {
                let minutes = parse_minutes(minutes)?;
                let seconds = parse_seconds(seconds)?;
                Ok(Self::from_seconds(minutes as f64 * 60.0 + seconds))
            }
            [hours, minutes, seconds] => {
                let hours = hours
                    .parse::<u32>()
                    .map_err(|_| DomainError::BadArgs(format!("Invalid hours in '{}'", trimmed)))?;
                let minutes = parse_minutes(minutes)?;
                if minutes >= 60 {
                    return Err(DomainError::BadArgs(format!(
                        "Minutes must be less than 60 in '{}'",
                        trimmed
                    )));
                }
                let seconds = parse_seconds(seconds)?;
                Ok(Self::from_seconds(
                    hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds,
                ))
            }
            _ => Err(DomainError::BadArgs(format!(
                "Invalid time '{}'. Supported formats: seconds (e.g., 123.45), MM:SS.ms (e.g., 2:30.5), HH:MM:SS.ms (e.g., 1:02:30.5)",
                trimmed
            ))),
        }
    }

    /// Format as HH:MM:SS.mmm, always with hours
    pub fn format_timestamp(&self) -> String {
        let total_millis = (self.seconds * 1000.0).round() as u64;
        let hours = total_millis / 3_600_000;
        let minutes = (total_millis % 3_600_000) / 60_000;
        let seconds = (total_millis % 60_000) / 1000;
        let millis = total_millis % 1000;
        format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis)
    }
}

impl fmt::Display for TimeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_timestamp())
    }
}

/// Unit shared by every point of one cut-list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CutUnit {
    Seconds,
    Frames,
}

/// One (start, end) boundary pair; `None` means start/end of file
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CutPoint {
    pub start: Option<f64>,
    pub end: Option<f64>,
}

impl CutPoint {
    /// Create a cut point, rejecting negative values and inverted ranges
    pub fn new(start: Option<f64>, end: Option<f64>) -> Result<Self, DomainError> {
        for value in [start, end].into_iter().flatten() {
            if value < 0.0 || !value.is_finite() {
                return Err(DomainError::BadArgs(format!(
                    "Cut boundary must be a non-negative number, got {}",
                    value
                )));
            }
        }
        if let (Some(s), Some(e)) = (start, end) {
            if e <= s {
                return Err(DomainError::BadArgs(format!(
                    "Invalid cut range: start ({}) must be less than end ({})",
                    s, e
                )));
            }
        }
        Ok(Self { start, end })
    }

    /// Length of the segment, if both ends are known
    pub fn duration(&self) -> Option<f64> {
        match (self.start, self.end) {
            (Some(s), Some(e)) => Some(e - s),
            (None, Some(e)) => Some(e),
            _ => None,
        }
    }
}

/// Ordered sequence of cut points in a single unit
///
/// Order is significant: segments are produced in the order given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CutList {
    pub unit: CutUnit,
    pub points: Vec<CutPoint>,
}

impl CutList {
    /// Create a cut-list; frame lists must hold whole numbers
    pub fn new(unit: CutUnit, points: Vec<CutPoint>) -> Result<Self, DomainError> {
        if unit == CutUnit::Frames {
            let fractional = points
                .iter()
                .flat_map(|p| [p.start, p.end])
                .flatten()
                .find(|v| v.fract() != 0.0);
            if let Some(value) = fractional {
                return Err(DomainError::BadArgs(format!(
                    "Frame numbers must be whole numbers, got {}",
                    value
                )));
            }
        }
        Ok(Self { unit, points })
    }

    /// Empty cut-list: the whole file is one segment
    pub fn whole_file(unit: CutUnit) -> Self {
        Self {
            unit,
            points: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CutPoint> {
        self.points.iter()
    }

    /// Convert a frame list to seconds at the given frame rate
    pub fn to_seconds(&self, frame_rate: f64) -> Result<Self, DomainError> {
        match self.unit {
            CutUnit::Seconds => Ok(self.clone()),
            CutUnit::Frames => {
                if frame_rate <= 0.0 || !frame_rate.is_finite() {
                    return Err(DomainError::BadArgs(format!(
                        "Frame rate must be positive, got {}",
                        frame_rate
                    )));
                }
                let points = self
                    .points
                    .iter()
                    .map(|p| CutPoint {
                        start: p.start.map(|f| f / frame_rate),
                        end: p.end.map(|f| f / frame_rate),
                    })
                    .collect();
                Ok(Self {
                    unit: CutUnit::Seconds,
                    points,
                })
            }
        }
    }

    /// Render one boundary in this list's unit
    pub fn format_value(&self, value: f64) -> String {
        match self.unit {
            CutUnit::Frames => format!("{}", value as u64),
            CutUnit::Seconds => {
                let text = format!("{:.3}", value);
                text.trim_end_matches('0').trim_end_matches('.').to_string()
            }
        }
    }
}

/// Identifier of one wrapped external tool, in default priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConverterId {
    #[serde(rename = "mkvmerge")]
    MkvMerge,
    #[serde(rename = "ffmpeg")]
    FFmpeg,
    #[serde(rename = "MP4Box")]
    Mp4Box,
    #[serde(rename = "avidemux")]
    AviDemux,
    #[serde(rename = "asfbin")]
    AsfBin,
}

impl ConverterId {
    /// Most robust general-purpose tool first, legacy cutter last
    pub const ALL: [ConverterId; 5] = [
        ConverterId::MkvMerge,
        ConverterId::FFmpeg,
        ConverterId::Mp4Box,
        ConverterId::AviDemux,
        ConverterId::AsfBin,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ConverterId::MkvMerge => "mkvmerge",
            ConverterId::FFmpeg => "ffmpeg",
            ConverterId::Mp4Box => "MP4Box",
            ConverterId::AviDemux => "avidemux",
            ConverterId::AsfBin => "asfbin",
        }
    }
}

impl fmt::Display for ConverterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ConverterId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "MKVMERGE" => Ok(ConverterId::MkvMerge),
            "FFMPEG" => Ok(ConverterId::FFmpeg),
            "MP4BOX" | "GPAC" => Ok(ConverterId::Mp4Box),
            "AVIDEMUX" => Ok(ConverterId::AviDemux),
            "ASFBIN" => Ok(ConverterId::AsfBin),
            other => Err(DomainError::BadArgs(format!(
                "Unknown converter '{}'. Valid converters: mkvmerge, ffmpeg, MP4Box, avidemux, asfbin",
                other.to_lowercase()
            ))),
        }
    }
}

/// Declared abilities consulted by the candidate selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    /// Can split on frame numbers, not only on seconds
    FrameSplit,
    /// Can embed a chapter list in the output
    Chapters,
    /// Can apply arbitrary audio/video filter arguments
    Filters,
}

/// How an adapter maps a cut-list onto subprocess invocations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Invocation {
    /// One command covers every segment
    SingleCommand,
    /// One command per segment
    OneShotPerSegment,
}

/// One registered tool adapter and its static metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolCandidate {
    pub id: ConverterId,
    /// Executable name or path used to invoke the tool
    pub executable: String,
    /// Upper-case extensions including the dot, e.g. ".MKV"
    pub extensions: &'static [&'static str],
    pub capabilities: &'static [Capability],
    pub invocation: Invocation,
    /// Position in the fallback order, lower is tried first
    pub rank: usize,
}

impl ToolCandidate {
    pub fn has(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    /// Whether the file's extension is in this tool's supported set
    pub fn matches(&self, path: &Path) -> bool {
        extension_upper(path)
            .map(|ext| self.extensions.contains(&ext.as_str()))
            .unwrap_or(false)
    }
}

/// Upper-cased extension with its leading dot
pub fn extension_upper(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_uppercase()))
}

/// Output container an adapter may be asked to target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Container {
    Mkv,
    Mp4,
    Avi,
    Nut,
    Ogm,
    Wmv,
}

impl Container {
    pub fn extension(&self) -> &'static str {
        match self {
            Container::Mkv => ".MKV",
            Container::Mp4 => ".MP4",
            Container::Avi => ".AVI",
            Container::Nut => ".NUT",
            Container::Ogm => ".OGM",
            Container::Wmv => ".WMV",
        }
    }
}

impl FromStr for Container {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_start_matches('.').to_lowercase().as_str() {
            "mkv" => Ok(Container::Mkv),
            "mp4" => Ok(Container::Mp4),
            "avi" => Ok(Container::Avi),
            "nut" => Ok(Container::Nut),
            "ogm" => Ok(Container::Ogm),
            "wmv" | "asf" => Ok(Container::Wmv),
            other => Err(DomainError::BadArgs(format!(
                "Unknown container '{}'. Valid containers: mkv, mp4, avi, nut, ogm, wmv",
                other
            ))),
        }
    }
}

/// Named chapter mark
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub name: String,
    pub at: TimeSpec,
}

impl Chapter {
    /// Parse `TIME=NAME`
    pub fn parse(text: &str) -> Result<Self, DomainError> {
        let (time, name) = text.split_once('=').ok_or_else(|| {
            DomainError::BadArgs(format!("Chapter must look like TIME=NAME, got '{}'", text))
        })?;
        Ok(Self {
            name: name.trim().to_string(),
            at: TimeSpec::parse(time)?,
        })
    }
}

/// User options forwarded to adapters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConvertOptions {
    pub title: Option<String>,
    /// Raw filter arguments, e.g. `["-vf", "crop=720:352"]`
    pub filters: Vec<String>,
    pub chapters: Vec<Chapter>,
    pub container: Option<Container>,
    /// Frame rate used to convert frame cuts for seconds-only tools
    pub frame_rate: Option<f64>,
}

/// One top-level request: one file, one full cut-list
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertRequest {
    pub input: PathBuf,
    pub cuts: CutList,
    pub options: ConvertOptions,
    /// Directory receiving the produced segments
    pub output_dir: PathBuf,
}

impl ConvertRequest {
    pub fn new(input: impl Into<PathBuf>, cuts: CutList, options: ConvertOptions) -> Self {
        let input = input.into();
        let output_dir = input
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            input,
            cuts,
            options,
            output_dir,
        }
    }

    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    /// File name without extension
    pub fn filepart(&self) -> String {
        self.input
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    /// File name with extension
    pub fn basename(&self) -> String {
        self.input
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    /// Path of an output file named `name` in the output directory
    pub fn output_path(&self, name: &str) -> String {
        self.output_dir.join(name).to_string_lossy().to_string()
    }
}

/// Opaque argument vector for one subprocess invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Index of the cut point this command produces, for per-segment tools
    pub segment: Option<usize>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            segment: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn for_segment(mut self, index: usize) -> Self {
        self.segment = Some(index);
        self
    }

    /// Render as one POSIX shell line
    pub fn to_shell_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(shell_quote)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

fn shell_quote(word: &str) -> String {
    let safe = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "@%+=:,./-_".contains(c));
    if safe {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', "'\"'\"'"))
    }
}

/// Four-way classification of one line of tool output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineClass {
    /// Progress indicator, never affects control flow
    Progress,
    /// Logged, never affects success
    Warning,
    /// Aborts the invocation
    Fatal,
    /// Dropped silently
    Noise,
}

/// Raw result of a finished subprocess
#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub elapsed: Duration,
}

impl ProcessOutput {
    pub fn new(exit_code: i32, stdout: impl Into<Vec<u8>>, stderr: impl Into<Vec<u8>>) -> Self {
        Self {
            exit_code: Some(exit_code),
            stdout: stdout.into(),
            stderr: stderr.into(),
            elapsed: Duration::ZERO,
        }
    }
}

/// Outcome of one subprocess invocation after classification
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunResult {
    pub command: String,
    pub segment: Option<usize>,
    pub exit_code: Option<i32>,
    #[serde(skip)]
    pub stdout: String,
    #[serde(skip)]
    pub stderr: String,
    pub success: bool,
    /// Line (or process error) that made the invocation fail
    pub failure: Option<String>,
    pub warnings: Vec<String>,
    pub last_progress: Option<String>,
}

impl RunResult {
    /// Nonzero exit and fatal output each force failure on their own
    pub fn derive_success(exit_code: Option<i32>, fatal: Option<&str>) -> bool {
        exit_code == Some(0) && fatal.is_none()
    }

    /// Result for a command that never produced output
    pub fn not_run(command: &CommandSpec, reason: String) -> Self {
        Self {
            command: command.to_string(),
            segment: command.segment,
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
            success: false,
            failure: Some(reason),
            warnings: Vec::new(),
            last_progress: None,
        }
    }
}

/// Success count over the commands of one attempt
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub successes: usize,
    pub total: usize,
}

impl AggregateResult {
    pub fn failures(&self) -> usize {
        self.total - self.successes
    }

    /// Strict AND over every result
    pub fn is_success(&self) -> bool {
        self.successes == self.total
    }

    /// Some but not all succeeded
    pub fn is_partial(&self) -> bool {
        self.successes > 0 && self.successes < self.total
    }
}

impl fmt::Display for AggregateResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.successes, self.total)
    }
}

/// Record of one candidate attempt
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttemptRecord {
    pub converter: ConverterId,
    pub succeeded: bool,
    /// Taxonomy name of the failure, if any
    pub failure_kind: Option<String>,
    pub reason: Option<String>,
    pub aggregate: Option<AggregateResult>,
}

/// Final report for one request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub input: PathBuf,
    pub converter: Option<ConverterId>,
    pub aggregate: AggregateResult,
    pub attempts: Vec<AttemptRecord>,
    pub results: Vec<RunResult>,
    pub elapsed_secs: f64,
    /// Input bytes per second of wall-clock time, observability only
    pub throughput_bytes_per_sec: Option<f64>,
    pub dry_run: bool,
    /// Commands of the chosen candidate, filled for dry runs
    pub commands: Vec<CommandSpec>,
}

impl RunSummary {
    /// Failed attempts that preceded the final one
    pub fn failed_attempts(&self) -> usize {
        self.attempts.iter().filter(|a| !a.succeeded).count()
    }
}

/// Auxiliary file an adapter wants written before its commands run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideFile {
    pub path: PathBuf,
    pub contents: String,
}

/// Allocates collision-free side-file paths for one attempt
///
/// Paths look like `<dir>/<basename>.<token>.<suffix>`; the token is unique
/// per attempt so a retry with another tool never reuses a path.
#[derive(Debug, Clone)]
pub struct SideFiles {
    dir: PathBuf,
    basename: String,
    token: String,
    pending: Vec<SideFile>,
}

impl SideFiles {
    pub fn new(dir: impl Into<PathBuf>, basename: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            basename: basename.into(),
            token: token.into(),
            pending: Vec::new(),
        }
    }

    /// Register a side file and return the path commands should reference
    pub fn add(&mut self, suffix: &str, contents: impl Into<String>) -> PathBuf {
        let path = self
            .dir
            .join(format!("{}.{}.{}", self.basename, self.token, suffix));
        self.pending.push(SideFile {
            path: path.clone(),
            contents: contents.into(),
        });
        path
    }

    pub fn files(&self) -> &[SideFile] {
        &self.pending
    }

    pub fn into_files(self) -> Vec<SideFile> {
        self.pending
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}
