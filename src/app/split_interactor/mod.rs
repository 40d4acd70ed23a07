// Split interactor - Dispatches one request over the candidate tools

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::adapters::converters::ConverterRegistry;
use crate::app::probe_interactor::run_probe;
use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::*;
use crate::ports::*;

/// Knobs of the dispatch loop, resolved from configuration
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Per-subprocess limit; `None` waits forever
    pub timeout: Option<Duration>,
    pub probe: bool,
    pub dry_run: bool,
    pub keep_side_files: bool,
    /// Move to the next candidate when only some segments succeeded
    pub retry_partial: bool,
    pub retry_policy: RetryPolicy,
    pub explicit_order: Option<Vec<ConverterId>>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(3600)),
            probe: true,
            dry_run: false,
            keep_side_files: false,
            retry_partial: false,
            retry_policy: RetryPolicy::default(),
            explicit_order: None,
        }
    }
}

/// How one attempt ended when it did not succeed
enum AttemptError {
    /// The candidate is done; try the next one
    Recoverable(AttemptFailure),
    /// The whole request is done
    Fatal(DomainError),
}

impl From<DomainError> for AttemptError {
    fn from(e: DomainError) -> Self {
        AttemptError::Fatal(e)
    }
}

/// What a successful attempt produced
struct AttemptOutput {
    aggregate: AggregateResult,
    results: Vec<RunResult>,
    commands: Vec<CommandSpec>,
}

/// Interactor for the split/convert use case
pub struct SplitInteractor {
    registry: ConverterRegistry,
    selector: CandidateSelector,
    process_port: Arc<dyn ProcessPort>,
    fs_port: Arc<dyn FsPort>,
    settings: EngineSettings,
}

impl SplitInteractor {
    /// Create new split interactor with injected ports
    pub fn new(
        registry: ConverterRegistry,
        process_port: Arc<dyn ProcessPort>,
        fs_port: Arc<dyn FsPort>,
        settings: EngineSettings,
    ) -> Self {
        let selector = CandidateSelector::new(registry.candidates());
        Self {
            registry,
            selector,
            process_port,
            fs_port,
            settings,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Run one request, falling back through the candidates until one succeeds
    pub async fn execute(&self, request: ConvertRequest) -> Result<RunSummary, DomainError> {
        let started = Instant::now();

        // Validate input file before anything else sees it
        if !self.fs_port.file_exists(&request.input).await? {
            return Err(DomainError::InputNotFound {
                path: request.input.clone(),
            });
        }
        let request = self.resolve_frame_rate(request).await;

        let candidates = self
            .selector
            .select(&request, self.settings.explicit_order.as_deref())?;
        info!(
            "{}: candidates {}",
            request.input.display(),
            candidates
                .iter()
                .map(|c| c.id.name())
                .collect::<Vec<_>>()
                .join(", ")
        );

        let mut attempts: Vec<AttemptRecord> = Vec::new();
        let mut last_reason = String::from("no candidate was run");

        for (index, candidate) in candidates.iter().enumerate() {
            let Some(converter) = self.registry.get(candidate.id) else {
                debug!("{} is not registered, skipping", candidate.id);
                continue;
            };

            match self.attempt(converter.as_ref(), &request, index).await {
                Ok(output) => {
                    attempts.push(AttemptRecord {
                        converter: candidate.id,
                        succeeded: true,
                        failure_kind: None,
                        reason: None,
                        aggregate: Some(output.aggregate),
                    });
                    return Ok(self
                        .summarize(&request, candidate.id, output, attempts, started)
                        .await);
                }
                Err(AttemptError::Recoverable(failure)) => {
                    warn!(
                        "Attempt {} on {} failed: {}",
                        index + 1,
                        request.input.display(),
                        failure
                    );
                    last_reason = failure.to_string();
                    attempts.push(AttemptRecord {
                        converter: failure.tool(),
                        succeeded: false,
                        failure_kind: Some(failure.kind().to_string()),
                        reason: Some(failure.to_string()),
                        aggregate: match failure {
                            AttemptFailure::PartialSegments { aggregate, .. } => Some(aggregate),
                            _ => None,
                        },
                    });
                }
                Err(AttemptError::Fatal(e)) => return Err(e),
            }
        }

        Err(DomainError::AllCandidatesExhausted {
            path: request.input.clone(),
            attempts: attempts.len(),
            last_reason,
        })
    }

    /// Fill in the frame rate of a frame cut-list from ffprobe
    ///
    /// An explicit `--fps` wins. Without a rate, tools that cannot split on
    /// frame numbers are left out of the candidate list.
    async fn resolve_frame_rate(&self, mut request: ConvertRequest) -> ConvertRequest {
        if request.cuts.unit != CutUnit::Frames
            || request.cuts.is_empty()
            || request.options.frame_rate.is_some()
        {
            return request;
        }
        let Some(probe) = self.registry.frame_rate_probe() else {
            return request;
        };

        let command = probe.command(&request.input);
        match self.process_port.run(&command, self.settings.timeout).await {
            Ok(output) => match probe.parse(&output) {
                Some(fps) => {
                    info!("{}: {:.3} fps", request.input.display(), fps);
                    request.options.frame_rate = Some(fps);
                }
                None => warn!(
                    "{}: ffprobe reported no video frame rate",
                    request.input.display()
                ),
            },
            Err(e) => warn!(
                "Cannot detect the frame rate of {}: {}",
                request.input.display(),
                e
            ),
        }
        request
    }

    /// One candidate, one full pass over the cut-list
    async fn attempt(
        &self,
        converter: &dyn Converter,
        request: &ConvertRequest,
        index: usize,
    ) -> Result<AttemptOutput, AttemptError> {
        let tool = converter.id();
        let descriptor = converter.descriptor();
        let adjusted = self
            .settings
            .retry_policy
            .adjust(request, descriptor, index)?;
        info!("Attempt {} with {}", index + 1, tool);

        if !adjusted.options.chapters.is_empty() && !descriptor.has(Capability::Chapters) {
            warn!("{} cannot embed chapters; they will be ignored", tool);
        }

        if self.settings.probe && !self.settings.dry_run {
            run_probe(
                converter,
                self.process_port.as_ref(),
                &adjusted.input,
                self.settings.timeout,
            )
            .await
            .map_err(AttemptError::Recoverable)?;
        }

        let mut side_files = SideFiles::new(
            side_file_dir(&adjusted.input),
            adjusted.basename(),
            run_token(),
        );
        let commands = converter
            .get_commands(&adjusted, &mut side_files)
            .map_err(|e| {
                AttemptError::Recoverable(AttemptFailure::ToolReportedFailure {
                    tool,
                    reason: e.to_string(),
                })
            })?;
        if commands.is_empty() {
            return Err(AttemptError::Recoverable(
                AttemptFailure::ToolReportedFailure {
                    tool,
                    reason: "no commands generated".to_string(),
                },
            ));
        }

        if converter.keyframe_only() && !adjusted.cuts.is_empty() {
            warn!(
                "{} cuts on keyframes only; output may not match the requested points exactly",
                tool
            );
        }

        let side_files = side_files.into_files();
        self.write_side_files(&side_files).await?;

        if self.settings.dry_run {
            return Ok(AttemptOutput {
                aggregate: AggregateResult::default(),
                results: Vec::new(),
                commands,
            });
        }

        let mut results = Vec::with_capacity(commands.len());
        let mut missing = None;
        for command in &commands {
            info!("Running: {}", command);
            match self.process_port.run(command, self.settings.timeout).await {
                Ok(output) => results.push(self.to_run_result(converter, command, &output)),
                Err(ProcessError::NotFound { program }) => {
                    missing = Some(program);
                    break;
                }
                Err(ProcessError::TimedOut { after, .. }) => {
                    warn!("{} timed out after {:?}", command.program, after);
                    results.push(RunResult::not_run(
                        command,
                        format!("timed out after {}s", after.as_secs()),
                    ));
                }
                Err(e) => {
                    warn!("{}", e);
                    results.push(RunResult::not_run(command, e.to_string()));
                }
            }
        }

        if !self.settings.keep_side_files {
            self.remove_side_files(&side_files).await;
        }

        if let Some(program) = missing {
            return Err(AttemptError::Recoverable(AttemptFailure::ToolNotFound {
                tool,
                executable: program,
            }));
        }

        let aggregate = aggregate_segments(&results, adjusted.cuts.len());
        if aggregate.successes == 0 {
            let reason = first_failure(&results)
                .unwrap_or("no output produced")
                .to_string();
            return Err(AttemptError::Recoverable(
                AttemptFailure::ToolReportedFailure { tool, reason },
            ));
        }
        if !aggregate.is_success() {
            if self.settings.retry_partial {
                return Err(AttemptError::Recoverable(AttemptFailure::PartialSegments {
                    tool,
                    aggregate,
                }));
            }
            return Err(AttemptError::Fatal(DomainError::PartialSegmentFailure {
                path: request.input.clone(),
                converter: tool,
                aggregate,
            }));
        }

        Ok(AttemptOutput {
            aggregate,
            results,
            commands,
        })
    }

    fn to_run_result(
        &self,
        converter: &dyn Converter,
        command: &CommandSpec,
        output: &ProcessOutput,
    ) -> RunResult {
        let report = converter.parse_output(output);
        if let Some(progress) = &report.last_progress {
            info!("{}: {}", converter.id(), progress);
        }

        let failure = match (&report.fatal, output.exit_code) {
            (Some(fatal), _) => Some(fatal.clone()),
            (None, Some(0)) => None,
            (None, Some(code)) => Some(format!("{} exited with status {}", converter.id(), code)),
            (None, None) => Some(format!("{} was terminated by a signal", converter.id())),
        };
        if let Some(reason) = &failure {
            match command.segment {
                Some(i) => warn!("Segment {} failed: {}", i + 1, reason),
                None => warn!("{} failed: {}", converter.id(), reason),
            }
        }

        RunResult {
            command: command.to_string(),
            segment: command.segment,
            exit_code: output.exit_code,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            success: RunResult::derive_success(output.exit_code, report.fatal.as_deref()),
            failure,
            warnings: report.warnings,
            last_progress: report.last_progress,
        }
    }

    /// Write every side file or none of them
    async fn write_side_files(&self, files: &[SideFile]) -> Result<(), DomainError> {
        for (written, file) in files.iter().enumerate() {
            debug!("Writing {}", file.path.display());
            if let Err(e) = self.fs_port.write_new_file(&file.path, &file.contents).await {
                self.remove_side_files(&files[..written]).await;
                return Err(e);
            }
        }
        Ok(())
    }

    async fn remove_side_files(&self, files: &[SideFile]) {
        for file in files {
            if let Err(e) = self.fs_port.remove_file(&file.path).await {
                warn!("Could not remove {}: {}", file.path.display(), e);
            }
        }
    }

    async fn summarize(
        &self,
        request: &ConvertRequest,
        converter: ConverterId,
        output: AttemptOutput,
        attempts: Vec<AttemptRecord>,
        started: Instant,
    ) -> RunSummary {
        let elapsed = started.elapsed().as_secs_f64();
        let throughput = match self.fs_port.file_size(&request.input).await {
            Ok(bytes) if elapsed > 0.0 && !self.settings.dry_run => Some(bytes as f64 / elapsed),
            _ => None,
        };

        if self.settings.dry_run {
            info!("{}: dry run with {}", request.input.display(), converter);
        } else {
            info!(
                "{}: {} segments completed with {} in {:.1}s",
                request.input.display(),
                output.aggregate,
                converter,
                elapsed
            );
        }

        RunSummary {
            input: request.input.clone(),
            converter: Some(converter),
            aggregate: output.aggregate,
            attempts,
            results: output.results,
            elapsed_secs: elapsed,
            throughput_bytes_per_sec: throughput,
            dry_run: self.settings.dry_run,
            commands: if self.settings.dry_run {
                output.commands
            } else {
                Vec::new()
            },
        }
    }
}

/// Side files live next to the input
fn side_file_dir(input: &Path) -> PathBuf {
    input
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

static ATTEMPT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// Unique per attempt for the lifetime of the process
fn run_token() -> String {
    format!(
        "{}-{}-{}",
        chrono::Local::now().format("%Y%m%dT%H%M%S"),
        std::process::id(),
        ATTEMPT_SEQUENCE.fetch_add(1, Ordering::Relaxed)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::converters::{
        AsfBinConverter, FFmpegConverter, FrameRateProbe, MkvMergeConverter,
    };
    use async_trait::async_trait;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    /// Replies to commands by program name, in order
    #[derive(Default)]
    struct ScriptedProcess {
        replies: Mutex<HashMap<String, VecDeque<Result<ProcessOutput, ProcessError>>>>,
        calls: Mutex<Vec<CommandSpec>>,
    }

    impl ScriptedProcess {
        fn reply(self, program: &str, reply: Result<ProcessOutput, ProcessError>) -> Self {
            self.replies
                .lock()
                .unwrap()
                .entry(program.to_string())
                .or_default()
                .push_back(reply);
            self
        }

        fn programs(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|c| c.program.clone())
                .collect()
        }
    }

    #[async_trait]
    impl ProcessPort for ScriptedProcess {
        async fn run(
            &self,
            command: &CommandSpec,
            _timeout: Option<Duration>,
        ) -> Result<ProcessOutput, ProcessError> {
            self.calls.lock().unwrap().push(command.clone());
            self.replies
                .lock()
                .unwrap()
                .get_mut(&command.program)
                .and_then(VecDeque::pop_front)
                .unwrap_or_else(|| {
                    Err(ProcessError::NotFound {
                        program: command.program.clone(),
                    })
                })
        }
    }

    #[derive(Default)]
    struct MemoryFs {
        existing: Vec<PathBuf>,
        files: Mutex<HashMap<PathBuf, String>>,
        removed: Mutex<Vec<PathBuf>>,
    }

    #[async_trait]
    impl FsPort for MemoryFs {
        async fn file_exists(&self, path: &Path) -> Result<bool, DomainError> {
            Ok(self.existing.iter().any(|p| p == path))
        }

        async fn file_size(&self, _path: &Path) -> Result<u64, DomainError> {
            Ok(1_000_000)
        }

        async fn write_new_file(&self, path: &Path, contents: &str) -> Result<(), DomainError> {
            let mut files = self.files.lock().unwrap();
            if files.contains_key(path) {
                return Err(DomainError::FsFail(format!("{} exists", path.display())));
            }
            files.insert(path.to_path_buf(), contents.to_string());
            Ok(())
        }

        async fn remove_file(&self, path: &Path) -> Result<(), DomainError> {
            self.files.lock().unwrap().remove(path);
            self.removed.lock().unwrap().push(path.to_path_buf());
            Ok(())
        }
    }

    fn registry() -> ConverterRegistry {
        ConverterRegistry::with_converters(vec![
            Arc::new(MkvMergeConverter::new("mkvmerge", 0)),
            Arc::new(FFmpegConverter::new("ffmpeg", "ffprobe", 1)),
            Arc::new(AsfBinConverter::new("asfbin", 4)),
        ])
    }

    fn no_probe() -> EngineSettings {
        EngineSettings {
            probe: false,
            ..EngineSettings::default()
        }
    }

    fn request(path: &str, points: &[(Option<f64>, Option<f64>)]) -> ConvertRequest {
        let cuts = CutList::new(
            CutUnit::Seconds,
            points
                .iter()
                .map(|(s, e)| CutPoint::new(*s, *e).unwrap())
                .collect(),
        )
        .unwrap();
        ConvertRequest::new(path, cuts, ConvertOptions::default())
    }

    fn interactor(
        process: Arc<ScriptedProcess>,
        fs: Arc<MemoryFs>,
        settings: EngineSettings,
    ) -> SplitInteractor {
        SplitInteractor::new(registry(), process, fs, settings)
    }

    fn fs_with(path: &str) -> Arc<MemoryFs> {
        Arc::new(MemoryFs {
            existing: vec![PathBuf::from(path)],
            ..MemoryFs::default()
        })
    }

    #[tokio::test]
    async fn test_missing_input_stops_before_selection() {
        let process = Arc::new(ScriptedProcess::default());
        let engine = interactor(process.clone(), Arc::new(MemoryFs::default()), no_probe());
        let err = engine
            .execute(request("/v/movie.xyz", &[]))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InputNotFound { .. }));
        assert!(process.programs().is_empty());
    }

    #[tokio::test]
    async fn test_side_files_are_removed_after_the_attempt() {
        let process = Arc::new(
            ScriptedProcess::default().reply("mkvmerge", Ok(ProcessOutput::new(0, "Progress: 100%\n", ""))),
        );
        let fs = fs_with("/v/movie.mkv");
        let engine = interactor(process.clone(), fs.clone(), no_probe());

        let summary = engine
            .execute(request("/v/movie.mkv", &[(Some(10.0), Some(20.0))]))
            .await
            .unwrap();

        assert_eq!(summary.converter, Some(ConverterId::MkvMerge));
        assert!(fs.files.lock().unwrap().is_empty());
        let removed = fs.removed.lock().unwrap();
        assert_eq!(removed.len(), 1);
        assert!(removed[0].to_string_lossy().ends_with(".MkvMerge.json"));
    }

    #[tokio::test]
    async fn test_retry_uses_fresh_side_file_token_and_universal_container() {
        let process = Arc::new(
            ScriptedProcess::default()
                .reply(
                    "mkvmerge",
                    Ok(ProcessOutput::new(2, "Error: The file could not be opened\n", "")),
                )
                .reply("ffmpeg", Ok(ProcessOutput::new(0, "", "frame=  10\n"))),
        );
        let fs = Arc::new(MemoryFs {
            existing: vec![PathBuf::from("/v/movie.mp4")],
            ..MemoryFs::default()
        });
        let settings = EngineSettings {
            keep_side_files: true,
            ..no_probe()
        };
        let engine = interactor(process.clone(), fs.clone(), settings);

        let summary = engine
            .execute(request("/v/movie.mp4", &[(Some(1.0), Some(2.0))]))
            .await
            .unwrap();

        assert_eq!(summary.converter, Some(ConverterId::FFmpeg));
        assert_eq!(summary.failed_attempts(), 1);
        assert_eq!(
            summary.attempts[0].reason.as_deref(),
            Some("mkvmerge: The file could not be opened")
        );
        let calls = process.calls.lock().unwrap();
        assert!(calls[1].args.iter().any(|a| a.ends_with(".MKV")));
    }

    #[tokio::test]
    async fn test_same_input_twice_gets_distinct_side_files() {
        let process = Arc::new(ScriptedProcess::default());
        let fs = fs_with("/v/movie.mkv");
        let settings = EngineSettings {
            dry_run: true,
            ..EngineSettings::default()
        };
        let engine = interactor(process.clone(), fs.clone(), settings);

        for _ in 0..2 {
            engine
                .execute(request("/v/movie.mkv", &[(Some(10.0), Some(20.0))]))
                .await
                .unwrap();
        }

        assert_eq!(fs.files.lock().unwrap().len(), 2);
        assert!(process.programs().is_empty());
    }

    fn frames_request(path: &str, start: f64, end: f64) -> ConvertRequest {
        let cuts = CutList::new(
            CutUnit::Frames,
            vec![CutPoint::new(Some(start), Some(end)).unwrap()],
        )
        .unwrap();
        ConvertRequest::new(path, cuts, ConvertOptions::default())
    }

    fn asfbin_only() -> ConverterRegistry {
        ConverterRegistry::with_converters(vec![Arc::new(AsfBinConverter::new("asfbin", 0))])
    }

    #[tokio::test]
    async fn test_frame_rate_is_detected_for_seconds_only_tools() {
        let process = Arc::new(
            ScriptedProcess::default()
                .reply(
                    "ffprobe",
                    Ok(ProcessOutput::new(
                        0,
                        r#"{"streams":[{"codec_type":"video","avg_frame_rate":"25/1"}]}"#,
                        "",
                    )),
                )
                .reply("asfbin", Ok(ProcessOutput::new(0, "0-100%: 100\n", ""))),
        );
        let registry = asfbin_only().with_frame_rate_probe(FrameRateProbe::new("ffprobe"));
        let engine = SplitInteractor::new(registry, process.clone(), fs_with("/v/clip.wmv"), no_probe());

        let summary = engine
            .execute(frames_request("/v/clip.wmv", 0.0, 125.0))
            .await
            .unwrap();

        assert_eq!(summary.converter, Some(ConverterId::AsfBin));
        assert_eq!(process.programs(), vec!["ffprobe", "asfbin"]);
    }

    #[tokio::test]
    async fn test_explicit_fps_skips_detection() {
        let process = Arc::new(
            ScriptedProcess::default().reply("asfbin", Ok(ProcessOutput::new(0, "", ""))),
        );
        let registry = asfbin_only().with_frame_rate_probe(FrameRateProbe::new("ffprobe"));
        let engine = SplitInteractor::new(registry, process.clone(), fs_with("/v/clip.wmv"), no_probe());
        let mut request = frames_request("/v/clip.wmv", 0.0, 50.0);
        request.options.frame_rate = Some(25.0);

        engine.execute(request).await.unwrap();
        assert_eq!(process.programs(), vec!["asfbin"]);
    }

    #[tokio::test]
    async fn test_undetectable_frame_rate_leaves_no_candidate() {
        let process = Arc::new(ScriptedProcess::default());
        let registry = asfbin_only().with_frame_rate_probe(FrameRateProbe::new("ffprobe"));
        let engine = SplitInteractor::new(registry, process.clone(), fs_with("/v/clip.wmv"), no_probe());

        let err = engine
            .execute(frames_request("/v/clip.wmv", 0.0, 50.0))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NoCapableConverter { .. }));
        assert_eq!(process.programs(), vec!["ffprobe"]);
    }

    #[tokio::test]
    async fn test_partial_failure_is_fatal_without_retry() {
        let registry = ConverterRegistry::with_converters(vec![Arc::new(
            crate::adapters::converters::Mp4BoxConverter::new("MP4Box", 0),
        )]);
        let process = Arc::new(
            ScriptedProcess::default()
                .reply("MP4Box", Ok(ProcessOutput::new(0, "", "")))
                .reply("MP4Box", Ok(ProcessOutput::new(1, "", "Bad Parameter\n"))),
        );
        let engine = SplitInteractor::new(registry, process, fs_with("/v/a.mp4"), no_probe());

        let err = engine
            .execute(request("/v/a.mp4", &[(Some(0.0), Some(5.0)), (Some(5.0), Some(9.0))]))
            .await
            .unwrap_err();
        match err {
            DomainError::PartialSegmentFailure { aggregate, .. } => {
                assert_eq!(aggregate, AggregateResult { successes: 1, total: 2 });
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_partial_failure_moves_on_when_retry_is_enabled() {
        let registry = ConverterRegistry::with_converters(vec![
            Arc::new(crate::adapters::converters::Mp4BoxConverter::new("MP4Box", 0)),
            Arc::new(FFmpegConverter::new("ffmpeg", "ffprobe", 1)),
        ]);
        let process = Arc::new(
            ScriptedProcess::default()
                .reply("MP4Box", Ok(ProcessOutput::new(0, "", "")))
                .reply("MP4Box", Ok(ProcessOutput::new(1, "", "Bad Parameter\n")))
                .reply("ffmpeg", Ok(ProcessOutput::new(0, "", ""))),
        );
        let settings = EngineSettings {
            retry_partial: true,
            ..no_probe()
        };
        let engine = SplitInteractor::new(registry, process, fs_with("/v/a.mp4"), settings);

        let summary = engine
            .execute(request("/v/a.mp4", &[(Some(0.0), Some(5.0)), (Some(5.0), Some(9.0))]))
            .await
            .unwrap();
        assert_eq!(summary.converter, Some(ConverterId::FFmpeg));
        assert_eq!(
            summary.attempts[0].failure_kind.as_deref(),
            Some("PartialSegmentFailure")
        );
        assert_eq!(summary.aggregate, AggregateResult { successes: 2, total: 2 });
    }

    #[tokio::test]
    async fn test_probe_failure_falls_back() {
        let process = Arc::new(
            ScriptedProcess::default()
                .reply("ffprobe", Ok(ProcessOutput::new(1, "", "Invalid data found\n")))
                .reply("asfbin", Ok(ProcessOutput::new(0, "", "")))
                .reply("asfbin", Ok(ProcessOutput::new(0, "0-100%: 100\n", ""))),
        );
        let engine = interactor(process.clone(), fs_with("/v/clip.wmv"), EngineSettings::default());

        let summary = engine
            .execute(request("/v/clip.wmv", &[(Some(0.0), Some(5.5))]))
            .await
            .unwrap();

        assert_eq!(summary.converter, Some(ConverterId::AsfBin));
        assert_eq!(summary.attempts[0].failure_kind.as_deref(), Some("ProbeFailed"));
        assert_eq!(process.programs(), vec!["ffprobe", "asfbin", "asfbin"]);
    }

    #[tokio::test]
    async fn test_timeout_is_a_failed_segment() {
        let process = Arc::new(ScriptedProcess::default().reply(
            "asfbin",
            Err(ProcessError::TimedOut {
                program: "asfbin".to_string(),
                after: Duration::from_secs(5),
            }),
        ));
        let engine = SplitInteractor::new(
            ConverterRegistry::with_converters(vec![Arc::new(AsfBinConverter::new("asfbin", 0))]),
            process,
            fs_with("/v/clip.wmv"),
            no_probe(),
        );

        let err = engine
            .execute(request("/v/clip.wmv", &[(Some(0.0), Some(5.5))]))
            .await
            .unwrap_err();
        match err {
            DomainError::AllCandidatesExhausted {
                attempts,
                last_reason,
                ..
            } => {
                assert_eq!(attempts, 1);
                assert!(last_reason.contains("timed out"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_dry_run_keeps_side_files_and_runs_nothing() {
        let process = Arc::new(ScriptedProcess::default());
        let fs = fs_with("/v/movie.mkv");
        let settings = EngineSettings {
            dry_run: true,
            ..EngineSettings::default()
        };
        let engine = interactor(process.clone(), fs.clone(), settings);

        let summary = engine
            .execute(request("/v/movie.mkv", &[(Some(10.0), None)]))
            .await
            .unwrap();

        assert!(summary.dry_run);
        assert_eq!(summary.commands.len(), 1);
        assert_eq!(summary.aggregate.total, 0);
        assert!(process.programs().is_empty());
        assert_eq!(fs.files.lock().unwrap().len(), 1);
    }
}
