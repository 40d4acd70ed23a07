//! Command implementations

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::adapters::converters::{ConverterInfo, ConverterRegistry};
use crate::adapters::toml_config::SplitterConfig;
use crate::app::container::{AppContainer, DefaultAppContainer};
use crate::cli::args::{ConvertersArgs, OutputFormat, ProbeArgs, RunArgs};
use crate::cli::Commands;
use crate::cutlist::{self, CutListDocument, CutListError};
use crate::domain::errors::DomainError;
use crate::domain::model::*;
use crate::error::{exit_code, most_severe, SplitXError};
use crate::utils::Utils;

/// Dispatch a parsed command; returns the process exit code
pub async fn execute(command: Commands, config: &SplitterConfig) -> Result<u8> {
    let container = DefaultAppContainer::new(config)
        .map_err(SplitXError::from)
        .context("Failed to set up converters")?;
    match command {
        Commands::Run(args) => run(args, &container).await,
        Commands::Probe(args) => probe(args, &container).await,
        Commands::Converters(args) => converters(args, container.registry()),
    }
}

/// Outcome of one input file, as rendered for `--format json|yaml`
#[derive(Debug, Serialize)]
struct FileReport {
    input: PathBuf,
    exit_code: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<RunSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Execute the run command
pub async fn run(args: RunArgs, container: &dyn AppContainer) -> Result<u8> {
    let options = convert_options(&args).map_err(SplitXError::from)?;
    let jobs = collect_jobs(&args, container.registry())?;
    if jobs.is_empty() {
        return Err(SplitXError::from(DomainError::BadArgs(
            "no input files to process".to_string(),
        ))
        .into());
    }

    let interactor = container.split_interactor();
    let dry_run = interactor.settings().dry_run;
    let mut reports = Vec::with_capacity(jobs.len());
    let mut overall = exit_code::SUCCESS;

    if dry_run && args.format == OutputFormat::Text {
        println!("#! /usr/bin/env sh");
    }

    for (input, cuts) in jobs {
        let mut request = ConvertRequest::new(input.clone(), cuts, options.clone());
        if let Some(dir) = &args.output_dir {
            request = request.with_output_dir(dir);
        }
        info!("Processing {}", input.display());

        let report = match interactor.execute(request).await {
            Ok(summary) => {
                if args.format == OutputFormat::Text {
                    print_summary(&summary);
                }
                FileReport {
                    input,
                    exit_code: exit_code::SUCCESS,
                    summary: Some(summary),
                    error: None,
                }
            }
            Err(e) => {
                error!("{}", e);
                let code = SplitXError::from(e.clone()).exit_code();
                FileReport {
                    input,
                    exit_code: code,
                    summary: None,
                    error: Some(e.to_string()),
                }
            }
        };
        overall = most_severe(overall, report.exit_code);
        reports.push(report);
    }

    if args.format != OutputFormat::Text {
        println!("{}", render(&reports, args.format)?);
    }
    Ok(overall)
}

fn print_summary(summary: &RunSummary) {
    let converter = summary
        .converter
        .map(|c| c.name())
        .unwrap_or("no converter");
    if summary.dry_run {
        println!("# {} ({})", summary.input.display(), converter);
        for command in &summary.commands {
            println!("{}", command.to_shell_line());
        }
        return;
    }

    let mut line = format!(
        "{}: {} segments completed with {}",
        summary.input.display(),
        summary.aggregate,
        converter
    );
    match summary.failed_attempts() {
        0 => {}
        1 => line.push_str(" after 1 failed attempt"),
        n => line.push_str(&format!(" after {} failed attempts", n)),
    }
    line.push_str(&format!(
        " in {}",
        Utils::format_duration(std::time::Duration::from_secs_f64(summary.elapsed_secs))
    ));
    if let Some(rate) = summary.throughput_bytes_per_sec {
        line.push_str(&format!(" ({})", Utils::format_throughput(rate)));
    }
    println!("{}", line);
}

/// Options shared by every file of one invocation
fn convert_options(args: &RunArgs) -> Result<ConvertOptions, DomainError> {
    if let Some(fps) = args.fps {
        if fps <= 0.0 || !fps.is_finite() {
            return Err(DomainError::BadArgs(format!(
                "Frame rate must be positive, got {}",
                fps
            )));
        }
    }
    Ok(ConvertOptions {
        title: args.title.clone(),
        filters: args
            .filters
            .as_deref()
            .map(|f| f.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default(),
        chapters: args
            .chapters
            .iter()
            .map(|c| Chapter::parse(c))
            .collect::<Result<_, _>>()?,
        container: args.container.as_deref().map(str::parse::<Container>).transpose()?,
        frame_rate: args.fps,
    })
}

/// Pair every input with its cuts
///
/// Playlists name their own media; other inputs share `--cuts` or a
/// media-less `--cutlist`, or are processed whole.
fn collect_jobs(
    args: &RunArgs,
    registry: &ConverterRegistry,
) -> Result<Vec<(PathBuf, CutList)>, SplitXError> {
    let unit = if args.frames {
        CutUnit::Frames
    } else {
        CutUnit::Seconds
    };
    let mut jobs = Vec::new();

    let mut shared = match &args.cuts {
        Some(text) => cutlist::parse_inline(text, unit)?,
        None => CutList::whole_file(unit),
    };
    if let Some(path) = &args.cutlist {
        match cutlist::load(path)? {
            CutListDocument::PerFile(sources) => {
                jobs.extend(sources.into_iter().map(|s| (s.input, s.cuts)));
            }
            CutListDocument::Shared(cuts) => shared = cuts,
        }
    }
    if args.frames && shared.unit != CutUnit::Frames && !shared.is_empty() {
        warn!("--frames ignored: the cut-list is in seconds");
    }

    let mut media = Vec::new();
    for file in &args.files {
        if cutlist::is_cutlist_path(file) {
            match cutlist::load(file)? {
                CutListDocument::PerFile(sources) => {
                    jobs.extend(sources.into_iter().map(|s| (s.input, s.cuts)));
                }
                CutListDocument::Shared(_) => {
                    return Err(CutListError::Invalid(format!(
                        "{} names no media files; pass it with --cutlist",
                        file.display()
                    ))
                    .into());
                }
            }
        } else {
            media.push(file.clone());
        }
    }

    for input in cutlist::expand_inputs(&media, |p| registry.claims(p)) {
        jobs.push((input, shared.clone()));
    }
    Ok(jobs)
}

/// Execute the probe command
pub async fn probe(args: ProbeArgs, container: &dyn AppContainer) -> Result<u8> {
    let interactor = container.probe_interactor();
    let mut overall = exit_code::SUCCESS;
    let mut reports = Vec::new();

    for file in &args.files {
        match interactor.execute(file).await {
            Ok(report) => {
                if args.format == OutputFormat::Text {
                    println!("{}", file.display());
                    for outcome in &report.outcomes {
                        println!(
                            "{}:\t{}",
                            outcome.converter,
                            if outcome.passed { "Pass" } else { "Fail" }
                        );
                        if let Some(reason) = &outcome.reason {
                            info!("{}", reason);
                        }
                    }
                }
                if !report.any_passed() {
                    overall = most_severe(overall, exit_code::ALL_FAILED);
                }
                reports.push(serde_json::to_value(&report).context("Failed to serialize probe report")?);
            }
            Err(e) => {
                error!("{}", e);
                overall = most_severe(overall, SplitXError::from(e.clone()).exit_code());
                reports.push(serde_json::json!({
                    "input": file,
                    "error": e.to_string(),
                }));
            }
        }
    }

    if args.format != OutputFormat::Text {
        println!("{}", render(&reports, args.format)?);
    }
    Ok(overall)
}

/// Execute the converters command
pub fn converters(args: ConvertersArgs, registry: &ConverterRegistry) -> Result<u8> {
    let infos = registry.check_all();
    if args.format != OutputFormat::Text {
        println!("{}", render(&infos, args.format)?);
        return Ok(exit_code::SUCCESS);
    }
    for info in &infos {
        println!("{}", converter_line(info));
    }
    Ok(exit_code::SUCCESS)
}

fn converter_line(info: &ConverterInfo) -> String {
    let location = match &info.path {
        Some(path) => path.display().to_string(),
        None => info.executable.clone(),
    };
    let capabilities: Vec<&str> = info
        .capabilities
        .iter()
        .map(|c| match c {
            Capability::FrameSplit => "frame-split",
            Capability::Chapters => "chapters",
            Capability::Filters => "filters",
        })
        .collect();
    format!(
        "{}\t{}\t{}\t[{}]\t{}",
        info.name,
        if info.available { "available" } else { "missing" },
        location,
        capabilities.join(", "),
        info.extensions.join(" ")
    )
}

fn render<T: Serialize>(value: &T, format: OutputFormat) -> Result<String> {
    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(value).map_err(|e| e.to_string()),
        OutputFormat::Yaml => serde_yaml::to_string(value).map_err(|e| e.to_string()),
        OutputFormat::Text => Err("text output has no serialized form".to_string()),
    };
    Ok(rendered.map_err(SplitXError::Render)?)
}
