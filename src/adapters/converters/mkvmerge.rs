//! MKVToolNix `mkvmerge` adapter

use std::path::Path;

use crate::adapters::converters::templates;
use crate::domain::errors::ConverterError;
use crate::domain::model::*;
use crate::ports::Converter;

const EXTENSIONS: &[&str] = &[
    ".MKV", ".MKA", ".MKS", ".WEBM", ".MP4", ".M4V", ".MOV", ".AVI", ".MPG", ".MPEG", ".TS",
    ".M2TS", ".MTS", ".OGM", ".OGV", ".FLV", ".DIVX", ".XVID", ".VOB", ".3GP",
];

const CAPABILITIES: &[Capability] = &[Capability::FrameSplit, Capability::Chapters];

const WARNINGS: &[&str] = &[
    "This corresponds to a delay",
    "audio/video synchronization may have been lost",
];

pub struct MkvMergeConverter {
    descriptor: ToolCandidate,
}

impl MkvMergeConverter {
    pub fn new(executable: impl Into<String>, rank: usize) -> Self {
        Self {
            descriptor: ToolCandidate {
                id: ConverterId::MkvMerge,
                executable: executable.into(),
                extensions: EXTENSIONS,
                capabilities: CAPABILITIES,
                invocation: Invocation::SingleCommand,
                rank,
            },
        }
    }

    /// `parts:` / `parts-frames:` argument for `--split`
    fn split_spec(cuts: &CutList) -> String {
        fn timestamp(value: f64) -> String {
            TimeSpec::from_seconds(value).format_timestamp()
        }
        fn frame(value: f64) -> String {
            format!("{}", value as u64)
        }
        let (style, render) = match cuts.unit {
            CutUnit::Seconds => ("parts", timestamp as fn(f64) -> String),
            CutUnit::Frames => ("parts-frames", frame as fn(f64) -> String),
        };
        let pairs = cuts
            .iter()
            .map(|p| {
                format!(
                    "{}-{}",
                    p.start.map(render).unwrap_or_default(),
                    p.end.map(render).unwrap_or_default()
                )
            })
            .collect::<Vec<_>>()
            .join(",");
        format!("{}:{}", style, pairs)
    }
}

impl Converter for MkvMergeConverter {
    fn descriptor(&self) -> &ToolCandidate {
        &self.descriptor
    }

    fn probe_command(&self, path: &Path) -> Result<CommandSpec, ConverterError> {
        Ok(CommandSpec::new(&self.descriptor.executable)
            .arg("-i")
            .arg(path.to_string_lossy()))
    }

    fn get_commands(
        &self,
        request: &ConvertRequest,
        side_files: &mut SideFiles,
    ) -> Result<Vec<CommandSpec>, ConverterError> {
        if let Some(container) = request.options.container {
            if container != Container::Mkv {
                return Err(ConverterError::Unsupported(format!(
                    "mkvmerge only writes Matroska, not {:?}",
                    container
                )));
            }
        }

        let output = if request.cuts.is_empty() {
            request.output_path(&format!("{}_Remux.MKV", request.filepart()))
        } else {
            request.output_path(&format!("{}.MKV", request.filepart()))
        };

        let mut args = vec!["--output".to_string(), output];
        if let Some(title) = &request.options.title {
            args.push("--title".to_string());
            args.push(title.clone());
        }
        if !request.cuts.is_empty() {
            args.push("--link".to_string());
            args.push("--split".to_string());
            args.push(Self::split_spec(&request.cuts));
        }
        if !request.options.chapters.is_empty() {
            let chapters = side_files.add(
                "chapters",
                templates::chapters_text(&request.options.chapters),
            );
            args.push("--chapters".to_string());
            args.push(chapters.to_string_lossy().to_string());
        }
        args.push(request.input.to_string_lossy().to_string());

        let options = side_files.add("MkvMerge.json", templates::mkvmerge_options(&args)?);
        Ok(vec![CommandSpec::new(&self.descriptor.executable)
            .arg(format!("@{}", options.to_string_lossy()))])
    }

    fn classify(&self, line: &str) -> Result<LineClass, ConverterError> {
        if line.starts_with("Progress:") && line.ends_with('%') {
            return Ok(LineClass::Progress);
        }
        if let Some(message) = line.strip_prefix("Error:") {
            return Err(ConverterError::Reported(message.trim().to_string()));
        }
        if line.contains("unsupported container:") {
            return Ok(LineClass::Fatal);
        }
        if line.starts_with("Warning:") || WARNINGS.iter().any(|w| line.contains(w)) {
            return Ok(LineClass::Warning);
        }
        Ok(LineClass::Noise)
    }

    fn keyframe_only(&self) -> bool {
        true
    }
}
