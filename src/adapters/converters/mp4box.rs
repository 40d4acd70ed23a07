//! GPAC `MP4Box` adapter, one `-split-chunk` invocation per segment

use std::path::Path;

use crate::adapters::converters::templates;
use crate::domain::errors::ConverterError;
use crate::domain::model::*;
use crate::domain::output::StreamSelection;
use crate::ports::Converter;

const EXTENSIONS: &[&str] = &[
    ".3GP", ".3G2", ".F4V", ".M4V", ".MJ2", ".MOV", ".MP4", ".MPG",
];

const CAPABILITIES: &[Capability] = &[Capability::Chapters];

const FATAL: &[&str] = &["Bad Parameter", "No suitable media tracks to cat"];

const PROGRESS: &[&str] = &["Appending:", "ISO File Writing:", "Splitting:"];

pub struct Mp4BoxConverter {
    descriptor: ToolCandidate,
}

impl Mp4BoxConverter {
    pub fn new(executable: impl Into<String>, rank: usize) -> Self {
        Self {
            descriptor: ToolCandidate {
                id: ConverterId::Mp4Box,
                executable: executable.into(),
                extensions: EXTENSIONS,
                capabilities: CAPABILITIES,
                invocation: Invocation::OneShotPerSegment,
                rank,
            },
        }
    }

    /// MP4Box misparses `+` in file names as a concatenation operator
    fn check_filename(path: &Path) -> Result<(), ConverterError> {
        if path.to_string_lossy().contains('+') {
            return Err(ConverterError::InvalidInput(format!(
                "MP4Box is intolerant of filenames with special characters: '{}'",
                path.display()
            )));
        }
        Ok(())
    }
}

impl Converter for Mp4BoxConverter {
    fn descriptor(&self) -> &ToolCandidate {
        &self.descriptor
    }

    fn probe_command(&self, path: &Path) -> Result<CommandSpec, ConverterError> {
        Self::check_filename(path)?;
        Ok(CommandSpec::new(&self.descriptor.executable)
            .arg("-info")
            .arg(path.to_string_lossy())
            .arg("-std"))
    }

    fn get_commands(
        &self,
        request: &ConvertRequest,
        side_files: &mut SideFiles,
    ) -> Result<Vec<CommandSpec>, ConverterError> {
        Self::check_filename(&request.input)?;
        if request.cuts.unit == CutUnit::Frames {
            return Err(ConverterError::Unsupported(
                "MP4Box only splits on seconds".to_string(),
            ));
        }

        let input = request.input.to_string_lossy().to_string();
        let mut shared = Vec::new();
        if !request.options.chapters.is_empty() {
            let chapters = side_files
                .add("chapters", templates::chapters_text(&request.options.chapters))
                .to_string_lossy()
                .to_string();
            shared.extend(["-chap".to_string(), chapters]);
        }
        let base = CommandSpec::new(&self.descriptor.executable)
            .arg("-cat")
            .arg(input)
            .args(shared);

        if request.cuts.is_empty() {
            let name = if request.options.chapters.is_empty() {
                format!("{}_Cut.MP4", request.filepart())
            } else {
                format!("{}_Chapters.MP4", request.filepart())
            };
            return Ok(vec![base.arg("-new").arg(request.output_path(&name))]);
        }

        Ok(request
            .cuts
            .iter()
            .enumerate()
            .map(|(i, point)| {
                let chunk = format!(
                    "{}:{}",
                    point.start.map(|v| request.cuts.format_value(v)).unwrap_or_default(),
                    point.end.map(|v| request.cuts.format_value(v)).unwrap_or_default()
                );
                let name = format!("{}-{:03}.MP4", request.filepart(), i + 1);
                base.clone()
                    .arg("-split-chunk")
                    .arg(chunk)
                    .arg("-new")
                    .arg(request.output_path(&name))
                    .for_segment(i)
            })
            .collect())
    }

    fn classify(&self, line: &str) -> Result<LineClass, ConverterError> {
        if PROGRESS.iter().any(|p| line.starts_with(p)) {
            return Ok(LineClass::Progress);
        }
        if FATAL.iter().any(|f| line.contains(f)) {
            return Ok(LineClass::Fatal);
        }
        if line.to_uppercase().starts_with("WARNING:") {
            return Ok(LineClass::Warning);
        }
        Ok(LineClass::Noise)
    }

    fn streams(&self) -> StreamSelection {
        StreamSelection::Stderr
    }

    fn keyframe_only(&self) -> bool {
        true
    }
}
