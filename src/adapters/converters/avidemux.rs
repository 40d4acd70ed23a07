//! Avidemux adapter, driving `avidemux3_cli --run` with a tinypy script per segment

use std::path::Path;

use crate::adapters::converters::templates::{self, AviDemuxJob};
use crate::domain::errors::ConverterError;
use crate::domain::model::*;
use crate::domain::output::TextEncoding;
use crate::ports::Converter;

const EXTENSIONS: &[&str] = &[".AVI", ".DIVX", ".FLV", ".MKV", ".OGM", ".WEBM", ".XVID"];

/// Tinypy cannot handle longer string literals
const MAX_PATH_LEN: usize = 255;

pub struct AviDemuxConverter {
    descriptor: ToolCandidate,
    /// `file(1)`; Avidemux has no info command of its own
    file_utility: String,
}

impl AviDemuxConverter {
    pub fn new(executable: impl Into<String>, file_utility: impl Into<String>, rank: usize) -> Self {
        Self {
            descriptor: ToolCandidate {
                id: ConverterId::AviDemux,
                executable: executable.into(),
                extensions: EXTENSIONS,
                capabilities: &[],
                invocation: Invocation::OneShotPerSegment,
                rank,
            },
            file_utility: file_utility.into(),
        }
    }

    /// Avidemux muxer name and its options
    fn muxer(container: Container) -> Result<(&'static str, &'static [&'static str]), ConverterError> {
        const AVI: &[&str] = &["odmlType=1"];
        const MKV: &[&str] = &["forceDisplayWidth=False", "displayWidth=1280"];
        const MP4: &[&str] = &["muxerType=0", "useAlternateMp3Tag=True"];
        const OGM: &[&str] = &[];
        match container {
            Container::Avi => Ok(("AVI", AVI)),
            Container::Mkv => Ok(("MKV", MKV)),
            Container::Mp4 => Ok(("MP4", MP4)),
            Container::Ogm => Ok(("OGM", OGM)),
            other => Err(ConverterError::Unsupported(format!(
                "avidemux cannot write {:?}",
                other
            ))),
        }
    }

    fn default_container(input: &Path) -> Container {
        match extension_upper(input).as_deref() {
            Some(".MKV") | Some(".WEBM") => Container::Mkv,
            Some(".OGM") => Container::Ogm,
            _ => Container::Avi,
        }
    }

    fn check_filename(path: &Path) -> Result<(), ConverterError> {
        let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        if absolute.to_string_lossy().len() > MAX_PATH_LEN {
            return Err(ConverterError::InvalidInput(format!(
                "path too long for an avidemux script: {}",
                path.display()
            )));
        }
        Ok(())
    }
}

impl Converter for AviDemuxConverter {
    fn descriptor(&self) -> &ToolCandidate {
        &self.descriptor
    }

    fn probe_command(&self, path: &Path) -> Result<CommandSpec, ConverterError> {
        Ok(CommandSpec::new(&self.file_utility).arg(path.to_string_lossy()))
    }

    /// First line of `file` output must name a container avidemux opens
    fn accept_probe(&self, output: &ProcessOutput) -> bool {
        let text = String::from_utf8_lossy(&output.stdout);
        output.exit_code == Some(0)
            && text
                .lines()
                .next()
                .map(|line| line.contains("AVI") || line.contains("MPEG"))
                .unwrap_or(false)
    }

    fn get_commands(
        &self,
        request: &ConvertRequest,
        side_files: &mut SideFiles,
    ) -> Result<Vec<CommandSpec>, ConverterError> {
        Self::check_filename(&request.input)?;
        if request.cuts.unit == CutUnit::Frames {
            return Err(ConverterError::Unsupported(
                "avidemux scripts only cut on seconds".to_string(),
            ));
        }

        let container = request
            .options
            .container
            .unwrap_or_else(|| Self::default_container(&request.input));
        let (muxer, muxer_options) = Self::muxer(container)?;
        let input = request.input.to_string_lossy().to_string();

        let segments: Vec<(Option<usize>, f64, Option<f64>, String)> = if request.cuts.is_empty() {
            vec![(
                None,
                0.0,
                None,
                format!("{}_Remux{}", request.filepart(), container.extension()),
            )]
        } else {
            request
                .cuts
                .iter()
                .enumerate()
                .map(|(i, p)| {
                    (
                        Some(i),
                        p.start.unwrap_or(0.0),
                        p.end,
                        format!("{}-{:03}{}", request.filepart(), i + 1, container.extension()),
                    )
                })
                .collect()
        };

        let mut commands = Vec::with_capacity(segments.len());
        for (segment, start, end, name) in segments {
            let output = request.output_path(&name);
            Self::check_filename(Path::new(&output))?;
            let script = templates::avidemux_script(&AviDemuxJob {
                input: &input,
                output: &output,
                start_seconds: start,
                end_seconds: end,
                container: muxer,
                container_options: muxer_options,
            });
            let suffix = format!("AviDemux.{:03}.py", segment.map(|i| i + 1).unwrap_or(0));
            let script_path = side_files.add(&suffix, script);
            let mut command = CommandSpec::new(&self.descriptor.executable)
                .arg("--run")
                .arg(script_path.to_string_lossy());
            if let Some(i) = segment {
                command = command.for_segment(i);
            }
            commands.push(command);
        }
        Ok(commands)
    }

    fn classify(&self, line: &str) -> Result<LineClass, ConverterError> {
        if line.contains("PerfectAudio") {
            return Ok(LineClass::Noise);
        }
        if let Some(script) = line.strip_prefix("[Script] ") {
            if script.starts_with("Tinypy INFO") {
                return Ok(LineClass::Progress);
            }
            if script.contains("Exception") || script.contains("ERROR") {
                return Ok(LineClass::Fatal);
            }
        }
        Ok(LineClass::Noise)
    }

    /// Avidemux emits raw control bytes
    fn encoding(&self) -> TextEncoding {
        TextEncoding::Latin1
    }
}
