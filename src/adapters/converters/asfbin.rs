//! AsfBin adapter for ASF/WMV cutting

use std::path::Path;

use crate::adapters::converters::templates;
use crate::domain::errors::ConverterError;
use crate::domain::model::*;
use crate::domain::output::StreamSelection;
use crate::ports::Converter;

const EXTENSIONS: &[&str] = &[".ASF", ".WMV", ".WVM"];

const CAPABILITIES: &[Capability] = &[Capability::Chapters];

const ERRORS: &[&str] = &[
    "PROCESSING FAILED",
    "At least one file cannot be processed",
    "exists but it is too short",
];

pub struct AsfBinConverter {
    descriptor: ToolCandidate,
}

impl AsfBinConverter {
    pub fn new(executable: impl Into<String>, rank: usize) -> Self {
        Self {
            descriptor: ToolCandidate {
                id: ConverterId::AsfBin,
                executable: executable.into(),
                extensions: EXTENSIONS,
                capabilities: CAPABILITIES,
                invocation: Invocation::SingleCommand,
                rank,
            },
        }
    }
}

impl Converter for AsfBinConverter {
    fn descriptor(&self) -> &ToolCandidate {
        &self.descriptor
    }

    fn probe_command(&self, path: &Path) -> Result<CommandSpec, ConverterError> {
        Ok(CommandSpec::new(&self.descriptor.executable)
            .arg("-i")
            .arg(path.to_string_lossy())
            .args(["-info", "-infohdr"]))
    }

    fn get_commands(
        &self,
        request: &ConvertRequest,
        side_files: &mut SideFiles,
    ) -> Result<Vec<CommandSpec>, ConverterError> {
        // AsfBin is picky about argument order: inputs first
        let mut command = CommandSpec::new(&self.descriptor.executable)
            .arg("-i")
            .arg(request.input.to_string_lossy());

        if request.cuts.is_empty() {
            command = command
                .arg("-o")
                .arg(request.output_path(&format!("{}_Remux.WMV", request.filepart())));
        } else {
            let segments = side_files.add("AsfBin.segments", templates::asfbin_segments(&request.cuts)?);
            command = command
                .arg("-sep")
                .arg("-o")
                .arg(request.output_path(&format!("{}_.WMV", request.filepart())))
                .arg("-s")
                .arg(segments.to_string_lossy());
        }

        if let Some(title) = &request.options.title {
            let attributes = side_files.add("AsfBin.attributes", templates::asfbin_attributes(title));
            command = command.arg("-a").arg(attributes.to_string_lossy());
        }
        if !request.options.chapters.is_empty() {
            let markers = side_files.add(
                "AsfBin.markers",
                templates::asfbin_markers(&request.options.chapters),
            );
            command = command.arg("-m").arg(markers.to_string_lossy());
        }
        Ok(vec![command])
    }

    fn classify(&self, line: &str) -> Result<LineClass, ConverterError> {
        if line.starts_with("0-100%:") {
            return Ok(LineClass::Progress);
        }
        if ERRORS.iter().any(|e| line.contains(e)) {
            return Ok(LineClass::Fatal);
        }
        Ok(LineClass::Noise)
    }

    /// AsfBin does not use stderr
    fn streams(&self) -> StreamSelection {
        StreamSelection::Stdout
    }

    fn keyframe_only(&self) -> bool {
        true
    }
}
