// Ports - Interface definitions (contracts)

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::output::{self, OutputReport, StreamSelection, TextEncoding};

/// Port for one wrapped external tool
///
/// Adapters build argument vectors and classify output; they never spawn
/// processes themselves.
pub trait Converter: Send + Sync {
    /// Static registration data: id, executable, extensions, capabilities
    fn descriptor(&self) -> &ToolCandidate;

    fn id(&self) -> ConverterId {
        self.descriptor().id
    }

    /// Can this tool plausibly process the file, based on extension
    fn matches(&self, path: &Path) -> bool {
        self.descriptor().matches(path)
    }

    /// Command for the lightweight pre-check
    fn probe_command(&self, path: &Path) -> Result<CommandSpec, ConverterError>;

    /// Decide whether the probe output means the file is openable
    fn accept_probe(&self, output: &ProcessOutput) -> bool {
        self.parse_output(output).success
    }

    /// Build the invocations for a request; side files go through `side_files`
    fn get_commands(
        &self,
        request: &ConvertRequest,
        side_files: &mut SideFiles,
    ) -> Result<Vec<CommandSpec>, ConverterError>;

    /// Map one output line to its class, or raise a fatal condition
    ///
    /// Must be a pure function of the line text.
    fn classify(&self, line: &str) -> Result<LineClass, ConverterError>;

    /// Captured streams the classifier should see
    fn streams(&self) -> StreamSelection {
        StreamSelection::Both
    }

    fn encoding(&self) -> TextEncoding {
        TextEncoding::Utf8
    }

    /// Classify a completed invocation
    fn parse_output(&self, output: &ProcessOutput) -> OutputReport {
        output::parse_output(output, self.streams(), self.encoding(), |line| {
            self.classify(line)
        })
    }

    /// Cuts land on keyframes only, so output may not match exactly
    fn keyframe_only(&self) -> bool {
        false
    }
}

/// Port for running external processes
#[async_trait]
pub trait ProcessPort: Send + Sync {
    /// Run to completion with stdin closed, capturing both output streams
    async fn run(
        &self,
        command: &CommandSpec,
        timeout: Option<Duration>,
    ) -> Result<ProcessOutput, ProcessError>;
}

/// Port for file system operations
#[async_trait]
pub trait FsPort: Send + Sync {
    /// Check if file exists
    async fn file_exists(&self, path: &Path) -> Result<bool, DomainError>;

    /// Get file size
    async fn file_size(&self, path: &Path) -> Result<u64, DomainError>;

    /// Write a file that must not exist yet
    async fn write_new_file(&self, path: &Path, contents: &str) -> Result<(), DomainError>;

    /// Delete file
    async fn remove_file(&self, path: &Path) -> Result<(), DomainError>;
}
