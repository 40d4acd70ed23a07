// Probe interactor - Asks every matching tool whether it can open a file

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};

use crate::adapters::converters::ConverterRegistry;
use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::*;

/// Run one converter's pre-check against a file
///
/// A missing executable is reported separately from a tool that ran and
/// rejected the file.
pub async fn run_probe(
    converter: &dyn Converter,
    process_port: &dyn ProcessPort,
    path: &Path,
    timeout: Option<Duration>,
) -> Result<(), AttemptFailure> {
    let tool = converter.id();
    let command = converter
        .probe_command(path)
        .map_err(|e| AttemptFailure::ProbeFailed {
            tool,
            reason: e.to_string(),
        })?;
    debug!("Probing with: {}", command);

    match process_port.run(&command, timeout).await {
        Ok(output) => {
            if converter.accept_probe(&output) {
                Ok(())
            } else {
                let reason = converter
                    .parse_output(&output)
                    .fatal
                    .unwrap_or_else(|| format!("cannot open {}", path.display()));
                Err(AttemptFailure::ProbeFailed { tool, reason })
            }
        }
        Err(ProcessError::NotFound { program }) => Err(AttemptFailure::ToolNotFound {
            tool,
            executable: program,
        }),
        Err(e) => Err(AttemptFailure::ProbeFailed {
            tool,
            reason: e.to_string(),
        }),
    }
}

/// Verdict of one converter on one file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeOutcome {
    pub converter: ConverterId,
    pub passed: bool,
    pub reason: Option<String>,
}

/// Verdicts of every matching converter on one file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeReport {
    pub input: PathBuf,
    pub outcomes: Vec<ProbeOutcome>,
}

impl ProbeReport {
    pub fn any_passed(&self) -> bool {
        self.outcomes.iter().any(|o| o.passed)
    }
}

/// Interactor for the `probe` use case
pub struct ProbeInteractor {
    registry: ConverterRegistry,
    process_port: Arc<dyn ProcessPort>,
    fs_port: Arc<dyn FsPort>,
    timeout: Option<Duration>,
}

impl ProbeInteractor {
    /// Create new probe interactor with injected ports
    pub fn new(
        registry: ConverterRegistry,
        process_port: Arc<dyn ProcessPort>,
        fs_port: Arc<dyn FsPort>,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            registry,
            process_port,
            fs_port,
            timeout,
        }
    }

    /// Probe a file with every converter that claims its extension
    pub async fn execute(&self, input: &Path) -> Result<ProbeReport, DomainError> {
        if !self.fs_port.file_exists(input).await? {
            return Err(DomainError::InputNotFound {
                path: input.to_path_buf(),
            });
        }

        let matching: Vec<_> = self.registry.iter().filter(|c| c.matches(input)).collect();
        if matching.is_empty() {
            return Err(DomainError::UnsupportedFormat {
                path: input.to_path_buf(),
            });
        }

        let mut outcomes = Vec::with_capacity(matching.len());
        for converter in matching {
            let verdict = run_probe(
                converter.as_ref(),
                self.process_port.as_ref(),
                input,
                self.timeout,
            )
            .await;
            let outcome = match verdict {
                Ok(()) => ProbeOutcome {
                    converter: converter.id(),
                    passed: true,
                    reason: None,
                },
                Err(failure) => ProbeOutcome {
                    converter: converter.id(),
                    passed: false,
                    reason: Some(failure.to_string()),
                },
            };
            info!(
                "{}: {} {}",
                input.display(),
                outcome.converter,
                if outcome.passed { "Pass" } else { "Fail" }
            );
            outcomes.push(outcome);
        }

        Ok(ProbeReport {
            input: input.to_path_buf(),
            outcomes,
        })
    }
}
