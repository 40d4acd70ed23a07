// Domain errors - Error types for the domain layer
//
// Two disjoint channels: `DomainError` aborts the whole request, while
// `AttemptFailure` only ends the current candidate and lets the dispatcher
// fall back to the next one.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::domain::model::{AggregateResult, ConverterId};

/// Fatal errors: the request stops here and the process exits nonzero
#[derive(Debug, Clone, Error)]
pub enum DomainError {
    /// The requested input file does not exist
    #[error("Input file not found: {}", path.display())]
    InputNotFound { path: PathBuf },

    /// No adapter claims the file extension
    #[error("Unsupported format: no converter handles {}", path.display())]
    UnsupportedFormat { path: PathBuf },

    /// Adapters claim the extension but none can satisfy the request options
    #[error("No converter for {} can {requirement}", path.display())]
    NoCapableConverter { path: PathBuf, requirement: String },

    /// Some, but not all, segments of a multi-segment run succeeded
    #[error("{converter} completed only {}/{} segments of {}", aggregate.successes, aggregate.total, path.display())]
    PartialSegmentFailure {
        path: PathBuf,
        converter: ConverterId,
        aggregate: AggregateResult,
    },

    /// Every candidate was tried and failed
    #[error("All {attempts} converters tried unsuccessfully on {} (last: {last_reason})", path.display())]
    AllCandidatesExhausted {
        path: PathBuf,
        attempts: usize,
        last_reason: String,
    },

    /// Invalid arguments provided
    #[error("Bad arguments: {0}")]
    BadArgs(String),

    /// File system operation failed
    #[error("File system error: {0}")]
    FsFail(String),
}

/// Recoverable failure of one candidate; the dispatcher moves on
#[derive(Debug, Clone, Error)]
pub enum AttemptFailure {
    /// The external binary could not be started at all
    #[error("{tool}: executable '{executable}' not found")]
    ToolNotFound { tool: ConverterId, executable: String },

    /// The tool could not open or understand the file during the pre-check
    #[error("{tool}: probe failed: {reason}")]
    ProbeFailed { tool: ConverterId, reason: String },

    /// A fatal output line, a nonzero exit, a timeout or an adapter refusal
    #[error("{tool}: {reason}")]
    ToolReportedFailure { tool: ConverterId, reason: String },

    /// Partial segment success while whole-file retry is enabled
    #[error("{tool}: only {}/{} segments completed", aggregate.successes, aggregate.total)]
    PartialSegments {
        tool: ConverterId,
        aggregate: AggregateResult,
    },
}

impl AttemptFailure {
    /// Converter the failure belongs to
    pub fn tool(&self) -> ConverterId {
        match self {
            AttemptFailure::ToolNotFound { tool, .. }
            | AttemptFailure::ProbeFailed { tool, .. }
            | AttemptFailure::ToolReportedFailure { tool, .. }
            | AttemptFailure::PartialSegments { tool, .. } => *tool,
        }
    }

    /// Short taxonomy name used in summaries
    pub fn kind(&self) -> &'static str {
        match self {
            AttemptFailure::ToolNotFound { .. } => "ToolNotFound",
            AttemptFailure::ProbeFailed { .. } => "ProbeFailed",
            AttemptFailure::ToolReportedFailure { .. } => "ToolReportedFailure",
            AttemptFailure::PartialSegments { .. } => "PartialSegmentFailure",
        }
    }
}

/// Errors raised at the adapter boundary
///
/// The dispatcher never inspects tool-specific text; every variant is turned
/// into `AttemptFailure::ToolReportedFailure` and triggers fallback.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConverterError {
    /// The tool cannot express what was requested
    #[error("unsupported request: {0}")]
    Unsupported(String),

    /// The input path is unacceptable to this tool
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The tool's own output named a fatal condition
    #[error("{0}")]
    Reported(String),
}

/// Errors from running an external process
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The executable is missing from the environment
    #[error("{program} not found; is it installed and in PATH?")]
    NotFound { program: String },

    /// The process could not be spawned for another reason
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The process exceeded its time budget and was killed
    #[error("{program} timed out after {after:?}")]
    TimedOut { program: String, after: Duration },

    /// Reading output or waiting failed
    #[error("I/O error while running {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}
