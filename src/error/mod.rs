//! Top-level error type and process exit codes

use thiserror::Error;

use crate::adapters::toml_config::ConfigError;
use crate::cutlist::CutListError;
use crate::domain::errors::DomainError;

/// Stable process exit codes
pub mod exit_code {
    pub const SUCCESS: u8 = 0;
    pub const FAILURE: u8 = 1;
    pub const USAGE: u8 = 2;
    pub const INPUT_NOT_FOUND: u8 = 3;
    pub const UNSUPPORTED: u8 = 4;
    pub const PARTIAL_FAILURE: u8 = 5;
    pub const ALL_FAILED: u8 = 6;
}

/// Main error type for splitter operations
#[derive(Error, Debug)]
pub enum SplitXError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    CutList(#[from] CutListError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot render output: {0}")]
    Render(String),
}

impl SplitXError {
    /// Exit code for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            SplitXError::Domain(e) => domain_exit_code(e),
            SplitXError::CutList(_) => exit_code::USAGE,
            SplitXError::Config(_) | SplitXError::Io(_) | SplitXError::Render(_) => {
                exit_code::FAILURE
            }
        }
    }
}

fn domain_exit_code(error: &DomainError) -> u8 {
    match error {
        DomainError::InputNotFound { .. } => exit_code::INPUT_NOT_FOUND,
        DomainError::UnsupportedFormat { .. } | DomainError::NoCapableConverter { .. } => {
            exit_code::UNSUPPORTED
        }
        DomainError::PartialSegmentFailure { .. } => exit_code::PARTIAL_FAILURE,
        DomainError::AllCandidatesExhausted { .. } => exit_code::ALL_FAILED,
        DomainError::BadArgs(_) => exit_code::USAGE,
        DomainError::FsFail(_) => exit_code::FAILURE,
    }
}

/// Rank of an exit code when several files were processed
///
/// Exhausting every candidate is the most severe outcome, then partial
/// output, then files that could not be attempted at all.
pub fn severity(code: u8) -> u8 {
    match code {
        exit_code::SUCCESS => 0,
        exit_code::USAGE => 1,
        exit_code::FAILURE => 2,
        exit_code::INPUT_NOT_FOUND => 3,
        exit_code::UNSUPPORTED => 4,
        exit_code::PARTIAL_FAILURE => 5,
        exit_code::ALL_FAILED => 6,
        _ => 2,
    }
}

/// The more severe of two exit codes
pub fn most_severe(a: u8, b: u8) -> u8 {
    if severity(b) > severity(a) {
        b
    } else {
        a
    }
}

/// Result type alias for splitter operations
pub type SplitXResult<T> = std::result::Result<T, SplitXError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{AggregateResult, ConverterId};
    use std::path::PathBuf;

    #[test]
    fn test_exit_codes_are_stable() {
        let path = PathBuf::from("a.mkv");
        let cases = [
            (DomainError::InputNotFound { path: path.clone() }, 3),
            (DomainError::UnsupportedFormat { path: path.clone() }, 4),
            (
                DomainError::NoCapableConverter {
                    path: path.clone(),
                    requirement: "apply custom filters".to_string(),
                },
                4,
            ),
            (
                DomainError::PartialSegmentFailure {
                    path: path.clone(),
                    converter: ConverterId::MkvMerge,
                    aggregate: AggregateResult { successes: 1, total: 2 },
                },
                5,
            ),
            (
                DomainError::AllCandidatesExhausted {
                    path,
                    attempts: 2,
                    last_reason: "boom".to_string(),
                },
                6,
            ),
        ];
        for (error, code) in cases {
            assert_eq!(SplitXError::from(error).exit_code(), code);
        }
    }

    #[test]
    fn test_most_severe_prefers_exhaustion() {
        assert_eq!(most_severe(0, 5), 5);
        assert_eq!(most_severe(6, 3), 6);
        assert_eq!(most_severe(4, 3), 4);
        assert_eq!(most_severe(0, 0), 0);
    }
}
