//! splitx - converter dispatch and fallback for video splitting
//!
//! Wraps external tools (mkvmerge, ffmpeg, MP4Box, avidemux, asfbin) behind
//! one interface. Each request is tried with every capable tool in priority
//! order until one of them produces every requested segment.
//!
//! # Usage
//!
//! ```bash
//! splitter run movie.mkv --cuts "10-20,30-"
//! splitter run playlist.m3u --dry-run
//! splitter probe clip.wmv
//! splitter converters
//! ```

pub mod adapters;
pub mod app;
pub mod cli;
pub mod config_initialization;
pub mod cutlist;
pub mod domain;
pub mod error;
pub mod ports;
pub mod utils;

// Re-export commonly used types
pub use domain::errors::{AttemptFailure, ConverterError, DomainError};
pub use domain::model::{CutList, CutPoint, CutUnit, RunSummary};
pub use error::{SplitXError, SplitXResult};
