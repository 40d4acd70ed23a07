//! CLI module for splitter
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

pub mod args;
pub mod commands;

pub use args::{ConvertersArgs, OutputFormat, ProbeArgs, RunArgs};

/// splitter - cut and remux video with whichever tool can do the job
///
/// Each file is handed to the wrapped tools (mkvmerge, ffmpeg, MP4Box,
/// avidemux, asfbin) in priority order until one of them succeeds.
#[derive(Parser, Debug)]
#[command(name = "splitter")]
#[command(about = "Split video files with mkvmerge, ffmpeg, MP4Box, avidemux or asfbin")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Logging level
    #[arg(long, global = true, value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: Option<String>,

    /// More output; repeat for trace
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only report errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(long, global = true, value_parser = ["pretty", "compact", "json"])]
    pub log_format: Option<String>,

    /// Configuration file
    #[arg(long, global = true, env = "SPLITX_CONFIG")]
    pub config: Option<PathBuf>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Split or remux files, falling back through the converters
    Run(RunArgs),
    /// Ask every matching converter whether it can open the files
    Probe(ProbeArgs),
    /// List converters in priority order and whether they are installed
    Converters(ConvertersArgs),
}
