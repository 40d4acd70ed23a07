//! Command-line argument definitions

use std::path::PathBuf;

use clap::{Args, ValueEnum};

use crate::domain::model::ConverterId;

/// Rendering of command results on stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Yaml,
}

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Media files, directories or playlists (.m3u, .cutlist)
    #[arg(required_unless_present = "cutlist")]
    pub files: Vec<PathBuf>,

    /// Segments as START-END pairs, e.g. "10-20,1:30-" (empty side = file start/end)
    #[arg(long, conflicts_with = "cutlist")]
    pub cuts: Option<String>,

    /// Cut-list document (.m3u, .m3u8, .cutlist, .tsv, .splits)
    #[arg(long)]
    pub cutlist: Option<PathBuf>,

    /// Cut values are frame numbers instead of seconds
    #[arg(long)]
    pub frames: bool,

    /// Frame rate used to convert frame cuts for seconds-only converters
    /// (read with ffprobe when omitted)
    #[arg(long)]
    pub fps: Option<f64>,

    /// Explicit converter order, e.g. "ffmpeg,asfbin"
    #[arg(short = 'C', long, value_delimiter = ',', value_parser = parse_converter_name)]
    pub converters: Option<Vec<String>>,

    /// Print the commands as a shell script instead of running them
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Title written into the output metadata
    #[arg(long)]
    pub title: Option<String>,

    /// Raw filter arguments, e.g. "-vf crop=720:352"
    #[arg(long, allow_hyphen_values = true)]
    pub filters: Option<String>,

    /// Output container (mkv, mp4, avi, nut, ogm, wmv)
    #[arg(long)]
    pub container: Option<String>,

    /// Directory receiving the output (default: next to the input)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Chapter mark as TIME=NAME; repeatable
    #[arg(long = "chapter")]
    pub chapters: Vec<String>,

    /// Per-command timeout in seconds (0 = none)
    #[arg(long, value_parser = parse_timeout)]
    pub timeout: Option<u64>,

    /// Skip the pre-check before each converter
    #[arg(long)]
    pub no_probe: bool,

    /// Keep generated option/script files
    #[arg(long)]
    pub keep_side_files: bool,

    /// Try the next converter when only some segments succeeded
    #[arg(long)]
    pub retry_partial: bool,

    /// Result format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// Arguments for the probe command
#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Media files to probe
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Result format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// Arguments for the converters command
#[derive(Args, Debug)]
pub struct ConvertersArgs {
    /// Result format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// Known converter name, case-insensitive
fn parse_converter_name(s: &str) -> Result<String, String> {
    s.parse::<ConverterId>()
        .map(|id| id.name().to_string())
        .map_err(|e| e.to_string())
}

/// At most one week
fn parse_timeout(s: &str) -> Result<u64, String> {
    clap_num::number_range(s, 0, 7 * 24 * 3600)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_range() {
        assert_eq!(parse_timeout("90"), Ok(90));
        assert!(parse_timeout("-1").is_err());
        assert!(parse_timeout("99999999").is_err());
    }

    #[test]
    fn test_converter_names_are_normalized() {
        assert_eq!(parse_converter_name("MKVMERGE"), Ok("mkvmerge".to_string()));
        assert_eq!(parse_converter_name("gpac"), Ok("MP4Box".to_string()));
        assert!(parse_converter_name("handbrake").is_err());
    }
}
