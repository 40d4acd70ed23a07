//! Converter adapters and their registry
//!
//! The [`ConverterRegistry`] owns one adapter per wrapped tool in fixed
//! priority order and reports which executables can be found on `PATH`.

pub mod asfbin;
pub mod avidemux;
pub mod ffmpeg;
pub mod ffprobe;
pub mod mkvmerge;
pub mod mp4box;
pub mod templates;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::adapters::toml_config::ExecutablesConfig;
use crate::domain::model::{Capability, ConverterId, Invocation, ToolCandidate};
use crate::ports::Converter;

pub use asfbin::AsfBinConverter;
pub use avidemux::AviDemuxConverter;
pub use ffmpeg::FFmpegConverter;
pub use ffprobe::FrameRateProbe;
pub use mkvmerge::MkvMergeConverter;
pub use mp4box::Mp4BoxConverter;

/// Availability of one converter, as listed by `splitter converters`
#[derive(Debug, Clone, Serialize)]
pub struct ConverterInfo {
    pub name: String,
    pub executable: String,
    pub available: bool,
    /// Resolved location on disk
    pub path: Option<PathBuf>,
    pub extensions: Vec<String>,
    pub capabilities: Vec<Capability>,
    pub invocation: Invocation,
}

/// Every registered adapter, highest priority first
#[derive(Clone)]
pub struct ConverterRegistry {
    converters: Vec<Arc<dyn Converter>>,
    frame_rate: Option<FrameRateProbe>,
}

impl ConverterRegistry {
    /// Register the five adapters in default priority order
    pub fn from_executables(executables: &ExecutablesConfig) -> Self {
        let converters = ConverterId::ALL
            .iter()
            .enumerate()
            .map(|(rank, id)| -> Arc<dyn Converter> {
                let executable = executables.for_converter(*id).to_string();
                match id {
                    ConverterId::MkvMerge => Arc::new(MkvMergeConverter::new(executable, rank)),
                    ConverterId::FFmpeg => Arc::new(FFmpegConverter::new(
                        executable,
                        executables.ffprobe.clone(),
                        rank,
                    )),
                    ConverterId::Mp4Box => Arc::new(Mp4BoxConverter::new(executable, rank)),
                    ConverterId::AviDemux => Arc::new(AviDemuxConverter::new(
                        executable,
                        executables.file.clone(),
                        rank,
                    )),
                    ConverterId::AsfBin => Arc::new(AsfBinConverter::new(executable, rank)),
                }
            })
            .collect();
        Self {
            converters,
            frame_rate: Some(FrameRateProbe::new(executables.ffprobe.clone())),
        }
    }

    /// Registry holding exactly the given adapters
    pub fn with_converters(converters: Vec<Arc<dyn Converter>>) -> Self {
        Self {
            converters,
            frame_rate: None,
        }
    }

    pub fn with_frame_rate_probe(mut self, probe: FrameRateProbe) -> Self {
        self.frame_rate = Some(probe);
        self
    }

    /// Frame rate lookup for frame cut-lists given without `--fps`
    pub fn frame_rate_probe(&self) -> Option<&FrameRateProbe> {
        self.frame_rate.as_ref()
    }

    pub fn get(&self, id: ConverterId) -> Option<Arc<dyn Converter>> {
        self.converters.iter().find(|c| c.id() == id).cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Converter>> {
        self.converters.iter()
    }

    /// Static candidate data for the selector
    pub fn candidates(&self) -> Vec<ToolCandidate> {
        self.converters
            .iter()
            .map(|c| c.descriptor().clone())
            .collect()
    }

    /// Whether any adapter claims the file
    pub fn claims(&self, path: &Path) -> bool {
        self.converters.iter().any(|c| c.matches(path))
    }

    /// Look every executable up on `PATH`
    pub fn check_all(&self) -> Vec<ConverterInfo> {
        self.converters
            .iter()
            .map(|c| {
                let descriptor = c.descriptor();
                let path = which::which(&descriptor.executable).ok();
                ConverterInfo {
                    name: descriptor.id.name().to_string(),
                    executable: descriptor.executable.clone(),
                    available: path.is_some(),
                    path,
                    extensions: descriptor
                        .extensions
                        .iter()
                        .map(|e| e.trim_start_matches('.').to_lowercase())
                        .collect(),
                    capabilities: descriptor.capabilities.to_vec(),
                    invocation: descriptor.invocation,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ConverterRegistry {
        ConverterRegistry::from_executables(&ExecutablesConfig::default())
    }

    #[test]
    fn test_registry_keeps_priority_order() {
        let ids: Vec<_> = registry().candidates().iter().map(|c| c.id).collect();
        assert_eq!(ids, ConverterId::ALL.to_vec());
        let ranks: Vec<_> = registry().candidates().iter().map(|c| c.rank).collect();
        assert_eq!(ranks, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_only_ffmpeg_applies_filters() {
        let filter_capable: Vec<_> = registry()
            .candidates()
            .into_iter()
            .filter(|c| c.has(Capability::Filters))
            .map(|c| c.id)
            .collect();
        assert_eq!(filter_capable, vec![ConverterId::FFmpeg]);
    }

    #[test]
    fn test_wmv_goes_to_ffmpeg_then_asfbin() {
        let ids: Vec<_> = registry()
            .candidates()
            .into_iter()
            .filter(|c| c.matches(Path::new("clip.wmv")))
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec![ConverterId::FFmpeg, ConverterId::AsfBin]);
        assert!(!registry().claims(Path::new("x.xyz")));
    }

    #[test]
    fn test_executable_overrides_are_used() {
        let mut executables = ExecutablesConfig::default();
        executables.asfbin = "/opt/asfbin/asfbin".to_string();
        let registry = ConverterRegistry::from_executables(&executables);
        let asfbin = registry.get(ConverterId::AsfBin).unwrap();
        assert_eq!(asfbin.descriptor().executable, "/opt/asfbin/asfbin");
    }

    #[test]
    fn test_check_all_reports_every_converter() {
        let mut executables = ExecutablesConfig::default();
        executables.mkvmerge = "nonexistent_tool_xyz_12345".to_string();
        let infos = ConverterRegistry::from_executables(&executables).check_all();
        assert_eq!(infos.len(), 5);
        assert_eq!(infos[0].name, "mkvmerge");
        assert!(!infos[0].available);
        assert!(infos[0].extensions.contains(&"mkv".to_string()));
    }

    #[test]
    fn test_classification_depends_only_on_the_line() {
        let lines = [
            "Progress: 42%",
            "Error: The file 'x' could not be opened",
            "unsupported container: foo",
            "frame=  120 fps= 30 q=-1.0 size=N/A",
            "Unrecognized option 'segment_times'.",
            "Output file is empty, nothing was encoded",
            "Bad Parameter",
            "WARNING: track 2 has no timing",
            "0-100%: 57",
            "PROCESSING FAILED",
            "PerfectAudio",
            "[Script] Tinypy INFO - saving",
            "",
        ];
        for converter in registry().iter() {
            for line in lines {
                assert_eq!(
                    converter.classify(line),
                    converter.classify(line),
                    "{} on {:?}",
                    converter.id(),
                    line
                );
            }
        }
        assert!(registry().frame_rate_probe().is_some());
    }
}
