// Adapters - External system implementations

pub mod converters;
pub mod fs_local;
pub mod process_tokio;
pub mod toml_config;

// Re-export adapters
pub use converters::ConverterRegistry;
pub use fs_local::FsLocalAdapter;
pub use process_tokio::TokioProcessAdapter;
pub use toml_config::TomlConfigAdapter;
