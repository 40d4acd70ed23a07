//! Configuration initialization and hierarchy management

use tracing::debug;

use crate::adapters::toml_config::{ConfigError, ExecutablesConfig, SplitterConfig};
use crate::adapters::TomlConfigAdapter;
use crate::cli::{Cli, Commands};
use crate::utils::logging::{LogFormat, LogLevel, LoggingConfig};

/// Resolve configuration following precedence: CLI > Env > File > Defaults
pub fn initialize_configuration_hierarchy(cli: &Cli) -> Result<SplitterConfig, ConfigError> {
    // Steps 1 and 2: defaults, then the config file if one is found
    let mut config = TomlConfigAdapter::new().load(cli.config.as_deref())?;

    // Step 3: Override with environment variables
    apply_environment(&mut config, |key| std::env::var(key).ok())?;

    // Step 4: Override with CLI arguments
    apply_cli_overrides(&mut config, cli);

    config.validate()?;
    Ok(config)
}

/// Apply `SPLITX_*` variables; `lookup` abstracts the process environment
pub fn apply_environment<F>(config: &mut SplitterConfig, lookup: F) -> Result<usize, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut overrides = 0;
    let mut found = |name: &str| {
        let value = lookup(name).filter(|v| !v.trim().is_empty());
        if let Some(value) = &value {
            debug!("Found environment override: {} = {}", name, value);
            overrides += 1;
        }
        value
    };

    if let Some(value) = found("SPLITX_LOG_LEVEL") {
        config.log_level = value;
    }
    if let Some(value) = found("SPLITX_LOG_FORMAT") {
        config.log_format = value;
    }
    if let Some(value) = found("SPLITX_TIMEOUT_SECS") {
        config.timeout_secs = value.trim().parse().map_err(|_| {
            ConfigError::Invalid(format!("SPLITX_TIMEOUT_SECS must be a number, got '{}'", value))
        })?;
    }
    if let Some(value) = found("SPLITX_PROBE") {
        config.probe = parse_flag("SPLITX_PROBE", &value)?;
    }
    if let Some(value) = found("SPLITX_KEEP_SIDE_FILES") {
        config.keep_side_files = parse_flag("SPLITX_KEEP_SIDE_FILES", &value)?;
    }
    if let Some(value) = found("SPLITX_RETRY_PARTIAL") {
        config.retry_partial = parse_flag("SPLITX_RETRY_PARTIAL", &value)?;
    }
    if let Some(value) = found("SPLITX_CONVERTERS") {
        config.converters = Some(split_list(&value));
    }
    for key in ExecutablesConfig::KEYS {
        if let Some(value) = found(&format!("SPLITX_{}", key.to_uppercase())) {
            if let Some(slot) = config.executables.slot_mut(key) {
                *slot = value;
            }
        }
    }

    if overrides > 0 {
        debug!("Applied {} environment variable overrides", overrides);
    }
    Ok(overrides)
}

/// Apply CLI argument overrides to configuration
pub fn apply_cli_overrides(config: &mut SplitterConfig, cli: &Cli) {
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.log_format = format.clone();
    }

    if let Commands::Run(args) = &cli.command {
        if let Some(timeout) = args.timeout {
            config.timeout_secs = timeout;
        }
        if args.no_probe {
            config.probe = false;
        }
        if args.dry_run {
            config.dry_run = true;
        }
        if args.keep_side_files {
            config.keep_side_files = true;
        }
        if args.retry_partial {
            config.retry_partial = true;
        }
        if let Some(order) = &args.converters {
            config.converters = Some(order.iter().map(|s| s.trim().to_string()).collect());
        }
    }
}

/// Logging settings from the merged configuration and `-v` / `-q`
pub fn logging_config(config: &SplitterConfig, cli: &Cli) -> LoggingConfig {
    let mut level = config.log_level.parse().unwrap_or(LogLevel::Info);
    if cli.quiet {
        level = LogLevel::Error;
    }
    for _ in 0..cli.verbose {
        level = level.louder();
    }
    LoggingConfig {
        level,
        format: config.log_format.parse().unwrap_or(LogFormat::Pretty),
        target: level == LogLevel::Trace,
    }
}

fn parse_flag(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid(format!(
            "{} must be true or false, got '{}'",
            name, value
        ))),
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_environment_overrides_file_values() {
        let mut config = SplitterConfig::default();
        let applied = apply_environment(
            &mut config,
            env(&[
                ("SPLITX_TIMEOUT_SECS", "60"),
                ("SPLITX_PROBE", "no"),
                ("SPLITX_CONVERTERS", "ffmpeg, asfbin"),
                ("SPLITX_MP4BOX", "/opt/gpac/MP4Box"),
            ]),
        )
        .unwrap();

        assert_eq!(applied, 4);
        assert_eq!(config.timeout_secs, 60);
        assert!(!config.probe);
        assert_eq!(
            config.converters,
            Some(vec!["ffmpeg".to_string(), "asfbin".to_string()])
        );
        assert_eq!(config.executables.mp4box, "/opt/gpac/MP4Box");
    }

    #[test]
    fn test_bad_environment_values_are_rejected() {
        let mut config = SplitterConfig::default();
        assert!(apply_environment(&mut config, env(&[("SPLITX_RETRY_PARTIAL", "maybe")])).is_err());
        assert!(apply_environment(&mut config, env(&[("SPLITX_TIMEOUT_SECS", "soon")])).is_err());
    }

    #[test]
    fn test_cli_wins_over_environment() {
        let mut config = SplitterConfig::default();
        apply_environment(&mut config, env(&[("SPLITX_TIMEOUT_SECS", "60")])).unwrap();

        let cli = Cli::parse_from([
            "splitter", "run", "a.mkv", "--timeout", "5", "-n", "-C", "asfbin,ffmpeg",
        ]);
        apply_cli_overrides(&mut config, &cli);

        assert_eq!(config.timeout_secs, 5);
        assert!(config.dry_run);
        assert_eq!(
            config.converters,
            Some(vec!["asfbin".to_string(), "ffmpeg".to_string()])
        );
    }

    #[test]
    fn test_verbosity_flags() {
        let config = SplitterConfig::default();
        let cli = Cli::parse_from(["splitter", "-vv", "converters"]);
        assert_eq!(logging_config(&config, &cli).level, LogLevel::Trace);

        let cli = Cli::parse_from(["splitter", "-q", "converters"]);
        assert_eq!(logging_config(&config, &cli).level, LogLevel::Error);
    }
}
