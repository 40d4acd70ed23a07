use std::sync::Arc;
use std::time::Duration;

use crate::adapters::toml_config::{ConfigError, SplitterConfig};
use crate::adapters::{ConverterRegistry, FsLocalAdapter, TokioProcessAdapter};
use crate::app::{
    probe_interactor::ProbeInteractor,
    split_interactor::{EngineSettings, SplitInteractor},
};
use crate::domain::rules::RetryPolicy;
use crate::ports::{FsPort, ProcessPort};

pub trait AppContainer: Send + Sync {
    fn split_interactor(&self) -> Arc<SplitInteractor>;
    fn probe_interactor(&self) -> Arc<ProbeInteractor>;
    fn registry(&self) -> &ConverterRegistry;
}

pub struct DefaultAppContainer {
    registry: ConverterRegistry,
    split_interactor: Arc<SplitInteractor>,
    probe_interactor: Arc<ProbeInteractor>,
}

impl DefaultAppContainer {
    /// Wire the real process runner and local filesystem
    pub fn new(config: &SplitterConfig) -> Result<Self, ConfigError> {
        Self::with_ports(
            config,
            Arc::new(TokioProcessAdapter::new()),
            Arc::new(FsLocalAdapter::new()),
        )
    }

    /// Wire custom ports, used by tests
    pub fn with_ports(
        config: &SplitterConfig,
        process_port: Arc<dyn ProcessPort>,
        fs_port: Arc<dyn FsPort>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let registry = ConverterRegistry::from_executables(&config.executables);
        let settings = engine_settings(config)?;
        let timeout = settings.timeout;

        let split_interactor = Arc::new(SplitInteractor::new(
            registry.clone(),
            Arc::clone(&process_port),
            Arc::clone(&fs_port),
            settings,
        ));

        let probe_interactor = Arc::new(ProbeInteractor::new(
            registry.clone(),
            Arc::clone(&process_port),
            Arc::clone(&fs_port),
            timeout,
        ));

        Ok(Self {
            registry,
            split_interactor,
            probe_interactor,
        })
    }
}

impl AppContainer for DefaultAppContainer {
    fn split_interactor(&self) -> Arc<SplitInteractor> {
        Arc::clone(&self.split_interactor)
    }

    fn probe_interactor(&self) -> Arc<ProbeInteractor> {
        Arc::clone(&self.probe_interactor)
    }

    fn registry(&self) -> &ConverterRegistry {
        &self.registry
    }
}

/// Engine knobs from the merged configuration; a zero timeout means none
pub fn engine_settings(config: &SplitterConfig) -> Result<EngineSettings, ConfigError> {
    Ok(EngineSettings {
        timeout: (config.timeout_secs > 0).then(|| Duration::from_secs(config.timeout_secs)),
        probe: config.probe,
        dry_run: config.dry_run,
        keep_side_files: config.keep_side_files,
        retry_partial: config.retry_partial,
        retry_policy: RetryPolicy {
            universal_container_on_retry: config.universal_container_on_retry,
        },
        explicit_order: config.converter_order()?,
    })
}
