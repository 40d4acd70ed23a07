//! splitter command-line entry point

use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, error};

use splitx_cli::cli::{commands, Cli};
use splitx_cli::config_initialization::{initialize_configuration_hierarchy, logging_config};
use splitx_cli::error::{exit_code, SplitXError};
use splitx_cli::utils::logging::LoggingSystem;

/// Main entry point for the splitter CLI application
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Usage errors exit with status 2 from inside clap
    let cli = Cli::parse();

    let config = match initialize_configuration_hierarchy(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("splitter: {}", e);
            return ExitCode::from(exit_code::FAILURE);
        }
    };

    // Initialize logging
    let logging = LoggingSystem::new(logging_config(&config, &cli));
    logging.initialize();
    logging.log_system_info();
    debug!("Configuration: {:?}", config);

    match commands::execute(cli.command, &config).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{:#}", e);
            let code = e
                .downcast_ref::<SplitXError>()
                .map(SplitXError::exit_code)
                .unwrap_or(exit_code::FAILURE);
            ExitCode::from(code)
        }
    }
}
