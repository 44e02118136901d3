use std::process::ExitCode;

use ssh_alert::config::{load_env_file, AppConfig, LoggingConfig};
use ssh_alert::monitoring::{
    tail_available, Classifier, EventProcessor, TailFollower, TelegramAlert,
};
use ssh_alert::shutdown::shutdown_signal;
use ssh_alert::utils::{init_logging, AppError};
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    // 1. Load environment (.env)
    load_env_file();

    // 2. Initialize logging; the guard flushes the log file on exit
    let _guard = init_logging(&LoggingConfig::from_env());

    // 3. Load configuration
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration, refusing to start");
            return ExitCode::FAILURE;
        }
    };

    // 4. Run the pipeline
    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Service stopped with error");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: AppConfig) -> Result<(), AppError> {
    let classifier = Classifier::new(config.rule_set)?;
    let sender = TelegramAlert::new(&config.telegram)?;

    if !tail_available() {
        return Err(AppError::SourceSpawn("tail is not available".to_string()));
    }
    let source = TailFollower::spawn(&config.watch_files)?;

    info!(
        rule_set = ?config.rule_set,
        rules = classifier.rules().len(),
        chat_id = %sender.chat_id(),
        "Service started"
    );

    let mut processor = EventProcessor::new(source, classifier, sender);
    processor.run(shutdown_signal()).await?;

    Ok(())
}
