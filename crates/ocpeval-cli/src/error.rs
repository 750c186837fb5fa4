use ocpeval::core::normalizer::NormalizerError;
use ocpeval::engine::config::ConfigError;
use ocpeval::engine::error::EvalError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Evaluation(#[from] EvalError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Normalizer(#[from] NormalizerError),

    #[error("Failed to parse file '{path}': {source}", path = path.display())]
    FileParsing {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid argument: {0}")]
    Argument(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
