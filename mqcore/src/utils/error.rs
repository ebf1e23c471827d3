use thiserror::Error;

#[derive(Debug, Error)]
pub enum MqError {
    #[error(transparent)]
    Lang(#[from] mqlisp::utils::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse configuration file '{file}': {source}")]
    ConfigParseError {
        source: toml::de::Error,
        file: String,
    },

    #[error("Invalid model: {0}")]
    InvalidModel(String),

    #[error("An unknown error occurred: {0}")]
    Unknown(String),
}

pub type MqResult<T> = Result<T, MqError>;
