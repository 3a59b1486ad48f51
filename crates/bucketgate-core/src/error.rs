use thiserror::Error;

#[derive(Debug, Error)]
pub enum GateError {
    // IO
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Config
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration file not found at {0}")]
    ConfigNotFound(String),

    #[error("Required environment variable {0} is missing or empty")]
    MissingEnv(&'static str),

    #[error("Invalid storage endpoint '{0}': {1}")]
    InvalidEndpoint(String, String),

    // Serialization
    #[error("TOML deserialization error: {0}")]
    TomlDe(String),
}

pub type Result<T> = std::result::Result<T, GateError>;
