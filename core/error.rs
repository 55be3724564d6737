use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AppError {
    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("TOML Parsing Error: {0}")]
    TomlParse(String),

    #[error("TOML Serialization Error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Filesystem Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File Read Error: Path '{path}', Error: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid Project Root: Path '{path}': {reason}")]
    InvalidRoot { path: PathBuf, reason: String },

    #[error("Invalid Argument: {0}")]
    InvalidArgument(String),

    #[error("Unknown output format '{0}' (expected one of: xml, shotgun, markdown, tree)")]
    UnknownFormat(String),

    #[error("Unknown provider '{0}' (expected one of: openai, anthropic, google, generic)")]
    UnknownProvider(String),

    #[error("TikToken Error: {0}")]
    TikToken(String),
}
