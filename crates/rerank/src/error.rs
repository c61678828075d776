use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RerankError>;

#[derive(Error, Debug)]
pub enum RerankError {
    #[error("Failed to read profile file {path}: {source}")]
    ProfileIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Profile '{name}' is not valid JSON/TOML configuration: {message}")]
    ProfileParse { name: String, message: String },

    #[error("Invalid profile '{name}': {message}")]
    InvalidProfile { name: String, message: String },

    #[error("Unknown profile '{0}' (not a builtin name or an existing file)")]
    UnknownProfile(String),
}
