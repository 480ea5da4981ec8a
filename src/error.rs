// Error types shared by the library modules. The binary maps each variant
// to a distinct process exit code (see `Error::exit_code`) so scripts can
// tell failure classes apart.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for dcron-cli operations
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error in {path}: {message}")]
    Config { path: PathBuf, message: String },

    #[error("could not access configuration at {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed configuration at {path}: {source}")]
    ConfigFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not determine the home directory")]
    HomeDirUnavailable,

    #[error("site {0} already exists in configuration")]
    DuplicateSite(String),

    #[error("site {0} not found in configuration")]
    SiteNotFound(String),

    #[error("site {0} has no servers configured")]
    NoServers(String),

    #[error("could not find {requested} for {site} in specified servers ({})", .available.join(", "))]
    Selection {
        requested: String,
        site: String,
        available: Vec<String>,
    },

    #[error("could not find job matching {pattern} {command}")]
    JobNotFound { pattern: String, command: String },

    #[error("request failed: {0}")]
    Remote(#[from] reqwest::Error),

    #[error("unsuccessful request: {body} ({status})")]
    UnexpectedStatus {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("pattern not valid, should follow cron pattern (* * * * *): {0}")]
    InvalidPattern(String),

    #[error("file {0} already exists (use --force to overwrite)")]
    ExportExists(PathBuf),

    #[error("could not locate file for importing {0}")]
    ImportMissing(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Process exit code for this failure class.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Config { .. }
            | Error::ConfigIo { .. }
            | Error::ConfigFormat { .. }
            | Error::HomeDirUnavailable => 10,
            Error::SiteNotFound(_) => 11,
            Error::NoServers(_) => 12,
            Error::Selection { .. } => 13,
            Error::InvalidPattern(_) => 14,
            Error::ExportExists(_) => 15,
            Error::ImportMissing(_) => 16,
            Error::JobNotFound { .. } => 17,
            Error::DuplicateSite(_)
            | Error::Remote(_)
            | Error::UnexpectedStatus { .. }
            | Error::Io(_)
            | Error::Json(_) => 1,
        }
    }
}
