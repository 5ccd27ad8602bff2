use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum BirdcallError {
    #[error("missing search scope: {0}")]
    MissingSearchScope(String),

    #[error("{service} request failed: {message}")]
    UpstreamUnavailable { service: String, message: String },

    #[error("{service} returned status {status}: {url}")]
    UpstreamStatus {
        service: String,
        status: u16,
        url: String,
    },

    #[error("failed to download {url}: {message}")]
    AssetFetchFailed { url: String, message: String },

    #[error("unexpected {service} response: {message}")]
    ParseAnomaly { service: String, message: String },

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("failed to write config file at {0}")]
    ConfigWrite(PathBuf),

    #[error("invalid quality rating: {0} (expected one of A, B, C, D, E)")]
    InvalidQuality(String),

    #[error("invalid eBird region code: {0}")]
    InvalidRegionCode(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

impl BirdcallError {
    pub fn upstream(service: &str, message: impl ToString) -> Self {
        Self::UpstreamUnavailable {
            service: service.to_string(),
            message: message.to_string(),
        }
    }

    pub fn parse_anomaly(service: &str, message: impl ToString) -> Self {
        Self::ParseAnomaly {
            service: service.to_string(),
            message: message.to_string(),
        }
    }
}
