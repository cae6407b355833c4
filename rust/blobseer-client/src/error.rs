use blobseer_metadata::{MetadataError, PageKey};
use blobseer_vmanager::VersionManagerError;
use thiserror::Error;

/// The common error type used by this crate
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The configuration could not be parsed
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// No object has been created or opened yet
    #[error("No object is open")]
    NotOpen,

    /// A read or write named a range the object cannot serve
    #[error("Invalid range: {0}")]
    InvalidRange(String),

    /// The version manager refused a request
    #[error("Version manager error: {0}")]
    VersionManager(VersionManagerError),

    /// The tree could not be written or read
    #[error("Metadata error: {0}")]
    Metadata(MetadataError),

    /// The placement service could not find enough providers
    #[error("Placement failed: {0}")]
    ResourceExhausted(String),

    /// A provider failed to store or serve a page
    #[error("Provider error: {0}")]
    Provider(String),

    /// No replica of a page could be fetched intact
    #[error("No replica of page {0} could be read")]
    PageUnavailable(PageKey),
}

impl From<VersionManagerError> for ClientError {
    fn from(value: VersionManagerError) -> Self {
        ClientError::VersionManager(value)
    }
}

impl From<MetadataError> for ClientError {
    fn from(value: MetadataError) -> Self {
        ClientError::Metadata(value)
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(value: serde_json::Error) -> Self {
        ClientError::Config(format!("{value}"))
    }
}
