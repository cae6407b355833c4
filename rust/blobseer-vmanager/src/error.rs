use blobseer_metadata::{ObjectId, Version};
use blobseer_storage::DhtError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The outcome of a version manager request, as carried in a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    /// The request succeeded
    Ok,
    /// The request was malformed or violated a precondition
    BadArgument,
    /// The request named an object or version that is not known
    ObjectNotFound,
    /// The request could not be served with the resources at hand
    ResourceExhausted,
}

/// The common error type used by this crate
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionManagerError {
    /// The request was malformed or violated a precondition
    #[error("Bad argument: {0}")]
    BadArgument(String),

    /// No object with this id was ever created
    #[error("Object {0} not found")]
    ObjectNotFound(ObjectId),

    /// The object exists, but the version is not ticketed or not published
    #[error("Version {1} of object {0} not found")]
    VersionNotFound(ObjectId, Version),

    /// An id, ticket or tree size space ran out
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// A request or reply could not be encoded or decoded
    #[error("Codec error: {0}")]
    Codec(DhtError),
}

impl VersionManagerError {
    /// The status that reports this error to a remote caller
    pub fn status(&self) -> Status {
        match self {
            VersionManagerError::BadArgument(_) | VersionManagerError::Codec(_) => {
                Status::BadArgument
            }
            VersionManagerError::ObjectNotFound(_) | VersionManagerError::VersionNotFound(..) => {
                Status::ObjectNotFound
            }
            VersionManagerError::ResourceExhausted(_) => Status::ResourceExhausted,
        }
    }
}

impl From<DhtError> for VersionManagerError {
    fn from(value: DhtError) -> Self {
        VersionManagerError::Codec(value)
    }
}
