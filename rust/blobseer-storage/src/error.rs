use thiserror::Error;

/// The common error type used by this crate
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DhtError {
    /// An error that occurs while encoding a key or a record
    #[error("Failed to encode a record: {0}")]
    EncodeFailed(String),

    /// An error that occurs while decoding a record
    #[error("Failed to decode a record: {0}")]
    DecodeFailed(String),

    /// A put found the key already bound to a different value
    #[error("Key {0} is already bound to a different value")]
    Conflict(String),

    /// A replace presented a secret that does not match the stored record
    #[error("Secret mismatch for key {0}")]
    SecretMismatch(String),

    /// An error that occurs when working with a DHT backend
    #[error("DHT backend error: {0}")]
    Backend(String),
}
