use std::io;
use std::time::Duration;

use thiserror::Error;

/// Failures while parsing the mounted region markup.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("markup parse error at byte {position}: {message}")]
    Parse { position: u64, message: String },

    #[error("markup is not valid UTF-8 at byte {position}")]
    Encoding { position: u64 },
}

/// Invalid script profile settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field} pattern: {source}")]
    Pattern {
        field: &'static str,
        #[source]
        source: regex::Error,
    },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
}

/// Failures fetching or decoding dictionary resources.
///
/// Any of these leaves the store in the `Failed` state for the rest of the
/// session; lookups then behave as "not found".
#[derive(Debug, Error)]
pub enum DictionaryLoadError {
    #[error("timed out after {}s", .after.as_secs())]
    Timeout { after: Duration },

    #[error("failed to read {resource}: {source}")]
    Io {
        resource: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to fetch {resource}: {message}")]
    Network { resource: String, message: String },

    #[error("invalid resource location {resource}: {message}")]
    Location { resource: String, message: String },

    #[error("failed to decompress {resource}: {source}")]
    Decompress {
        resource: String,
        #[source]
        source: io::Error,
    },

    #[error("malformed dictionary data in {resource}: {source}")]
    Parse {
        resource: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to build dictionary index: {0}")]
    Index(#[from] fst::Error),

    #[error("no async runtime available to fetch dictionary data")]
    NoRuntime,
}

/// Failures of the persisted-flag collaborator.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage is unavailable")]
    Unavailable,

    #[error("storage io error: {0}")]
    Io(#[from] io::Error),

    #[error("storage data is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}
