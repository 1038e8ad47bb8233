use std::path::PathBuf;

use thiserror::Error;

use crate::metadata::runs::RunError;

/// Everything that can stop a rebuild. None of these are retried: the first
/// error aborts the batch (except correlation misses under the skip policy).
#[derive(Error, Debug)]
pub enum Error {
    #[error("Malformed archive {path}: {source}")]
    MalformedInput {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unexpected payload shape in {context}: {message}")]
    MetadataShapeMismatch { context: String, message: String },

    #[error("Ambiguous metadata for video {video_id}: {source}")]
    AmbiguousMetadata {
        video_id: String,
        #[source]
        source: RunError,
    },

    #[error("Cannot correlate video {video_id}: {reason}")]
    CorrelationMiss { video_id: String, reason: String },

    #[error("{tool} failed for {dest} (exit status {status}): {stderr}")]
    ExternalToolFailure {
        tool: String,
        dest: PathBuf,
        status: String,
        stderr: String,
    },

    #[error("Chunk for file {file_id} is not valid base64: {source}")]
    ChunkDecode {
        file_id: String,
        #[source]
        source: base64::DecodeError,
    },

    #[error("No chunks captured for {0}")]
    NoChunks(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn shape(context: impl Into<String>, message: impl Into<String>) -> Self {
        Error::MetadataShapeMismatch {
            context: context.into(),
            message: message.into(),
        }
    }

    pub fn miss(video_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::CorrelationMiss {
            video_id: video_id.into(),
            reason: reason.into(),
        }
    }

    /// True for errors the skip policy may step over.
    pub fn is_correlation_miss(&self) -> bool {
        matches!(self, Error::CorrelationMiss { .. })
    }
}
