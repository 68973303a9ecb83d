//! Asset ingestion: turns user-provided binaries into provider identifiers.
//!
//! Photos become an image key on the avatar provider. Voice samples become a
//! cloned voice on the speech provider when possible, and a raw audio asset
//! on the avatar provider otherwise (or additionally, so the pipeline can
//! always fall back to lip-syncing the original recording).

mod config;
mod ingestor;

pub use config::IngestConfig;
pub use ingestor::{select_stale_voices, AssetIngestor, AudioReference, CleanupReport};

use thiserror::Error;

use crate::provider::ProviderError;

/// Errors that can occur while ingesting an asset.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The blob carried no bytes.
    #[error("{0} is empty")]
    EmptyBlob(&'static str),

    /// The blob's content type is not accepted for this asset kind.
    #[error("unsupported content type '{content_type}' for {kind}")]
    UnsupportedContentType {
        kind: &'static str,
        content_type: String,
    },

    /// The provider rejected the upload.
    #[error("upload failed: {0}")]
    Upload(#[from] ProviderError),

    /// The provider accepted the upload but returned an empty identifier.
    #[error("provider returned an empty identifier for {0}")]
    EmptyIdentifier(&'static str),
}
