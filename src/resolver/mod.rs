//! Turning release metadata into records ready to merge.
//!
//! Tagged releases are read from the GitHub release API; nightly builds come
//! from a local artifact listing produced by the build workflow.

pub mod checksums;
pub mod github;
pub mod nightly;
pub mod version;

use std::path::PathBuf;

use thiserror::Error;

use crate::models::ResolvedAsset;

pub use checksums::{ChecksumMap, parse_checksums};
pub use github::{GitHubClient, Release, ReleaseAsset, ReleaseSource};
pub use nightly::{NightlyArtifact, NightlySource, parse_artifact_listing};
pub use version::{build_hash, nightly_version, release_version};

/// Trait implemented by anything that can produce records to publish.
pub trait AssetSource {
  /// Resolve every record that should be merged, paired with its platform.
  fn resolve(&self) -> Result<Vec<ResolvedAsset>, ResolveError>;
}

/// Errors raised while resolving release assets.
#[derive(Debug, Error)]
pub enum ResolveError {
  /// The HTTP client could not be constructed.
  #[error("failed to build HTTP client: {0}")]
  Client(#[source] reqwest::Error),
  /// The request could not be sent or its body could not be read.
  #[error("request to {url} failed: {source}")]
  Http {
    /// Requested URL.
    url: String,
    /// Underlying transport error.
    source: reqwest::Error,
  },
  /// The server answered with a non-success status.
  #[error("{url} returned {status}: {body}")]
  Status {
    /// Requested URL.
    url: String,
    /// Response status.
    status: reqwest::StatusCode,
    /// Response body, possibly empty.
    body: String,
  },
  /// The response body was not the expected JSON.
  #[error("failed to decode response from {url}: {source}")]
  Decode {
    /// Requested URL.
    url: String,
    /// Underlying decode error.
    source: reqwest::Error,
  },
  /// The nightly artifact listing could not be read.
  #[error("failed to read artifact listing {}: {source}", path.display())]
  ListingRead {
    /// Listing path.
    path: PathBuf,
    /// Underlying I/O error.
    source: std::io::Error,
  },
  /// The nightly artifact listing is not a JSON array of objects.
  #[error("artifact listing {} is not valid JSON: {source}", path.display())]
  ListingParse {
    /// Listing path.
    path: PathBuf,
    /// Underlying parse error.
    source: serde_json::Error,
  },
}
