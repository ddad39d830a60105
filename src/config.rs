//! Publisher configuration and environment loading.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::manifest::{ManifestVariant, MergeOptions, OnCorruptManifest};
use crate::models::SolcRange;
use crate::platforms::PlatformTable;

const DEFAULT_CONFIG_FILE: &str = "release-manifest.json";

/// Access token used for the release API.
pub const TOKEN_VAR: &str = "GITHUB_TOKEN";
/// First supported compiler version.
pub const FIRST_SOLC_VAR: &str = "FIRST_SOLC_VERSION";
/// Last supported compiler version.
pub const LAST_SOLC_VAR: &str = "LAST_SOLC_VERSION";
/// Commit the nightly artifacts were built from.
pub const COMMIT_VAR: &str = "GITHUB_SHA";
/// Most recent release tag, used as the nightly base version.
pub const TAG_VAR: &str = "TAG";
/// Path of the nightly artifact listing.
pub const LISTING_VAR: &str = "FILEPATH";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
  /// A required environment variable is unset.
  #[error("{0} environment variable is not set")]
  MissingEnv(&'static str),
  /// The configuration file could not be read.
  #[error("failed to read {}: {source}", path.display())]
  Read {
    /// Configuration path.
    path: PathBuf,
    /// Underlying I/O error.
    source: std::io::Error,
  },
  /// The configuration file is not valid JSON.
  #[error("failed to parse {}: {source}", path.display())]
  Parse {
    /// Configuration path.
    path: PathBuf,
    /// Underlying parse error.
    source: serde_json::Error,
  },
  /// A platform folder is not a single relative directory name.
  #[error("platform folder {folder:?} for {asset} must be a single directory name")]
  InvalidPlatformFolder {
    /// Asset routed to the folder.
    asset: String,
    /// Offending folder.
    folder: String,
  },
}

/// Discoverable configuration for a publishing run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PublisherConfig {
  /// Base URL of the release API.
  pub api_base: String,
  /// User agent sent with every API request.
  pub user_agent: String,
  /// Name of the release asset listing artifact checksums.
  pub checksum_asset: String,
  /// Keying policy for every manifest written by the run.
  pub variant: ManifestVariant,
  /// Recovery policy for unparseable manifests.
  pub on_corrupt: OnCorruptManifest,
  /// Asset routing for tagged releases.
  pub release_platforms: PlatformTable,
  /// Artifact routing for nightly builds.
  pub nightly_platforms: PlatformTable,
}

impl Default for PublisherConfig {
  fn default() -> Self {
    Self {
      api_base: "https://api.github.com".into(),
      user_agent: concat!("release-manifest/", env!("CARGO_PKG_VERSION")).into(),
      checksum_asset: "checksums.txt".into(),
      variant: ManifestVariant::default(),
      on_corrupt: OnCorruptManifest::default(),
      release_platforms: PlatformTable::release_defaults(),
      nightly_platforms: PlatformTable::nightly_defaults(),
    }
  }
}

impl PublisherConfig {
  /// Load configuration from the default file in `dir`.
  ///
  /// A missing file falls back to the defaults. A file that exists but fails
  /// to load also falls back, with a warning.
  pub fn discover(dir: &Path) -> Self {
    match Self::from_path(&dir.join(DEFAULT_CONFIG_FILE)) {
      Ok(config) => config,
      Err(ConfigError::Read { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
        Self::default()
      }
      Err(err) => {
        warn!("ignoring configuration: {err}");
        Self::default()
      }
    }
  }

  /// Read configuration from a specific JSON file.
  pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    let config: Self = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })?;
    config.validate()?;
    Ok(config)
  }

  /// Check that every platform folder stays inside the output root.
  pub fn validate(&self) -> Result<(), ConfigError> {
    self.release_platforms.validate()?;
    self.nightly_platforms.validate()
  }

  /// Merge policies derived from this configuration.
  pub fn merge_options(&self) -> MergeOptions {
    MergeOptions {
      variant: self.variant,
      on_corrupt: self.on_corrupt,
    }
  }
}

/// Inputs of a tagged release run taken from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseEnv {
  /// API access token.
  pub token: String,
  /// Compiler compatibility markers, empty when unset.
  pub solc: SolcRange,
}

impl ReleaseEnv {
  /// Read from the process environment.
  pub fn from_env() -> Result<Self, ConfigError> {
    Self::from_lookup(|name| std::env::var(name).ok())
  }

  /// Read through `lookup`, which returns the value of a variable if set.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
    let token = lookup(TOKEN_VAR).ok_or(ConfigError::MissingEnv(TOKEN_VAR))?;
    let solc = SolcRange {
      first: lookup(FIRST_SOLC_VAR).unwrap_or_default(),
      last: lookup(LAST_SOLC_VAR).unwrap_or_default(),
    };
    Ok(Self { token, solc })
  }
}

/// Inputs of a nightly run taken from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NightlyEnv {
  /// Commit the artifacts were built from.
  pub commit: String,
  /// Base release tag.
  pub tag: String,
  /// Path of the artifact listing.
  pub listing_path: PathBuf,
  /// Compiler compatibility markers.
  pub solc: SolcRange,
}

impl NightlyEnv {
  /// Read from the process environment.
  pub fn from_env() -> Result<Self, ConfigError> {
    Self::from_lookup(|name| std::env::var(name).ok())
  }

  /// Read through `lookup`; every variable is required.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
    let require = |name: &'static str| lookup(name).ok_or(ConfigError::MissingEnv(name));

    let commit = require(COMMIT_VAR)?;
    let first = require(FIRST_SOLC_VAR)?;
    let last = require(LAST_SOLC_VAR)?;
    let tag = require(TAG_VAR)?;
    let listing_path = PathBuf::from(require(LISTING_VAR)?);

    Ok(Self {
      commit,
      tag,
      listing_path,
      solc: SolcRange { first, last },
    })
  }
}
