//! Nightly builds described by the artifact listing written by the build workflow.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde_json::Value;
use tracing::warn;

use crate::models::{AssetRecord, ResolvedAsset, SolcRange};
use crate::platforms::PlatformLookup;
use crate::resolver::version::{build_hash, nightly_version};
use crate::resolver::{AssetSource, ResolveError};

static LISTING_KEY: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^(?P<artifact>.+)_(?P<field>url|sha)$").expect("invalid listing key regex")
});

/// Download location and checksum collected for one nightly artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NightlyArtifact {
  /// Download URL, if listed.
  pub url: Option<String>,
  /// SHA-256 checksum, if listed.
  pub sha: Option<String>,
}

/// Parse a listing: a JSON array of objects whose `<artifact>_url` and
/// `<artifact>_sha` keys describe each artifact.
///
/// Keys with other suffixes are ignored. Later objects override earlier ones.
pub fn parse_artifact_listing(
  content: &str,
) -> Result<BTreeMap<String, NightlyArtifact>, serde_json::Error> {
  let items: Vec<BTreeMap<String, Value>> = serde_json::from_str(content)?;
  let mut artifacts: BTreeMap<String, NightlyArtifact> = BTreeMap::new();

  for (key, value) in items.into_iter().flatten() {
    let Some(caps) = LISTING_KEY.captures(&key) else {
      continue;
    };
    let value = match value {
      Value::String(text) => text,
      other => other.to_string(),
    };

    let entry = artifacts.entry(caps["artifact"].to_string()).or_default();
    match &caps["field"] {
      "url" => entry.url = Some(value),
      _ => entry.sha = Some(value),
    }
  }

  Ok(artifacts)
}

/// Nightly artifacts read from a listing file on disk.
#[derive(Debug)]
pub struct NightlySource<'a, P: PlatformLookup + ?Sized> {
  /// Listing file path.
  pub listing_path: &'a Path,
  /// Base release tag, e.g. `v0.3.0`.
  pub tag: &'a str,
  /// Commit the artifacts were built from.
  pub commit: &'a str,
  /// Build date stamped into the version.
  pub date: NaiveDate,
  /// Artifact routing table.
  pub platforms: &'a P,
  /// Compiler compatibility markers attached to every record.
  pub solc: &'a SolcRange,
}

impl<P: PlatformLookup + ?Sized> NightlySource<'_, P> {
  fn read_listing(&self) -> Result<BTreeMap<String, NightlyArtifact>, ResolveError> {
    let path: PathBuf = self.listing_path.to_path_buf();
    let content = fs::read_to_string(&path).map_err(|source| ResolveError::ListingRead {
      path: path.clone(),
      source,
    })?;
    parse_artifact_listing(&content).map_err(|source| ResolveError::ListingParse { path, source })
  }
}

impl<P: PlatformLookup + ?Sized> AssetSource for NightlySource<'_, P> {
  fn resolve(&self) -> Result<Vec<ResolvedAsset>, ResolveError> {
    let artifacts = self.read_listing()?;
    let version = nightly_version(self.tag, self.date);
    let build = build_hash(self.commit);

    let mut resolved = Vec::new();
    for (name, artifact) in artifacts {
      let Some(platform) = self.platforms.platform_for(&name) else {
        continue;
      };
      let Some(url) = artifact.url else {
        warn!("nightly artifact {name} has no download URL, skipping");
        continue;
      };

      let record = AssetRecord::new(name, version.clone(), build.clone(), url)
        .with_sha256(artifact.sha.unwrap_or_default())
        .with_solc_range(self.solc);
      resolved.push(ResolvedAsset {
        platform: platform.to_string(),
        record,
      });
    }

    Ok(resolved)
  }
}
