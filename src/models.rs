//! Data structures read from and written to per-platform release manifests.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A single published build as it appears in the `builds` list of `list.json`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRecord {
  /// Artifact file name as published on the release.
  #[serde(default, deserialize_with = "lenient_string")]
  pub name: String,
  /// Semantic version with any leading `v` removed.
  #[serde(default, deserialize_with = "lenient_string")]
  pub version: String,
  /// Build hash in the form `commit.<prefix>`.
  #[serde(default, deserialize_with = "lenient_string")]
  pub build: String,
  /// Fully qualified `<version>+<build>` string.
  #[serde(default, deserialize_with = "lenient_string")]
  pub long_version: String,
  /// Download URL for the artifact.
  #[serde(default, deserialize_with = "lenient_string")]
  pub url: String,
  /// Hex encoded SHA-256 of the artifact, empty when unknown.
  #[serde(default, deserialize_with = "lenient_string")]
  pub sha256: String,
  /// First compiler version the build supports, empty when unknown.
  #[serde(default, deserialize_with = "lenient_string")]
  pub first_solc_version: String,
  /// Last compiler version the build supports, empty when unknown.
  #[serde(default, deserialize_with = "lenient_string")]
  pub last_solc_version: String,
  /// `<name>+<longVersion>` key written by path-keyed manifests.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub path: Option<String>,
  /// Fields written by other tooling, carried through untouched.
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

impl AssetRecord {
  /// Create a record for `name` and derive its long version from `version` and `build`.
  pub fn new(
    name: impl Into<String>,
    version: impl Into<String>,
    build: impl Into<String>,
    url: impl Into<String>,
  ) -> Self {
    let version = version.into();
    let build = build.into();
    Self {
      name: name.into(),
      long_version: format!("{version}+{build}"),
      version,
      build,
      url: url.into(),
      ..Self::default()
    }
  }

  /// Attach a checksum to the record.
  pub fn with_sha256(mut self, sha256: impl Into<String>) -> Self {
    self.sha256 = sha256.into();
    self
  }

  /// Attach the compiler compatibility markers to the record.
  pub fn with_solc_range(mut self, range: &SolcRange) -> Self {
    self.first_solc_version = range.first.clone();
    self.last_solc_version = range.last.clone();
    self
  }

  /// `<name>+<longVersion>`, the label used for releases and path keys.
  pub fn qualified_name(&self) -> String {
    format!("{}+{}", self.name, self.long_version)
  }
}

/// Compiler compatibility range attached to every published record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SolcRange {
  /// First supported compiler version.
  pub first: String,
  /// Last supported compiler version.
  pub last: String,
}

/// The persisted aggregate stored in each platform's `list.json`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseManifest {
  /// Published builds in insertion order.
  #[serde(default)]
  pub builds: Vec<AssetRecord>,
  /// Mapping from version to its release label.
  #[serde(default, deserialize_with = "lenient_labels")]
  pub releases: BTreeMap<String, String>,
  /// Version of the most recently merged build.
  #[serde(default, deserialize_with = "lenient_string")]
  pub latest_release: String,
}

/// A record paired with the platform folder it should be merged into.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAsset {
  /// Platform folder name, relative to the output root.
  pub platform: String,
  /// Record to merge into that platform's manifest.
  pub record: AssetRecord,
}

// Older manifests hold `null` or bare numbers in string slots.
fn value_to_string(value: Value) -> String {
  match value {
    Value::Null => String::new(),
    Value::String(text) => text,
    other => other.to_string(),
  }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
  D: Deserializer<'de>,
{
  Value::deserialize(deserializer).map(value_to_string)
}

fn lenient_labels<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
  D: Deserializer<'de>,
{
  let labels = Option::<BTreeMap<String, Value>>::deserialize(deserializer)?.unwrap_or_default();
  Ok(
    labels
      .into_iter()
      .map(|(version, label)| (version, value_to_string(label)))
      .collect(),
  )
}
