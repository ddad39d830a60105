//! Keying and recovery policies for release manifests.

use std::borrow::Cow;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::models::AssetRecord;

/// Decides which field identifies a build and how its release label is written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ManifestVariant {
  /// One build per `version`; releases point at `<name>+<longVersion>`.
  #[default]
  Version,
  /// One build per `path` (`<name>+<longVersion>`); releases point at the path.
  Path,
}

/// What to do when an existing `list.json` cannot be parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OnCorruptManifest {
  /// Warn and continue from an empty manifest.
  #[default]
  Discard,
  /// Abort with a parse error.
  Fail,
}

impl ManifestVariant {
  /// Normalise an incoming record for this variant.
  ///
  /// Path-keyed manifests always carry a freshly derived `path`; version-keyed
  /// manifests never write one.
  pub fn prepare(self, mut record: AssetRecord) -> AssetRecord {
    record.path = match self {
      Self::Version => None,
      Self::Path => Some(record.qualified_name()),
    };
    record
  }

  /// Unique key of `record` under this variant.
  ///
  /// Records written before a manifest switched to path keys have no `path`;
  /// their key is derived from name and long version instead.
  pub fn key(self, record: &AssetRecord) -> Cow<'_, str> {
    match self {
      Self::Version => Cow::Borrowed(record.version.as_str()),
      Self::Path => match record.path.as_deref() {
        Some(path) => Cow::Borrowed(path),
        None => Cow::Owned(record.qualified_name()),
      },
    }
  }

  /// Value stored under `releases[version]` for `record`.
  pub fn release_label(self, record: &AssetRecord) -> String {
    match self {
      Self::Version => record.qualified_name(),
      Self::Path => self.key(record).into_owned(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn record() -> AssetRecord {
    AssetRecord::new("resolc.js", "1.2.0", "commit.abcd1234", "https://x/resolc.js")
  }

  #[test]
  fn version_variant_keys_by_version() {
    let record = ManifestVariant::Version.prepare(record());

    assert_eq!(ManifestVariant::Version.key(&record), "1.2.0");
    assert_eq!(
      ManifestVariant::Version.release_label(&record),
      "resolc.js+1.2.0+commit.abcd1234"
    );
    assert!(record.path.is_none());
  }

  #[test]
  fn path_variant_derives_and_keys_by_path() {
    let record = ManifestVariant::Path.prepare(record());

    assert_eq!(record.path.as_deref(), Some("resolc.js+1.2.0+commit.abcd1234"));
    assert_eq!(ManifestVariant::Path.key(&record), "resolc.js+1.2.0+commit.abcd1234");
    assert_eq!(
      ManifestVariant::Path.release_label(&record),
      "resolc.js+1.2.0+commit.abcd1234"
    );
  }

  #[test]
  fn path_variant_falls_back_for_records_without_path() {
    let legacy = record();
    assert_eq!(ManifestVariant::Path.key(&legacy), "resolc.js+1.2.0+commit.abcd1234");
  }

  #[test]
  fn version_variant_drops_stale_path() {
    let mut stale = record();
    stale.path = Some("old+path".into());

    assert!(ManifestVariant::Version.prepare(stale).path.is_none());
  }
}
