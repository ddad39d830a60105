//! Mapping from published asset names to the platform folders holding their manifests.

use std::collections::BTreeMap;
use std::path::{Component, Path};

use serde::Deserialize;

use crate::config::ConfigError;

/// Trait describing how asset names are routed to platform folders.
pub trait PlatformLookup {
  /// Folder for `asset_name`, or `None` when the asset is not published.
  fn platform_for(&self, asset_name: &str) -> Option<&str>;
}

/// Exact-name table of published assets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "BTreeMap<String, String>")]
pub struct PlatformTable {
  folders: BTreeMap<String, String>,
}

const RELEASE_PLATFORMS: &[(&str, &str)] = &[
  ("resolc-x86_64-unknown-linux-musl", "linux"),
  ("resolc-universal-apple-darwin", "macos"),
  ("resolc-x86_64-pc-windows-msvc.exe", "windows"),
  ("resolc_web.js", "wasm"),
];

const NIGHTLY_PLATFORMS: &[(&str, &str)] = &[
  ("resolc-x86_64-unknown-linux-musl", "linux"),
  ("resolc-universal-apple-darwin", "macos"),
  ("resolc-x86_64-pc-windows-msvc", "windows"),
  ("resolc-web.js", "wasm"),
];

impl PlatformTable {
  /// Asset names published by tagged releases.
  pub fn release_defaults() -> Self {
    Self::from_pairs(RELEASE_PLATFORMS.iter().copied())
  }

  /// Artifact names published by nightly builds.
  pub fn nightly_defaults() -> Self {
    Self::from_pairs(NIGHTLY_PLATFORMS.iter().copied())
  }

  /// Build a table from `(asset name, folder)` pairs.
  pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
    pairs
      .into_iter()
      .map(|(asset, folder)| (asset.to_string(), folder.to_string()))
      .collect::<BTreeMap<_, _>>()
      .into()
  }

  /// Iterate over `(asset name, folder)` pairs in name order.
  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self
      .folders
      .iter()
      .map(|(asset, folder)| (asset.as_str(), folder.as_str()))
  }

  /// Reject folders that would escape the output root.
  pub fn validate(&self) -> Result<(), ConfigError> {
    self
      .iter()
      .try_for_each(|(asset, folder)| validate_folder(asset, folder))
  }
}

/// Check that `folder` is exactly one plain directory name, as given.
pub fn validate_folder(asset: &str, folder: &str) -> Result<(), ConfigError> {
  let mut components = Path::new(folder).components();
  let single_normal = matches!(
    (components.next(), components.next()),
    (Some(Component::Normal(name)), None) if name == folder
  );
  if single_normal {
    Ok(())
  } else {
    Err(ConfigError::InvalidPlatformFolder {
      asset: asset.to_string(),
      folder: folder.to_string(),
    })
  }
}

impl PlatformLookup for PlatformTable {
  fn platform_for(&self, asset_name: &str) -> Option<&str> {
    self.folders.get(asset_name).map(String::as_str)
  }
}

impl From<BTreeMap<String, String>> for PlatformTable {
  fn from(raw: BTreeMap<String, String>) -> Self {
    let folders = raw
      .into_iter()
      .map(|(asset, folder)| {
        (
          asset.trim().to_string(),
          folder.trim().trim_matches('/').to_string(),
        )
      })
      .filter(|(asset, folder)| !asset.is_empty() && !folder.is_empty())
      .collect();
    Self { folders }
  }
}
