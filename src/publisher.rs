//! Publishing orchestrator that routes resolved records into per-platform manifests.

use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{info, warn};

use crate::manifest::{MANIFEST_FILE, MergeOptions, merge_into_file};
use crate::models::ResolvedAsset;
use crate::platforms::validate_folder;
use crate::resolver::AssetSource;

/// Result type used by the publishing entry points.
pub type PublishResult<T> = anyhow::Result<T>;

/// Summary of one manifest update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedManifest {
  /// Platform folder that was updated.
  pub platform: String,
  /// Artifact name merged into the manifest.
  pub asset: String,
  /// Version recorded as the latest release.
  pub version: String,
  /// Path of the rewritten manifest.
  pub manifest_path: PathBuf,
}

/// Writes resolved records into `<out_dir>/<platform>/list.json`.
#[derive(Debug, Clone)]
pub struct ManifestPublisher<'a> {
  out_dir: &'a Path,
  options: MergeOptions,
}

impl<'a> ManifestPublisher<'a> {
  /// Create a publisher writing below `out_dir` with the given merge policies.
  pub fn new(out_dir: &'a Path, options: MergeOptions) -> Self {
    Self { out_dir, options }
  }

  /// Manifest location for `platform`.
  pub fn manifest_path(&self, platform: &str) -> PathBuf {
    self.out_dir.join(platform).join(MANIFEST_FILE)
  }

  /// Resolve `source` and merge every record it yields.
  pub fn publish<S: AssetSource + ?Sized>(&self, source: &S) -> PublishResult<Vec<PublishedManifest>> {
    let assets = source
      .resolve()
      .context("failed to resolve release assets")?;
    if assets.is_empty() {
      warn!("no published asset matched the platform table");
    }
    self.publish_assets(assets)
  }

  /// Merge already resolved records in order, stopping at the first failure.
  pub fn publish_assets(
    &self,
    assets: impl IntoIterator<Item = ResolvedAsset>,
  ) -> PublishResult<Vec<PublishedManifest>> {
    let mut published = Vec::new();

    for ResolvedAsset { platform, record } in assets {
      validate_folder(&record.name, &platform)?;
      let manifest_path = self.manifest_path(&platform);
      let asset = record.name.clone();
      let version = record.version.clone();

      merge_into_file(&manifest_path, record, self.options)
        .with_context(|| format!("failed to update {}", manifest_path.display()))?;
      info!("Processed {asset} for {platform}");

      published.push(PublishedManifest {
        platform,
        asset,
        version,
        manifest_path,
      });
    }

    Ok(published)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::fs;

  use crate::manifest::{ManifestVariant, OnCorruptManifest, load_manifest};
  use crate::models::AssetRecord;
  use crate::resolver::ResolveError;
  use tempfile::tempdir;

  struct FixedSource(Vec<ResolvedAsset>);

  impl AssetSource for FixedSource {
    fn resolve(&self) -> Result<Vec<ResolvedAsset>, ResolveError> {
      Ok(self.0.clone())
    }
  }

  fn asset(platform: &str, name: &str, version: &str) -> ResolvedAsset {
    ResolvedAsset {
      platform: platform.into(),
      record: AssetRecord::new(name, version, "commit.abcd1234", format!("https://x/{name}")),
    }
  }

  #[test]
  fn writes_one_manifest_per_platform() {
    let temp = tempdir().expect("failed to create temp dir");
    let publisher = ManifestPublisher::new(temp.path(), MergeOptions::default());
    let source = FixedSource(vec![
      asset("linux", "resolc-x86_64-unknown-linux-musl", "0.3.0"),
      asset("wasm", "resolc_web.js", "0.3.0"),
    ]);

    let published = publisher.publish(&source).expect("publish should succeed");

    assert_eq!(published.len(), 2);
    assert_eq!(published[1].manifest_path, temp.path().join("wasm").join(MANIFEST_FILE));

    let linux = load_manifest(&temp.path().join("linux/list.json"), OnCorruptManifest::Fail)
      .expect("linux manifest written");
    assert_eq!(linux.latest_release, "0.3.0");
    assert_eq!(
      linux.releases["0.3.0"],
      "resolc-x86_64-unknown-linux-musl+0.3.0+commit.abcd1234"
    );
  }

  #[test]
  fn honours_path_variant() {
    let temp = tempdir().expect("failed to create temp dir");
    let options = MergeOptions {
      variant: ManifestVariant::Path,
      ..MergeOptions::default()
    };
    let publisher = ManifestPublisher::new(temp.path(), options);

    publisher
      .publish_assets(vec![
        asset("wasm", "resolc.js", "0.3.0"),
        asset("wasm", "resolc.wasm", "0.3.0"),
      ])
      .expect("publish should succeed");

    let wasm = load_manifest(&temp.path().join("wasm/list.json"), OnCorruptManifest::Fail)
      .expect("wasm manifest written");
    assert_eq!(wasm.builds.len(), 2);
    assert_eq!(wasm.releases["0.3.0"], "resolc.wasm+0.3.0+commit.abcd1234");
  }

  #[test]
  fn stops_at_first_write_failure() {
    let temp = tempdir().expect("failed to create temp dir");
    fs::write(temp.path().join("linux"), b"not a directory").expect("failed to write blocker");
    let publisher = ManifestPublisher::new(temp.path(), MergeOptions::default());

    let err = publisher
      .publish_assets(vec![
        asset("linux", "resolc-x86_64-unknown-linux-musl", "0.3.0"),
        asset("wasm", "resolc_web.js", "0.3.0"),
      ])
      .expect_err("blocked platform folder should fail");

    assert!(err.to_string().contains("failed to update"));
    assert!(!temp.path().join("wasm").exists());
  }

  #[test]
  fn refuses_platforms_outside_output_root() {
    let temp = tempdir().expect("failed to create temp dir");
    let out = temp.path().join("out");
    let publisher = ManifestPublisher::new(&out, MergeOptions::default());

    for platform in ["/evil", "../escape", "linux/x86"] {
      let err = publisher
        .publish_assets(vec![asset(platform, "", "0.3.0")])
        .expect_err("escaping platform should fail");
      assert!(err.to_string().contains("single directory name"));
    }

    assert!(!out.exists());
    assert!(!temp.path().join("escape").exists());
  }

  #[test]
  fn empty_source_publishes_nothing() {
    let temp = tempdir().expect("failed to create temp dir");
    let publisher = ManifestPublisher::new(temp.path(), MergeOptions::default());

    let published = publisher
      .publish(&FixedSource(Vec::new()))
      .expect("empty publish should succeed");

    assert!(published.is_empty());
    assert_eq!(fs::read_dir(temp.path()).expect("temp dir").count(), 0);
  }
}
