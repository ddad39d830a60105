//! Reading and atomically rewriting `list.json` files.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::error::Category;
use serde_json::ser::PrettyFormatter;
use tempfile::{Builder, NamedTempFile};
use thiserror::Error;
use tracing::{debug, warn};

use crate::manifest::merge::merge_record;
use crate::manifest::variant::{ManifestVariant, OnCorruptManifest};
use crate::models::{AssetRecord, ReleaseManifest};

/// File name of the manifest inside each platform folder.
pub const MANIFEST_FILE: &str = "list.json";

/// Policies applied when merging into a manifest on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOptions {
  /// Keying policy for deduplication and release labels.
  pub variant: ManifestVariant,
  /// Recovery policy for unparseable manifests.
  pub on_corrupt: OnCorruptManifest,
}

/// Errors raised while loading or persisting a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
  /// The manifest exists but could not be read.
  #[error("failed to read {}: {source}", path.display())]
  Read {
    /// Manifest path.
    path: PathBuf,
    /// Underlying I/O error.
    source: std::io::Error,
  },
  /// The manifest is not valid JSON and the policy forbids discarding it, or
  /// it is valid JSON whose shape is not a manifest.
  #[error("failed to parse {}: {source}", path.display())]
  Parse {
    /// Manifest path.
    path: PathBuf,
    /// Underlying parse error.
    source: serde_json::Error,
  },
  /// The manifest could not be serialised.
  #[error("failed to serialise manifest: {0}")]
  Serialize(#[from] serde_json::Error),
  /// The manifest or its directory could not be written.
  #[error("failed to write {}: {source}", path.display())]
  Write {
    /// Manifest path.
    path: PathBuf,
    /// Underlying I/O error.
    source: std::io::Error,
  },
}

/// Load the manifest at `path`.
///
/// A missing file yields an empty manifest. Content that is not valid JSON
/// yields an empty manifest under [`OnCorruptManifest::Discard`] and an error
/// under [`OnCorruptManifest::Fail`]. Valid JSON that cannot be read as a
/// manifest is always an error, so its history is never dropped.
pub fn load_manifest(
  path: &Path,
  on_corrupt: OnCorruptManifest,
) -> Result<ReleaseManifest, ManifestError> {
  let content = match fs::read(path) {
    Ok(content) => content,
    Err(err) if err.kind() == ErrorKind::NotFound => {
      debug!("no manifest at {}, starting empty", path.display());
      return Ok(ReleaseManifest::default());
    }
    Err(err) => {
      return Err(ManifestError::Read {
        path: path.to_path_buf(),
        source: err,
      });
    }
  };

  match serde_json::from_slice(&content) {
    Ok(manifest) => Ok(manifest),
    Err(err) if err.classify() == Category::Data => Err(ManifestError::Parse {
      path: path.to_path_buf(),
      source: err,
    }),
    Err(err) => corrupt(path, on_corrupt, err),
  }
}

fn corrupt(
  path: &Path,
  on_corrupt: OnCorruptManifest,
  source: serde_json::Error,
) -> Result<ReleaseManifest, ManifestError> {
  match on_corrupt {
    OnCorruptManifest::Discard => {
      warn!(
        "discarding unreadable manifest {}: {}",
        path.display(),
        source
      );
      Ok(ReleaseManifest::default())
    }
    OnCorruptManifest::Fail => Err(ManifestError::Parse {
      path: path.to_path_buf(),
      source,
    }),
  }
}

/// Serialise a manifest with four-space indentation and no trailing newline.
pub fn render_manifest(manifest: &ReleaseManifest) -> Result<Vec<u8>, serde_json::Error> {
  let mut buffer = Vec::new();
  let formatter = PrettyFormatter::with_indent(b"    ");
  let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
  manifest.serialize(&mut serializer)?;
  Ok(buffer)
}

/// Write `manifest` to `path`, creating the parent directory if needed.
///
/// Content goes to a temporary file in the same directory which is then renamed
/// over the target, so readers never observe a truncated manifest.
pub fn save_manifest(path: &Path, manifest: &ReleaseManifest) -> Result<(), ManifestError> {
  let bytes = render_manifest(manifest)?;
  let write_err = |source: std::io::Error| ManifestError::Write {
    path: path.to_path_buf(),
    source,
  };

  let parent = match path.parent() {
    Some(parent) if !parent.as_os_str().is_empty() => parent,
    _ => Path::new("."),
  };
  fs::create_dir_all(parent).map_err(write_err)?;

  let mut staged = stage_in(parent, path).map_err(write_err)?;
  staged.write_all(&bytes).map_err(write_err)?;
  staged.as_file().sync_all().map_err(write_err)?;
  staged.persist(path).map_err(|err| write_err(err.error))?;
  Ok(())
}

/// Create the temporary file that will replace `target`, carrying over the
/// permissions of an existing manifest. New manifests get `0o644` minus umask.
fn stage_in(parent: &Path, target: &Path) -> std::io::Result<NamedTempFile> {
  let existing = match fs::metadata(target) {
    Ok(metadata) => Some(metadata.permissions()),
    Err(err) if err.kind() == ErrorKind::NotFound => None,
    Err(err) => return Err(err),
  };

  let mut builder = Builder::new();
  #[cfg(unix)]
  {
    use std::os::unix::fs::PermissionsExt;
    builder.permissions(fs::Permissions::from_mode(0o644));
  }
  let staged = builder.tempfile_in(parent)?;

  if let Some(permissions) = existing {
    staged.as_file().set_permissions(permissions)?;
  }
  Ok(staged)
}

/// Load, merge and rewrite the manifest at `path`, returning the merged manifest.
pub fn merge_into_file(
  path: &Path,
  record: AssetRecord,
  options: MergeOptions,
) -> Result<ReleaseManifest, ManifestError> {
  let manifest = load_manifest(path, options.on_corrupt)?;
  let merged = merge_record(manifest, record, options.variant);
  save_manifest(path, &merged)?;
  Ok(merged)
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::tempdir;

  fn record() -> AssetRecord {
    AssetRecord::new("resolc.js", "1.2.0", "commit.abcd1234", "https://x/resolc.js")
  }

  #[test]
  fn missing_manifest_loads_empty() {
    let temp = tempdir().expect("failed to create temp dir");
    let manifest = load_manifest(&temp.path().join(MANIFEST_FILE), OnCorruptManifest::Fail)
      .expect("missing manifest should not error");

    assert_eq!(manifest, ReleaseManifest::default());
  }

  #[test]
  fn corrupt_manifest_is_discarded_by_default() {
    let temp = tempdir().expect("failed to create temp dir");
    let path = temp.path().join(MANIFEST_FILE);
    fs::write(&path, "{ not json").expect("failed to write fixture");

    let merged = merge_into_file(&path, record(), MergeOptions::default())
      .expect("corrupt manifest should be replaced");

    assert_eq!(merged.builds.len(), 1);
    let reloaded = load_manifest(&path, OnCorruptManifest::Fail).expect("rewritten manifest");
    assert_eq!(reloaded, merged);
  }

  #[test]
  fn corrupt_manifest_fails_when_requested() {
    let temp = tempdir().expect("failed to create temp dir");
    let path = temp.path().join(MANIFEST_FILE);
    fs::write(&path, "[1, 2").expect("failed to write fixture");

    let options = MergeOptions {
      on_corrupt: OnCorruptManifest::Fail,
      ..MergeOptions::default()
    };
    let err = merge_into_file(&path, record(), options).expect_err("parse error expected");

    assert!(matches!(err, ManifestError::Parse { .. }));
    assert_eq!(fs::read_to_string(&path).expect("fixture intact"), "[1, 2");
  }

  #[test]
  fn valid_json_with_wrong_shape_is_never_discarded() {
    let temp = tempdir().expect("failed to create temp dir");
    let path = temp.path().join(MANIFEST_FILE);
    let original = r#"{"builds": {"version": "1.0.0"}, "releases": {}, "latestRelease": "1.0.0"}"#;
    fs::write(&path, original).expect("failed to write fixture");

    let err =
      merge_into_file(&path, record(), MergeOptions::default()).expect_err("shape error expected");

    assert!(matches!(err, ManifestError::Parse { .. }));
    assert_eq!(fs::read_to_string(&path).expect("fixture intact"), original);
  }

  #[test]
  fn null_latest_release_keeps_existing_builds() {
    let temp = tempdir().expect("failed to create temp dir");
    let path = temp.path().join(MANIFEST_FILE);
    fs::write(
      &path,
      r#"{
    "builds": [{"name": "resolc.js", "version": "1.1.0", "build": "commit.00000000",
                "longVersion": "1.1.0+commit.00000000", "url": "https://x/old.js"}],
    "releases": {"1.1.0": "resolc.js+1.1.0+commit.00000000"},
    "latestRelease": null
}"#,
    )
    .expect("failed to write fixture");

    let merged =
      merge_into_file(&path, record(), MergeOptions::default()).expect("merge should succeed");

    let versions: Vec<&str> = merged.builds.iter().map(|b| b.version.as_str()).collect();
    assert_eq!(versions, vec!["1.1.0", "1.2.0"]);
    assert_eq!(merged.latest_release, "1.2.0");
  }

  #[cfg(unix)]
  #[test]
  fn rewrite_keeps_existing_file_mode() {
    use std::os::unix::fs::PermissionsExt;

    let temp = tempdir().expect("failed to create temp dir");
    let path = temp.path().join(MANIFEST_FILE);
    save_manifest(&path, &ReleaseManifest::default()).expect("initial save");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o664)).expect("failed to chmod");

    merge_into_file(&path, record(), MergeOptions::default()).expect("merge should succeed");

    let mode = fs::metadata(&path).expect("manifest exists").permissions().mode();
    assert_eq!(mode & 0o777, 0o664);
  }

  #[cfg(unix)]
  #[test]
  fn new_manifest_uses_default_file_mode() {
    use std::os::unix::fs::PermissionsExt;

    let temp = tempdir().expect("failed to create temp dir");
    let path = temp.path().join(MANIFEST_FILE);

    merge_into_file(&path, record(), MergeOptions::default()).expect("merge should succeed");

    let mode = fs::metadata(&path).expect("manifest exists").permissions().mode() & 0o777;
    assert_eq!(mode & 0o600, 0o600);
    assert_eq!(mode & !0o644, 0);
  }

  #[test]
  fn renders_four_space_indent_without_trailing_newline() {
    let manifest = merge_record(ReleaseManifest::default(), record(), ManifestVariant::Version);
    let rendered = String::from_utf8(render_manifest(&manifest).expect("render")).expect("utf8");

    assert!(rendered.starts_with("{\n    \"builds\": [\n        {\n            \"name\": \"resolc.js\""));
    assert!(rendered.contains("\"latestRelease\": \"1.2.0\""));
    assert!(rendered.ends_with('}'));
  }

  #[test]
  fn renders_empty_manifest_compactly() {
    let rendered =
      String::from_utf8(render_manifest(&ReleaseManifest::default()).expect("render")).expect("utf8");

    assert_eq!(
      rendered,
      "{\n    \"builds\": [],\n    \"releases\": {},\n    \"latestRelease\": \"\"\n}"
    );
  }

  #[test]
  fn save_creates_platform_directory_and_leaves_no_temp_files() {
    let temp = tempdir().expect("failed to create temp dir");
    let platform_dir = temp.path().join("linux");
    let path = platform_dir.join(MANIFEST_FILE);

    merge_into_file(&path, record(), MergeOptions::default()).expect("merge should succeed");

    let entries: Vec<_> = fs::read_dir(&platform_dir)
      .expect("platform dir exists")
      .flatten()
      .map(|entry| entry.file_name())
      .collect();
    assert_eq!(entries, vec![std::ffi::OsString::from(MANIFEST_FILE)]);
  }

  #[test]
  fn reads_manifests_written_by_previous_runs() {
    let temp = tempdir().expect("failed to create temp dir");
    let path = temp.path().join(MANIFEST_FILE);
    fs::write(
      &path,
      r#"{
    "builds": [
        {
            "name": "resolc-x86_64-unknown-linux-musl",
            "version": "0.1.0-dev.13",
            "build": "commit.a1b2c3d4",
            "longVersion": "0.1.0-dev.13+commit.a1b2c3d4",
            "url": "https://github.com/paritytech/revive/releases/download/v0.1.0-dev.13/resolc-x86_64-unknown-linux-musl",
            "sha256": "",
            "firstSolcVersion": "",
            "lastSolcVersion": ""
        }
    ],
    "releases": {
        "0.1.0-dev.13": "resolc-x86_64-unknown-linux-musl+0.1.0-dev.13+commit.a1b2c3d4"
    },
    "latestRelease": "0.1.0-dev.13"
}"#,
    )
    .expect("failed to write fixture");

    let merged =
      merge_into_file(&path, record(), MergeOptions::default()).expect("merge should succeed");

    assert_eq!(merged.builds.len(), 2);
    assert_eq!(merged.releases.len(), 2);
    assert_eq!(merged.latest_release, "1.2.0");
  }
}
