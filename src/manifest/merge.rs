//! Pure upsert of a build record into a release manifest.

use crate::manifest::variant::ManifestVariant;
use crate::models::{AssetRecord, ReleaseManifest};

/// Merge `record` into `manifest` and return the updated manifest.
///
/// Any build sharing the record's key is dropped, the record is appended, its
/// release label is written and `latestRelease` is set to its version without
/// comparing against the previous value.
pub fn merge_record(
  mut manifest: ReleaseManifest,
  record: AssetRecord,
  variant: ManifestVariant,
) -> ReleaseManifest {
  let record = variant.prepare(record);

  {
    let key = variant.key(&record);
    manifest
      .builds
      .retain(|existing| variant.key(existing) != key);
  }

  manifest
    .releases
    .insert(record.version.clone(), variant.release_label(&record));
  manifest.latest_release = record.version.clone();
  manifest.builds.push(record);
  manifest
}
