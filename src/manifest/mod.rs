//! Per-platform `list.json` handling split into a pure merge step and file storage.

mod merge;
mod store;
mod variant;

pub use merge::merge_record;
pub use store::{
  MANIFEST_FILE, ManifestError, MergeOptions, load_manifest, merge_into_file, render_manifest,
  save_manifest,
};
pub use variant::{ManifestVariant, OnCorruptManifest};
