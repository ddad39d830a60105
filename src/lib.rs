#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod config;
pub mod manifest;
pub mod models;
pub mod platforms;
pub mod publisher;
pub mod resolver;

pub use config::{ConfigError, NightlyEnv, PublisherConfig, ReleaseEnv};
pub use manifest::{ManifestVariant, MergeOptions, OnCorruptManifest, merge_record};
pub use models::{AssetRecord, ReleaseManifest, ResolvedAsset, SolcRange};
pub use platforms::{PlatformLookup, PlatformTable, validate_folder};
pub use publisher::{ManifestPublisher, PublishResult, PublishedManifest};
pub use resolver::{AssetSource, GitHubClient, NightlySource, ReleaseSource, ResolveError};
