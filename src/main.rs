use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use release_manifest::{
  AssetRecord, GitHubClient, ManifestPublisher, ManifestVariant, NightlyEnv, NightlySource,
  OnCorruptManifest, PublishedManifest, PublisherConfig, ReleaseEnv, ReleaseSource, ResolvedAsset,
  validate_folder,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Merge published release assets into per-platform list.json manifests
#[derive(Parser)]
#[command(name = "release-manifest")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Directory holding the platform folders
  #[arg(long, global = true, default_value = ".")]
  out_dir: PathBuf,

  /// Configuration file (default: release-manifest.json in the working directory)
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  /// Deduplication key for builds
  #[arg(long, global = true, value_enum)]
  variant: Option<ManifestVariant>,

  /// What to do with an existing manifest that is not valid JSON
  #[arg(long, global = true, value_enum)]
  on_corrupt: Option<OnCorruptManifest>,

  /// Base URL of the release API
  #[arg(long, global = true)]
  api_base: Option<String>,

  /// Enable debug logging
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Publish the assets of a tagged release (requires GITHUB_TOKEN)
  Release {
    /// Repository in owner/name form
    repo: String,
    /// Release tag, e.g. v0.3.0
    tag: String,
  },

  /// Publish nightly artifacts described by FILEPATH (requires GITHUB_SHA, TAG,
  /// FILEPATH, FIRST_SOLC_VERSION and LAST_SOLC_VERSION)
  Nightly,

  /// Merge a single asset record JSON file into one platform manifest
  Merge {
    /// Asset record file
    #[arg(long)]
    record: PathBuf,
    /// Platform folder to update
    #[arg(long)]
    platform: String,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "info" };
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
    )
    .without_time()
    .init();

  let config = load_config(&cli)?;
  let publisher = ManifestPublisher::new(&cli.out_dir, config.merge_options());

  let published = match &cli.command {
    Commands::Release { repo, tag } => cmd_release(&publisher, &config, repo, tag)?,
    Commands::Nightly => cmd_nightly(&publisher, &config)?,
    Commands::Merge { record, platform } => cmd_merge(&publisher, record, platform)?,
  };

  info!("updated {} manifest(s)", published.len());
  Ok(())
}

fn load_config(cli: &Cli) -> Result<PublisherConfig> {
  let mut config = match &cli.config {
    Some(path) => PublisherConfig::from_path(path)?,
    None => PublisherConfig::discover(Path::new(".")),
  };

  if let Some(variant) = cli.variant {
    config.variant = variant;
  }
  if let Some(on_corrupt) = cli.on_corrupt {
    config.on_corrupt = on_corrupt;
  }
  if let Some(api_base) = &cli.api_base {
    config.api_base = api_base.clone();
  }
  Ok(config)
}

fn cmd_release(
  publisher: &ManifestPublisher,
  config: &PublisherConfig,
  repo: &str,
  tag: &str,
) -> Result<Vec<PublishedManifest>> {
  let env = ReleaseEnv::from_env()?;
  let client = GitHubClient::new(&config.api_base, env.token, &config.user_agent)?;
  let source = ReleaseSource {
    client: &client,
    repo,
    tag,
    checksum_asset: &config.checksum_asset,
    platforms: &config.release_platforms,
    solc: &env.solc,
  };
  publisher.publish(&source)
}

fn cmd_nightly(
  publisher: &ManifestPublisher,
  config: &PublisherConfig,
) -> Result<Vec<PublishedManifest>> {
  let env = NightlyEnv::from_env()?;
  let source = NightlySource {
    listing_path: &env.listing_path,
    tag: &env.tag,
    commit: &env.commit,
    date: Local::now().date_naive(),
    platforms: &config.nightly_platforms,
    solc: &env.solc,
  };
  publisher.publish(&source)
}

fn cmd_merge(
  publisher: &ManifestPublisher,
  record_path: &Path,
  platform: &str,
) -> Result<Vec<PublishedManifest>> {
  let content = fs::read_to_string(record_path)
    .with_context(|| format!("failed to read {}", record_path.display()))?;
  let record: AssetRecord = serde_json::from_str(&content)
    .with_context(|| format!("failed to parse asset record {}", record_path.display()))?;
  validate_folder(&record.name, platform)?;

  publisher.publish_assets([ResolvedAsset {
    platform: platform.to_string(),
    record,
  }])
}
