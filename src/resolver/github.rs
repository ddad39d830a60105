//! GitHub release API client and tagged-release asset resolution.

use reqwest::blocking::{Client, Response};
use reqwest::header::ACCEPT;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::models::{AssetRecord, ResolvedAsset, SolcRange};
use crate::platforms::{PlatformLookup, PlatformTable};
use crate::resolver::checksums::{ChecksumMap, parse_checksums};
use crate::resolver::version::{build_hash, release_version};
use crate::resolver::{AssetSource, ResolveError};

const API_VERSION_HEADER: &str = "X-GitHub-Api-Version";
const API_VERSION: &str = "2022-11-28";

/// Release metadata returned by `GET /repos/{repo}/releases/tags/{tag}`.
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
  /// Tag the release was published under, e.g. `v0.3.0`.
  pub tag_name: String,
  /// Commit or branch the tag points at.
  pub target_commitish: String,
  /// Files attached to the release.
  #[serde(default)]
  pub assets: Vec<ReleaseAsset>,
}

/// A single file attached to a release.
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseAsset {
  /// File name as published.
  pub name: String,
  /// Public download URL.
  pub browser_download_url: String,
}

/// Blocking client for the release endpoints.
#[derive(Debug, Clone)]
pub struct GitHubClient {
  http: Client,
  api_base: String,
  token: String,
}

impl GitHubClient {
  /// Create a client for `api_base` authenticating with `token`.
  pub fn new(
    api_base: &str,
    token: impl Into<String>,
    user_agent: &str,
  ) -> Result<Self, ResolveError> {
    let http = Client::builder()
      .user_agent(user_agent)
      .build()
      .map_err(ResolveError::Client)?;

    Ok(Self {
      http,
      api_base: api_base.trim_end_matches('/').to_string(),
      token: token.into(),
    })
  }

  /// Fetch the release published under `tag` in `repo` (`owner/name`).
  pub fn fetch_release(&self, repo: &str, tag: &str) -> Result<Release, ResolveError> {
    let url = format!("{}/repos/{}/releases/tags/{}", self.api_base, repo, tag);
    debug!("fetching release metadata from {url}");

    let response = self
      .http
      .get(&url)
      .bearer_auth(&self.token)
      .header(ACCEPT, "application/vnd.github+json")
      .header(API_VERSION_HEADER, API_VERSION)
      .send()
      .map_err(|source| ResolveError::Http {
        url: url.clone(),
        source,
      })?;

    check_status(&url, response)?
      .json()
      .map_err(|source| ResolveError::Decode { url, source })
  }

  /// Download and parse the checksum listing attached to `release`.
  ///
  /// A missing listing or a failed download is logged and yields no checksums.
  pub fn fetch_checksums(&self, release: &Release, asset_name: &str) -> ChecksumMap {
    let Some(asset) = release.assets.iter().find(|asset| asset.name == asset_name) else {
      warn!("{asset_name} not found in release assets");
      return ChecksumMap::new();
    };

    match self.download_text(&asset.browser_download_url) {
      Ok(text) => parse_checksums(&text),
      Err(err) => {
        warn!("failed to fetch {asset_name}: {err}");
        ChecksumMap::new()
      }
    }
  }

  fn download_text(&self, url: &str) -> Result<String, ResolveError> {
    debug!("downloading {url}");
    let response = self
      .http
      .get(url)
      .bearer_auth(&self.token)
      .header(ACCEPT, "application/octet-stream")
      .send()
      .map_err(|source| ResolveError::Http {
        url: url.to_string(),
        source,
      })?;

    check_status(url, response)?
      .text()
      .map_err(|source| ResolveError::Http {
        url: url.to_string(),
        source,
      })
  }
}

fn check_status(url: &str, response: Response) -> Result<Response, ResolveError> {
  let status = response.status();
  if status.is_success() {
    return Ok(response);
  }

  let body = response.text().unwrap_or_default();
  Err(ResolveError::Status {
    url: url.to_string(),
    status,
    body,
  })
}

/// Build a record for every release asset routed by `platforms`.
pub fn records_for_release<P: PlatformLookup + ?Sized>(
  release: &Release,
  checksums: &ChecksumMap,
  platforms: &P,
  solc: &SolcRange,
) -> Vec<ResolvedAsset> {
  let version = release_version(&release.tag_name);
  let build = build_hash(&release.target_commitish);

  release
    .assets
    .iter()
    .filter_map(|asset| {
      let platform = platforms.platform_for(&asset.name)?;
      let sha256 = checksums.get(&asset.name).cloned().unwrap_or_default();
      let record = AssetRecord::new(
        asset.name.clone(),
        version,
        build.clone(),
        asset.browser_download_url.clone(),
      )
      .with_sha256(sha256)
      .with_solc_range(solc);

      Some(ResolvedAsset {
        platform: platform.to_string(),
        record,
      })
    })
    .collect()
}

/// Assets of a tagged release fetched through [`GitHubClient`].
#[derive(Debug)]
pub struct ReleaseSource<'a> {
  /// Client used for every request.
  pub client: &'a GitHubClient,
  /// Repository in `owner/name` form.
  pub repo: &'a str,
  /// Release tag.
  pub tag: &'a str,
  /// Name of the checksum listing asset.
  pub checksum_asset: &'a str,
  /// Asset routing table.
  pub platforms: &'a PlatformTable,
  /// Compiler compatibility markers attached to every record.
  pub solc: &'a SolcRange,
}

impl AssetSource for ReleaseSource<'_> {
  fn resolve(&self) -> Result<Vec<ResolvedAsset>, ResolveError> {
    let release = self.client.fetch_release(self.repo, self.tag)?;
    let checksums = self.client.fetch_checksums(&release, self.checksum_asset);
    Ok(records_for_release(
      &release,
      &checksums,
      self.platforms,
      self.solc,
    ))
  }
}
