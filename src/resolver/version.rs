//! Version and build-hash strings derived from tags and commits.

use chrono::NaiveDate;

/// Number of commit characters kept in a build hash.
pub const BUILD_HASH_LEN: usize = 8;

/// `commit.<first eight characters of commit>`.
///
/// Shorter commits are used as-is.
pub fn build_hash(commit: &str) -> String {
  let prefix: String = commit.chars().take(BUILD_HASH_LEN).collect();
  format!("commit.{prefix}")
}

/// Release version for a tag, with every leading `v` removed.
pub fn release_version(tag: &str) -> &str {
  tag.trim_start_matches('v')
}

/// Nightly version `<tag without v>-nightly.<YYYY.MM.DD>` for the given build date.
pub fn nightly_version(tag: &str, date: NaiveDate) -> String {
  format!(
    "{}-nightly.{}",
    tag.replace('v', ""),
    date.format("%Y.%m.%d")
  )
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn build_hash_keeps_first_eight_characters() {
    assert_eq!(build_hash("abcdef1234567890"), "commit.abcdef12");
  }

  #[test]
  fn build_hash_accepts_short_commits() {
    assert_eq!(build_hash("abc"), "commit.abc");
    assert_eq!(build_hash(""), "commit.");
  }

  #[test]
  fn release_version_strips_v_prefix() {
    assert_eq!(release_version("v1.2.0"), "1.2.0");
    assert_eq!(release_version("1.2.0"), "1.2.0");
    assert_eq!(release_version("v0.1.0-dev.16"), "0.1.0-dev.16");
  }

  #[test]
  fn nightly_version_appends_dotted_date() {
    let date = NaiveDate::from_ymd_opt(2025, 3, 7).expect("valid date");
    assert_eq!(nightly_version("v0.3.0", date), "0.3.0-nightly.2025.03.07");
  }
}
