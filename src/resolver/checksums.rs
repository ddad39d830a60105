//! Parsing of `checksums.txt` release assets.

use std::collections::BTreeMap;

use tracing::warn;

/// Mapping from artifact file name to its hex encoded SHA-256.
pub type ChecksumMap = BTreeMap<String, String>;

/// Parse lines of `<sha256> <filename>`.
///
/// Only the first whitespace run separates the digest, so file names may
/// contain spaces. Blank lines are ignored and lines without a file name are
/// skipped.
pub fn parse_checksums(text: &str) -> ChecksumMap {
  let mut checksums = ChecksumMap::new();

  for line in text.lines() {
    let line = line.trim();
    if line.is_empty() {
      continue;
    }

    match line.split_once(char::is_whitespace) {
      Some((digest, filename)) => {
        checksums.insert(filename.trim_start().to_string(), digest.to_string());
      }
      None => warn!("skipping checksum line without a file name: {line}"),
    }
  }

  checksums
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_digest_and_filename_pairs() {
    let checksums = parse_checksums(
      "aaaa  resolc-x86_64-unknown-linux-musl\n\nbbbb resolc_web.js\n",
    );

    assert_eq!(checksums.len(), 2);
    assert_eq!(checksums["resolc-x86_64-unknown-linux-musl"], "aaaa");
    assert_eq!(checksums["resolc_web.js"], "bbbb");
  }

  #[test]
  fn keeps_spaces_inside_file_names() {
    let checksums = parse_checksums("cccc\tmy release notes.txt  \r\n");
    assert_eq!(checksums["my release notes.txt"], "cccc");
  }

  #[test]
  fn skips_lines_without_file_name() {
    let checksums = parse_checksums("dddd\neeee resolc.js");

    assert_eq!(checksums.len(), 1);
    assert_eq!(checksums["resolc.js"], "eeee");
  }

  #[test]
  fn later_entries_override_earlier_ones() {
    let checksums = parse_checksums("1111 resolc.js\n2222 resolc.js");
    assert_eq!(checksums["resolc.js"], "2222");
  }
}
