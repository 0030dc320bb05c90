//! # Banned-Name Filter
//!
//! Hash-based forbidden-token checking for procedural names. The
//! filter never sees the banned words themselves: it loads a binary
//! file of concatenated SHA-256 digests and tests candidates by
//! membership after sanitisation. The builder half of the module
//! produces that file from plain wordlists, fetched or local.

use crate::config::SHA256_DIGEST_LEN;
use crate::{GuildhallError, GuildhallResult};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::Path;

/// Normalises a candidate for hashing: lowercased, every character
/// outside `[a-z]` removed. Spacing and punctuation never disguise a
/// banned token.
pub fn sanitize(input: &str) -> String {
    input
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase())
        .collect()
}

/// SHA-256 digest of a sanitised token.
pub fn token_digest(token: &str) -> [u8; SHA256_DIGEST_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(sanitize(token).as_bytes());
    hasher.finalize().into()
}

/// Membership filter over banned-token digests.
#[derive(Debug, Clone, Default)]
pub struct NameFilter {
    digests: HashSet<[u8; SHA256_DIGEST_LEN]>,
}

impl NameFilter {
    /// A filter that accepts everything.
    pub fn permissive() -> Self {
        Self::default()
    }

    pub fn from_digests(digests: impl IntoIterator<Item = [u8; SHA256_DIGEST_LEN]>) -> Self {
        Self {
            digests: digests.into_iter().collect(),
        }
    }

    /// Loads a filter from a hash file: a raw concatenation of 32-byte
    /// digests, order-insignificant. A length not divisible by 32 is a
    /// corrupt file.
    pub fn load(path: impl AsRef<Path>) -> GuildhallResult<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        if bytes.len() % SHA256_DIGEST_LEN != 0 {
            return Err(GuildhallError::InvalidState(format!(
                "Hash file {} is corrupt: {} bytes is not a whole number of digests",
                path.as_ref().display(),
                bytes.len()
            )));
        }
        let digests = bytes
            .chunks_exact(SHA256_DIGEST_LEN)
            .map(|chunk| {
                let mut digest = [0u8; SHA256_DIGEST_LEN];
                digest.copy_from_slice(chunk);
                digest
            })
            .collect();
        Ok(Self { digests })
    }

    /// Loads the filter, falling back to a permissive one when the
    /// file is missing or unreadable. Generation uses this so a fresh
    /// checkout without wordlists still boots.
    pub fn load_or_permissive(path: impl AsRef<Path>) -> Self {
        match Self::load(path.as_ref()) {
            Ok(filter) => filter,
            Err(error) => {
                log::warn!(
                    "No banned-name list at {} ({}); all names allowed",
                    path.as_ref().display(),
                    error
                );
                Self::permissive()
            }
        }
    }

    /// Whether the candidate is acceptable: true when its sanitised
    /// form is not on the banned list.
    pub fn check(&self, candidate: &str) -> bool {
        !self.digests.contains(&token_digest(candidate))
    }

    pub fn len(&self) -> usize {
        self.digests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }
}

/// Writes the digests of the given lines back-to-back to `path`,
/// sanitising each line the same way `check` does. Lines that sanitise
/// to nothing are skipped.
///
/// The parent directory is created first; a failed write is retried
/// once before the error propagates.
pub fn write_digests(
    lines: impl IntoIterator<Item = impl AsRef<str>>,
    path: impl AsRef<Path>,
) -> GuildhallResult<usize> {
    let mut bytes = Vec::new();
    let mut count = 0usize;
    for line in lines {
        let token = sanitize(line.as_ref());
        if token.is_empty() {
            continue;
        }
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        bytes.extend_from_slice(&hasher.finalize());
        count += 1;
    }

    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    if let Err(first) = std::fs::write(path, &bytes) {
        log::warn!(
            "Writing {} failed ({}); retrying once",
            path.display(),
            first
        );
        std::fs::write(path, &bytes)?;
    }
    Ok(count)
}

/// Builds the hash file from wordlists fetched over HTTP, one URL per
/// list, one token per line. A URL that cannot be fetched is logged
/// and skipped; the remaining lists still produce a file.
pub fn build_from_urls(
    urls: &[String],
    path: impl AsRef<Path>,
) -> GuildhallResult<usize> {
    let mut lines: Vec<String> = Vec::new();
    for url in urls {
        let body = match reqwest::blocking::get(url).and_then(|response| response.text()) {
            Ok(body) => body,
            Err(error) => {
                log::warn!("Skipping wordlist {}: {}", url, error);
                continue;
            }
        };
        lines.extend(body.lines().map(str::to_string));
    }
    write_digests(lines, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_and_lowercases() {
        assert_eq!(sanitize("Verboten Haram!"), "verbotenharam");
        assert_eq!(sanitize("Guts"), "guts");
        assert_eq!(sanitize("123$%"), "");
        assert_eq!(sanitize("Mixed-Case 42"), "mixedcase");
    }

    #[test]
    fn test_check_rejects_banned_and_accepts_clean() {
        let filter = NameFilter::from_digests([token_digest("verbotenharam")]);
        assert!(!filter.check("VerbotenHaram!"));
        assert!(filter.check("Guts"));
    }

    #[test]
    fn test_permissive_accepts_everything() {
        let filter = NameFilter::permissive();
        assert!(filter.is_empty());
        assert!(filter.check("anything at all"));
    }

    #[test]
    fn test_write_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wordlists").join("hashes.bin");

        let written = write_digests(["Cursed", "  ", "Foul-Name!"], &path).unwrap();
        assert_eq!(written, 2);

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes.len() % SHA256_DIGEST_LEN, 0);
        assert_eq!(bytes.len(), 2 * SHA256_DIGEST_LEN);

        let filter = NameFilter::load(&path).unwrap();
        assert_eq!(filter.len(), 2);
        assert!(!filter.check("cursed"));
        assert!(!filter.check("FOULNAME"));
        assert!(filter.check("wholesome"));
    }

    #[test]
    fn test_load_rejects_truncated_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hashes.bin");
        std::fs::write(&path, [0u8; 33]).unwrap();

        assert!(matches!(
            NameFilter::load(&path),
            Err(GuildhallError::InvalidState(_))
        ));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.bin");
        assert!(matches!(
            NameFilter::load(&path),
            Err(GuildhallError::Io(_))
        ));
        // The generation fallback shrugs it off.
        assert!(NameFilter::load_or_permissive(&path).is_empty());
    }

    #[test]
    fn test_digest_matches_sanitised_input() {
        // The file format is position-independent: the same token
        // always hashes identically, pre- or post-sanitisation.
        assert_eq!(token_digest("Verboten Haram!"), token_digest("verboten haram"));
    }
}
