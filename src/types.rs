//! Shared data model (§3): [`RelPath`], [`IdentityEntry`], [`VersionManifest`],
//! [`ReleaseDescriptor`], and [`InstalledVersion`].

use std::convert::TryFrom;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::digest::HexDigest;
use crate::error::{PatchlineError, Result};

/// A path relative to the install root. Construction rejects absolute
/// paths and any `.`/`..`/empty segment, unifying the rejection rule in
/// `ocfl::types::InventoryPathInner::try_from` with
/// `PORTALSURFER-sempal`'s `sanitize_relative_path` — this is what makes
/// "all paths outside root that appear in any manifest are rejected" (§6)
/// a property of the type rather than a scattered runtime check.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RelPath(String);

impl RelPath {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_path(&self) -> &Path {
        Path::new(&self.0)
    }

    /// The final path segment, used to name staged payloads after their
    /// destination basename (§4.5's `Create.stage`).
    pub fn basename(&self) -> &str {
        match self.0.rfind('/') {
            Some(idx) => &self.0[idx + 1..],
            None => &self.0,
        }
    }
}

impl TryFrom<&str> for RelPath {
    type Error = PatchlineError;

    fn try_from(value: &str) -> Result<Self> {
        if value.is_empty() {
            return Err(PatchlineError::InvalidManifest(
                "path must not be empty".to_string(),
            ));
        }
        if value.starts_with('/') || value.starts_with('\\') {
            return Err(PatchlineError::InvalidManifest(format!(
                "path must be relative to the install root: {value}"
            )));
        }
        let has_illegal_part = value
            .split(['/', '\\'])
            .any(|part| part.is_empty() || part == "." || part == "..");
        if has_illegal_part {
            return Err(PatchlineError::InvalidManifest(format!(
                "path may not contain '.', '..', or empty segments: {value}"
            )));
        }
        Ok(Self(value.to_string()))
    }
}

impl TryFrom<String> for RelPath {
    type Error = PatchlineError;

    fn try_from(value: String) -> Result<Self> {
        Self::try_from(value.as_str())
    }
}

impl From<RelPath> for String {
    fn from(path: RelPath) -> Self {
        path.0
    }
}

impl fmt::Display for RelPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single entry of the identity map: a path whose digest is included in
/// the fingerprint, and (after `identify` runs) the digest itself.
#[derive(Debug, Clone)]
pub struct IdentityEntry {
    pub path: RelPath,
    pub digest: Option<HexDigest>,
}

impl IdentityEntry {
    pub fn new(path: RelPath) -> Self {
        Self { path, digest: None }
    }
}

/// A single release in the chain: its checksum, optional fetch URI (absent
/// only for the chain's `initial` release), optional human label, and
/// whether it is the chain's starting point.
#[derive(Debug, Clone)]
pub struct ReleaseDescriptor {
    pub checksum: HexDigest,
    pub uri: Option<String>,
    pub tag: Option<String>,
    pub initial: bool,
}

/// The parsed version manifest: the identity map plus the ordered release
/// chain, oldest to newest.
#[derive(Debug, Clone)]
pub struct VersionManifest {
    pub identity: Vec<RelPath>,
    pub releases: Vec<ReleaseDescriptor>,
}

impl VersionManifest {
    /// Validates the chain invariants from §3: exactly one `initial`
    /// release, and unique checksums across the chain. Called once after
    /// parsing so every other component can assume these hold.
    pub fn validate(&self) -> Result<()> {
        if self.identity.is_empty() {
            return Err(PatchlineError::InvalidManifest(
                "identity map must be non-empty".to_string(),
            ));
        }

        let initial_count = self.releases.iter().filter(|r| r.initial).count();
        if initial_count != 1 {
            return Err(PatchlineError::InvalidManifest(format!(
                "exactly one release must have initial=true, found {initial_count}"
            )));
        }

        for release in &self.releases {
            if !release.initial && release.uri.is_none() {
                return Err(PatchlineError::missing_attribute(
                    "version",
                    "release",
                    "uri",
                ));
            }
        }

        let mut seen = std::collections::HashSet::new();
        for release in &self.releases {
            if !seen.insert(release.checksum.clone()) {
                return Err(PatchlineError::InvalidManifest(format!(
                    "duplicate release checksum in chain: {}",
                    release.checksum
                )));
            }
        }

        Ok(())
    }
}

/// The digest identifying an installed version: `hash(concat(identity
/// digests in manifest order))`.
pub type InstalledVersion = HexDigest;
