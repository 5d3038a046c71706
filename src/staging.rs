//! `StagingArea` (§3): the per-release scratch directory that owns every
//! pre-committed payload and backup copy for the duration of one
//! `apply_next_update` call.
//!
//! Grounded in `ocfl::store::fs::FsOcflStore`'s staging-path construction
//! (`inventory.new_content_path`) and `PORTALSURFER-sempal`'s
//! `with_suffix`/`.new`-`.old` sibling-path convention, adapted to
//! `.new`/`.bak` per §4.5.

use std::path::{Path, PathBuf};

use crate::digest::HexDigest;
use crate::error::Result;
use crate::fs;
use crate::types::RelPath;

/// A directory under the cache root, uniquely named after the target
/// release's checksum. Created at the start of a release application;
/// removed on both success and (after restoring backups) rollback.
pub struct StagingArea {
    root: PathBuf,
}

impl StagingArea {
    /// Creates the staging directory for `release_checksum` under
    /// `cache_root`, creating both if missing.
    pub fn create(cache_root: &Path, release_checksum: &HexDigest) -> Result<Self> {
        let root = cache_root.join(release_checksum.as_str());
        fs::ensure_directory(&root)?;
        Ok(Self { root })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Where `Create.stage` downloads its payload: `staging / basename`.
    pub fn payload_path(&self, dst_path: &RelPath) -> PathBuf {
        self.root.join(dst_path.basename())
    }

    /// Where `Update.stage` downloads the new content: `staging / <path>.new`.
    pub fn new_path(&self, path: &RelPath) -> PathBuf {
        self.sibling(path, "new")
    }

    /// Where `Update.stage`/`Delete.stage` back up the existing file:
    /// `staging / <path>.bak`.
    pub fn backup_path(&self, path: &RelPath) -> PathBuf {
        self.sibling(path, "bak")
    }

    fn sibling(&self, path: &RelPath, suffix: &str) -> PathBuf {
        let mut name = path.as_str().replace('/', "__");
        name.push('.');
        name.push_str(suffix);
        self.root.join(name)
    }

    /// Destroys the staging area and everything in it. Called on both
    /// success and rollback completion (§3).
    pub fn destroy(&self) -> Result<()> {
        fs::remove_directory_recursive(&self.root)
    }
}
