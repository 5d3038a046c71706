//! Resource Manager (C3): remote fetch, local load, and path/cache rooting
//! behind one contract, per §4.3.
//!
//! The remote-fetch half is deliberately pluggable: §1 places the HTTP
//! transport out of scope, so [`ResourceManager::get_remote`] delegates to
//! a separate [`RemoteFetcher`]. This mirrors the teacher's `OcflStore`
//! trait with swappable `FsOcflStore`/`S3OcflStore` backends behind a
//! Cargo feature (`s3` there, `http` here).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{PatchlineError, Result};
use crate::fs;

/// Fetches bytes from a URI. The only production implementation shipped
/// here (`UreqFetcher`) lives behind the `http` feature; tests use
/// [`MemoryFetcher`] instead, per §4.3: "tests substitute a fake that
/// serves byte strings from memory."
pub trait RemoteFetcher: Send + Sync {
    fn fetch(&self, uri: &str) -> Result<Vec<u8>>;
}

/// Combines the identity/cache rooting and local-file half of §4.3's
/// contract with a pluggable remote-fetch dependency.
pub trait ResourceManager {
    /// Base URI used to resolve relative manifest URIs.
    fn host_address(&self) -> &str;

    /// Absolute path to the installation root.
    fn root_path(&self) -> &Path;

    /// Absolute path to the staging cache root.
    fn cache_path(&self) -> &Path;

    /// Blocking fetch of remote bytes. `UnreachableResource`/`InvalidResource`
    /// (§4.3) are both folded into [`PatchlineError::InvalidResource`] here;
    /// callers that need to distinguish transport failure from HTTP-level
    /// failure inspect the message.
    fn get_remote(&self, uri: &str) -> Result<Vec<u8>>;

    /// Loads a file relative to the install root.
    fn load_file(&self, relative_path: &Path) -> Result<Vec<u8>> {
        fs::load_file(&self.root_path().join(relative_path))
    }

    /// True iff the path, relative to the install root, is readable.
    fn is_readable(&self, relative_path: &Path) -> bool {
        fs::is_readable(&self.root_path().join(relative_path))
    }

    /// Creates `cache_path() / name` and returns its absolute path.
    fn create_temp_directory(&self, name: &str) -> Result<PathBuf> {
        let path = self.cache_path().join(name);
        fs::ensure_directory(&path)?;
        Ok(path)
    }
}

/// The always-available [`ResourceManager`], rooted at a real install tree
/// and staging cache, with the remote half delegated to any [`RemoteFetcher`].
/// Grounded in `ocfl::store::fs::FsOcflStore`'s storage-root-plus-backend
/// shape.
pub struct FileResourceManager<F: RemoteFetcher> {
    host_address: String,
    root: PathBuf,
    cache: PathBuf,
    fetcher: F,
}

impl<F: RemoteFetcher> FileResourceManager<F> {
    pub fn new(host_address: impl Into<String>, root: PathBuf, cache: PathBuf, fetcher: F) -> Self {
        Self {
            host_address: host_address.into(),
            root,
            cache,
            fetcher,
        }
    }
}

impl<F: RemoteFetcher> ResourceManager for FileResourceManager<F> {
    fn host_address(&self) -> &str {
        &self.host_address
    }

    fn root_path(&self) -> &Path {
        &self.root
    }

    fn cache_path(&self) -> &Path {
        &self.cache
    }

    fn get_remote(&self, uri: &str) -> Result<Vec<u8>> {
        log::debug!("fetching remote resource {uri}");
        let bytes = self.fetcher.fetch(uri)?;
        log::debug!("fetched {} bytes from {uri}", bytes.len());
        Ok(bytes)
    }
}

/// An in-memory [`RemoteFetcher`] that serves byte strings from a map,
/// exactly as §4.3 describes the intended test double.
#[derive(Debug, Default, Clone)]
pub struct MemoryFetcher {
    resources: HashMap<String, Vec<u8>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, uri: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.resources.insert(uri.into(), bytes.into());
        self
    }

    pub fn insert(&mut self, uri: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.resources.insert(uri.into(), bytes.into());
    }
}

impl RemoteFetcher for MemoryFetcher {
    fn fetch(&self, uri: &str) -> Result<Vec<u8>> {
        self.resources
            .get(uri)
            .cloned()
            .ok_or_else(|| PatchlineError::invalid_resource(uri, "no such in-memory resource"))
    }
}

#[cfg(feature = "http")]
pub mod http {
    //! `ureq`-backed [`super::RemoteFetcher`], grounded in
    //! `PORTALSURFER-sempal::http_client` (shared `Agent` with connect/read/
    //! write timeouts, `Content-Length`-checked bounded reads).

    use std::io::Read;
    use std::sync::OnceLock;
    use std::time::Duration;

    use super::{PatchlineError, RemoteFetcher, Result};

    const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
    const READ_TIMEOUT: Duration = Duration::from_secs(30);

    fn agent() -> &'static ureq::Agent {
        static AGENT: OnceLock<ureq::Agent> = OnceLock::new();
        AGENT.get_or_init(|| {
            ureq::AgentBuilder::new()
                .timeout_connect(CONNECT_TIMEOUT)
                .timeout_read(READ_TIMEOUT)
                .build()
        })
    }

    /// Fetches a URI over HTTP(S) with a hard response-size cap, so a
    /// misbehaving or malicious server cannot exhaust memory.
    pub struct UreqFetcher {
        max_bytes: usize,
    }

    impl UreqFetcher {
        pub fn new(max_bytes: usize) -> Self {
            Self { max_bytes }
        }
    }

    impl Default for UreqFetcher {
        fn default() -> Self {
            Self::new(512 * 1024 * 1024)
        }
    }

    impl RemoteFetcher for UreqFetcher {
        fn fetch(&self, uri: &str) -> Result<Vec<u8>> {
            let response = agent()
                .get(uri)
                .call()
                .map_err(|err| PatchlineError::invalid_resource(uri, err.to_string()))?;
            let mut limited = response.into_reader().take(self.max_bytes as u64 + 1);
            let mut bytes = Vec::new();
            limited
                .read_to_end(&mut bytes)
                .map_err(|err| PatchlineError::invalid_resource(uri, err.to_string()))?;
            if bytes.len() > self.max_bytes {
                return Err(PatchlineError::invalid_resource(
                    uri,
                    format!("response exceeded {} bytes", self.max_bytes),
                ));
            }
            Ok(bytes)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn memory_fetcher_serves_registered_bytes() {
        let fetcher = MemoryFetcher::new().with("http://example/r2.json", b"hello".to_vec());
        assert_eq!(fetcher.fetch("http://example/r2.json").unwrap(), b"hello");
    }

    #[test]
    fn memory_fetcher_errors_on_unknown_uri() {
        let fetcher = MemoryFetcher::new();
        assert!(fetcher.fetch("http://example/missing").is_err());
    }

    #[test]
    fn file_resource_manager_creates_temp_directory_under_cache() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("root");
        let cache = dir.path().join("cache");
        fs::ensure_directory(&root).unwrap();
        let manager = FileResourceManager::new("http://example", root, cache.clone(), MemoryFetcher::new());
        let created = manager.create_temp_directory("deadbeef").unwrap();
        assert_eq!(created, cache.join("deadbeef"));
        assert!(created.is_dir());
    }

    #[test]
    fn file_resource_manager_loads_file_relative_to_root() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("root");
        fs::ensure_directory(&root).unwrap();
        std::fs::write(root.join("a.txt"), b"hi\n").unwrap();
        let manager = FileResourceManager::new(
            "http://example",
            root,
            dir.path().join("cache"),
            MemoryFetcher::new(),
        );
        let bytes = manager.load_file(Path::new("a.txt")).unwrap();
        assert_eq!(bytes, b"hi\n");
    }
}
