//! A transactional core for a software auto-update engine: version
//! fingerprinting, release-chain planning, and staged patch application
//! with full rollback on failure.
//!
//! The caller-facing surface is [`Patcher`]: construct one with a
//! [`ResourceManager`], call [`Patcher::identify`] to fingerprint the
//! installed tree, [`Patcher::is_update_available`] to plan the pending
//! chain, and [`Patcher::apply_next_update`] repeatedly to walk it one
//! release at a time.

pub mod config;
pub mod digest;
pub mod error;
pub mod fs;
pub mod manifest;
pub mod operation;
pub mod patcher;
pub mod resource;
pub mod staging;
pub mod types;

pub use config::Config;
pub use digest::{DigestAlgorithm, Hasher, HexDigest};
pub use error::{PatchlineError, Result};
pub use operation::{Operation, StageResult};
pub use patcher::{PatchState, Patcher};
pub use resource::{FileResourceManager, MemoryFetcher, RemoteFetcher, ResourceManager};
pub use types::{IdentityEntry, InstalledVersion, ReleaseDescriptor, RelPath, VersionManifest};

#[cfg(feature = "http")]
pub use resource::http::UreqFetcher;
