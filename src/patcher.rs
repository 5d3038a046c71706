//! Patcher (C6): identifies the installed version, plans the release
//! chain, and drives the two-phase transactional protocol of §4.6.
//!
//! Grounded in `PORTALSURFER-sempal::updater::apply`'s
//! `apply_update_with_progress` orchestration (fetch → verify → stage →
//! commit → cleanup) and `check.rs`'s `check_for_updates` (the direct
//! analogue of `is_update_available`), with `ocfl::OcflRepo` as the shape
//! for a single entry-point struct holding injected dependencies instead of
//! process-wide state (§9).

use crate::digest::{DigestAlgorithm, Hasher, HexDigest};
use crate::error::{PatchlineError, Result};
use crate::fs;
use crate::manifest::{parse_release_manifest, parse_version_manifest};
use crate::operation::{Operation, StageContext};
use crate::resource::ResourceManager;
use crate::staging::StagingArea;
use crate::types::{InstalledVersion, ReleaseDescriptor, VersionManifest};

/// The per-release-application state machine of §4.6.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PatchState {
    Idle,
    Staging,
    Committing,
    RollingBack,
    Applied,
    Reverted,
}

/// The engine's single entry point. Owns the resource manager and hasher
/// it was constructed with; holds no process-wide state, per §9's
/// re-architecture guidance for the source's global launcher singleton.
pub struct Patcher<R: ResourceManager> {
    resource_manager: R,
    hasher: Hasher,
    manifest: Option<VersionManifest>,
    installed_version: Option<InstalledVersion>,
    pending: Vec<ReleaseDescriptor>,
    state: PatchState,
}

impl<R: ResourceManager> Patcher<R> {
    pub fn new(resource_manager: R, default_algorithm: DigestAlgorithm) -> Self {
        Self {
            resource_manager,
            hasher: Hasher::new(default_algorithm),
            manifest: None,
            installed_version: None,
            pending: Vec::new(),
            state: PatchState::Idle,
        }
    }

    pub fn state(&self) -> PatchState {
        self.state
    }

    /// Fetches and parses the version manifest, then computes the
    /// installed version by hashing the concatenation of every identity
    /// file's digest, in declared order. Repeated calls replace prior
    /// state, per §4.6.
    pub fn identify(&mut self, manifest_uri: &str) -> Result<()> {
        let bytes = self.resource_manager.get_remote(manifest_uri)?;
        let manifest = parse_version_manifest(&bytes)?;

        let mut concatenated = Vec::new();
        for path in &manifest.identity {
            let absolute = self.resource_manager.root_path().join(path.as_path());
            if !fs::is_readable(&absolute) {
                return Err(PatchlineError::IntegrityViolation(format!(
                    "identity file missing or unreadable: {path}"
                )));
            }
            let digest = self.hasher.digest_file(&absolute);
            if digest.is_empty() {
                return Err(PatchlineError::IntegrityViolation(format!(
                    "could not digest identity file: {path}"
                )));
            }
            concatenated.extend_from_slice(digest.as_str().as_bytes());
        }

        let installed = self.hasher.digest_bytes(&concatenated);
        log::debug!("computed installed version {installed}");

        self.installed_version = Some(installed);
        self.manifest = Some(manifest);
        self.pending.clear();
        Ok(())
    }

    /// The current installed version, computed by the most recent
    /// `identify` call.
    pub fn version(&self) -> Result<&InstalledVersion> {
        self.installed_version
            .as_ref()
            .ok_or_else(|| PatchlineError::InvalidState("identify must be called before version".to_string()))
    }

    /// Scans the release chain for the installed version and sets the
    /// pending chain to everything after it, per §4.6.
    pub fn is_update_available(&mut self) -> Result<bool> {
        let manifest = self
            .manifest
            .as_ref()
            .ok_or_else(|| PatchlineError::InvalidState("identify must be called before is_update_available".to_string()))?;
        let installed = self
            .installed_version
            .as_ref()
            .ok_or_else(|| PatchlineError::InvalidState("identify must be called before is_update_available".to_string()))?;

        let position = manifest
            .releases
            .iter()
            .position(|release| release.checksum == *installed);

        match position {
            Some(idx) => {
                self.pending = manifest.releases[idx + 1..].to_vec();
                Ok(!self.pending.is_empty())
            }
            None => Err(PatchlineError::IntegrityViolation(
                "installed version does not belong to the known release chain".to_string(),
            )),
        }
    }

    /// Applies the next pending release, running the full two-phase
    /// protocol with no cooperative cancellation point. Equivalent to
    /// `apply_next_update_cancellable(|| false)`.
    pub fn apply_next_update(&mut self) -> Result<bool> {
        self.apply_next_update_cancellable(&|| false)
    }

    /// Applies the next pending release. `should_cancel` is polled between
    /// operations and between phases, per §5: honored immediately during
    /// Staging, only after the in-flight commit returns during Committing.
    pub fn apply_next_update_cancellable(&mut self, should_cancel: &dyn Fn() -> bool) -> Result<bool> {
        if self.pending.is_empty() {
            return Err(PatchlineError::InvalidState(
                "apply_next_update called with no pending release".to_string(),
            ));
        }

        let descriptor = self.pending[0].clone();
        let uri = descriptor.uri.clone().ok_or_else(|| {
            PatchlineError::InvalidManifest("pending release has no uri".to_string())
        })?;
        let release_label = descriptor
            .tag
            .clone()
            .unwrap_or_else(|| descriptor.checksum.to_string());

        let manifest_bytes = self.resource_manager.get_remote(&uri)?;
        let operations = parse_release_manifest(&manifest_bytes, &release_label)?;

        let staging = StagingArea::create(self.resource_manager.cache_path(), &descriptor.checksum)?;
        let ctx = StageContext {
            resource_manager: &self.resource_manager,
            hasher: &self.hasher,
            staging: &staging,
        };

        self.state = PatchState::Staging;
        log::info!("staging release {release_label}");

        let mut attempted: Vec<&Operation> = Vec::new();
        let mut staging_ok = true;
        for op in &operations {
            if should_cancel() {
                staging_ok = false;
                break;
            }
            attempted.push(op);
            if !op.stage(&ctx).is_ok() {
                staging_ok = false;
                break;
            }
        }

        let mut commit_ok = false;
        if staging_ok {
            self.state = PatchState::Committing;
            log::info!("committing release {release_label}");
            commit_ok = true;
            for op in &operations {
                if !op.commit(&ctx).is_ok() {
                    commit_ok = false;
                    break;
                }
                if should_cancel() {
                    commit_ok = false;
                    break;
                }
            }
            // Staging succeeded fully, so every operation has something to
            // roll back regardless of how far committing got.
            attempted = operations.iter().collect();
        }

        if staging_ok && commit_ok {
            staging.destroy()?;
            self.pending.remove(0);
            self.installed_version = Some(descriptor.checksum.clone());
            self.state = PatchState::Applied;
            log::info!("applied release {release_label}");
            return Ok(true);
        }

        self.state = PatchState::RollingBack;
        log::info!("rolling back release {release_label}");
        for op in attempted.iter().rev() {
            if let Err(e) = op.rollback(&ctx) {
                log::warn!("rollback step failed for {release_label}: {e}");
            }
        }
        staging.destroy()?;
        self.state = PatchState::Reverted;
        log::info!("reverted release {release_label}");
        Ok(false)
    }
}
