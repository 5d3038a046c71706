//! Operation Set (C5): the four tagged operation variants, each
//! implementing the `stage`/`commit`/`rollback` three-phase contract of
//! §4.5.
//!
//! Grounded in `PORTALSURFER-sempal::updater::fs_ops`'s `UpdateTransaction`
//! (stage to a sibling path, commit via rename-swap with a backup, roll
//! back in reverse order) generalized to per-operation granularity, and in
//! `ocfl::store::fs`'s `StagingStore` trait for the staging-path-
//! construction idiom.

use std::path::Path;

use crate::digest::HexDigest;
use crate::error::Result;
use crate::fs;
use crate::resource::ResourceManager;
use crate::staging::StagingArea;
use crate::types::RelPath;

/// Outcome of a `stage` or `commit` call. This is a control-flow value the
/// Patcher inspects, not a thrown error — it stays distinct from
/// [`crate::error::PatchlineError`], mirroring the teacher's separation
/// between thrown `RocflError`s and matched validation-result enums.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum StageResult {
    Ok,
    FileExists,
    FileMissing,
    IntegrityMismatch,
    UnwritableDestination,
    UnreachableSource,
    InternalError,
}

impl StageResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, StageResult::Ok)
    }
}

/// Everything an operation needs to stage, commit, or roll itself back.
pub struct StageContext<'a> {
    pub resource_manager: &'a dyn ResourceManager,
    pub hasher: &'a crate::digest::Hasher,
    pub staging: &'a StagingArea,
}

impl<'a> StageContext<'a> {
    fn install_path(&self, path: &RelPath) -> std::path::PathBuf {
        self.resource_manager.root_path().join(path.as_path())
    }
}

/// A tagged file-level change, per §3.
#[derive(Debug, Clone)]
pub enum Operation {
    Create {
        src_checksum: HexDigest,
        src_size: u64,
        src_uri: String,
        dst_path: RelPath,
    },
    Update {
        dst_path: RelPath,
        pre_checksum: HexDigest,
        post_checksum: HexDigest,
        src_uri: String,
        size: u64,
    },
    Rename {
        from: RelPath,
        to: RelPath,
    },
    Delete {
        path: RelPath,
        checksum: HexDigest,
    },
}

impl Operation {
    /// Performs all fallible work except the final visible mutation of the
    /// install tree: downloading and verifying payloads, and backing up
    /// whatever will be overwritten or removed.
    pub fn stage(&self, ctx: &StageContext) -> StageResult {
        match self {
            Operation::Create {
                src_checksum,
                src_size,
                src_uri,
                dst_path,
            } => stage_create(ctx, src_checksum, *src_size, src_uri, dst_path),
            Operation::Update {
                dst_path,
                pre_checksum,
                post_checksum,
                src_uri,
                size,
            } => stage_update(ctx, dst_path, pre_checksum, post_checksum, src_uri, *size),
            Operation::Rename { from, to } => stage_rename(ctx, from, to),
            Operation::Delete { path, checksum } => stage_delete(ctx, path, checksum),
        }
    }

    /// Performs the visible, atomic filesystem mutation using already
    /// staged artifacts. No network dependency.
    pub fn commit(&self, ctx: &StageContext) -> StageResult {
        match self {
            Operation::Create { dst_path, .. } => commit_create(ctx, dst_path),
            Operation::Update { dst_path, .. } => commit_update(ctx, dst_path),
            Operation::Rename { from, to } => commit_rename(ctx, from, to),
            Operation::Delete { path, .. } => commit_delete(ctx, path),
        }
    }

    /// Undoes whatever `stage` and any already-executed `commit` did, using
    /// the backup slot. Idempotent; logged, never propagated as a hard
    /// error by the caller.
    pub fn rollback(&self, ctx: &StageContext) -> Result<()> {
        match self {
            Operation::Create { dst_path, .. } => rollback_create(ctx, dst_path),
            Operation::Update { dst_path, .. } => rollback_update(ctx, dst_path),
            Operation::Rename { from, to } => rollback_rename(ctx, from, to),
            Operation::Delete { path, .. } => rollback_delete(ctx, path),
        }
    }
}

fn download_and_verify(
    ctx: &StageContext,
    src_uri: &str,
    expected_size: u64,
    expected_checksum: &HexDigest,
    dest: &Path,
) -> StageResult {
    let bytes = match ctx.resource_manager.get_remote(src_uri) {
        Ok(bytes) => bytes,
        Err(_) => return StageResult::UnreachableSource,
    };
    if bytes.len() as u64 != expected_size {
        return StageResult::IntegrityMismatch;
    }
    let digest = ctx.hasher.digest_bytes(&bytes);
    if digest != *expected_checksum {
        return StageResult::IntegrityMismatch;
    }
    match fs::write_file(dest, &bytes) {
        Ok(()) => StageResult::Ok,
        Err(_) => StageResult::UnwritableDestination,
    }
}

fn stage_create(
    ctx: &StageContext,
    src_checksum: &HexDigest,
    src_size: u64,
    src_uri: &str,
    dst_path: &RelPath,
) -> StageResult {
    let install_path = ctx.install_path(dst_path);
    if install_path.exists() {
        return StageResult::FileExists;
    }
    if !fs::is_writable(
        install_path
            .parent()
            .unwrap_or_else(|| ctx.resource_manager.root_path()),
    ) {
        return StageResult::UnwritableDestination;
    }
    let dest = ctx.staging.payload_path(dst_path);
    download_and_verify(ctx, src_uri, src_size, src_checksum, &dest)
}

fn commit_create(ctx: &StageContext, dst_path: &RelPath) -> StageResult {
    let staged = ctx.staging.payload_path(dst_path);
    let install_path = ctx.install_path(dst_path);
    if let Some(parent) = install_path.parent() {
        if fs::ensure_directory(parent).is_err() {
            return StageResult::UnwritableDestination;
        }
    }
    match fs::move_file(&staged, &install_path) {
        Ok(()) => StageResult::Ok,
        Err(_) => StageResult::InternalError,
    }
}

fn rollback_create(ctx: &StageContext, dst_path: &RelPath) -> Result<()> {
    fs::remove_file(&ctx.staging.payload_path(dst_path))?;
    fs::remove_file(&ctx.install_path(dst_path))?;
    Ok(())
}

fn stage_update(
    ctx: &StageContext,
    dst_path: &RelPath,
    pre_checksum: &HexDigest,
    post_checksum: &HexDigest,
    src_uri: &str,
    size: u64,
) -> StageResult {
    let install_path = ctx.install_path(dst_path);
    if !install_path.is_file() {
        return StageResult::FileMissing;
    }
    let current_digest = ctx.hasher.digest_file(&install_path);
    if current_digest != *pre_checksum {
        return StageResult::IntegrityMismatch;
    }
    if fs::copy_file(&install_path, &ctx.staging.backup_path(dst_path)).is_err() {
        return StageResult::InternalError;
    }
    let dest = ctx.staging.new_path(dst_path);
    download_and_verify(ctx, src_uri, size, post_checksum, &dest)
}

fn commit_update(ctx: &StageContext, dst_path: &RelPath) -> StageResult {
    let staged = ctx.staging.new_path(dst_path);
    let install_path = ctx.install_path(dst_path);
    match fs::move_file_replacing(&staged, &install_path) {
        Ok(()) => StageResult::Ok,
        Err(_) => StageResult::InternalError,
    }
}

fn rollback_update(ctx: &StageContext, dst_path: &RelPath) -> Result<()> {
    let backup = ctx.staging.backup_path(dst_path);
    let install_path = ctx.install_path(dst_path);
    if backup.is_file() {
        fs::remove_file(&install_path)?;
        fs::move_file(&backup, &install_path)?;
    }
    fs::remove_file(&ctx.staging.new_path(dst_path))?;
    Ok(())
}

fn stage_rename(ctx: &StageContext, from: &RelPath, to: &RelPath) -> StageResult {
    let from_path = ctx.install_path(from);
    let to_path = ctx.install_path(to);
    if !from_path.exists() {
        return StageResult::FileMissing;
    }
    if to_path.exists() {
        return StageResult::FileExists;
    }
    StageResult::Ok
}

fn commit_rename(ctx: &StageContext, from: &RelPath, to: &RelPath) -> StageResult {
    let from_path = ctx.install_path(from);
    let to_path = ctx.install_path(to);
    if let Some(parent) = to_path.parent() {
        if fs::ensure_directory(parent).is_err() {
            return StageResult::UnwritableDestination;
        }
    }
    match fs::move_file(&from_path, &to_path) {
        Ok(()) => StageResult::Ok,
        Err(_) => StageResult::InternalError,
    }
}

fn rollback_rename(ctx: &StageContext, from: &RelPath, to: &RelPath) -> Result<()> {
    let from_path = ctx.install_path(from);
    let to_path = ctx.install_path(to);
    if to_path.exists() && !from_path.exists() {
        fs::move_file(&to_path, &from_path)?;
    }
    Ok(())
}

fn stage_delete(ctx: &StageContext, path: &RelPath, checksum: &HexDigest) -> StageResult {
    let install_path = ctx.install_path(path);
    if !install_path.is_file() {
        return StageResult::FileMissing;
    }
    let current_digest = ctx.hasher.digest_file(&install_path);
    if current_digest != *checksum {
        return StageResult::IntegrityMismatch;
    }
    match fs::copy_file(&install_path, &ctx.staging.backup_path(path)) {
        Ok(()) => StageResult::Ok,
        Err(_) => StageResult::InternalError,
    }
}

fn commit_delete(ctx: &StageContext, path: &RelPath) -> StageResult {
    match fs::remove_file(&ctx.install_path(path)) {
        Ok(()) => StageResult::Ok,
        Err(_) => StageResult::InternalError,
    }
}

fn rollback_delete(ctx: &StageContext, path: &RelPath) -> Result<()> {
    let backup = ctx.staging.backup_path(path);
    let install_path = ctx.install_path(path);
    if backup.is_file() && !install_path.exists() {
        fs::move_file(&backup, &install_path)?;
    }
    Ok(())
}
