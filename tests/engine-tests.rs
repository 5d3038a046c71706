//! Black-box, end-to-end coverage of the public API, in the style of the
//! teacher's `fs-tests.rs`: drive the library the way an external caller
//! would, against a real temporary install tree, and assert on the
//! resulting filesystem state rather than internal module behavior.

use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;

use patchline::{DigestAlgorithm, FileResourceManager, Hasher, MemoryFetcher, Patcher};

fn checksum(bytes: &[u8]) -> String {
    Hasher::new(DigestAlgorithm::Sha256)
        .digest_bytes(bytes)
        .as_str()
        .to_string()
}

#[test]
fn applies_a_chain_of_two_releases_with_mixed_operations() {
    let dir = TempDir::new().unwrap();
    let root = dir.child("install");
    let cache = dir.child("cache");
    root.create_dir_all().unwrap();
    root.child("identity.txt").write_str("v1\n").unwrap();
    root.child("old.txt").write_str("old contents").unwrap();
    root.child("keep.txt").write_str("keep me").unwrap();

    let r1 = checksum(
        format!(
            "{}{}{}",
            checksum(b"v1\n"),
            checksum(b"old contents"),
            checksum(b"keep me")
        )
        .as_bytes(),
    );

    let release2_payload = b"brand new file".to_vec();
    let release2_payload_checksum = checksum(&release2_payload);
    let updated_contents = b"old contents, updated".to_vec();
    let updated_checksum = checksum(&updated_contents);

    let version_manifest = serde_json::json!({
        "identity": ["identity.txt", "old.txt", "keep.txt"],
        "release": [
            {"checksum": r1, "initial": true},
            {"checksum": "deadbeef00000000000000000000000000000000000000000000000000000001", "uri": "http://updates/release-2.json", "tag": "2.0"},
        ],
    });
    let release2_manifest = serde_json::json!({
        "operations": [
            {
                "type": "create",
                "source": {"checksum": release2_payload_checksum, "size": release2_payload.len(), "uri": "http://updates/payload-2"},
                "destination": "new.txt",
            },
            {
                "type": "update",
                "source": {"checksum": updated_checksum, "size": updated_contents.len(), "uri": "http://updates/payload-update"},
                "destination": {"checksum": checksum(b"old contents"), "path": "old.txt"},
            },
            {
                "type": "rename",
                "source": "keep.txt",
                "destination": "kept.txt",
            },
        ]
    });

    let fetcher = MemoryFetcher::new()
        .with("http://updates/manifest.json", version_manifest.to_string().into_bytes())
        .with("http://updates/release-2.json", release2_manifest.to_string().into_bytes())
        .with("http://updates/payload-2", release2_payload.clone())
        .with("http://updates/payload-update", updated_contents.clone());

    let resource_manager = FileResourceManager::new(
        "http://updates",
        root.path().to_path_buf(),
        cache.path().to_path_buf(),
        fetcher,
    );
    let mut patcher = Patcher::new(resource_manager, DigestAlgorithm::Sha256);

    patcher.identify("http://updates/manifest.json").unwrap();
    assert!(patcher.is_update_available().unwrap());
    assert!(patcher.apply_next_update().unwrap());
    assert!(!patcher.is_update_available().unwrap());

    root.child("new.txt")
        .assert(predicate::str::similar("brand new file").from_utf8());
    root.child("old.txt")
        .assert(predicate::str::similar("old contents, updated").from_utf8());
    root.child("keep.txt").assert(predicate::path::missing());
    root.child("kept.txt")
        .assert(predicate::str::similar("keep me").from_utf8());
    cache.assert(predicate::path::is_dir());
    assert!(cache.path().read_dir().unwrap().next().is_none());
}

#[test]
fn rolls_back_the_whole_release_when_one_operation_fails_integrity_check() {
    let dir = TempDir::new().unwrap();
    let root = dir.child("install");
    let cache = dir.child("cache");
    root.create_dir_all().unwrap();
    root.child("identity.txt").write_str("v1\n").unwrap();

    let r1 = checksum(checksum(b"v1\n").as_bytes());

    let version_manifest = serde_json::json!({
        "identity": ["identity.txt"],
        "release": [
            {"checksum": r1, "initial": true},
            {"checksum": "deadbeef00000000000000000000000000000000000000000000000000000002", "uri": "http://updates/release-2.json"},
        ],
    });
    let release2_manifest = serde_json::json!({
        "operations": [
            {
                "type": "create",
                "source": {"checksum": checksum(b"first"), "size": 5, "uri": "http://updates/payload-1"},
                "destination": "one.txt",
            },
            {
                "type": "create",
                "source": {"checksum": "0000000000000000000000000000000000000000000000000000000000000000", "size": 6, "uri": "http://updates/payload-2"},
                "destination": "two.txt",
            },
        ]
    });
    let fetcher = MemoryFetcher::new()
        .with("http://updates/manifest.json", version_manifest.to_string().into_bytes())
        .with("http://updates/release-2.json", release2_manifest.to_string().into_bytes())
        .with("http://updates/payload-1", b"first".to_vec())
        .with("http://updates/payload-2", b"second".to_vec());

    let resource_manager = FileResourceManager::new(
        "http://updates",
        root.path().to_path_buf(),
        cache.path().to_path_buf(),
        fetcher,
    );
    let mut patcher = Patcher::new(resource_manager, DigestAlgorithm::Sha256);

    patcher.identify("http://updates/manifest.json").unwrap();
    assert!(patcher.is_update_available().unwrap());
    assert!(!patcher.apply_next_update().unwrap());

    root.child("one.txt").assert(predicate::path::missing());
    root.child("two.txt").assert(predicate::path::missing());
    assert!(patcher.is_update_available().unwrap());
}
