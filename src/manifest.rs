//! Manifest Parser (C4): strict parsing of the version manifest and
//! per-release manifests described in §6.
//!
//! The wire format in §6 is given in an attribute-prefixed schema notation
//! (`@checksum`, `@uri`, ...). No XML crate appears anywhere in the example
//! pack; every structured document in it — `ocfl`'s `inventory.json`,
//! `PORTALSURFER-sempal`'s `UpdateManifest`, `Elektrobit-rupdate`'s bundle
//! manifest — is JSON via `serde_json`. This parser therefore renders the
//! same schema shape as plain JSON object fields (see `DESIGN.md`). It
//! walks a permissive `serde_json::Value` by hand instead of relying on a
//! blind `#[derive(Deserialize)]`, so malformed or missing fields can name
//! the offending node, per §4.4 and `ocfl::error`'s precise-message
//! convention.

use std::convert::TryFrom;

use serde_json::Value;

use crate::digest::HexDigest;
use crate::error::{PatchlineError, Result};
use crate::operation::Operation;
use crate::types::{RelPath, ReleaseDescriptor, VersionManifest};

const VERSION_MANIFEST_LABEL: &str = "version";

/// Parses the version manifest document fetched from the configured URL.
pub fn parse_version_manifest(bytes: &[u8]) -> Result<VersionManifest> {
    let root: Value = serde_json::from_slice(bytes)
        .map_err(|e| PatchlineError::InvalidManifest(format!("malformed JSON: {e}")))?;

    let identity_node = require_array(&root, VERSION_MANIFEST_LABEL, "root", "identity")?;
    let mut identity = Vec::with_capacity(identity_node.len());
    for (i, entry) in identity_node.iter().enumerate() {
        let path = entry.as_str().ok_or_else(|| {
            PatchlineError::missing_attribute(VERSION_MANIFEST_LABEL, format!("identity[{i}]"), "file")
        })?;
        identity.push(RelPath::try_from(path)?);
    }

    let releases_node = require_array(&root, VERSION_MANIFEST_LABEL, "root", "release")?;
    let mut releases = Vec::with_capacity(releases_node.len());
    for (i, entry) in releases_node.iter().enumerate() {
        let node_name = format!("release[{i}]");
        let initial = entry
            .get("initial")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let checksum_str = require_str(entry, VERSION_MANIFEST_LABEL, &node_name, "checksum")?;
        let uri = entry
            .get("uri")
            .map(|v| {
                v.as_str().map(str::to_string).ok_or_else(|| {
                    PatchlineError::InvalidManifest(format!("{node_name}.uri must be a string"))
                })
            })
            .transpose()?;
        if uri.is_none() && !initial {
            return Err(PatchlineError::missing_attribute(
                VERSION_MANIFEST_LABEL,
                node_name,
                "uri",
            ));
        }
        let tag = entry
            .get("tag")
            .and_then(Value::as_str)
            .map(str::to_string);

        releases.push(ReleaseDescriptor {
            checksum: HexDigest::from(checksum_str),
            uri,
            tag,
            initial,
        });
    }

    let manifest = VersionManifest { identity, releases };
    manifest.validate()?;
    Ok(manifest)
}

/// Parses a single release manifest, fetched from `release.uri`, into the
/// ordered [`Operation`] list that transforms the install tree.
pub fn parse_release_manifest(bytes: &[u8], release_label: &str) -> Result<Vec<Operation>> {
    let root: Value = serde_json::from_slice(bytes)
        .map_err(|e| PatchlineError::InvalidManifest(format!("malformed JSON: {e}")))?;

    let ops_node = require_array(&root, release_label, "root", "operations")?;
    let mut operations = Vec::with_capacity(ops_node.len());
    for (i, entry) in ops_node.iter().enumerate() {
        let node_name = format!("operations[{i}]");
        let op_type = require_str(entry, release_label, &node_name, "type")?;
        let operation = match op_type {
            "create" => parse_create(entry, release_label, &node_name)?,
            "update" => parse_update(entry, release_label, &node_name)?,
            "rename" => parse_rename(entry, release_label, &node_name)?,
            "delete" => parse_delete(entry, release_label, &node_name)?,
            other => {
                return Err(PatchlineError::InvalidManifest(format!(
                    "{release_label} manifest {node_name} has unknown type '{other}'"
                )))
            }
        };
        operations.push(operation);
    }

    Ok(operations)
}

fn parse_create(entry: &Value, release: &str, node: &str) -> Result<Operation> {
    let source = require_object(entry, release, node, "source")?;
    let checksum = require_str(source, release, &format!("{node}.source"), "checksum")?;
    let size = require_u64(source, release, &format!("{node}.source"), "size")?;
    let uri = require_str(source, release, &format!("{node}.source"), "uri")?;
    let destination = require_str(entry, release, node, "destination")?;
    Ok(Operation::Create {
        src_checksum: HexDigest::from(checksum),
        src_size: size,
        src_uri: uri.to_string(),
        dst_path: RelPath::try_from(destination)?,
    })
}

fn parse_update(entry: &Value, release: &str, node: &str) -> Result<Operation> {
    let source = require_object(entry, release, node, "source")?;
    let post_checksum = require_str(source, release, &format!("{node}.source"), "checksum")?;
    let size = require_u64(source, release, &format!("{node}.source"), "size")?;
    let uri = require_str(source, release, &format!("{node}.source"), "uri")?;

    let destination = require_object(entry, release, node, "destination")?;
    let pre_checksum = require_str(destination, release, &format!("{node}.destination"), "checksum")?;
    let path = require_str(destination, release, &format!("{node}.destination"), "path")?;

    Ok(Operation::Update {
        dst_path: RelPath::try_from(path)?,
        pre_checksum: HexDigest::from(pre_checksum),
        post_checksum: HexDigest::from(post_checksum),
        src_uri: uri.to_string(),
        size,
    })
}

fn parse_rename(entry: &Value, release: &str, node: &str) -> Result<Operation> {
    let from = require_str(entry, release, node, "source")?;
    let to = require_str(entry, release, node, "destination")?;
    Ok(Operation::Rename {
        from: RelPath::try_from(from)?,
        to: RelPath::try_from(to)?,
    })
}

fn parse_delete(entry: &Value, release: &str, node: &str) -> Result<Operation> {
    let source = require_object(entry, release, node, "source")?;
    let checksum = require_str(source, release, &format!("{node}.source"), "checksum")?;
    let path = require_str(source, release, &format!("{node}.source"), "path")?;
    Ok(Operation::Delete {
        path: RelPath::try_from(path)?,
        checksum: HexDigest::from(checksum),
    })
}

fn require_array<'a>(node: &'a Value, release: &str, parent: &str, child: &str) -> Result<&'a Vec<Value>> {
    node.get(child)
        .and_then(Value::as_array)
        .ok_or_else(|| PatchlineError::missing_node(release, parent, child))
}

fn require_object<'a>(node: &'a Value, release: &str, parent: &str, child: &str) -> Result<&'a Value> {
    match node.get(child) {
        Some(v) if v.is_object() => Ok(v),
        Some(_) => Err(PatchlineError::InvalidManifest(format!(
            "{release} manifest {parent}.{child} must be an object"
        ))),
        None => Err(PatchlineError::missing_node(release, parent, child)),
    }
}

fn require_str<'a>(node: &'a Value, release: &str, parent: &str, attr: &str) -> Result<&'a str> {
    node.get(attr)
        .and_then(Value::as_str)
        .ok_or_else(|| PatchlineError::missing_attribute(release, parent, attr))
}

fn require_u64(node: &Value, release: &str, parent: &str, attr: &str) -> Result<u64> {
    node.get(attr)
        .and_then(Value::as_u64)
        .ok_or_else(|| PatchlineError::missing_attribute(release, parent, attr))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_well_formed_version_manifest() {
        let doc = serde_json::json!({
            "identity": ["a.txt", "b.txt"],
            "release": [
                {"checksum": "r1", "initial": true},
                {"checksum": "r2", "uri": "releases/r2.json", "tag": "2024.1"},
            ],
        });
        let manifest = parse_version_manifest(doc.to_string().as_bytes()).unwrap();
        assert_eq!(manifest.identity.len(), 2);
        assert_eq!(manifest.releases.len(), 2);
        assert!(manifest.releases[0].initial);
        assert_eq!(manifest.releases[1].tag.as_deref(), Some("2024.1"));
    }

    #[test]
    fn rejects_missing_identity_node() {
        let doc = serde_json::json!({ "release": [{"checksum": "r1", "initial": true}] });
        let err = parse_version_manifest(doc.to_string().as_bytes()).unwrap_err();
        assert!(matches!(err, PatchlineError::MissingNode { .. }));
    }

    #[test]
    fn rejects_non_initial_release_missing_uri() {
        let doc = serde_json::json!({
            "identity": ["a.txt"],
            "release": [
                {"checksum": "r1", "initial": true},
                {"checksum": "r2"},
            ],
        });
        let err = parse_version_manifest(doc.to_string().as_bytes()).unwrap_err();
        assert!(matches!(err, PatchlineError::MissingAttribute { .. }));
    }

    #[test]
    fn rejects_more_than_one_initial_release() {
        let doc = serde_json::json!({
            "identity": ["a.txt"],
            "release": [
                {"checksum": "r1", "initial": true},
                {"checksum": "r2", "initial": true},
            ],
        });
        assert!(parse_version_manifest(doc.to_string().as_bytes()).is_err());
    }

    #[test]
    fn parses_a_release_manifest_with_every_operation_type() {
        let doc = serde_json::json!({
            "operations": [
                {"type": "create", "source": {"checksum": "c1", "size": 3, "uri": "p/a"}, "destination": "a.txt"},
                {"type": "update", "source": {"checksum": "c2", "size": 4, "uri": "p/b"}, "destination": {"checksum": "c1pre", "path": "b.txt"}},
                {"type": "rename", "source": "old.txt", "destination": "new.txt"},
                {"type": "delete", "source": {"checksum": "c3", "path": "c.txt"}},
            ]
        });
        let ops = parse_release_manifest(doc.to_string().as_bytes(), "R2").unwrap();
        assert_eq!(ops.len(), 4);
        assert!(matches!(ops[0], Operation::Create { .. }));
        assert!(matches!(ops[1], Operation::Update { .. }));
        assert!(matches!(ops[2], Operation::Rename { .. }));
        assert!(matches!(ops[3], Operation::Delete { .. }));
    }

    #[test]
    fn rejects_path_traversal_in_destination() {
        let doc = serde_json::json!({
            "operations": [
                {"type": "create", "source": {"checksum": "c1", "size": 3, "uri": "p/a"}, "destination": "../etc/passwd"},
            ]
        });
        assert!(parse_release_manifest(doc.to_string().as_bytes(), "R2").is_err());
    }

    #[test]
    fn reports_missing_attribute_with_node_path() {
        let doc = serde_json::json!({
            "operations": [
                {"type": "create", "source": {"size": 3, "uri": "p/a"}, "destination": "a.txt"},
            ]
        });
        let err = parse_release_manifest(doc.to_string().as_bytes(), "R2").unwrap_err();
        match err {
            PatchlineError::MissingAttribute { node, attr, .. } => {
                assert_eq!(node, "operations[0].source");
                assert_eq!(attr, "checksum");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
