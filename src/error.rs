//! Error taxonomy shared across every component of the engine.

use std::fmt;
use std::io;

use thiserror::Error;

pub type Result<T, E = PatchlineError> = core::result::Result<T, E>;

/// The seven tagged, exhaustive error kinds the engine can surface to a
/// caller. Component-local recoverable conditions are not represented here;
/// they travel as booleans or [`crate::operation::StageResult`] instead and
/// only escalate to one of these variants when they invalidate the Patcher
/// as a whole.
#[derive(Error)]
pub enum PatchlineError {
    #[error("Could not fetch resource {uri}: {message}")]
    InvalidResource { uri: String, message: String },

    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    #[error("Missing node in {release} manifest: {parent} has no {child}")]
    MissingNode {
        release: String,
        parent: String,
        child: String,
    },

    #[error("Missing attribute in {release} manifest: {node}.{attr}")]
    MissingAttribute {
        release: String,
        node: String,
        attr: String,
    },

    #[error("Integrity violation: {0}")]
    IntegrityViolation(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl PatchlineError {
    pub fn missing_node(release: impl Into<String>, parent: impl Into<String>, child: impl Into<String>) -> Self {
        Self::MissingNode {
            release: release.into(),
            parent: parent.into(),
            child: child.into(),
        }
    }

    pub fn missing_attribute(release: impl Into<String>, node: impl Into<String>, attr: impl Into<String>) -> Self {
        Self::MissingAttribute {
            release: release.into(),
            node: node.into(),
            attr: attr.into(),
        }
    }

    pub fn invalid_resource(uri: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidResource {
            uri: uri.into(),
            message: message.into(),
        }
    }
}

// thiserror's derive(Debug) would print the struct-like variant layout;
// the teacher delegates Debug to Display so error logs stay single-line.
impl fmt::Debug for PatchlineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl From<io::Error> for PatchlineError {
    fn from(error: io::Error) -> Self {
        Self::InternalError(error.to_string())
    }
}

impl From<serde_json::Error> for PatchlineError {
    fn from(error: serde_json::Error) -> Self {
        Self::InvalidManifest(error.to_string())
    }
}

impl From<toml::de::Error> for PatchlineError {
    fn from(error: toml::de::Error) -> Self {
        Self::InvalidState(format!("invalid configuration: {error}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_delegates_to_display() {
        let err = PatchlineError::InvalidState("apply before identify".to_string());
        assert_eq!(format!("{:?}", err), format!("{}", err));
    }

    #[test]
    fn missing_node_constructor() {
        let err = PatchlineError::missing_node("R2", "release", "create");
        assert_eq!(
            err.to_string(),
            "Missing node in R2 manifest: release has no create"
        );
    }
}
