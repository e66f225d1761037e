//! Deploy identity resolution and pipe endpoint naming.
//!
//! A deploy id is the token correlating every event from one orchestration
//! run. It is discovered lazily, from the base directory of the inventory
//! bound to the first play: the external launcher places the inventory
//! under a directory whose name carries `kolla_<deploy_id>`, so the id is
//! whatever follows the first occurrence of that marker.
//!
//! Ad-hoc invocations and runs launched outside the deploy tooling have no
//! marker in their inventory path; they resolve to nothing and the
//! dispatcher stays silent for the whole run.

use std::fmt;
use std::path::{Path, PathBuf};

/// Marker substring preceding the deploy id in the inventory base directory.
pub const DEPLOY_ID_MARKER: &str = "kolla_";

/// File name of the deploy pipe inside the per-run directory.
pub const PIPE_FILE_NAME: &str = ".kolla_pipe";

// ============================================================================
// Deploy Id
// ============================================================================

/// A non-empty token uniquely identifying one provisioning run.
///
/// Resolved at most once per run; an unresolved identity is represented as
/// `None` rather than an empty string, so the type cannot carry the
/// "unresolved" state by accident.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeployId(String);

impl DeployId {
    /// Resolves a deploy id from an inventory base directory.
    ///
    /// Returns `None` when no inventory is bound yet, when the path does
    /// not contain [`DEPLOY_ID_MARKER`], or when nothing follows the
    /// marker. Pure and idempotent; safe to call redundantly.
    pub fn resolve(inventory_basedir: Option<&str>) -> Option<Self> {
        let basedir = inventory_basedir?;
        let start = basedir.find(DEPLOY_ID_MARKER)? + DEPLOY_ID_MARKER.len();
        let id = &basedir[start..];
        if id.is_empty() {
            None
        } else {
            Some(Self(id.to_string()))
        }
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeployId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Channel Endpoint
// ============================================================================

/// Path of the named pipe scoped to one deploy id:
/// `<runtime_dir>/kolla_<deploy_id>/<PIPE_FILE_NAME>`.
///
/// The pipe itself is created by the external consumer before the run
/// starts; this crate only ever opens it for writing. Computed once when
/// the identity resolves and never recomputed mid-run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelEndpoint {
    path: PathBuf,
}

impl ChannelEndpoint {
    /// Computes the endpoint for a deploy id under the given runtime
    /// directory (the system temp dir in production).
    pub fn new(runtime_dir: &Path, deploy_id: &DeployId) -> Self {
        Self {
            path: runtime_dir
                .join(format!("{}{}", DEPLOY_ID_MARKER, deploy_id.as_str()))
                .join(PIPE_FILE_NAME),
        }
    }

    /// Returns the pipe path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

// ============================================================================
// Tests
// ============================================================================
