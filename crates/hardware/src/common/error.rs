//! Error taxonomy for composition and tool invocation.
//!
//! Every failure aborts the invocation; nothing is recovered locally. The
//! variants fall into three families:
//! 1. **Board resources:** a pad is absent on the selected revision or was
//!    already claimed by another module.
//! 2. **Configuration:** mutually exclusive features, overlapping bus
//!    attachments, unreachable clock targets or malformed input.
//! 3. **External tools:** the toolchain or programmer could not be started or
//!    exited non-zero.

use std::fmt;
use std::path::PathBuf;

use crate::config::BoardRevision;

/// Why a `(resource, index)` pair could not be handed out by the platform.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Unavailability {
    /// The selected board revision has no such resource.
    Absent,
    /// The resource exists but another module already owns it.
    Claimed {
        /// Name of the module holding the pads.
        owner: String,
    },
}

impl fmt::Display for Unavailability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => write!(f, "not present"),
            Self::Claimed { owner } => write!(f, "already claimed by `{owner}`"),
        }
    }
}

/// Errors raised while composing a SoC or driving the external toolchain.
#[derive(Debug, thiserror::Error)]
pub enum SocError {
    /// A board resource could not be obtained from the platform.
    #[error("resource `{resource}:{index}` unavailable on revision {revision}: {reason}")]
    ResourceUnavailable {
        /// Resource name in the pinout catalog (e.g. `clk25`).
        resource: String,
        /// Resource index.
        index: u32,
        /// Revision the platform was built for.
        revision: BoardRevision,
        /// Absent or already claimed.
        reason: Unavailability,
    },

    /// Two features (or two attachments) claim the same exclusive resource.
    #[error("configuration conflict between `{first}` and `{second}`: {detail}")]
    ConfigurationConflict {
        /// The earlier claimant in declaration order.
        first: String,
        /// The later claimant, which is rejected.
        second: String,
        /// What the two collide on.
        detail: String,
    },

    /// An external program failed to start or exited unsuccessfully.
    #[error("external tool `{tool}` failed: {detail}")]
    ExternalToolFailure {
        /// Program name as invoked.
        tool: String,
        /// Exit status or spawn error.
        detail: String,
    },

    /// The PLL cannot synthesize a requested output frequency.
    #[error("no PLL configuration reaches {target_hz} Hz for clock domain `{domain}`")]
    UnreachableFrequency {
        /// Domain whose output could not be placed.
        domain: String,
        /// Requested frequency.
        target_hz: u64,
    },

    /// A configuration value could not be interpreted.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Filesystem failure while writing or reading build artifacts.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// The path being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// JSON (de)serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SocError {
    /// Builds an [`SocError::Io`] for `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Process exit code for this error.
    ///
    /// `2` configuration, `3` board/clocking resources, `4` external tools,
    /// `1` everything else.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::ConfigurationConflict { .. } | Self::InvalidConfig(_) => 2,
            Self::ResourceUnavailable { .. } | Self::UnreachableFrequency { .. } => 3,
            Self::ExternalToolFailure { .. } => 4,
            Self::Io { .. } | Self::Json(_) => 1,
        }
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, SocError>;
