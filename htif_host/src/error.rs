//! Error types for argument classification, program loading and target access.

use std::{io, path::PathBuf};

/// Error type reported by a [`Target`](crate::Target) transport.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TargetError {
    /// The access falls outside the memory the target exposes.
    #[error("access of {len} bytes at {addr:#x} is outside target memory")]
    OutOfRange { addr: u64, len: usize },
    /// A single transfer exceeded the transport's maximum chunk size.
    #[error("chunk of {len} bytes exceeds the maximum transfer size of {max} bytes")]
    ChunkTooLarge { len: usize, max: usize },
    /// The transport itself failed.
    #[error("target transport failed: {0}")]
    Transport(String),
}

/// Error type for the front-end server.
#[derive(Debug, thiserror::Error)]
pub enum HtifError {
    /// The user asked for usage text. Not a failure, but startup stops here.
    #[error("help requested")]
    HelpRequested,
    /// Malformed or contradictory command-line usage.
    #[error("{0}")]
    InvalidArgument(String),
    /// Classification finished without a target binary.
    #[error(
        "No binary specified (Did you forget it? Did you forget '+permissive-off' if running with +permissive?)"
    )]
    NoBinary,
    /// The target binary could not be resolved.
    #[error(
        "could not open {path} (did you misspell it? If VCS, did you forget +permissive/+permissive-off?)"
    )]
    FileNotFound { path: String },
    #[error("failed to read ELF file '{}'", .path.display())]
    ReadElf {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse ELF file '{}'", .path.display())]
    ParseElf {
        path: PathBuf,
        #[source]
        source: goblin::error::Error,
    },
    /// A loadable segment points outside the file it came from.
    #[error("segment at file offset {offset:#x} ({len} bytes) exceeds ELF file '{}'", .path.display())]
    BadSegment {
        path: PathBuf,
        offset: u64,
        len: u64,
    },
    #[error("failed to write signature file '{}'", .path.display())]
    Signature {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// `begin_signature`..`end_signature` is larger than a signature may be.
    #[error(
        "signature region {begin:#x}..{end:#x} is larger than {max} bytes, not writing '{}'",
        .path.display()
    )]
    SignatureTooLarge {
        path: PathBuf,
        begin: u64,
        end: u64,
        max: usize,
    },
    #[error(transparent)]
    Target(#[from] TargetError),
}

impl HtifError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        HtifError::InvalidArgument(msg.into())
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = HtifError> = std::result::Result<T, E>;
