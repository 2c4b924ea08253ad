use thiserror::Error;

use crate::cert::KeyVariant;

/// Catch-all error type for ctrpkg
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum CtrError {
    #[error("Malformed header: expected {expected:#x}, got {actual:#x}")]
    MalformedHeader { expected: u32, actual: u32 },
    #[error("Unknown signature type {0:#010x}")]
    UnknownSignatureVariant(u32),
    #[error("Unknown public key type {0:#x}")]
    UnknownKeyVariant(u32),
    #[error("Input truncated at {offset:#x}: needed {needed:#x} bytes, {available:#x} available")]
    TruncatedInput {
        offset: usize,
        needed: usize,
        available: usize,
    },
    #[error("{missing} active content indexes have no matching TMD record")]
    ContentIndexMismatch { missing: usize },
    #[error("Can't export {0:?} public key")]
    UnsupportedCertificateExport(KeyVariant),
    #[error("Invalid length of {what}: {actual} (expected {expected})")]
    InvalidLength {
        what: &'static str,
        actual: usize,
        expected: usize,
    },
    #[error("Ticket content index declares an impossible length {0:#x}")]
    InvalidContentIndexLength(u32),
    #[error("TMD version 1 needs a content info table")]
    MissingContentInfo,
    #[error("Invalid magic bytes")]
    InvalidMagic,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type CtrResult<T> = std::result::Result<T, CtrError>;
