//! Error taxonomy for the container tool, in the teacher's daemon-crate
//! style (`thiserror` variants, `anyhow::Result` at the call sites).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SendError {
    #[error("classification level {0} is out of range (0..=4)")]
    BadClassification(u8),

    #[error("user clearance {clearance} does not meet required classification {required}")]
    InsufficientClearance { clearance: u8, required: u8 },

    #[error("not a SENTINAL container: bad magic")]
    BadMagic,

    #[error("unsupported container version")]
    BadVersion,

    #[error("header checksum mismatch — container is corrupt or truncated")]
    HeaderChecksumMismatch,

    #[error("payload checksum mismatch — wrong password or corrupted ciphertext")]
    PayloadChecksumMismatch,

    #[error("ciphertext length is not a multiple of the AES block size")]
    UnalignedCiphertext,

    #[error("container is shorter than the fixed header")]
    Truncated,
}
