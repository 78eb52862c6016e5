//! The fixed 56-byte SENTINAL container header — `spec.md` §6
//! "Encrypted File Container", grounded in
//! `original_source/userland/sentinal_send/src/sentinal_send.c`'s
//! `struct file_header` and `calculate_checksum`. The wire layout is
//! little-endian and hand-serialized rather than cast through a
//! `#[repr(C, packed)]` struct, since this tool only ever runs on one
//! side of the wire and explicit byte ranges are clearer than relying on
//! struct layout matching across builds.

use crate::error::SendError;

pub const MAGIC: &[u8; 8] = b"SENTINAL";
pub const VERSION: [u8; 4] = [1, 0, 0, 0];
pub const SALT_SIZE: usize = 16;
pub const IV_SIZE: usize = 16;
pub const HEADER_SIZE: usize = 64;

pub const FLAG_ENCRYPTED: u8 = 0x01;

pub const CLASSIFICATION_NAMES: [&str; 5] =
    ["UNCLASSIFIED", "CONFIDENTIAL", "SECRET", "TOP SECRET", "PENTAGON"];

#[derive(Debug, Clone)]
pub struct Header {
    pub classification: u8,
    pub flags: u8,
    pub salt: [u8; SALT_SIZE],
    pub iv: [u8; IV_SIZE],
    pub original_length: u64,
    pub payload_checksum: u32,
}

/// The original system's rolling checksum: `c = (c << 1) ^ byte` folded
/// over every byte. Not cryptographic, just an integrity tripwire —
/// `spec.md` pairs it with the password-derived key for tamper evidence,
/// not authentication.
pub fn rolling_checksum(data: &[u8]) -> u32 {
    data.iter().fold(0u32, |acc, &b| (acc << 1) ^ (b as u32))
}

impl Header {
    pub fn new(classification: u8, salt: [u8; SALT_SIZE], iv: [u8; IV_SIZE], original_length: u64, payload_checksum: u32) -> Result<Self, SendError> {
        if classification > 4 {
            return Err(SendError::BadClassification(classification));
        }
        Ok(Self {
            classification,
            flags: FLAG_ENCRYPTED,
            salt,
            iv,
            original_length,
            payload_checksum,
        })
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[0..8].copy_from_slice(MAGIC);
        out[8..12].copy_from_slice(&VERSION);
        out[12] = self.classification;
        out[13] = self.flags;
        out[14..16].copy_from_slice(&[0, 0]); // reserved
        out[16..32].copy_from_slice(&self.salt);
        out[32..48].copy_from_slice(&self.iv);
        out[48..56].copy_from_slice(&self.original_length.to_le_bytes());
        out[56..60].copy_from_slice(&self.payload_checksum.to_le_bytes());
        let header_checksum = rolling_checksum(&out[0..56]);
        out[60..64].copy_from_slice(&header_checksum.to_le_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SendError> {
        if bytes.len() < HEADER_SIZE {
            return Err(SendError::Truncated);
        }
        if &bytes[0..8] != MAGIC {
            return Err(SendError::BadMagic);
        }
        if bytes[8..12] != VERSION {
            return Err(SendError::BadVersion);
        }

        let stored_checksum = u32::from_le_bytes(bytes[60..64].try_into().unwrap());
        if rolling_checksum(&bytes[0..56]) != stored_checksum {
            return Err(SendError::HeaderChecksumMismatch);
        }

        let classification = bytes[12];
        if classification > 4 {
            return Err(SendError::BadClassification(classification));
        }
        let flags = bytes[13];

        let mut salt = [0u8; SALT_SIZE];
        salt.copy_from_slice(&bytes[16..32]);
        let mut iv = [0u8; IV_SIZE];
        iv.copy_from_slice(&bytes[32..48]);
        let original_length = u64::from_le_bytes(bytes[48..56].try_into().unwrap());
        let payload_checksum = u32::from_le_bytes(bytes[56..60].try_into().unwrap());

        Ok(Self { classification, flags, salt, iv, original_length, payload_checksum })
    }

    pub fn classification_name(&self) -> &'static str {
        CLASSIFICATION_NAMES[self.classification as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_bytes() {
        let header = Header::new(4, [7u8; SALT_SIZE], [9u8; IV_SIZE], 1234, 0xdeadbeef).unwrap();
        let bytes = header.to_bytes();
        let parsed = Header::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.classification, 4);
        assert_eq!(parsed.salt, [7u8; SALT_SIZE]);
        assert_eq!(parsed.iv, [9u8; IV_SIZE]);
        assert_eq!(parsed.original_length, 1234);
        assert_eq!(parsed.payload_checksum, 0xdeadbeef);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = Header::new(0, [0; SALT_SIZE], [0; IV_SIZE], 0, 0).unwrap().to_bytes();
        bytes[0] = b'X';
        assert!(matches!(Header::from_bytes(&bytes), Err(SendError::BadMagic)));
    }

    #[test]
    fn rejects_corrupted_header_checksum() {
        let mut bytes = Header::new(2, [1; SALT_SIZE], [2; IV_SIZE], 10, 5).unwrap().to_bytes();
        bytes[12] ^= 0xff; // flip the classification byte after the checksum was computed
        assert!(matches!(Header::from_bytes(&bytes), Err(SendError::HeaderChecksumMismatch)));
    }

    #[test]
    fn rejects_classification_above_pentagon() {
        assert!(matches!(
            Header::new(5, [0; SALT_SIZE], [0; IV_SIZE], 0, 0),
            Err(SendError::BadClassification(5))
        ));
    }
}
