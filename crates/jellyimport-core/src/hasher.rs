use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::{ImportError, Result};

pub const MIB: u64 = 1024 * 1024;

/// Files at or above this size are identified by a head/tail sample only.
pub const PARTIAL_HASH_THRESHOLD: u64 = 2 * MIB;

/// Bytes taken from each end of a large file.
pub const SAMPLE_SIZE: u64 = MIB;

/// Compute the content digest of a file as lowercase SHA-256 hex.
///
/// Files smaller than 2 MiB are hashed in full. Larger files hash the first
/// and the last MiB only, so two large files that agree on both ends share a
/// digest even if their middles differ.
pub fn content_digest(path: &Path) -> Result<String> {
    let size = fs::metadata(path)
        .map_err(|e| ImportError::io(path, e))?
        .len();
    let mut hasher = Sha256::new();

    if size < PARTIAL_HASH_THRESHOLD {
        let bytes = fs::read(path).map_err(|e| ImportError::io(path, e))?;
        hasher.update(&bytes);
    } else {
        let mut file = File::open(path).map_err(|e| ImportError::io(path, e))?;
        let mut buf = vec![0u8; SAMPLE_SIZE as usize];

        file.read_exact(&mut buf).map_err(|e| ImportError::io(path, e))?;
        hasher.update(&buf);

        file.seek(SeekFrom::Start(size - SAMPLE_SIZE))
            .map_err(|e| ImportError::io(path, e))?;
        file.read_exact(&mut buf).map_err(|e| ImportError::io(path, e))?;
        hasher.update(&buf);
    }

    Ok(hex::encode(hasher.finalize()))
}
