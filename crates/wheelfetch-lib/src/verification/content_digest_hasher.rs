use digest::Digest;
use sha2::Sha256;
use std::path::Path;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Chunk size used when hashing files and streams.
pub const DIGEST_CHUNK_SIZE: usize = 8 * 1024;

#[derive(Error, Debug)]
pub enum VerificationError {
    #[error("Verification failed: expected {expected}, got {actual}")]
    VerificationFailed { expected: String, actual: String },
}

/// Incremental SHA-256 hasher producing lowercase hex digests.
#[derive(Default, Clone)]
pub struct ContentDigestHasher {
    hasher: Sha256,
}

impl ContentDigestHasher {
    #[inline]
    pub fn new() -> Self {
        Self {
            hasher: Sha256::new(),
        }
    }

    #[inline]
    pub fn update(&mut self, data: impl AsRef<[u8]>) {
        Digest::update(&mut self.hasher, data.as_ref());
    }

    pub fn finalize_hex(self) -> String {
        hex::encode(self.hasher.finalize())
    }

    /// Finalizes the hash and compares it against `expected`, returning the
    /// computed digest on success.
    pub fn verify(self, expected: &str) -> Result<String, VerificationError> {
        let actual = self.finalize_hex();
        if digests_match(&actual, expected) {
            Ok(actual)
        } else {
            Err(VerificationError::VerificationFailed {
                expected: expected.to_ascii_lowercase(),
                actual,
            })
        }
    }
}

/// Case-insensitive digest comparison.
pub fn digests_match(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// Hashes everything `reader` yields, reading at most [`DIGEST_CHUNK_SIZE`]
/// bytes at a time.
pub async fn digest_reader<R>(mut reader: R) -> std::io::Result<String>
where
    R: AsyncRead + Unpin,
{
    let mut hasher = ContentDigestHasher::new();
    let mut buffer = vec![0u8; DIGEST_CHUNK_SIZE];

    loop {
        let bytes_read = reader.read(&mut buffer).await?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hasher.finalize_hex())
}

pub async fn digest_file(path: impl AsRef<Path>) -> std::io::Result<String> {
    let file = tokio::fs::File::open(path.as_ref()).await?;
    digest_reader(file).await
}
