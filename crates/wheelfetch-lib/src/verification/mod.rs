pub mod content_digest_hasher;

pub use content_digest_hasher::{
    ContentDigestHasher, DIGEST_CHUNK_SIZE, VerificationError, digest_file, digest_reader,
    digests_match,
};
