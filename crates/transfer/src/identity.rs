use sha1::{Digest, Sha1};

/// Number of digest bytes kept in a deterministic upload id.
const ID_DIGEST_BYTES: usize = 8;

/// Derives the upload id for a transfer of `storage_path`.
///
/// With a known, non-zero `content_length` the id is the first 8 bytes of
/// SHA-1 over `"<storage_path>:<content_length>"`, hex-encoded. Re-running the
/// same transfer yields the same id, so the receiver can hand back the bytes
/// it already stored. Without a length a random id is used and the upload
/// cannot resume.
pub fn derive_upload_id(storage_path: &str, content_length: Option<u64>) -> String {
    match content_length {
        Some(len) if len > 0 => {
            let digest = Sha1::digest(format!("{storage_path}:{len}").as_bytes());
            hex::encode(&digest[..ID_DIGEST_BYTES])
        }
        _ => uuid::Uuid::new_v4().simple().to_string(),
    }
}
