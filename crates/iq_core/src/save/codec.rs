use std::io::{Read, Write};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;

use super::error::SaveError;

/// Upper bound on the inflated size of a decoded save. A corrupt or hostile
/// blob must not be able to balloon memory during decompression.
const MAX_DECODED_BYTES: u64 = 32 * 1024 * 1024;

/// Compress JSON text into a storage-safe compact string.
///
/// Raw deflate, then URL-safe base64 without padding, so the result survives
/// any string-valued storage backend untouched.
pub fn encode(json_text: &str) -> Result<String, SaveError> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(json_text.as_bytes())?;
    let compressed = encoder.finish()?;

    Ok(URL_SAFE_NO_PAD.encode(compressed))
}

/// Inverse of [`encode`]. Returns `None` on unrecognized or corrupted input
/// so the caller can try the legacy decoder next; this path never errors.
pub fn decode(compact: &str) -> Option<String> {
    let compressed = URL_SAFE_NO_PAD.decode(compact.trim()).ok()?;

    let mut inflated = Vec::new();
    let mut decoder = DeflateDecoder::new(&compressed[..]).take(MAX_DECODED_BYTES + 1);
    decoder.read_to_end(&mut inflated).ok()?;

    if inflated.len() as u64 > MAX_DECODED_BYTES {
        log::warn!("decoded save exceeds {} bytes, rejecting", MAX_DECODED_BYTES);
        return None;
    }

    String::from_utf8(inflated).ok()
}
