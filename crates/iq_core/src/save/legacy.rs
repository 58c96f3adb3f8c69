use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::Value;

/// Key shipped with every pre-codec client build. Saves written by those
/// builds can only be read with it.
const DEFAULT_LEGACY_KEY: &[u8] = b"iq-save-key-2019";

/// Decrypt-only reader for saves written before the storage codec existed.
///
/// The historical format is a repeating fixed-key XOR keystream over the
/// JSON text, wrapped in standard base64. The key is injected configuration;
/// [`Default`] wires the shipped key. Nothing in the pipeline ever writes
/// this format.
#[derive(Debug, Clone)]
pub struct LegacyDecoder {
    key: Vec<u8>,
}

impl Default for LegacyDecoder {
    fn default() -> Self {
        Self { key: DEFAULT_LEGACY_KEY.to_vec() }
    }
}

impl LegacyDecoder {
    pub fn with_key(key: impl Into<Vec<u8>>) -> Self {
        Self { key: key.into() }
    }

    /// Decode a raw legacy blob into a structured save object.
    ///
    /// Returns `None` unless the decrypted text parses into a JSON object;
    /// merely surviving base64/XOR is not enough, since arbitrary garbage
    /// can do that.
    pub fn decode(&self, raw: &str) -> Option<Value> {
        if self.key.is_empty() {
            return None;
        }

        let bytes = STANDARD.decode(raw.trim()).ok()?;
        let plain = self.apply_keystream(bytes);
        let text = String::from_utf8(plain).ok()?;
        let value: Value = serde_json::from_str(&text).ok()?;

        value.is_object().then_some(value)
    }

    // XOR is its own inverse, so one keystream pass serves both directions.
    fn apply_keystream(&self, mut bytes: Vec<u8>) -> Vec<u8> {
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte ^= self.key[i % self.key.len()];
        }
        bytes
    }

    /// Fabricate a legacy blob. Test fixture support only; production code
    /// never writes the legacy format.
    #[cfg(test)]
    pub(crate) fn encode(&self, value: &Value) -> String {
        let cipher = self.apply_keystream(value.to_string().into_bytes());
        STANDARD.encode(cipher)
    }
}
