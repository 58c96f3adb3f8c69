use serde_json::{Map, Value};

use super::codec;
use super::legacy::LegacyDecoder;
use super::version::SaveVersion;

/// Storage format a save was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveFormat {
    /// Codec-compressed text, the only format ever written.
    Current,
    /// Deprecated encrypted blob; re-encoded with the codec on next save.
    Legacy,
}

/// Persisted wrapper pairing a schema version with a payload.
///
/// Invariant: `version` always reflects the schema the payload currently
/// conforms to. On the wire the envelope is flattened to
/// `{ "version": ..., ...payload sections }`, with `options.version` inside
/// the payload as the authoritative copy.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub version: SaveVersion,
    pub payload: Value,
}

impl Envelope {
    pub fn new(version: SaveVersion, payload: Value) -> Self {
        Self { version, payload }
    }

    /// Reconstruct an envelope from a parsed save root.
    ///
    /// `options.version` wins over the top-level `version` key; a save with
    /// neither is treated as predating versioning entirely.
    pub fn from_value(root: Value) -> Self {
        let mut root = match root {
            Value::Object(map) => map,
            other => return Self::new(SaveVersion::ZERO, other),
        };

        let version = declared_version(&root).unwrap_or_else(|| {
            log::warn!("save carries no readable version, treating as {}", SaveVersion::ZERO);
            SaveVersion::ZERO
        });

        // The top-level version key is envelope metadata, not payload
        root.remove("version");

        Self::new(version, Value::Object(root))
    }

    /// Flatten back to the wire shape, stamping both version copies.
    pub fn to_value(&self) -> Value {
        let mut root = match self.payload.clone() {
            Value::Object(map) => map,
            other => return other,
        };

        root.insert("version".to_string(), Value::String(self.version.to_string()));

        let mut value = Value::Object(root);
        stamp_version(&mut value, &self.version);
        value
    }
}

fn declared_version(root: &Map<String, Value>) -> Option<SaveVersion> {
    let from_options = root.get("options").and_then(|o| o.get("version")).and_then(Value::as_str);
    let from_root = root.get("version").and_then(Value::as_str);

    for raw in [from_options, from_root].into_iter().flatten() {
        match raw.parse() {
            Ok(version) => return Some(version),
            Err(err) => log::warn!("ignoring unreadable save version: {}", err),
        }
    }
    None
}

/// Write `version` into the payload's `options.version`, the field the
/// migration chain treats as authoritative.
pub fn stamp_version(payload: &mut Value, version: &SaveVersion) {
    let Some(root) = payload.as_object_mut() else {
        return;
    };

    let options = root.entry("options".to_string()).or_insert_with(|| Value::Object(Map::new()));
    if !options.is_object() {
        *options = Value::Object(Map::new());
    }
    if let Some(options) = options.as_object_mut() {
        options.insert("version".to_string(), Value::String(version.to_string()));
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Result of sniffing a raw storage string, in probe order.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    /// Codec format decoded and parsed into a structured object.
    Current(Value),
    /// Only the legacy decoder could read it; must be rewritten on save.
    Legacy(Value),
    /// Neither probe produced a structured object.
    Corrupt,
}

/// Sniff a raw storage string, codec format first.
///
/// Each stage requires the decoded text to parse into a JSON object, not
/// merely to survive the transform: a garbage string can spuriously decode
/// under either one.
pub fn probe(raw: &str, legacy: &LegacyDecoder) -> ProbeOutcome {
    if let Some(text) = codec::decode(raw) {
        if let Ok(value) = serde_json::from_str::<Value>(&text) {
            if value.is_object() {
                return ProbeOutcome::Current(value);
            }
        }
        log::debug!("codec output was not a structured save, trying legacy decoder");
    }

    if let Some(value) = legacy.decode(raw) {
        log::warn!("save is in the deprecated encrypted format and will be re-encoded on next save");
        return ProbeOutcome::Legacy(value);
    }

    ProbeOutcome::Corrupt
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_options_version_wins_over_top_level() {
        let envelope = Envelope::from_value(json!({
            "version": "0.7.3",
            "options": {"version": "0.7.9"},
            "hero": {"level": 3}
        }));

        assert_eq!(envelope.version, SaveVersion::new(0, 7, 9));
        assert_eq!(envelope.payload["hero"]["level"], 3);
        // top-level copy is stripped from the payload
        assert!(envelope.payload.get("version").is_none());
    }

    #[test]
    fn test_top_level_version_is_the_fallback() {
        let envelope = Envelope::from_value(json!({"version": "0.7.3", "hero": {}}));
        assert_eq!(envelope.version, SaveVersion::new(0, 7, 3));
    }

    #[test]
    fn test_versionless_save_is_treated_as_zero() {
        let envelope = Envelope::from_value(json!({"hero": {"gold": 1}}));
        assert_eq!(envelope.version, SaveVersion::ZERO);

        let envelope = Envelope::from_value(json!({"options": {"version": "garbled"}}));
        assert_eq!(envelope.version, SaveVersion::ZERO);
    }

    #[test]
    fn test_to_value_stamps_both_version_copies() {
        let envelope = Envelope::new(SaveVersion::new(0, 7, 10), json!({"hero": {}}));
        let root = envelope.to_value();

        assert_eq!(root["version"], "0.7.10");
        assert_eq!(root["options"]["version"], "0.7.10");
    }

    #[test]
    fn test_to_value_overwrites_stale_option_version() {
        let envelope = Envelope::new(
            SaveVersion::new(0, 7, 10),
            json!({"options": {"version": "0.7.3", "soundEnabled": false}}),
        );
        let root = envelope.to_value();

        assert_eq!(root["options"]["version"], "0.7.10");
        assert_eq!(root["options"]["soundEnabled"], false);
    }

    #[test]
    fn test_stamp_version_repairs_non_object_options() {
        let mut payload = json!({"options": "broken"});
        stamp_version(&mut payload, &SaveVersion::new(0, 7, 9));
        assert_eq!(payload["options"]["version"], "0.7.9");
    }

    #[test]
    fn test_probe_prefers_codec_format() {
        let decoder = LegacyDecoder::default();
        let raw = codec::encode(&json!({"options": {"version": "0.7.9"}}).to_string()).unwrap();

        match probe(&raw, &decoder) {
            ProbeOutcome::Current(value) => {
                assert_eq!(value["options"]["version"], "0.7.9");
            }
            other => panic!("expected Current, got {:?}", other),
        }
    }

    #[test]
    fn test_probe_falls_back_to_legacy() {
        let decoder = LegacyDecoder::default();
        let raw = decoder.encode(&json!({"hero": {"level": 2}}));

        match probe(&raw, &decoder) {
            ProbeOutcome::Legacy(value) => assert_eq!(value["hero"]["level"], 2),
            other => panic!("expected Legacy, got {:?}", other),
        }
    }

    #[test]
    fn test_probe_requires_structured_output() {
        let decoder = LegacyDecoder::default();

        // Decodes cleanly under the codec but is not an object
        let unstructured = codec::encode("[1,2,3]").unwrap();
        assert_eq!(probe(&unstructured, &decoder), ProbeOutcome::Corrupt);

        assert_eq!(probe("*** corrupted slot ***", &decoder), ProbeOutcome::Corrupt);
        assert_eq!(probe("", &decoder), ProbeOutcome::Corrupt);
    }
}
