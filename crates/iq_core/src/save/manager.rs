use serde_json::Value;

use super::codec;
use super::error::SaveError;
use super::format::{json_kind, probe, Envelope, ProbeOutcome, SaveFormat};
use super::legacy::LegacyDecoder;
use super::migration::{run_pending, MigrationRegistry};
use super::version::SaveVersion;
use super::SAVE_VERSION;

/// Result of a successful load: the current-schema payload plus provenance.
#[derive(Debug, Clone)]
pub struct LoadedSave {
    pub payload: Value,
    pub version: SaveVersion,
    /// Which storage format the raw string was in. A `Legacy` hit means the
    /// next save rewrites the slot in codec format.
    pub format: SaveFormat,
    pub migrated: bool,
}

/// The persistence facade: the only surface the rest of the game uses.
///
/// `load` composes the format probe and the migration chain; `save` wraps a
/// payload snapshot into an envelope and encodes it with the codec. The
/// manager holds no mutable state, so calls are independent; the caller is
/// responsible for not issuing a second `load` while one is in flight and
/// for handing `save` an immutable snapshot.
pub struct SaveManager {
    registry: MigrationRegistry,
    legacy: LegacyDecoder,
}

impl Default for SaveManager {
    fn default() -> Self {
        Self { registry: MigrationRegistry::builtin().clone(), legacy: LegacyDecoder::default() }
    }
}

impl SaveManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the built-in migration chain (tests, tooling).
    pub fn with_registry(mut self, registry: MigrationRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Replace the shipped legacy decryption key.
    pub fn with_legacy_decoder(mut self, legacy: LegacyDecoder) -> Self {
        self.legacy = legacy;
        self
    }

    /// Read a raw storage string and return the payload at the current
    /// schema version.
    ///
    /// Never writes anything: a failed load leaves the raw slot untouched,
    /// and a migration failure surfaces the last committed envelope inside
    /// the error so the caller can offer recovery.
    pub fn load(&self, raw: &str) -> Result<LoadedSave, SaveError> {
        let (root, format) = match probe(raw, &self.legacy) {
            ProbeOutcome::Current(value) => (value, SaveFormat::Current),
            ProbeOutcome::Legacy(value) => (value, SaveFormat::Legacy),
            ProbeOutcome::Corrupt => return Err(SaveError::Corrupt),
        };

        let envelope = Envelope::from_value(root);
        let report = run_pending(&self.registry, &envelope);

        if let Some(failure) = report.failure {
            return Err(SaveError::Migration {
                version: failure.version,
                reason: failure.reason,
                committed: Box::new(report.envelope),
            });
        }

        log::debug!(
            "loaded save at {} ({} migrations applied)",
            report.envelope.version,
            report.applied.len()
        );

        Ok(LoadedSave {
            payload: report.envelope.payload,
            version: report.envelope.version,
            format,
            migrated: !report.applied.is_empty(),
        })
    }

    /// Wrap a payload snapshot and encode it for storage.
    ///
    /// Output is always codec format, regardless of what format the payload
    /// was loaded from.
    pub fn save(&self, payload: &Value, version: &SaveVersion) -> Result<String, SaveError> {
        if !payload.is_object() {
            return Err(SaveError::SchemaMismatch {
                context: format!("payload root is {}, expected an object", json_kind(payload)),
            });
        }

        let envelope = Envelope::new(*version, payload.clone());
        let text = serde_json::to_string(&envelope.to_value())?;

        codec::encode(&text)
    }

    /// [`save`](Self::save) at the current schema version.
    pub fn save_current(&self, payload: &Value) -> Result<String, SaveError> {
        self.save(payload, &SAVE_VERSION)
    }
}
