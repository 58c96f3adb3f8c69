use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::{json, Map, Value};

use super::format::{json_kind, stamp_version, Envelope};
use super::version::SaveVersion;

/// Signature every registered migration satisfies.
///
/// A migration consumes a payload and produces the payload upgraded to its
/// target version, or an error description. Migrations are pure and total:
/// missing or partial substructures get defaults, never a panic.
pub type MigrationFn = fn(Value) -> Result<Value, String>;

/// Upper bound on collection entries a single migration will rewrite.
/// Migrations own their scaling limits; there is no external timeout.
pub const MAX_MIGRATED_ITEMS: usize = 10_000;

/// A migration that returned an error, identified by its target version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationFailure {
    pub version: SaveVersion,
    pub reason: String,
}

/// Outcome of running the pending chain against one envelope.
#[derive(Debug, Clone)]
pub struct MigrationReport {
    /// The envelope at the last successfully committed version.
    pub envelope: Envelope,
    /// Targets applied, in order.
    pub applied: Vec<SaveVersion>,
    /// Set when the chain stopped early.
    pub failure: Option<MigrationFailure>,
}

impl MigrationReport {
    pub fn migrated(&self) -> bool {
        !self.applied.is_empty()
    }
}

/// Ordered catalogue of version-keyed payload transforms.
///
/// Entries are kept sorted ascending by target version so the pending suffix
/// for any starting version is a contiguous slice. Released migrations are
/// never replaced or removed; old saves may still need every one of them.
#[derive(Clone, Default)]
pub struct MigrationRegistry {
    entries: Vec<(SaveVersion, MigrationFn)>,
}

impl MigrationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The product chain, shared process-wide.
    pub fn builtin() -> &'static MigrationRegistry {
        static BUILTIN: Lazy<MigrationRegistry> = Lazy::new(|| {
            let mut registry = MigrationRegistry::new();
            registry.register(SaveVersion::new(0, 6, 0), migrate_hero_section_split);
            registry.register(SaveVersion::new(0, 7, 0), migrate_statistics_intro);
            registry.register(SaveVersion::new(0, 7, 3), migrate_audio_options_rename);
            registry.register(SaveVersion::new(0, 7, 9), migrate_prestige_intro);
            registry.register(SaveVersion::new(0, 7, 10), migrate_rarity_tier_rename);
            registry
        });
        &BUILTIN
    }

    /// Insert a migration at its sorted position. A released target is never
    /// replaced, so a duplicate registration is dropped.
    pub fn register(&mut self, target: SaveVersion, migration: MigrationFn) {
        match self.entries.binary_search_by(|(version, _)| version.cmp(&target)) {
            Ok(_) => log::error!("ignoring duplicate migration registration for {}", target),
            Err(position) => self.entries.insert(position, (target, migration)),
        }
    }

    /// Strictly ascending migrations with target version > `from`.
    pub fn pending(&self, from: &SaveVersion) -> &[(SaveVersion, MigrationFn)] {
        let start = self.entries.partition_point(|(version, _)| version <= from);
        &self.entries[start..]
    }

    /// Highest registered target version, if any.
    pub fn latest(&self) -> Option<SaveVersion> {
        self.entries.last().map(|(version, _)| *version)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Apply every migration newer than the envelope's version, in order.
///
/// The caller's payload is structurally cloned up front, and each migration
/// runs on its own clone of the current state: a migration that errors has
/// no partial effect, and everything committed before it survives. Running
/// against an already-current envelope is a no-op.
pub fn run_pending(registry: &MigrationRegistry, envelope: &Envelope) -> MigrationReport {
    let mut version = envelope.version;
    let mut payload = envelope.payload.clone();
    let mut applied = Vec::new();
    let mut failure = None;

    for (target, migrate) in registry.pending(&envelope.version) {
        match migrate(payload.clone()) {
            Ok(mut upgraded) => {
                stamp_version(&mut upgraded, target);
                payload = upgraded;
                log::info!("migrated save from {} to {}", version, target);
                version = *target;
                applied.push(*target);
            }
            Err(reason) => {
                log::error!("migration to {} failed: {}", target, reason);
                failure = Some(MigrationFailure { version: *target, reason });
                break;
            }
        }
    }

    MigrationReport { envelope: Envelope::new(version, payload), applied, failure }
}

// --- Built-in chain ---------------------------------------------------------

fn require_object(payload: Value) -> Result<Map<String, Value>, String> {
    match payload {
        Value::Object(map) => Ok(map),
        other => Err(format!("payload root is {}, expected an object", json_kind(&other))),
    }
}

// Sections damaged into non-objects are rebuilt empty rather than failed on;
// their fields then get the same defaults as a genuinely missing section.
fn ensure_section<'a>(root: &'a mut Map<String, Value>, name: &str) -> &'a mut Map<String, Value> {
    if !root.get(name).map_or(false, Value::is_object) {
        root.insert(name.to_string(), Value::Object(Map::new()));
    }
    match root.get_mut(name) {
        Some(Value::Object(section)) => section,
        _ => unreachable!("section was just made an object"),
    }
}

/// 0.6.0 moved hero progress out of the save root into a `hero` section.
///
/// Pre-0.6.0 saves kept `gold`, `level` and `experience` as top-level fields
/// next to the section maps.
fn migrate_hero_section_split(payload: Value) -> Result<Value, String> {
    let mut root = require_object(payload)?;

    let gold = root.remove("gold");
    let level = root.remove("level");
    let experience = root.remove("experience");

    let hero = ensure_section(&mut root, "hero");
    let moves = [
        ("gold", gold, json!(0)),
        ("level", level, json!(1)),
        ("experience", experience, json!(0)),
    ];
    for (field, moved, default) in moves {
        if !hero.contains_key(field) {
            let value = moved.filter(|v| v.is_number()).unwrap_or(default);
            hero.insert(field.to_string(), value);
        }
    }

    Ok(Value::Object(root))
}

/// 0.7.0 introduced lifetime statistics.
fn migrate_statistics_intro(payload: Value) -> Result<Value, String> {
    let mut root = require_object(payload)?;

    // Seed the high-water mark from current hero progress
    let highest_level = root
        .get("hero")
        .and_then(|hero| hero.get("level"))
        .filter(|v| v.is_number())
        .cloned()
        .unwrap_or(json!(1));

    let statistics = ensure_section(&mut root, "statistics");
    let defaults = [
        ("goldEarned", json!(0)),
        ("monstersSlain", json!(0)),
        ("deaths", json!(0)),
        ("highestLevel", highest_level),
    ];
    for (field, default) in defaults {
        if !statistics.contains_key(field) {
            statistics.insert(field.to_string(), default);
        }
    }

    Ok(Value::Object(root))
}

/// 0.7.3 audio rework renamed the option flags.
fn migrate_audio_options_rename(payload: Value) -> Result<Value, String> {
    let mut root = require_object(payload)?;

    let options = ensure_section(&mut root, "options");
    for (old, new) in [("sound", "soundEnabled"), ("music", "musicEnabled")] {
        let previous = options.remove(old);
        if !options.contains_key(new) {
            let value = previous.filter(|v| v.is_boolean()).unwrap_or(json!(true));
            options.insert(new.to_string(), value);
        }
    }

    Ok(Value::Object(root))
}

/// 0.7.9 shipped prestige; beta builds stored the points at the save root.
fn migrate_prestige_intro(payload: Value) -> Result<Value, String> {
    let mut root = require_object(payload)?;

    let beta_points = root.remove("prestigePoints");

    let prestige = ensure_section(&mut root, "prestige");
    if !prestige.contains_key("points") {
        let points = beta_points.filter(|v| v.is_number()).unwrap_or(json!(0));
        prestige.insert("points".to_string(), points);
    }
    if !prestige.contains_key("totalResets") {
        prestige.insert("totalResets".to_string(), json!(0));
    }

    Ok(Value::Object(root))
}

/// 0.7.10 renamed the UNIQUE item rarity tier to EPIC.
fn migrate_rarity_tier_rename(payload: Value) -> Result<Value, String> {
    let mut root = require_object(payload)?;

    let mut renamed = 0usize;
    let inventory = ensure_section(&mut root, "inventory");

    if let Some(Value::Array(items)) = inventory.get_mut("inventoryItems") {
        for item in items.iter_mut().take(MAX_MIGRATED_ITEMS) {
            renamed += rename_rarity(item);
        }
    }
    if let Some(Value::Object(equipped)) = inventory.get_mut("equippedItems") {
        for item in equipped.values_mut().take(MAX_MIGRATED_ITEMS) {
            renamed += rename_rarity(item);
        }
    }

    if renamed > 0 {
        log::debug!("renamed {} UNIQUE items to EPIC", renamed);
    }

    Ok(Value::Object(root))
}

fn rename_rarity(item: &mut Value) -> usize {
    match item.get_mut("rarity") {
        Some(rarity) if rarity.as_str() == Some("UNIQUE") => {
            *rarity = json!("EPIC");
            1
        }
        _ => 0,
    }
}
