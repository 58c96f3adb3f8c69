//! # iq_core - IdleQuest Save Pipeline
//!
//! Versioned save persistence for IdleQuest: a compression codec for the
//! current storage format, a decrypt-only reader for the deprecated
//! encrypted format, and an ordered migration chain that upgrades
//! historical saves to the current schema on load.
//!
//! ## Features
//! - Transparent two-format reads (codec first, legacy fallback)
//! - Strictly ordered, atomic, idempotent schema migrations
//! - Malformed historical input never panics; corrupt input is reported
//! - Storage backend agnostic: consumes and produces plain strings

pub mod save;

// Re-export save system
pub use save::{
    Envelope, LegacyDecoder, LoadedSave, MigrationFailure, MigrationRegistry, MigrationReport,
    SaveError, SaveFormat, SaveManager, SaveVersion, SAVE_VERSION,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
