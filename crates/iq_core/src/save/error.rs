use thiserror::Error;

use super::format::Envelope;
use super::version::SaveVersion;

#[derive(Error, Debug)]
pub enum SaveError {
    /// Neither the codec nor the legacy decoder produced a structured object.
    #[error("corrupt save data: not a recognized format")]
    Corrupt,

    /// A migration returned an error; `committed` is the last envelope that
    /// was successfully upgraded and can be offered for recovery.
    #[error("migration to {version} failed: {reason}")]
    Migration { version: SaveVersion, reason: String, committed: Box<Envelope> },

    /// The payload shape makes the requested operation structurally
    /// impossible (e.g. a non-object save root).
    #[error("schema mismatch: {context}")]
    SchemaMismatch { context: String },

    #[error("serialization error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SaveError {
    pub fn is_recoverable(&self) -> bool {
        match self {
            SaveError::Corrupt => false,
            SaveError::Migration { .. } => true, // committed intermediate survives
            SaveError::SchemaMismatch { .. } => false,
            SaveError::Encode(_) => false,
            SaveError::Io(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_recoverability_classification() {
        assert!(!SaveError::Corrupt.is_recoverable());
        assert!(!SaveError::SchemaMismatch { context: "x".into() }.is_recoverable());

        let failure = SaveError::Migration {
            version: SaveVersion::new(0, 7, 10),
            reason: "bad inventory".into(),
            committed: Box::new(Envelope::new(SaveVersion::new(0, 7, 9), json!({}))),
        };
        assert!(failure.is_recoverable());
    }

    #[test]
    fn test_display_names_the_failing_version() {
        let failure = SaveError::Migration {
            version: SaveVersion::new(0, 7, 10),
            reason: "bad inventory".into(),
            committed: Box::new(Envelope::new(SaveVersion::new(0, 7, 9), json!({}))),
        };
        let text = failure.to_string();
        assert!(text.contains("0.7.10"));
        assert!(text.contains("bad inventory"));
    }
}
