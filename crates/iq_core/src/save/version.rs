use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Schema version of a save, compared numerically per component.
///
/// Version strings like `"0.7.10"` must order after `"0.7.9"`, so comparison
/// is never done on the string form. Field order gives the derived `Ord` the
/// correct major/minor/patch precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SaveVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl SaveVersion {
    /// Version assumed for saves that carry no readable version field.
    pub const ZERO: SaveVersion = SaveVersion::new(0, 0, 0);

    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self { major, minor, patch }
    }
}

impl fmt::Display for SaveVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseVersionError {
    raw: String,
}

impl fmt::Display for ParseVersionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid save version {:?}, expected \"major.minor.patch\"", self.raw)
    }
}

impl std::error::Error for ParseVersionError {}

impl FromStr for SaveVersion {
    type Err = ParseVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let error = || ParseVersionError { raw: s.to_string() };

        let parts: Vec<&str> = s.trim().split('.').collect();
        if parts.len() != 3 {
            return Err(error());
        }

        let major = parts[0].parse().map_err(|_| error())?;
        let minor = parts[1].parse().map_err(|_| error())?;
        let patch = parts[2].parse().map_err(|_| error())?;

        Ok(SaveVersion::new(major, minor, patch))
    }
}

// Serialized as the dotted string form, matching what saves store in
// `options.version`.
impl Serialize for SaveVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SaveVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> SaveVersion {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_and_display_roundtrip() {
        for raw in ["0.0.0", "0.7.10", "1.2.3", "10.20.30"] {
            assert_eq!(v(raw).to_string(), raw);
        }
    }

    #[test]
    fn test_ordering_is_numeric_not_lexicographic() {
        assert!(v("0.7.10") > v("0.7.9"));
        assert!(v("0.7.9") > v("0.7.3"));
        assert!(v("0.10.0") > v("0.9.99"));
        assert!(v("1.0.0") > v("0.99.99"));

        // The string order would get all of these wrong
        assert!("0.7.10" < "0.7.9");
    }

    #[test]
    fn test_parse_rejects_malformed_input() {
        for raw in ["", "1", "1.2", "1.2.3.4", "a.b.c", "1.2.x", "1..3", "-1.0.0"] {
            assert!(raw.parse::<SaveVersion>().is_err(), "{:?} should not parse", raw);
        }
    }

    #[test]
    fn test_parse_tolerates_surrounding_whitespace() {
        assert_eq!(v(" 0.7.9 "), SaveVersion::new(0, 7, 9));
    }

    #[test]
    fn test_serde_uses_dotted_string_form() {
        let version = SaveVersion::new(0, 7, 10);
        let json = serde_json::to_string(&version).unwrap();
        assert_eq!(json, "\"0.7.10\"");

        let back: SaveVersion = serde_json::from_str(&json).unwrap();
        assert_eq!(back, version);

        assert!(serde_json::from_str::<SaveVersion>("\"nope\"").is_err());
    }

    #[cfg(all(test, feature = "proptest"))]
    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: ordering always agrees with tuple ordering of the components
            #[test]
            fn prop_ordering_matches_components(
                a in (0u32..100, 0u32..100, 0u32..100),
                b in (0u32..100, 0u32..100, 0u32..100)
            ) {
                let left = SaveVersion::new(a.0, a.1, a.2);
                let right = SaveVersion::new(b.0, b.1, b.2);
                prop_assert_eq!(left.cmp(&right), a.cmp(&b));
            }

            /// Property: display then parse is lossless
            #[test]
            fn prop_display_parse_roundtrip(
                major in 0u32..1000, minor in 0u32..1000, patch in 0u32..1000
            ) {
                let version = SaveVersion::new(major, minor, patch);
                prop_assert_eq!(version.to_string().parse::<SaveVersion>().unwrap(), version);
            }
        }
    }
}
