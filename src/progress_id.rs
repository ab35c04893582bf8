use std::fmt;

/// Maximum length, in bytes, of a client-supplied progress identifier.
pub const MAX_LEN: usize = 128;

/// An opaque, client-chosen identifier for a tracked upload.
///
/// Equality and hashing are exact over the underlying bytes; the id is never
/// checked for uniqueness across shards, only validated for length.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgressId(String);

impl ProgressId {
    /// Parses a query-string value into a `ProgressId`, enforcing the
    /// 1..=128 byte length rule. Returns `None` for anything that should be
    /// treated as "absent" by callers — an empty, missing, or oversized id
    /// is a soft no-op everywhere in this crate, never an error.
    pub fn parse(raw: &str) -> Option<Self> {
        let len = raw.len();
        if len == 0 || len > MAX_LEN {
            return None;
        }
        Some(ProgressId(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProgressId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
