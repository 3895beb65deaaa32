//! A unique 128-bit token identifying one lease.

use std::fmt;

use uuid::Uuid;

/// Canonical textual form of a 128-bit holder-id (hyphenated hex, lowercase).
///
/// Minted once via [`HolderId::new`] and rendered once; the same `String` is reused for every
/// subsequent `extend`/`release` call so comparisons are plain byte equality, matching what the
/// store has on file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HolderId(String);

impl HolderId {
    /// Mints a fresh, uniformly random holder-id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the canonical textual form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for HolderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for HolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<HolderId> for String {
    fn from(id: HolderId) -> Self {
        id.0
    }
}

impl redis::ToRedisArgs for HolderId {
    fn write_redis_args<W>(&self, out: &mut W)
    where
        W: ?Sized + redis::RedisWrite,
    {
        self.0.write_redis_args(out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_as_hyphenated_lowercase() {
        let id = HolderId::new();
        let rendered = id.as_str();
        assert_eq!(rendered.len(), 36);
        assert!(rendered.chars().all(|c| c.is_ascii_hexdigit() || c == '-'));
        assert!(rendered.chars().all(|c| !c.is_ascii_uppercase()));
    }

    #[test]
    fn two_mints_never_collide() {
        assert_ne!(HolderId::new(), HolderId::new());
    }

    #[test]
    fn display_matches_as_str() {
        let id = HolderId::new();
        assert_eq!(id.to_string(), id.as_str());
    }
}
