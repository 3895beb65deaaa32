//! Distributed counting semaphore: scripted primitives, client façade, scoped permit, and
//! auto-renewer.

use thiserror::Error;

/// Client façade (`acquire` / `extend` / `release` / `census`) and the Lua scripts backing them.
pub mod client;
/// Holder-id minting and rendering.
pub mod holder_id;
/// Background lease-renewal loop wrapping a scoped permit.
pub mod renewer;
/// Blocking, scope-bounded acquisition.
pub mod scoped;

pub use client::{acquire, census, extend, release};
pub use holder_id::HolderId;
pub use renewer::{RenewingPermit, auto_renewing};
pub use scoped::{Permit, scoped};

/// Represents an error that occurred while operating a distributed semaphore.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct Error(#[from] ErrorKind);

impl Error {
    /// Returns the [`ErrorKind`] of the error.
    #[must_use]
    pub fn kind(&self) -> &ErrorKind {
        &self.0
    }
}

/// Represents the kinds of errors that occur while operating a distributed semaphore.
#[derive(Error, Debug)]
pub enum ErrorKind {
    /// `ttl` passed to `acquire` or `extend` was negative.
    #[error("expiry must not be negative")]
    InvalidExpiry,
    /// `scoped`/`auto_renewing` was called with `blocking = true` and a zero `timeout`.
    #[error("blocking acquisition requires a non-zero timeout")]
    InvalidArgument,
    /// No permit was obtained within the caller's bound.
    #[error("failed to acquire a permit for semaphore {key:?} within the allotted attempt(s)")]
    FailedToAcquire {
        /// The semaphore key that refused admission.
        key: String,
    },
    /// The underlying Redis connection or script evaluation failed.
    #[error(transparent)]
    Redis(#[from] redis::RedisError),
}

impl From<redis::RedisError> for Error {
    fn from(error: redis::RedisError) -> Self {
        ErrorKind::Redis(error).into()
    }
}

/// Derives the default signal-channel key for a holder-set key, when the caller does not
/// supply an override.
#[must_use]
pub fn default_signal_key(key: &str) -> String {
    format!("signal_key:{key}")
}

fn resolve_signal_key(key: &str, signal_key: Option<&str>) -> String {
    signal_key.map_or_else(|| default_signal_key(key), str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_signal_key_is_deterministic() {
        assert_eq!(default_signal_key("locks:db"), "signal_key:locks:db");
        assert_eq!(resolve_signal_key("locks:db", None), "signal_key:locks:db");
    }

    #[test]
    fn resolve_signal_key_prefers_override() {
        assert_eq!(
            resolve_signal_key("locks:db", Some("custom")),
            "custom".to_string()
        );
    }
}
