//! Client façade: `acquire` / `extend` / `release` / `census`, backed by the scripted primitives
//! that run atomically server-side.

use std::time::Duration;

use log::debug;
use redis::{AsyncCommands, Script, aio::ConnectionManager};

use crate::semaphore::{Error, ErrorKind, HolderId, resolve_signal_key};

// ARGV[1] = holder-id, ARGV[2] = limit, ARGV[3] = ttl in seconds
// KEYS[1] = holder set, KEYS[2] = signal channel
const ACQUIRE_SCRIPT: &str = r"
local now = tonumber(redis.call('TIME')[1])
local purged = redis.call('ZREMRANGEBYSCORE', KEYS[1], '-inf', now)
redis.call('DEL', KEYS[2])
for i = 1, purged do
    redis.call('LPUSH', KEYS[2], 1)
end
redis.call('PEXPIRE', KEYS[2], 1000)
if redis.call('ZCOUNT', KEYS[1], '-inf', '+inf') < tonumber(ARGV[2]) then
    redis.call('ZADD', KEYS[1], now + tonumber(ARGV[3]), ARGV[1])
    return 1
else
    return 0
end
";

// ARGV[1] = holder-id, ARGV[2] = ttl in seconds
// KEYS[1] = holder set
const EXTEND_SCRIPT: &str = r"
local now = tonumber(redis.call('TIME')[1])
if redis.call('ZSCORE', KEYS[1], ARGV[1]) then
    redis.call('ZADD', KEYS[1], now + tonumber(ARGV[2]), ARGV[1])
    return 1
else
    return 0
end
";

// ARGV[1] = holder-id
// KEYS[1] = holder set, KEYS[2] = signal channel
const RELEASE_SCRIPT: &str = r"
local removed = redis.call('ZREM', KEYS[1], ARGV[1])
if removed == 1 then
    redis.call('LPUSH', KEYS[2], 1)
    redis.call('PEXPIRE', KEYS[2], 1000)
end
return removed
";

// KEYS[1] = holder set, KEYS[2] = signal channel
const CENSUS_SCRIPT: &str = r"
local now = tonumber(redis.call('TIME')[1])
local purged = redis.call('ZREMRANGEBYSCORE', KEYS[1], '-inf', now)
redis.call('DEL', KEYS[2])
for i = 1, purged do
    redis.call('LPUSH', KEYS[2], 1)
end
redis.call('PEXPIRE', KEYS[2], 1000)
return redis.call('ZCOUNT', KEYS[1], '-inf', '+inf')
";

/// Recommended default lease duration (seconds), used by [`crate::semaphore::scoped`] and
/// [`crate::semaphore::auto_renewing`] when the caller does not supply one.
pub const DEFAULT_TTL_SECS: i64 = 60;

fn check_ttl(ttl: i64) -> Result<(), Error> {
    if ttl < 0 {
        Err(ErrorKind::InvalidExpiry.into())
    } else {
        Ok(())
    }
}

/// Attempts to acquire one permit of the named semaphore.
///
/// `ttl` is how long, in seconds, the lease will remain held before it becomes eligible for
/// purge; [`DEFAULT_TTL_SECS`] is a reasonable default. `signal_key` overrides the derived
/// `signal_key:{key}` channel name.
///
/// Returns `Some(holder_id)` on success, `None` if the semaphore is already at `limit`.
///
/// # Errors
/// Returns [`ErrorKind::InvalidExpiry`] if `ttl` is negative, without contacting the store.
/// Returns [`ErrorKind::Redis`] on any connection or script failure.
pub async fn acquire(
    conn: &mut ConnectionManager,
    key: &str,
    limit: i64,
    ttl: i64,
    signal_key: Option<&str>,
) -> Result<Option<HolderId>, Error> {
    check_ttl(ttl)?;
    let signal_key = resolve_signal_key(key, signal_key);
    let holder_id = HolderId::new();

    let acquired: i64 = Script::new(ACQUIRE_SCRIPT)
        .key(key)
        .key(&signal_key)
        .arg(holder_id.as_str())
        .arg(limit)
        .arg(ttl)
        .invoke_async(conn)
        .await?;

    Ok((acquired == 1).then_some(holder_id))
}

/// Extends an already-held lease by `ttl` seconds from now, read from the store's own clock.
///
/// Never purges other holders' leases; a refresh by a still-live holder must not disturb
/// anyone else's admission.
///
/// Returns `true` if the lease was still held (and has been extended), `false` if `holder_id`
/// is unknown to the store.
///
/// # Errors
/// Returns [`ErrorKind::InvalidExpiry`] if `ttl` is negative. Returns [`ErrorKind::Redis`] on
/// any connection or script failure.
pub async fn extend(
    conn: &mut ConnectionManager,
    key: &str,
    holder_id: &HolderId,
    ttl: i64,
) -> Result<bool, Error> {
    check_ttl(ttl)?;

    let extended: i64 = Script::new(EXTEND_SCRIPT)
        .key(key)
        .arg(holder_id.as_str())
        .arg(ttl)
        .invoke_async(conn)
        .await?;

    Ok(extended == 1)
}

/// Releases a held lease, idempotently.
///
/// A second release of the same `holder_id` (or of an id that was never acquired) is a no-op;
/// no error is surfaced for "not held".
///
/// # Errors
/// Returns [`ErrorKind::Redis`] on any connection or script failure.
pub async fn release(
    conn: &mut ConnectionManager,
    key: &str,
    holder_id: &HolderId,
    signal_key: Option<&str>,
) -> Result<(), Error> {
    let signal_key = resolve_signal_key(key, signal_key);

    let removed: i64 = Script::new(RELEASE_SCRIPT)
        .key(key)
        .key(&signal_key)
        .arg(holder_id.as_str())
        .invoke_async(conn)
        .await?;

    if removed == 0 {
        debug!("release of {holder_id} on {key:?} was a no-op (already released or unknown)");
    }

    Ok(())
}

/// Purges expired leases and returns the number of holders currently consuming a permit.
///
/// Performs the same purge as `acquire`, including refilling the signal channel, so it can be
/// used to drive garbage collection without actually acquiring.
///
/// # Errors
/// Returns [`ErrorKind::Redis`] on any connection or script failure.
pub async fn census(
    conn: &mut ConnectionManager,
    key: &str,
    signal_key: Option<&str>,
) -> Result<i64, Error> {
    let signal_key = resolve_signal_key(key, signal_key);

    let count: i64 = Script::new(CENSUS_SCRIPT)
        .key(key)
        .key(&signal_key)
        .invoke_async(conn)
        .await?;

    Ok(count)
}

/// Performs the single blocking pop used by [`crate::semaphore::scoped`] to wait for a wake-up.
///
/// The signal channel is advisory: a timeout here never constitutes an error, it simply means
/// no token arrived in time.
pub(crate) async fn wait_for_signal(
    conn: &mut ConnectionManager,
    signal_key: &str,
    timeout: Duration,
) -> Result<bool, Error> {
    let popped: Option<(String, String)> = conn.blpop(signal_key, timeout.as_secs_f64()).await?;
    Ok(popped.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(-1; "negative one")]
    #[test_case(-60; "negative sixty")]
    #[test_case(i64::MIN; "minimum")]
    fn negative_ttl_is_rejected(ttl: i64) {
        assert!(matches!(check_ttl(ttl), Err(e) if matches!(e.kind(), ErrorKind::InvalidExpiry)));
    }

    #[test_case(0; "zero")]
    #[test_case(60; "default")]
    #[test_case(i64::MAX; "maximum")]
    fn non_negative_ttl_is_accepted(ttl: i64) {
        assert!(check_ttl(ttl).is_ok());
    }
}
