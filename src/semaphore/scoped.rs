//! Blocking, scope-bounded acquisition: [`scoped`] yields a [`Permit`] that releases its lease
//! on every exit path.

use std::time::Duration;

use log::debug;
use redis::aio::ConnectionManager;

use crate::semaphore::{Error, ErrorKind, HolderId, client, resolve_signal_key};

/// A held lease, valid for the lifetime of this guard.
///
/// Dropping the permit without calling [`Permit::release`] still releases the lease: `Drop`
/// spawns a detached task that runs the same release call, a last-resort safety net mirroring
/// the teacher's `leased_lock::lease::Client` `Drop` impl. Prefer the explicit, awaitable
/// [`Permit::release`] when the caller can reach it, since it surfaces store errors instead of
/// only logging them.
pub struct Permit {
    conn: ConnectionManager,
    key: String,
    signal_key: String,
    holder_id: Option<HolderId>,
}

impl Permit {
    /// The holder-id backing this permit.
    #[must_use]
    pub fn holder_id(&self) -> &HolderId {
        self.holder_id
            .as_ref()
            .expect("holder_id is only taken by release/Drop, which consume the permit")
    }

    /// The semaphore key this permit was acquired against.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// A clone of the connection this permit is using, handy for extending the lease manually
    /// or composing with other store operations inside the scope.
    #[must_use]
    pub fn connection(&self) -> ConnectionManager {
        self.conn.clone()
    }

    /// Releases the lease, awaiting store confirmation. Consumes the permit so it cannot be
    /// released twice.
    ///
    /// # Errors
    /// Returns [`ErrorKind::Redis`] if the release script fails.
    pub async fn release(mut self) -> Result<(), Error> {
        let holder_id = self.holder_id.take().expect("not yet released");
        client::release(&mut self.conn, &self.key, &holder_id, Some(&self.signal_key)).await
    }
}

impl Drop for Permit {
    fn drop(&mut self) {
        let Some(holder_id) = self.holder_id.take() else {
            return;
        };
        let mut conn = self.conn.clone();
        let key = self.key.clone();
        let signal_key = self.signal_key.clone();
        tokio::task::spawn(async move {
            if let Err(error) = client::release(&mut conn, &key, &holder_id, Some(&signal_key)).await {
                debug!("release on drop of permit {holder_id} for {key:?} failed: {error}");
            }
        });
    }
}

/// Acquires a permit of semaphore `key`, blocking until one is available or `timeout` elapses.
///
/// `ttl` is the lease duration in seconds ([`client::DEFAULT_TTL_SECS`] is a reasonable default). When
/// `blocking` is `false`, a refused first attempt fails immediately with
/// [`ErrorKind::FailedToAcquire`] — no signal-channel wait is performed. When `blocking` is
/// `true`, `timeout` must be non-zero; a refused first attempt is followed by exactly one
/// `BLPOP` on the signal channel (bounded by `timeout`) and exactly one retry. Longer waits are
/// the caller's responsibility — loop around this call.
///
/// # Errors
/// Returns [`ErrorKind::InvalidArgument`] up-front, before any store contact, if `blocking` is
/// `true` and `timeout` is zero. Returns [`ErrorKind::FailedToAcquire`] if no permit was
/// obtained within the bound. Returns [`ErrorKind::Redis`] on any connection or script failure.
pub async fn scoped(
    mut conn: ConnectionManager,
    key: &str,
    limit: i64,
    ttl: i64,
    blocking: bool,
    timeout: Duration,
    signal_key: Option<&str>,
) -> Result<Permit, Error> {
    check_blocking_timeout(blocking, timeout)?;

    let signal_key = resolve_signal_key(key, signal_key);

    if let Some(holder_id) = client::acquire(&mut conn, key, limit, ttl, Some(&signal_key)).await?
    {
        return Ok(Permit {
            conn,
            key: key.to_owned(),
            signal_key,
            holder_id: Some(holder_id),
        });
    }

    if !blocking {
        return Err(ErrorKind::FailedToAcquire {
            key: key.to_owned(),
        }
        .into());
    }

    let woken = client::wait_for_signal(&mut conn, &signal_key, timeout).await?;
    if woken {
        if let Some(holder_id) =
            client::acquire(&mut conn, key, limit, ttl, Some(&signal_key)).await?
        {
            return Ok(Permit {
                conn,
                key: key.to_owned(),
                signal_key,
                holder_id: Some(holder_id),
            });
        }
    }

    Err(ErrorKind::FailedToAcquire {
        key: key.to_owned(),
    }
    .into())
}

/// Rejects a blocking request with no timeout to wait on, before any store contact.
fn check_blocking_timeout(blocking: bool, timeout: Duration) -> Result<(), Error> {
    if blocking && timeout.is_zero() {
        return Err(ErrorKind::InvalidArgument.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocking_with_zero_timeout_is_rejected() {
        let result = check_blocking_timeout(true, Duration::ZERO);
        assert!(matches!(result, Err(e) if matches!(e.kind(), ErrorKind::InvalidArgument)));
    }

    #[test]
    fn blocking_with_nonzero_timeout_is_accepted() {
        assert!(check_blocking_timeout(true, Duration::from_secs(1)).is_ok());
    }

    #[test]
    fn non_blocking_with_zero_timeout_is_accepted() {
        assert!(check_blocking_timeout(false, Duration::ZERO).is_ok());
    }
}
