//! Background lease-renewal loop wrapping a scoped permit.

use std::time::Duration;

use log::debug;
use redis::aio::ConnectionManager;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::semaphore::{Error, Permit, client, scoped};

/// A scoped permit whose lease is kept alive by a background renewal task for as long as this
/// guard is held.
///
/// The renewal task is cancelled and joined when the guard is released or dropped — it never
/// outlives its enclosing scope, and it never synthesises a new lease, only refreshes the one
/// acquired up front. Its only effect on an already-lost lease is to notice and stop quietly.
pub struct RenewingPermit {
    permit: Option<Permit>,
    cancellation: CancellationToken,
    renewal_task: Option<JoinHandle<()>>,
}

impl RenewingPermit {
    /// The holder-id backing this permit.
    #[must_use]
    pub fn holder_id(&self) -> &crate::semaphore::HolderId {
        self.permit
            .as_ref()
            .expect("permit is only taken by release/Drop, which consume the guard")
            .holder_id()
    }

    /// Stops renewal, awaits the renewal task, and releases the lease.
    ///
    /// # Errors
    /// Returns [`crate::semaphore::ErrorKind::Redis`] if the underlying release script fails.
    pub async fn release(mut self) -> Result<(), Error> {
        self.stop_renewal().await;
        self.permit.take().expect("not yet released").release().await
    }

    async fn stop_renewal(&mut self) {
        self.cancellation.cancel();
        if let Some(task) = self.renewal_task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for RenewingPermit {
    fn drop(&mut self) {
        self.cancellation.cancel();
        // The JoinHandle is dropped without being awaited here: Drop cannot be async. The
        // task observes cancellation on its next select! wakeup and exits promptly; callers
        // that need a guaranteed join should call `release` instead.
    }
}

/// Acquires a permit exactly as [`scoped`] does, then starts a background task that calls
/// `extend` with the original `ttl` every `renewal_interval`, for as long as the returned
/// [`RenewingPermit`] is held.
///
/// The first renewal happens no earlier than `renewal_interval` after acquisition, since the
/// initial acquire already set a full `ttl`. A safe guideline (not enforced) is
/// `renewal_interval <= ttl / 3`, to survive one missed tick.
///
/// # Errors
/// Same as [`scoped`]: [`crate::semaphore::ErrorKind::InvalidArgument`] if `blocking` is `true`
/// and `timeout` is zero, [`crate::semaphore::ErrorKind::FailedToAcquire`] if no permit was
/// obtained, [`crate::semaphore::ErrorKind::Redis`] on connection or script failure.
pub async fn auto_renewing(
    conn: ConnectionManager,
    key: &str,
    limit: i64,
    renewal_interval: Duration,
    ttl: i64,
    blocking: bool,
    timeout: Duration,
    signal_key: Option<&str>,
) -> Result<RenewingPermit, Error> {
    let permit = scoped(conn, key, limit, ttl, blocking, timeout, signal_key).await?;

    let cancellation = CancellationToken::new();
    let renewal_task = tokio::task::spawn(renewal_loop(
        permit.connection(),
        permit.key().to_owned(),
        permit.holder_id().clone(),
        ttl,
        renewal_interval,
        cancellation.clone(),
    ));

    Ok(RenewingPermit {
        permit: Some(permit),
        cancellation,
        renewal_task: Some(renewal_task),
    })
}

async fn renewal_loop(
    mut conn: ConnectionManager,
    key: String,
    holder_id: crate::semaphore::HolderId,
    ttl: i64,
    interval: Duration,
    cancellation: CancellationToken,
) {
    loop {
        tokio::select! {
            () = cancellation.cancelled() => return,
            () = tokio::time::sleep(interval) => {}
        }

        match client::extend(&mut conn, &key, &holder_id, ttl).await {
            Ok(true) => {}
            Ok(false) => {
                debug!("auto-renewal of {holder_id} on {key:?} found the lease already lost; stopping");
                return;
            }
            Err(error) => {
                debug!("auto-renewal of {holder_id} on {key:?} failed: {error}; stopping");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_token_starts_uncancelled() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
    }
}
