//! Integration tests for the auto-renewer, gated on a live Redis.
//!
//! API under test:
//! auto_renewing
//!
//! Scenarios:
//! the lease's expiry-score advances roughly once per renewal interval
//! releasing a renewing permit stops renewal and frees the slot

mod common;

use std::time::Duration;

use redis::AsyncCommands;
use redis_semaphore::semaphore;

#[tokio::test]
async fn lease_score_advances_with_each_renewal() {
    let Some(mut conn) = common::connect("lease_score_advances_with_each_renewal").await else {
        return;
    };
    let key = common::unique_key("lease_score_advances_with_each_renewal");

    let permit = semaphore::auto_renewing(
        conn.clone(),
        &key,
        2,
        Duration::from_secs(1),
        5,
        true,
        Duration::from_secs(1),
        None,
    )
    .await
    .unwrap();

    let first: f64 = conn
        .zscore(&key, permit.holder_id().as_str())
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(1500)).await;

    let second: f64 = conn
        .zscore(&key, permit.holder_id().as_str())
        .await
        .unwrap();

    // One renewal tick (interval = 1s) should have fired, advancing the score by roughly one
    // interval's worth of seconds (within clock granularity).
    assert!(second - first >= 0.8);

    permit.release().await.unwrap();
}

#[tokio::test]
async fn releasing_a_renewing_permit_stops_renewal_and_frees_the_slot() {
    let Some(conn) = common::connect("releasing_a_renewing_permit_stops_renewal_and_frees_the_slot")
        .await
    else {
        return;
    };
    let key = common::unique_key("releasing_a_renewing_permit_stops_renewal_and_frees_the_slot");

    let permit = semaphore::auto_renewing(
        conn.clone(),
        &key,
        1,
        Duration::from_secs(1),
        5,
        true,
        Duration::from_secs(1),
        None,
    )
    .await
    .unwrap();
    permit.release().await.unwrap();

    let second = semaphore::auto_renewing(
        conn,
        &key,
        1,
        Duration::from_secs(1),
        5,
        true,
        Duration::from_secs(1),
        None,
    )
    .await;
    assert!(second.is_ok());
}
