use std::time::Duration;

use env_logger::Builder;
use redis_semaphore::semaphore;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    Builder::new()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp(None)
        .init();

    let client = redis::Client::open("redis://127.0.0.1/").unwrap();
    let conn = client.get_connection_manager().await.unwrap();

    let key = "demo:printer";
    let ttl = 60;
    let limit = 2;

    let mut acquire_conn = conn.clone();
    let holder_id = match semaphore::acquire(&mut acquire_conn, key, limit, ttl, None).await {
        Ok(Some(holder_id)) => {
            log::info!("acquired permit {holder_id}");
            holder_id
        }
        Ok(None) => {
            log::error!("semaphore {key} is already at capacity");
            return;
        }
        Err(e) => {
            log::error!("failed acquiring permit: {e}");
            return;
        }
    };

    match semaphore::census(&mut acquire_conn, key, None).await {
        Ok(count) => log::info!("{count} holder(s) of {key} right now"),
        Err(e) => log::error!("failed checking census: {e}"),
    }

    if let Err(e) = semaphore::release(&mut acquire_conn, key, &holder_id, None).await {
        log::error!("failed releasing permit: {e}");
        return;
    }
    log::info!("released permit {holder_id}");

    // Equivalent, but scoped: the permit is released automatically when it goes out of scope,
    // and kept alive by a background renewal task for as long as it's held.
    match semaphore::auto_renewing(
        conn,
        key,
        limit,
        Duration::from_secs(20),
        ttl,
        true,
        Duration::from_secs(5),
        None,
    )
    .await
    {
        Ok(permit) => {
            log::info!("auto-renewing permit {} acquired", permit.holder_id());
            // ... do work while the permit is held ...
            if let Err(e) = permit.release().await {
                log::error!("failed releasing auto-renewing permit: {e}");
            }
        }
        Err(e) => log::error!("failed acquiring auto-renewing permit: {e}"),
    }
}
