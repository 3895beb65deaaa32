use redis::aio::ConnectionManager;

/// Connects to a live Redis instance for integration tests, or returns `None` so the calling
/// test can skip cleanly.
///
/// Gated on `ENABLE_NETWORK_TESTS` (any value) being set, with the server address taken from
/// `REDIS_URL` (defaulting to `redis://127.0.0.1/`), mirroring the teacher crate's
/// `ENABLE_NETWORK_TESTS`-gated integration tests.
pub async fn connect(test_name: &str) -> Option<ConnectionManager> {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .is_test(true)
        .try_init();

    if std::env::var("ENABLE_NETWORK_TESTS").is_err() {
        log::warn!("test {test_name} is skipped. Set ENABLE_NETWORK_TESTS to run.");
        return None;
    }

    let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1/".to_owned());
    let client = redis::Client::open(url).expect("REDIS_URL must be a valid connection string");
    let conn = client
        .get_connection_manager()
        .await
        .expect("failed to connect to Redis; is a server running and ENABLE_NETWORK_TESTS accurate?");
    Some(conn)
}

/// Generates a test-unique key so concurrently-run tests don't interfere with each other's
/// semaphore state.
pub fn unique_key(test_name: &str) -> String {
    format!("redis_semaphore_tests:{test_name}:{}", uuid::Uuid::new_v4())
}
