//! Scratch and log directory handling.

use keyfault_scenario::Driver;

use crate::helpers::backend::InProcessBackend;
use crate::helpers::config::test_config;

#[tokio::test]
async fn scratch_is_recreated_and_logs_are_kept() {
    // Given: leftovers from an earlier run in both directories
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let stale = config.paths.scratch_dir.join("keystore").join("leftover");
    std::fs::create_dir_all(stale.parent().unwrap()).unwrap();
    std::fs::write(&stale, b"old").unwrap();
    let old_log = config.paths.log_dir.join("holochain.txt");
    std::fs::create_dir_all(&config.paths.log_dir).unwrap();
    std::fs::write(&old_log, b"previous run\n").unwrap();
    let driver = Driver::new(config, InProcessBackend::new());

    // When: the scenario runs
    let report = driver.run().await;

    // Then: scratch leftovers are gone, logs survive
    assert!(report.completed);
    assert!(!stale.exists());
    assert_eq!(std::fs::read_to_string(&old_log).unwrap(), "previous run\n");
    assert!(driver.config().proxy_dir().is_dir());
}

#[tokio::test]
async fn missing_log_dir_is_created() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.paths.log_dir = dir.path().join("nested").join("log");
    let log_dir = config.paths.log_dir.clone();
    let driver = Driver::new(config, InProcessBackend::new());

    let report = driver.run().await;

    assert!(report.completed);
    assert!(log_dir.is_dir());
}
