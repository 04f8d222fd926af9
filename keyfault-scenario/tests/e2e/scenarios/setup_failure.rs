//! Fatal failures before the conductor is reachable.

use keyfault_scenario::{Driver, ScenarioStage};

use crate::helpers::backend::{Faults, InProcessBackend};
use crate::helpers::config::test_config;

#[tokio::test]
async fn keystore_spawn_failure_aborts_without_teardown_work() {
    // Given: a keystore command that cannot be started
    let dir = tempfile::tempdir().unwrap();
    let backend = InProcessBackend::with_faults(Faults {
        keystore_spawn_fails: true,
        ..Faults::default()
    });
    let driver = Driver::new(test_config(dir.path()), backend);

    // When: the scenario runs
    let report = driver.run().await;

    // Then: the run fails with the spawn error and nothing needed stopping
    assert!(!report.completed);
    let error = report.error.as_deref().unwrap();
    assert!(error.contains("failed to start process"), "{error}");
    assert!(error.contains("lair-keystore"), "{error}");
    assert!(report.teardown.is_empty());
    assert!(report.proxy.is_none());
    assert_eq!(report.reached, ScenarioStage::Teardown);
}

#[tokio::test]
async fn invalid_membrane_proof_fails_before_any_process_starts() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config
        .scenario
        .membrane_proofs
        .insert("broken".to_owned(), "not base64!".to_owned());
    let driver = Driver::new(config, InProcessBackend::new());

    let report = driver.run().await;

    assert!(!report.completed);
    assert!(report.error.as_deref().unwrap().contains("membrane_proofs.broken"));
    assert!(report.teardown.is_empty());
    assert!(!dir.path().join("tmp").exists());
}

#[tokio::test]
async fn stale_proxy_socket_does_not_block_startup() {
    // Given: a socket file left behind at the proxy path by an earlier run
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    std::fs::create_dir_all(config.proxy_dir()).unwrap();
    let _stale = std::os::unix::net::UnixListener::bind(config.proxy_socket()).unwrap();
    let driver = Driver::new(config, InProcessBackend::new());

    // When/Then: the scratch tree is recreated and the run completes
    let report = driver.run().await;
    assert!(report.completed, "unexpected error: {:?}", report.error);
}
