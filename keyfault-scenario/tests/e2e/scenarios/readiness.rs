//! Readiness waits: slow starters are retried, dead ones time out.

use std::time::{Duration, Instant};

use keyfault_scenario::{Driver, ScenarioStage};

use crate::helpers::backend::{Faults, InProcessBackend};
use crate::helpers::config::test_config;

#[tokio::test]
async fn admin_connect_is_retried_until_it_succeeds() {
    // Given: a conductor that refuses the first three connects
    let dir = tempfile::tempdir().unwrap();
    let backend = InProcessBackend::with_faults(Faults {
        refused_admin_connects: 3,
        ..Faults::default()
    });
    let driver = Driver::new(test_config(dir.path()), backend);

    // When: the scenario runs
    let report = driver.run().await;

    // Then: the fourth attempt opened the session
    assert!(report.completed, "unexpected error: {:?}", report.error);
    assert_eq!(driver.backend().connect_attempts(), 4);
}

#[tokio::test]
async fn silent_admin_interface_fails_with_not_ready() {
    // Given: a conductor whose admin interface never comes up
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.readiness.conductor_deadline_ms = 200;
    let backend = InProcessBackend::with_faults(Faults {
        admin_never_listens: true,
        ..Faults::default()
    });
    let driver = Driver::new(config, backend);

    // When: the scenario runs
    let started = Instant::now();
    let report = driver.run().await;

    // Then: it gives up after the deadline and still tears everything down
    assert!(started.elapsed() >= Duration::from_millis(200));
    assert!(!report.completed);
    assert_eq!(report.reached, ScenarioStage::Teardown);
    let error = report.error.as_deref().unwrap();
    assert!(error.contains("conductor admin"), "{error}");
    assert!(error.contains("Connection refused"), "{error}");
    assert!(report.steps.is_empty());

    let order: Vec<&str> = report.teardown.iter().map(|r| r.component.as_str()).collect();
    assert_eq!(order, vec!["signing-proxy", "conductor", "keystore"]);
}

#[tokio::test]
async fn keystore_that_never_listens_fails_before_proxy_start() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.readiness.keystore_deadline_ms = 100;
    let proxy_socket = config.proxy_socket();
    let backend = InProcessBackend::with_faults(Faults {
        keystore_never_listens: true,
        ..Faults::default()
    });
    let driver = Driver::new(config, backend);

    let report = driver.run().await;

    assert!(!report.completed);
    assert!(report.error.as_deref().unwrap().contains("keystore socket"));
    assert!(report.proxy.is_none());
    assert!(!proxy_socket.exists());
    let order: Vec<&str> = report.teardown.iter().map(|r| r.component.as_str()).collect();
    assert_eq!(order, vec!["keystore"]);
}
