//! A conductor-side failure of app 3's activation is recorded as-is.

use keyfault_scenario::{Driver, StepOutcome};

use crate::helpers::backend::{Faults, InProcessBackend};
use crate::helpers::config::test_config;

#[tokio::test]
async fn app3_activation_failure_is_recorded_not_masked() {
    // Given: a conductor that cannot activate happ-3
    let dir = tempfile::tempdir().unwrap();
    let backend = InProcessBackend::with_faults(Faults {
        broken_activation: Some("happ-3".to_owned()),
        ..Faults::default()
    });
    let driver = Driver::new(test_config(dir.path()), backend);

    // When: the scenario runs
    let report = driver.run().await;

    // Then: the run still completes, the failure is in the report
    assert!(report.completed);
    assert!(report.step("install happ-3").unwrap().outcome.is_success());
    match &report.step("activate happ-3").unwrap().outcome {
        StepOutcome::Failed { error, expected } => {
            assert!(expected);
            assert!(error.contains("cell failed to join network"), "{error}");
        }
        StepOutcome::Succeeded => panic!("activation of happ-3 must fail"),
    }

    // Then: the final listing shows happ-3 inactive
    let app3 = report
        .listing("final")
        .unwrap()
        .apps
        .iter()
        .find(|app| app.installed_app_id == "happ-3")
        .cloned()
        .unwrap();
    assert!(!app3.status.is_active());
}

#[tokio::test]
async fn custom_app_id_prefix_is_used_throughout() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.scenario.app_id_prefix = "fault-".to_owned();
    let driver = Driver::new(config, InProcessBackend::new());

    let report = driver.run().await;

    assert!(report.completed);
    assert!(report.step("deactivate fault-2").is_some());
    let ids: Vec<_> = report
        .listing("final")
        .unwrap()
        .apps
        .iter()
        .map(|app| app.installed_app_id.clone())
        .collect();
    assert_eq!(ids, vec!["fault-1", "fault-2", "fault-3"]);
}
