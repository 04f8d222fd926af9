//! Full run: denylisting agent 2 breaks exactly the calls that need its
//! signature.

use keyfault_core::AgentIdentity;
use keyfault_scenario::{Driver, ScenarioStage, StepOutcome};

use crate::helpers::backend::InProcessBackend;
use crate::helpers::config::test_config;

fn agent(hex_identity: &str) -> AgentIdentity {
    let bytes: Vec<u8> = (0..hex_identity.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex_identity[i..i + 2], 16).unwrap())
        .collect();
    AgentIdentity::from_bytes(bytes).unwrap()
}

#[tokio::test]
async fn scenario_completes_with_recorded_probe_failure() {
    // Given: a driver over the in-process keystore and conductor
    let dir = tempfile::tempdir().unwrap();
    let driver = Driver::new(test_config(dir.path()), InProcessBackend::new());

    // When: the scenario runs
    let report = driver.run().await;

    // Then: it completes and tears down
    assert!(report.completed, "unexpected error: {:?}", report.error);
    assert!(report.error.is_none());
    assert_eq!(report.reached, ScenarioStage::Teardown);
    assert_eq!(report.agents.len(), 3);
    assert_eq!(report.unexpected_failures().count(), 0);

    // Then: agent 1's app is active in the final listing
    let final_listing = report.listing("final").unwrap();
    let app1 = final_listing
        .apps
        .iter()
        .find(|app| app.installed_app_id == "happ-1")
        .unwrap();
    assert!(app1.status.is_active());

    // Then: deactivating agent 2's app failed with the synthetic reason
    match &report.step("deactivate happ-2").unwrap().outcome {
        StepOutcome::Failed { error, expected } => {
            assert!(expected);
            assert!(error.contains("purposeful signing error"), "{error}");
        }
        StepOutcome::Succeeded => panic!("deactivate must fail once agent 2 is denylisted"),
    }
}

#[tokio::test]
async fn healthy_agent_is_unaffected_after_fault_injection() {
    let dir = tempfile::tempdir().unwrap();
    let driver = Driver::new(test_config(dir.path()), InProcessBackend::new());

    let report = driver.run().await;

    assert!(report.step("install happ-3").unwrap().outcome.is_success());
    assert!(report.step("activate happ-3").unwrap().outcome.is_success());
    let final_listing = report.listing("final").unwrap();
    assert_eq!(final_listing.apps.len(), 3);
    assert!(
        final_listing
            .apps
            .iter()
            .filter(|app| app.installed_app_id != "happ-2")
            .all(|app| app.status.is_active())
    );
}

#[tokio::test]
async fn denylisted_agent_never_reaches_upstream_after_the_fault() {
    // Given: a completed run
    let dir = tempfile::tempdir().unwrap();
    let driver = Driver::new(test_config(dir.path()), InProcessBackend::new());
    let report = driver.run().await;
    assert!(report.completed);

    // Then: agent 2 is on the denylist
    let agent2 = agent(&report.agents[1]).key();
    assert!(driver.denylist().contains(&agent2));
    assert_eq!(driver.denylist().len(), 1);

    // Then: upstream saw agent 2 only for install and activate, before the fault
    let keystore = driver.backend().keystore();
    assert_eq!(keystore.signatures_for(&agent2), 2);
    let agent1 = agent(&report.agents[0]).key();
    assert_eq!(keystore.signatures_for(&agent1), 2);
    let agent3 = agent(&report.agents[2]).key();
    assert_eq!(keystore.signatures_for(&agent3), 2);

    // Then: the proxy counted one synthetic failure and no forward failures
    let stats = report.proxy.unwrap();
    assert_eq!(stats.synthetic_failures, 1);
    assert_eq!(stats.forward_failures, 0);
    assert_eq!(stats.frames_forwarded, 6);
}

#[tokio::test]
async fn app2_stays_active_when_deactivation_cannot_be_signed() {
    let dir = tempfile::tempdir().unwrap();
    let driver = Driver::new(test_config(dir.path()), InProcessBackend::new());
    let report = driver.run().await;

    let after = report.listing("after-deactivate").unwrap();
    let app2 = after
        .apps
        .iter()
        .find(|app| app.installed_app_id == "happ-2")
        .unwrap();
    assert!(app2.status.is_active());
    assert!(after.apps.iter().all(|app| app.installed_app_id != "happ-3"));
}

#[tokio::test]
async fn steps_are_recorded_in_stage_order() {
    let dir = tempfile::tempdir().unwrap();
    let driver = Driver::new(test_config(dir.path()), InProcessBackend::new());
    let report = driver.run().await;

    let steps: Vec<&str> = report.steps.iter().map(|s| s.step.as_str()).collect();
    assert_eq!(
        steps,
        vec![
            "generate agent 1",
            "generate agent 2",
            "generate agent 3",
            "install happ-1",
            "activate happ-1",
            "install happ-2",
            "activate happ-2",
            "deny agent 2",
            "deactivate happ-2",
            "list apps (after-deactivate)",
            "install happ-3",
            "activate happ-3",
            "list apps (final)",
        ]
    );
    assert!(report.steps.windows(2).all(|w| w[0].stage <= w[1].stage));
}

#[tokio::test]
async fn teardown_stops_proxy_then_conductor_then_keystore() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let proxy_socket = config.proxy_socket();
    let driver = Driver::new(config, InProcessBackend::new());

    let report = driver.run().await;

    let order: Vec<&str> = report.teardown.iter().map(|r| r.component.as_str()).collect();
    assert_eq!(order, vec!["signing-proxy", "conductor", "keystore"]);
    assert!(report.teardown.iter().all(|r| r.error.is_none()));
    assert!(driver.backend().conductor().is_stopped());
    assert!(driver.backend().keystore().is_stopped());
    assert!(!proxy_socket.exists());
}

#[tokio::test]
async fn report_serializes_to_json() {
    let dir = tempfile::tempdir().unwrap();
    let driver = Driver::new(test_config(dir.path()), InProcessBackend::new());
    let report = driver.run().await;

    let value: serde_json::Value = serde_json::from_str(&report.to_json_pretty().unwrap()).unwrap();
    assert_eq!(value["completed"], true);
    assert_eq!(value["reached"], "teardown");
    assert_eq!(value["run_id"].as_str().unwrap().len(), 36);
    assert_eq!(value["proxy"]["synthetic_failures"], 1);
    assert_eq!(value["listings"][1]["label"], "final");
}
