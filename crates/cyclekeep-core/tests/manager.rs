use cyclekeep_core::{new_identity, CoreError, CreateOutcome, Manager, StateKind};
use cyclekeep_remote::{AccountStatus, CreateResourceReply, MockRemote};
use cyclekeep_schema::{resolve_identity, KeyPair, ResourceRecord, SerializedManager};
use serde_json::json;
use std::sync::Arc;

fn profile_with(resources: &[(&str, &str, u64)]) -> SerializedManager {
    let mut profile = new_identity().unwrap();
    profile.resources = resources
        .iter()
        .map(|(nickname, id, remaining)| ResourceRecord::new(*nickname, *id, *remaining))
        .collect();
    profile
}

fn booted(resources: &[(&str, &str, u64)]) -> (Arc<MockRemote>, Manager<MockRemote>) {
    let mock = Arc::new(MockRemote::new());
    let manager = Manager::with_shared_client(Arc::clone(&mock));
    assert_eq!(
        manager.boot(&profile_with(resources).to_json()),
        StateKind::Initialized
    );
    (mock, manager)
}

async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

// --- boot ---

#[test]
fn empty_keys_boot_uninitialized_regardless_of_resources() {
    let manager = Manager::new(MockRemote::new());
    let blobs = [
        json!({"resources": [], "publicKey": "", "privateKey": ""}),
        json!({"resources": [{"nickname": "a", "id": "c-1"}], "publicKey": "", "privateKey": ""}),
        json!({"resources": [{"nickname": "a", "id": "c-1"}], "publicKey": "ab", "privateKey": ""}),
        json!({"resources": [], "publicKey": "", "privateKey": "cd"}),
    ];
    for blob in &blobs {
        assert_eq!(manager.boot(blob), StateKind::Uninitialized, "blob: {blob}");
        assert!(manager.read_model().resources.is_empty());
        assert!(manager.read_model().error.is_empty());
    }
}

#[test]
fn validation_runs_before_identity_resolution() {
    let manager = Manager::new(MockRemote::new());
    // Unusable keys, but the resource list is malformed first.
    let blob = json!({
        "resources": [{"nickname": "a", "id": 7}],
        "publicKey": "not-hex",
        "privateKey": "not-hex"
    });
    assert_eq!(manager.boot(&blob), StateKind::Errored);
    let error = manager.read_model().error;
    assert!(error.contains("resources[0].id: expected string, found integer"));
    assert!(error.contains(" : object : "));
    assert!(!error.contains("invalid public key"));
}

#[test]
fn non_object_blob_is_errored_with_raw_text() {
    let manager = Manager::new(MockRemote::new());
    assert_eq!(manager.boot(&json!(null)), StateKind::Errored);
    assert!(manager.read_model().error.ends_with(" : null : null"));
}

#[test]
fn mismatched_keys_are_errored() {
    let first = new_identity().unwrap();
    let second = new_identity().unwrap();
    let blob = json!({
        "resources": [],
        "publicKey": first.public_key,
        "privateKey": second.private_key,
    });
    let manager = Manager::new(MockRemote::new());
    assert_eq!(manager.boot(&blob), StateKind::Errored);
    assert!(manager.export().is_err());
}

#[test]
fn legacy_field_names_boot() {
    let profile = new_identity().unwrap();
    let blob = json!({
        "canisters": [
            {"nickname": "alpha", "id": "c-1", "remainingCyclesInfo": {"remainingCycles": 55}}
        ],
        "publicKey": profile.public_key,
        "privateKey": profile.private_key,
    });
    let manager = Manager::new(MockRemote::new());
    assert_eq!(manager.boot(&blob), StateKind::Initialized);
    let resources = manager.read_model().resources;
    assert_eq!(resources[0].remaining_quota, 55);
    assert!(resources[0].loading);
}

#[test]
fn new_identity_then_boot_scenario() {
    let manager = Manager::new(MockRemote::new());
    let empty = json!({"resources": [], "publicKey": "", "privateKey": ""});
    assert_eq!(manager.boot(&empty), StateKind::Uninitialized);

    let fresh = manager.new_identity().unwrap();
    assert!(fresh.resources.is_empty());
    assert!(!fresh.public_key.is_empty());
    assert!(!fresh.private_key.is_empty());
    assert_eq!(manager.kind(), StateKind::Uninitialized);

    assert_eq!(manager.boot(&fresh.to_json()), StateKind::Initialized);
    let model = manager.read_model();
    assert!(model.resources.is_empty());

    let expected = resolve_identity(&KeyPair::new(&fresh.public_key, &fresh.private_key))
        .unwrap()
        .account;
    assert_eq!(model.account_id, expected.as_str());

    // Same keys, same account.
    manager.boot(&fresh.to_json());
    assert_eq!(manager.read_model().account_id, expected.as_str());
}

// --- export ---

#[test]
fn export_round_trips_resources_and_keys() {
    let profile = profile_with(&[("alpha", "c-1", 0), ("", "c-2", 9_000), ("gamma", "", 1)]);
    let manager = Manager::new(MockRemote::new());
    manager.boot(&profile.to_json());
    assert_eq!(manager.export().unwrap(), profile);
}

#[test]
fn export_after_logout_is_empty() {
    let (_, manager) = booted(&[("alpha", "c-1", 3)]);
    manager.log_out();
    assert_eq!(manager.export().unwrap(), SerializedManager::empty());
}

#[test]
fn export_from_errored_fails_with_message() {
    let manager = Manager::new(MockRemote::new());
    manager.boot(&json!("garbage"));
    match manager.export() {
        Err(CoreError::Errored(message)) => assert!(message.contains("garbage")),
        other => panic!("expected errored export, got {other:?}"),
    }
}

// --- create ---

#[tokio::test]
async fn create_is_noop_when_uninitialized() {
    let mock = Arc::new(MockRemote::new());
    let manager = Manager::with_shared_client(Arc::clone(&mock));
    assert_eq!(manager.create_resource("alpha").await, CreateOutcome::Skipped);
    assert_eq!(mock.create_calls(), 0);
    assert_eq!(manager.kind(), StateKind::Uninitialized);
}

#[tokio::test]
async fn create_then_reject_scenario() {
    let (mock, manager) = booted(&[]);
    mock.push_create_reply(CreateResourceReply::created("c-1"));
    mock.push_create_reply(CreateResourceReply::rejected("quota exceeded"));

    let first = manager.create_resource("alpha").await;
    assert!(matches!(first, CreateOutcome::Created(ref view) if view.id == "c-1"));
    let model = manager.read_model();
    assert_eq!(model.resources.len(), 1);
    assert_eq!(model.resources[0].nickname, "alpha");
    assert_eq!(model.resources[0].remaining_quota, 0);
    assert!(model.resources[0].loading);
    assert!(!model.creating);

    let second = manager.create_resource("beta").await;
    assert_eq!(second, CreateOutcome::Rejected("quota exceeded".to_owned()));
    let model = manager.read_model();
    assert_eq!(model.resources.len(), 1);
    assert_eq!(model.error, "quota exceeded");
    assert!(!model.creating);
}

#[tokio::test]
async fn creating_flag_is_visible_while_in_flight() {
    let (mock, manager) = booted(&[]);
    let gate = mock.gate_create();

    let task = {
        let manager = manager.clone();
        tokio::spawn(async move { manager.create_resource("alpha").await })
    };
    settle().await;
    assert!(manager.read_model().creating);

    gate.release();
    task.await.unwrap();
    let model = manager.read_model();
    assert!(!model.creating);
    assert_eq!(model.resources.len(), 1);
}

#[tokio::test]
async fn dropped_create_clears_creating_flag() {
    let (mock, manager) = booted(&[("alpha", "c-1", 5)]);
    let _gate = mock.gate_create();

    let task = {
        let manager = manager.clone();
        tokio::spawn(async move { manager.create_resource("beta").await })
    };
    settle().await;
    assert!(manager.read_model().creating);

    task.abort();
    assert!(task.await.unwrap_err().is_cancelled());
    let model = manager.read_model();
    assert!(!model.creating);
    assert!(model.error.is_empty());
    assert_eq!(model.resources.len(), 1);
}

#[tokio::test]
async fn transport_failure_clears_flag_and_keeps_resources() {
    let (mock, manager) = booted(&[("alpha", "c-1", 5)]);
    mock.fail_next_create("connection refused");

    let outcome = manager.create_resource("beta").await;
    assert!(matches!(outcome, CreateOutcome::Failed(ref e) if e.contains("connection refused")));
    let model = manager.read_model();
    assert!(!model.creating);
    assert!(model.error.contains("connection refused"));
    assert_eq!(model.resources.len(), 1);
    assert_eq!(mock.create_calls(), 1);
}

#[tokio::test]
async fn next_create_clears_previous_error() {
    let (mock, manager) = booted(&[]);
    mock.push_create_reply(CreateResourceReply::rejected("quota exceeded"));
    manager.create_resource("alpha").await;
    assert_eq!(manager.read_model().error, "quota exceeded");

    manager.create_resource("beta").await;
    let model = manager.read_model();
    assert!(model.error.is_empty());
    assert_eq!(model.resources.len(), 1);
}

#[tokio::test]
async fn create_settling_after_logout_is_dropped() {
    let (mock, manager) = booted(&[]);
    let gate = mock.gate_create();
    let task = {
        let manager = manager.clone();
        tokio::spawn(async move { manager.create_resource("alpha").await })
    };
    settle().await;

    manager.log_out();
    gate.release();
    task.await.unwrap();
    assert_eq!(manager.kind(), StateKind::Uninitialized);
    assert!(manager.read_model().resources.is_empty());
}

#[tokio::test]
async fn create_settling_after_reboot_is_dropped() {
    let (mock, manager) = booted(&[]);
    let gate = mock.gate_create();
    let task = {
        let manager = manager.clone();
        tokio::spawn(async move { manager.create_resource("alpha").await })
    };
    settle().await;

    manager.boot(&profile_with(&[]).to_json());
    gate.release();
    task.await.unwrap();
    let model = manager.read_model();
    assert!(model.resources.is_empty());
    assert!(!model.creating);
}

// --- refresh ---

#[tokio::test]
async fn refresh_applies_successes_and_failures_independently() {
    let (mock, manager) = booted(&[("alpha", "c-1", 10), ("beta", "c-2", 20)]);
    mock.set_quota("c-1", 400);
    mock.fail_quota("c-2", "replica unavailable");

    assert_eq!(manager.refresh_quota().await, 2);
    let model = manager.read_model();
    let alpha = &model.resources[0];
    assert_eq!(alpha.remaining_quota, 400);
    assert!(!alpha.loading);
    assert!(alpha.error.is_empty());

    let beta = &model.resources[1];
    assert_eq!(beta.remaining_quota, 20);
    assert!(!beta.loading);
    assert!(beta.error.contains("replica unavailable"));
    assert!(beta.error.contains("c-2"));
}

#[tokio::test]
async fn refresh_results_apply_in_arrival_order() {
    for failing_first in [true, false] {
        let (mock, manager) = booted(&[("alpha", "c-1", 1), ("beta", "c-2", 2)]);
        mock.set_quota("c-1", 100);
        mock.fail_quota("c-2", "timeout");
        let gate_ok = mock.gate_quota("c-1");
        let gate_err = mock.gate_quota("c-2");

        let task = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.refresh_quota().await })
        };
        settle().await;

        let (first, second) = if failing_first {
            (gate_err, gate_ok)
        } else {
            (gate_ok, gate_err)
        };
        first.release();
        settle().await;

        let model = manager.read_model();
        if failing_first {
            assert_eq!(model.resources[1].error, "could not read cycles for c-2: HTTP error: timeout");
            assert!(model.resources[0].loading, "alpha must not wait on beta");
        } else {
            assert_eq!(model.resources[0].remaining_quota, 100);
            assert!(model.resources[1].loading, "beta must not wait on alpha");
        }

        second.release();
        assert_eq!(task.await.unwrap(), 2);
        let model = manager.read_model();
        assert_eq!(model.resources[0].remaining_quota, 100);
        assert!(model.resources[0].error.is_empty());
        assert_eq!(model.resources[1].remaining_quota, 2);
        assert!(!model.resources[1].error.is_empty());
    }
}

#[tokio::test]
async fn readings_after_logout_are_dropped() {
    let (mock, manager) = booted(&[("alpha", "c-1", 1)]);
    mock.set_quota("c-1", 50);
    let gate = mock.gate_quota("c-1");

    let task = {
        let manager = manager.clone();
        tokio::spawn(async move { manager.refresh_quota().await })
    };
    settle().await;
    manager.log_out();
    gate.release();
    task.await.unwrap();

    assert_eq!(manager.kind(), StateKind::Uninitialized);
    assert!(manager.read_model().resources.is_empty());
}

#[tokio::test]
async fn stale_readings_do_not_touch_a_new_profile() {
    let (mock, manager) = booted(&[("alpha", "c-1", 1)]);
    mock.set_quota("c-1", 50);
    let gate = mock.gate_quota("c-1");

    let task = {
        let manager = manager.clone();
        tokio::spawn(async move { manager.refresh_quota().await })
    };
    settle().await;

    manager.boot(&profile_with(&[("other", "c-9", 7)]).to_json());
    gate.release();
    task.await.unwrap();

    let model = manager.read_model();
    assert_eq!(model.resources.len(), 1);
    assert_eq!(model.resources[0].id, "c-9");
    assert_eq!(model.resources[0].remaining_quota, 7);
    assert!(model.resources[0].loading);
}

#[tokio::test]
async fn resource_created_mid_refresh_keeps_its_place() {
    let (mock, manager) = booted(&[("alpha", "c-1", 1)]);
    mock.set_quota("c-1", 60);
    mock.push_create_reply(CreateResourceReply::created("c-2"));
    let gate = mock.gate_quota("c-1");

    let task = {
        let manager = manager.clone();
        tokio::spawn(async move { manager.refresh_quota().await })
    };
    settle().await;
    manager.create_resource("beta").await;
    gate.release();
    task.await.unwrap();

    let model = manager.read_model();
    assert_eq!(model.resources.len(), 2);
    assert_eq!(model.resources[0].remaining_quota, 60);
    assert_eq!(model.resources[1].id, "c-2");
    assert!(model.resources[1].loading);
    assert_eq!(mock.quota_calls().len(), 1);
}

#[tokio::test]
async fn refresh_is_noop_without_resources() {
    let mock = Arc::new(MockRemote::new());
    let manager = Manager::with_shared_client(Arc::clone(&mock));
    assert_eq!(manager.refresh_quota().await, 0);
    manager.boot(&profile_with(&[]).to_json());
    assert_eq!(manager.refresh_quota().await, 0);
    assert!(mock.quota_calls().is_empty());
}

#[tokio::test]
async fn manager_error_survives_refresh_cycles() {
    let (mock, manager) = booted(&[("alpha", "c-1", 1)]);
    mock.set_quota("c-1", 2);
    mock.push_create_reply(CreateResourceReply::rejected("quota exceeded"));
    manager.create_resource("beta").await;
    manager.refresh_quota().await;
    assert_eq!(manager.read_model().error, "quota exceeded");
}

// --- account status ---

#[tokio::test]
async fn account_status_requires_identity() {
    let mock = Arc::new(MockRemote::new());
    mock.set_account_status(AccountStatus {
        resource_count: 2,
        remaining_quota: 1,
    });
    let manager = Manager::with_shared_client(Arc::clone(&mock));
    assert!(matches!(
        manager.account_status().await,
        Err(CoreError::NotInitialized)
    ));

    manager.boot(&profile_with(&[]).to_json());
    let status = manager.account_status().await.unwrap();
    assert_eq!(status.resource_count, 2);
}

#[tokio::test]
async fn account_status_propagates_remote_errors() {
    let (_, manager) = booted(&[]);
    assert!(matches!(
        manager.account_status().await,
        Err(CoreError::Remote(_))
    ));
}
