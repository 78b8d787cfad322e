use crate::integration::support::{client, metadata, FakeTransport};
use agent_catalog::error::ApiError;
use agent_catalog::install::{Orchestrator, OrchestratorConfig};
use agent_catalog::ledger::Ledger;
use agent_catalog::types::ItemId;
use std::sync::Arc;
use tempfile::TempDir;

fn id(raw: &str) -> ItemId {
    ItemId::parse(raw).unwrap()
}

struct Fixture {
    transport: Arc<FakeTransport>,
    orchestrator: Orchestrator,
    _dir: TempDir,
}

/// Ledger with `acme/current@1.0.0` and `acme/stale@1.0.0`; the catalog has 1.0.0 and
/// 1.1.0 as their latest versions.
fn fixture() -> Fixture {
    let transport = FakeTransport::new();
    transport.serve_agent("acme/current", &metadata("acme/current", "1.0.0"), "# Current");
    transport.serve_agent("acme/stale", &metadata("acme/stale", "1.1.0"), "# Stale v1.1");

    let dir = TempDir::new().unwrap();
    let ledger = Arc::new(Ledger::new(dir.path()));
    for raw in ["acme/current", "acme/stale"] {
        let item = id(raw);
        let path = ledger.resolve_path(&item);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "# v1.0").unwrap();
        ledger.record_install_version(&item, "1.0.0", &path).unwrap();
    }

    let orchestrator = Orchestrator::new(client(&transport), ledger, OrchestratorConfig::default());
    Fixture {
        transport,
        orchestrator,
        _dir: dir,
    }
}

#[tokio::test]
async fn check_reports_current_and_updatable() {
    let fixture = fixture();

    let statuses = fixture.orchestrator.check_updates().await.unwrap();
    assert_eq!(statuses.len(), 2);

    let current = statuses.iter().find(|s| s.id == id("acme/current")).unwrap();
    assert!(current.is_current());

    let stale = statuses.iter().find(|s| s.id == id("acme/stale")).unwrap();
    assert!(!stale.is_current());
    assert_eq!(stale.installed_version, "1.0.0");
    assert_eq!(stale.latest_version, "1.1.0");
}

#[tokio::test]
async fn check_skips_ids_whose_metadata_fails() {
    let fixture = fixture();
    fixture.transport.remove("agents/acme/stale/metadata.json");

    let statuses = fixture.orchestrator.check_updates().await.unwrap();
    let ids: Vec<&str> = statuses.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["acme/current"]);
}

#[tokio::test]
async fn update_all_reinstalls_only_drifted() {
    let fixture = fixture();

    let report = fixture.orchestrator.update_batch(&[]).await.unwrap();

    assert!(report.is_success());
    assert_eq!(report.succeeded.len(), 1);
    assert_eq!(report.succeeded[0].id, id("acme/stale"));
    assert_eq!(report.succeeded[0].version, "1.1.0");
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].id, id("acme/current"));

    let ledger = fixture.orchestrator.ledger();
    let stale = ledger.get_installed(&id("acme/stale")).unwrap();
    assert_eq!(stale.version, "1.1.0");
    assert_eq!(std::fs::read_to_string(&stale.path).unwrap(), "# Stale v1.1");
    assert_eq!(fixture.transport.hits("agents/acme/current/agent.md"), 0);

    let statuses = fixture.orchestrator.check_updates().await.unwrap();
    assert!(statuses.iter().all(|s| s.is_current()));
}

#[tokio::test]
async fn update_unknown_id_fails_without_stopping_others() {
    let fixture = fixture();

    let report = fixture
        .orchestrator
        .update_batch(&[id("acme/ghost"), id("acme/stale")])
        .await
        .unwrap();

    assert_eq!(report.failed_ids(), vec!["acme/ghost"]);
    assert!(matches!(report.failed[0].error, ApiError::NotFound(_)));
    assert_eq!(report.succeeded.len(), 1);
}

#[tokio::test]
async fn placeholder_version_is_reported_as_drift() {
    let fixture = fixture();
    let ledger = fixture.orchestrator.ledger();
    let item = id("acme/current");
    ledger.record_uninstall(&item).unwrap();
    ledger.record_install(&item, &ledger.resolve_path(&item)).unwrap();

    let statuses = fixture.orchestrator.check_updates().await.unwrap();
    let current = statuses.iter().find(|s| s.id == item).unwrap();
    assert_eq!(current.installed_version, "latest");
    assert!(!current.is_current());
}

#[tokio::test]
async fn missing_latest_is_never_reinstalled() {
    let fixture = fixture();
    let item = id("acme/unversioned");
    fixture.transport.serve_agent(
        "acme/unversioned",
        &serde_json::json!({"id": "acme/unversioned", "latest": "", "compatibility": {"claudeCode": {}}}),
        "# Unversioned",
    );
    let ledger = fixture.orchestrator.ledger();
    ledger.record_install(&item, &ledger.resolve_path(&item)).unwrap();

    for _ in 0..3 {
        let report = fixture
            .orchestrator
            .update_batch(std::slice::from_ref(&item))
            .await
            .unwrap();
        assert!(report.is_success());
        assert!(report.succeeded.is_empty());
        assert_eq!(report.skipped.len(), 1);
    }
    assert_eq!(fixture.transport.hits("agents/acme/unversioned/agent.md"), 0);
    assert_eq!(ledger.get_installed(&item).unwrap().version, "latest");

    let statuses = fixture.orchestrator.check_updates().await.unwrap();
    assert!(statuses.iter().all(|s| s.id != item));
}
