use crate::integration::support::{
    catalog, client, client_with_clock, entry, incompatible_metadata, metadata, registry_config,
    FakeTransport,
};
use agent_catalog::error::ApiError;
use agent_catalog::install::{Orchestrator, OrchestratorConfig};
use agent_catalog::ledger::Ledger;
use agent_catalog::registry::RegistryClient;
use agent_catalog::types::{InstallSpec, ItemId, Target};
use std::sync::Arc;
use tempfile::TempDir;

fn spec(raw: &str) -> InstallSpec {
    InstallSpec::parse(raw).unwrap()
}

fn orchestrator(registry: Arc<RegistryClient>, dir: &TempDir) -> Orchestrator {
    Orchestrator::new(
        registry,
        Arc::new(Ledger::new(dir.path())),
        OrchestratorConfig::default(),
    )
}

#[tokio::test]
async fn partial_failure_keeps_going() {
    let transport = FakeTransport::new();
    transport.serve_agent("acme/first", &metadata("acme/first", "1.0.0"), "# First");
    transport.serve_agent("acme/third", &metadata("acme/third", "3.0.0"), "# Third");
    let dir = TempDir::new().unwrap();
    let orchestrator = orchestrator(client(&transport), &dir);

    let report = orchestrator
        .install_batch(
            &[spec("acme/first"), spec("acme/second"), spec("acme/third")],
            Target::ClaudeCode,
            false,
        )
        .await;

    assert_eq!(report.success_count(), 2);
    assert_eq!(report.failed_ids(), vec!["acme/second"]);
    assert!(matches!(report.failed[0].error, ApiError::Transport(_)));

    let first = dir.path().join("acme").join("first.md");
    let third = dir.path().join("acme").join("third.md");
    assert_eq!(std::fs::read_to_string(first).unwrap(), "# First");
    assert_eq!(std::fs::read_to_string(third).unwrap(), "# Third");
    assert!(!dir.path().join("acme").join("second.md").exists());

    let records = orchestrator.ledger().list_installed().unwrap();
    let rows: Vec<(&str, &str)> = records
        .iter()
        .map(|r| (r.id.as_str(), r.version.as_str()))
        .collect();
    assert_eq!(rows, vec![("acme/first", "1.0.0"), ("acme/third", "3.0.0")]);
}

#[tokio::test]
async fn results_keep_request_order() {
    let transport = FakeTransport::new();
    let names = ["a", "b", "c", "d", "e", "f"];
    for name in names {
        let id = format!("acme/{}", name);
        transport.serve_agent(&id, &metadata(&id, "1.0.0"), name);
    }
    let dir = TempDir::new().unwrap();
    let orchestrator = orchestrator(client(&transport), &dir);

    let specs: Vec<InstallSpec> = names.iter().map(|n| spec(&format!("acme/{}", n))).collect();
    let report = orchestrator.install_batch(&specs, Target::ClaudeCode, false).await;

    let ids: Vec<String> = report.succeeded.iter().map(|i| i.id.to_string()).collect();
    let expected: Vec<String> = names.iter().map(|n| format!("acme/{}", n)).collect();
    assert_eq!(ids, expected);
}

#[tokio::test]
async fn compatibility_gate_blocks_install() {
    let transport = FakeTransport::new();
    transport.serve_agent(
        "acme/codex-only",
        &incompatible_metadata("acme/codex-only", "1.0.0"),
        "# Codex only",
    );
    let dir = TempDir::new().unwrap();
    let orchestrator = orchestrator(client(&transport), &dir);

    let report = orchestrator
        .install_batch(&[spec("acme/codex-only")], Target::ClaudeCode, false)
        .await;

    assert_eq!(report.success_count(), 0);
    assert!(matches!(
        report.failed[0].error,
        ApiError::Compatibility { .. }
    ));
    assert_eq!(transport.hits("agents/acme/codex-only/agent.md"), 0);
    assert!(!dir.path().join("acme").join("codex-only.md").exists());
    assert!(orchestrator.ledger().list_installed().unwrap().is_empty());
}

#[tokio::test]
async fn compatibility_is_checked_per_target() {
    let transport = FakeTransport::new();
    transport.serve_agent("acme/claude", &metadata("acme/claude", "1.0.0"), "# Claude");
    let dir = TempDir::new().unwrap();
    let orchestrator = orchestrator(client(&transport), &dir);

    let report = orchestrator
        .install_batch(&[spec("acme/claude")], Target::Codex, false)
        .await;
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].error.kind(), "compatibility");
}

#[tokio::test]
async fn dry_run_writes_nothing() {
    let transport = FakeTransport::new();
    transport.serve_agent("acme/reviewer", &metadata("acme/reviewer", "1.2.0"), "# Reviewer");
    let dir = TempDir::new().unwrap();
    let orchestrator = orchestrator(client(&transport), &dir);

    let report = orchestrator
        .install_batch(&[spec("acme/reviewer")], Target::ClaudeCode, true)
        .await;

    assert!(report.dry_run);
    assert_eq!(report.succeeded[0].version, "1.2.0");
    assert_eq!(
        report.succeeded[0].path,
        dir.path().join("acme").join("reviewer.md")
    );
    assert_eq!(transport.hits("agents/acme/reviewer/agent.md"), 0);
    assert!(!orchestrator.ledger().ledger_path().exists());
    assert!(!dir.path().join("acme").exists());
}

#[tokio::test]
async fn pinned_version_is_recorded_and_fetched() {
    let transport = FakeTransport::new();
    transport.serve_agent("acme/reviewer", &metadata("acme/reviewer", "1.2.0"), "# Latest");
    transport.route("agents/acme/reviewer/reviewer_v1.0.0.md", "# Old");
    let mut config = registry_config();
    config.versioned_content = true;
    let (_clock, registry) = client_with_clock(&transport, &config);
    let dir = TempDir::new().unwrap();
    let orchestrator = orchestrator(registry, &dir);

    let report = orchestrator
        .install_batch(&[spec("acme/reviewer@1.0.0")], Target::ClaudeCode, false)
        .await;
    assert!(report.is_success());

    let path = dir.path().join("acme").join("reviewer.md");
    assert_eq!(std::fs::read_to_string(path).unwrap(), "# Old");
    let record = orchestrator
        .ledger()
        .get_installed(&ItemId::parse("acme/reviewer").unwrap())
        .unwrap();
    assert_eq!(record.version, "1.0.0");
}

#[tokio::test]
async fn duplicate_ids_leave_one_row() {
    let transport = FakeTransport::new();
    transport.serve_agent("acme/reviewer", &metadata("acme/reviewer", "1.2.0"), "# Reviewer");
    let dir = TempDir::new().unwrap();
    let orchestrator = orchestrator(client(&transport), &dir);

    let report = orchestrator
        .install_batch(
            &[spec("acme/reviewer"), spec("acme/reviewer")],
            Target::ClaudeCode,
            false,
        )
        .await;

    assert_eq!(report.success_count(), 2);
    assert_eq!(orchestrator.ledger().list_installed().unwrap().len(), 1);
}

#[tokio::test]
async fn install_all_uses_catalog() {
    let transport = FakeTransport::new();
    transport.serve_catalog(&catalog(vec![
        entry("acme/a", "development", &[], 1, 1.0),
        entry("acme/b", "development", &[], 2, 2.0),
    ]));
    transport.serve_agent("acme/a", &metadata("acme/a", "1.0.0"), "# A");
    transport.serve_agent("acme/b", &metadata("acme/b", "1.0.0"), "# B");
    let dir = TempDir::new().unwrap();
    let orchestrator = orchestrator(client(&transport), &dir);

    let report = orchestrator
        .install_all(Target::ClaudeCode, false)
        .await
        .unwrap();

    assert_eq!(report.success_count(), 2);
    assert_eq!(orchestrator.ledger().list_installed().unwrap().len(), 2);
}

#[tokio::test]
async fn uninstall_removes_file_and_row() {
    let transport = FakeTransport::new();
    transport.serve_agent("acme/reviewer", &metadata("acme/reviewer", "1.2.0"), "# Reviewer");
    let dir = TempDir::new().unwrap();
    let orchestrator = orchestrator(client(&transport), &dir);
    orchestrator
        .install_batch(&[spec("acme/reviewer")], Target::ClaudeCode, false)
        .await;

    let id = ItemId::parse("acme/reviewer").unwrap();
    let record = orchestrator.uninstall(&id).await.unwrap();

    assert_eq!(record.version, "1.2.0");
    assert!(!record.path.exists());
    assert!(orchestrator.ledger().list_installed().unwrap().is_empty());
}

#[tokio::test]
async fn uninstall_unknown_id_is_not_found() {
    let transport = FakeTransport::new();
    let dir = TempDir::new().unwrap();
    let orchestrator = orchestrator(client(&transport), &dir);

    let err = orchestrator
        .uninstall(&ItemId::parse("acme/ghost").unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

#[tokio::test]
async fn uninstall_tolerates_missing_content_file() {
    let transport = FakeTransport::new();
    let dir = TempDir::new().unwrap();
    let orchestrator = orchestrator(client(&transport), &dir);
    let id = ItemId::parse("acme/gone").unwrap();
    let path = orchestrator.ledger().resolve_path(&id);
    orchestrator
        .ledger()
        .record_install_version(&id, "1.0.0", &path)
        .unwrap();

    orchestrator.uninstall(&id).await.unwrap();
    assert!(!orchestrator.ledger().is_installed(&id).unwrap());
}

#[tokio::test]
async fn uninstall_drops_row_even_when_file_removal_fails() {
    let transport = FakeTransport::new();
    let dir = TempDir::new().unwrap();
    let orchestrator = orchestrator(client(&transport), &dir);
    let id = ItemId::parse("acme/stuck").unwrap();
    let path = orchestrator.ledger().resolve_path(&id);
    // A non-empty directory where the content file should be cannot be unlinked.
    std::fs::create_dir_all(&path).unwrap();
    std::fs::write(path.join("keep"), "x").unwrap();
    orchestrator
        .ledger()
        .record_install_version(&id, "1.0.0", &path)
        .unwrap();

    let err = orchestrator.uninstall(&id).await.unwrap_err();

    assert_eq!(err.kind(), "filesystem");
    assert!(!orchestrator.ledger().is_installed(&id).unwrap());
}

#[tokio::test]
async fn wide_batch_records_every_id() {
    let transport = FakeTransport::new();
    let ids: Vec<String> = (0..24).map(|i| format!("acme/agent-{:02}", i)).collect();
    for raw in &ids {
        transport.serve_agent(raw, &metadata(raw, "1.0.0"), "# Agent");
    }
    let dir = TempDir::new().unwrap();
    let orchestrator = Orchestrator::new(
        client(&transport),
        Arc::new(Ledger::new(dir.path())),
        OrchestratorConfig {
            concurrency: 16,
            ..OrchestratorConfig::default()
        },
    );

    let specs: Vec<InstallSpec> = ids.iter().map(|raw| spec(raw)).collect();
    let report = orchestrator.install_batch(&specs, Target::ClaudeCode, false).await;

    assert!(report.is_success());
    assert_eq!(report.success_count(), 24);
    let rows = orchestrator.ledger().list_installed().unwrap();
    assert_eq!(rows.len(), 24);
    assert!(rows.iter().all(|r| r.path.exists()));
}
