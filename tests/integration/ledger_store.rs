use agent_catalog::ledger::{Ledger, LEDGER_FILE};
use agent_catalog::types::ItemId;
use std::sync::Arc;
use tempfile::TempDir;

fn id(raw: &str) -> ItemId {
    ItemId::parse(raw).unwrap()
}

#[test]
fn ledger_persists_across_instances() {
    let dir = TempDir::new().unwrap();
    {
        let ledger = Ledger::new(dir.path());
        let path = ledger.resolve_path(&id("acme/reviewer"));
        ledger
            .record_install_version(&id("acme/reviewer"), "1.2.0", &path)
            .unwrap();
    }

    let reopened = Ledger::new(dir.path());
    let record = reopened.get_installed(&id("acme/reviewer")).unwrap();
    assert_eq!(record.version, "1.2.0");
    assert_eq!(record.path, dir.path().join("acme").join("reviewer.md"));
    assert!(dir.path().join(LEDGER_FILE).exists());
}

#[test]
fn content_file_without_row_is_not_installed() {
    let dir = TempDir::new().unwrap();
    let ledger = Ledger::new(dir.path());
    let path = ledger.resolve_path(&id("stray"));
    std::fs::write(&path, "# Stray").unwrap();

    assert!(!ledger.is_installed(&id("stray")).unwrap());
    assert!(ledger.list_installed().unwrap().is_empty());
}

#[test]
fn no_temp_files_left_behind() {
    let dir = TempDir::new().unwrap();
    let ledger = Ledger::new(dir.path());
    for i in 0..5 {
        let item = id(&format!("agent-{}", i));
        ledger.record_install(&item, &ledger.resolve_path(&item)).unwrap();
    }

    let entries: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(entries, vec![LEDGER_FILE.to_string()]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_tasks_do_not_lose_rows() {
    let dir = TempDir::new().unwrap();
    let ledger = Arc::new(Ledger::new(dir.path()));

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let ledger = ledger.clone();
            tokio::task::spawn_blocking(move || {
                let item = id(&format!("acme/agent-{}", i));
                ledger
                    .record_install_version(&item, "1.0.0", &ledger.resolve_path(&item))
                    .unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(ledger.list_installed().unwrap().len(), 16);
}
