use crate::integration::support::{catalog, client, entry, metadata, FakeTransport};
use agent_catalog::config::AgentsConfig;
use agent_catalog::error::ApiError;
use agent_catalog::tooling::cli::{Cli, CliContext, Commands, ConfigCommands};
use clap::{CommandFactory, Parser};
use std::sync::Arc;
use tempfile::TempDir;

fn context(transport: &Arc<FakeTransport>, dir: &TempDir) -> CliContext {
    CliContext::with_registry(
        AgentsConfig::default(),
        Some(dir.path().join("config.toml")),
        Some(dir.path().join("agents")),
        client(transport),
    )
    .unwrap()
}

fn install(specs: &[&str], format: &str) -> Commands {
    Commands::Install {
        specs: specs.iter().map(|s| s.to_string()).collect(),
        target: None,
        dry_run: false,
        from_file: None,
        all: false,
        format: format.to_string(),
    }
}

#[test]
fn parse_valid_command_matrix() {
    let cases: Vec<Vec<&str>> = vec![
        vec!["agents", "search"],
        vec!["agents", "search", "review", "--category", "development", "--sort", "rating"],
        vec!["agents", "list", "--installed", "--format", "json"],
        vec!["agents", "list", "--updates"],
        vec!["agents", "categories"],
        vec!["agents", "info", "acme/reviewer"],
        vec!["agents", "install", "acme/reviewer@1.0.0", "--dry-run"],
        vec!["agents", "install", "--all", "--target", "codex"],
        vec!["agents", "install", "--from-file", "agents.txt"],
        vec!["agents", "update", "--check"],
        vec!["agents", "update", "acme/reviewer"],
        vec!["agents", "uninstall", "acme/reviewer", "--force"],
        vec!["agents", "config", "show"],
        vec!["agents", "config", "init", "--force"],
        vec!["agents", "--install-dir", "/tmp/agents", "list", "--installed"],
    ];

    for args in cases {
        let parsed = Cli::try_parse_from(args.clone());
        assert!(parsed.is_ok(), "expected valid parse for args: {args:?}");
    }
}

#[test]
fn parse_rejects_conflicting_flags() {
    assert!(Cli::try_parse_from(["agents", "list", "--installed", "--updates"]).is_err());
    assert!(Cli::try_parse_from(["agents", "install", "--all", "--from-file", "x.txt"]).is_err());
}

#[test]
fn cli_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn search_json_contract() {
    let transport = FakeTransport::new();
    transport.serve_catalog(&catalog(vec![
        entry("acme/reviewer", "development", &["review"], 10, 4.0),
        entry("acme/writer", "writing", &["docs"], 20, 3.0),
    ]));
    let dir = TempDir::new().unwrap();
    let cli = context(&transport, &dir);

    let output = cli
        .execute(&Commands::Search {
            query: Some("review".to_string()),
            category: None,
            tag: None,
            author: None,
            sort: "downloads".to_string(),
            limit: 0,
            target: Some("claude-code".to_string()),
            format: "json".to_string(),
        })
        .unwrap();

    let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
    let rows = parsed.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], "acme/reviewer");
    assert_eq!(rows[0]["ratingCount"], 0);
    cli.shutdown();
}

#[test]
fn install_then_list_installed() {
    let transport = FakeTransport::new();
    transport.serve_agent("acme/reviewer", &metadata("acme/reviewer", "1.2.0"), "# Reviewer");
    let dir = TempDir::new().unwrap();
    let cli = context(&transport, &dir);

    let output = cli.execute(&install(&["acme/reviewer"], "text")).unwrap();
    assert!(output.contains("acme/reviewer@1.2.0"));

    let listed = cli
        .execute(&Commands::List {
            installed: true,
            updates: false,
            category: None,
            target: None,
            format: "json".to_string(),
        })
        .unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&listed).unwrap();
    assert_eq!(parsed[0]["id"], "acme/reviewer");
    assert_eq!(parsed[0]["version"], "1.2.0");
    assert!(parsed[0]["installedAt"].is_string());
}

#[test]
fn install_with_failures_is_an_error_carrying_the_report() {
    let transport = FakeTransport::new();
    transport.serve_agent("acme/reviewer", &metadata("acme/reviewer", "1.2.0"), "# Reviewer");
    let dir = TempDir::new().unwrap();
    let cli = context(&transport, &dir);

    let err = cli
        .execute(&install(&["acme/reviewer", "acme/missing"], "json"))
        .unwrap_err();

    let ApiError::PartialFailure(rendered) = err else {
        panic!("expected partial failure");
    };
    let parsed: serde_json::Value = serde_json::from_str(&rendered).unwrap();
    assert_eq!(parsed["succeeded"].as_array().unwrap().len(), 1);
    assert_eq!(parsed["failed"][0]["id"], "acme/missing");
    assert_eq!(parsed["failed"][0]["kind"], "transport");
    assert!(dir.path().join("agents").join("acme").join("reviewer.md").exists());
}

#[test]
fn install_reads_spec_file() {
    let transport = FakeTransport::new();
    transport.serve_agent("acme/a", &metadata("acme/a", "1.0.0"), "# A");
    transport.serve_agent("acme/b", &metadata("acme/b", "1.0.0"), "# B");
    let dir = TempDir::new().unwrap();
    let list = dir.path().join("agents.txt");
    std::fs::write(&list, "# team set\nacme/a\n\nacme/b\n").unwrap();
    let cli = context(&transport, &dir);

    let output = cli
        .execute(&Commands::Install {
            specs: vec![],
            target: None,
            dry_run: true,
            from_file: Some(list),
            all: false,
            format: "text".to_string(),
        })
        .unwrap();

    assert!(output.contains("acme/a@1.0.0"));
    assert!(output.contains("acme/b@1.0.0"));
    assert!(!dir.path().join("agents").exists());
}

#[test]
fn install_without_specs_is_invalid() {
    let transport = FakeTransport::new();
    let dir = TempDir::new().unwrap();
    let cli = context(&transport, &dir);

    let err = cli.execute(&install(&[], "text")).unwrap_err();
    assert_eq!(err.kind(), "invalid_input");
}

#[test]
fn invalid_target_is_rejected() {
    let transport = FakeTransport::new();
    let dir = TempDir::new().unwrap();
    let cli = context(&transport, &dir);

    let err = cli
        .execute(&Commands::Install {
            specs: vec!["acme/a".to_string()],
            target: Some("emacs".to_string()),
            dry_run: false,
            from_file: None,
            all: false,
            format: "text".to_string(),
        })
        .unwrap_err();
    assert_eq!(err.kind(), "invalid_input");
}

#[test]
fn config_init_and_show() {
    let transport = FakeTransport::new();
    let dir = TempDir::new().unwrap();
    let cli = context(&transport, &dir);

    cli.execute(&Commands::Config {
        command: ConfigCommands::Init { force: false },
    })
    .unwrap();
    let written = std::fs::read_to_string(dir.path().join("config.toml")).unwrap();
    assert!(written.contains("[registry]"));

    let shown = cli
        .execute(&Commands::Config {
            command: ConfigCommands::Show {
                format: "json".to_string(),
            },
        })
        .unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&shown).unwrap();
    assert_eq!(parsed["registry"]["cache_ttl_secs"], 300);
    assert_eq!(parsed["install"]["target"], "claude-code");
}
