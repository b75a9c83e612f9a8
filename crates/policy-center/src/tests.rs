use crate::api::{InMemoryPolicyCenter, PolicyCenter};
use crate::defaults::default_snapshot;
use crate::errors::PolicyError;
use crate::loader::{load_snapshot, load_snapshot_with_options, LoadOptions};
use crate::model::{PolicySource, RuntimeOverrideSpec};
use std::env;
use std::sync::{Arc, Mutex, OnceLock};

#[test]
fn default_snapshot_matches_documented_defaults() {
    let snapshot = default_snapshot();
    assert_eq!(snapshot.executor.idle_timeout_ms, 10_000);
    assert_eq!(snapshot.executor.max_retries, 2);
    assert_eq!(snapshot.executor.backoff_ms, 500);
    assert_eq!(snapshot.nlu.confidence_threshold, 0.7);
    assert_eq!(snapshot.session.max_sessions, 10);
    assert_eq!(snapshot.resolver.max_candidates, 9);
    assert!(snapshot
        .safety
        .allowed_domains
        .iter()
        .any(|domain| domain == "wikipedia.org"));
    assert_eq!(snapshot.safety.restricted_actions.len(), 4);
}

#[test]
fn load_snapshot_applies_file() {
    let _guard = env_guard().lock().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let file_path = dir.path().join("lighthouse.yaml");
    std::fs::write(
        &file_path,
        r#"safety:
  allowed_domains: [example.com, "*.wikipedia.org"]
  domain_rules:
    - domain: example.com
      restricted_paths: ["/admin"]
      confirm_actions: [submit]
executor:
  max_retries: 3
  backoff_ms: 100
"#,
    )
    .unwrap();

    let snapshot = load_snapshot(Some(&file_path)).unwrap();
    assert_eq!(
        snapshot.safety.allowed_domains,
        vec!["example.com".to_string(), "*.wikipedia.org".to_string()]
    );
    assert_eq!(snapshot.safety.domain_rules[0].restricted_paths, vec!["/admin"]);
    assert_eq!(snapshot.executor.max_retries, 3);
    assert_eq!(snapshot.executor.idle_timeout_ms, 10_000);
    assert_eq!(
        snapshot.source_of("executor.backoff_ms"),
        Some(PolicySource::File)
    );
    assert_eq!(
        snapshot.source_of("executor.idle_timeout_ms"),
        Some(PolicySource::Builtin)
    );
}

#[test]
fn unknown_paths_and_bad_values_are_rejected() {
    let _guard = env_guard().lock().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let file_path = dir.path().join("bad.yaml");
    std::fs::write(&file_path, "executor:\n  max_retrys: 3\n").unwrap();
    let err = load_snapshot(Some(&file_path)).unwrap_err();
    assert!(matches!(err, PolicyError::UnsupportedPath(path) if path == "executor.max_retrys"));

    std::fs::write(&file_path, "nlu:\n  confidence_threshold: 1.5\n").unwrap();
    let err = load_snapshot(Some(&file_path)).unwrap_err();
    assert!(matches!(err, PolicyError::InvalidValue(_)));
}

#[test]
fn missing_file_is_an_error() {
    let _guard = env_guard().lock().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let err = load_snapshot(Some(&dir.path().join("absent.yaml"))).unwrap_err();
    assert!(matches!(err, PolicyError::Io(_)));
}

#[tokio::test]
async fn override_updates_snapshot() {
    let center = InMemoryPolicyCenter::new(default_snapshot());
    let request = RuntimeOverrideSpec {
        path: "executor.max_retries".into(),
        value: serde_json::json!(4),
        owner: "test".into(),
        reason: "unit test".into(),
        ttl_seconds: 0,
    };
    PolicyCenter::apply_override(&center, request).await.unwrap();
    let snapshot = PolicyCenter::snapshot(&center).await;
    assert_eq!(snapshot.executor.max_retries, 4);
    assert_eq!(
        snapshot.source_of("executor.max_retries"),
        Some(PolicySource::RuntimeOverride)
    );
    assert_eq!(center.view().executor.max_retries, 4);
}

#[tokio::test]
async fn rejected_override_leaves_snapshot_untouched() {
    let center = InMemoryPolicyCenter::new(default_snapshot());
    let before = center.current().rev;
    let request = RuntimeOverrideSpec {
        path: "resolver.max_candidates".into(),
        value: serde_json::json!(12),
        owner: "test".into(),
        reason: "too many".into(),
        ttl_seconds: 0,
    };
    assert!(PolicyCenter::apply_override(&center, request).await.is_err());
    assert_eq!(center.current().rev, before);
    assert_eq!(center.current().resolver.max_candidates, 9);
}

#[tokio::test]
async fn subscribe_streams_updates() {
    let center = InMemoryPolicyCenter::new(default_snapshot());
    let mut rx = PolicyCenter::subscribe(&center);
    let original_rev = rx.borrow().rev;

    let request = RuntimeOverrideSpec {
        path: "speech.timeout_ms".into(),
        value: serde_json::json!(2500),
        owner: "test".into(),
        reason: "unit test".into(),
        ttl_seconds: 0,
    };
    PolicyCenter::apply_override(&center, request).await.unwrap();
    rx.changed().await.unwrap();
    let snapshot = Arc::clone(&rx.borrow());
    assert_ne!(snapshot.rev, original_rev);
    assert_eq!(snapshot.speech.timeout_ms, 2500);
}

#[tokio::test(start_paused = true)]
async fn expired_override_is_withdrawn() {
    let center = InMemoryPolicyCenter::new(default_snapshot());
    let mut rx = PolicyCenter::subscribe(&center);

    let request = RuntimeOverrideSpec {
        path: "executor.max_retries".into(),
        value: serde_json::json!(4),
        owner: "test".into(),
        reason: "unit test".into(),
        ttl_seconds: 30,
    };
    PolicyCenter::apply_override(&center, request).await.unwrap();
    rx.changed().await.unwrap();
    assert_eq!(rx.borrow_and_update().executor.max_retries, 4);

    // the paused clock jumps to the expiry once the runtime is idle
    rx.changed().await.unwrap();
    assert_eq!(rx.borrow_and_update().executor.max_retries, 2);
    assert_eq!(center.current().executor.max_retries, 2);
}

#[test]
fn with_override_leaves_the_source_untouched() {
    let base = default_snapshot();
    let next = base
        .with_override("executor.max_retries", &serde_json::json!(5))
        .unwrap();
    assert_eq!(next.executor.max_retries, 5);
    assert_eq!(base.executor.max_retries, 2);
    assert!(base
        .with_override("executor.warp_speed", &serde_json::json!(9))
        .is_err());
}

#[test]
fn env_overlay_records_provenance() {
    let _guard = env_guard().lock().unwrap();
    let key = "LIGHTHOUSE_POLICY__EXECUTOR__IDLE_TIMEOUT_MS";
    env::set_var(key, "4000");
    let snapshot = load_snapshot(None).expect("load snapshot");
    env::remove_var(key);
    assert_eq!(snapshot.executor.idle_timeout_ms, 4000);
    assert_eq!(
        snapshot.source_of("executor.idle_timeout_ms"),
        Some(PolicySource::Env)
    );
}

#[test]
fn cli_overrides_replace_and_record_provenance() {
    let _guard = env_guard().lock().unwrap();
    env::set_var(
        "LIGHTHOUSE_POLICY_CLI_OVERRIDES",
        "nlu.confidence_threshold=0.5,executor.max_retries=3",
    );
    let snapshot = load_snapshot(None).expect("load snapshot with cli");
    env::remove_var("LIGHTHOUSE_POLICY_CLI_OVERRIDES");
    assert_eq!(snapshot.nlu.confidence_threshold, 0.5);
    assert_eq!(snapshot.executor.max_retries, 3);
    assert_eq!(
        snapshot.source_of("nlu.confidence_threshold"),
        Some(PolicySource::Cli)
    );

    let options = LoadOptions {
        cli_overrides: vec!["safety.allowed_domains=example.com;github.com".into()],
        ..LoadOptions::default()
    };
    let snapshot = load_snapshot_with_options(&options).unwrap();
    assert_eq!(
        snapshot.safety.allowed_domains,
        vec!["example.com".to_string(), "github.com".to_string()]
    );
}

fn env_guard() -> &'static Mutex<()> {
    static ENV_GUARD: OnceLock<Mutex<()>> = OnceLock::new();
    ENV_GUARD.get_or_init(|| Mutex::new(()))
}
