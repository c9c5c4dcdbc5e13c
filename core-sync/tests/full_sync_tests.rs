//! Integration tests for the full sync workflow
//!
//! Exercises the orchestrator end to end against scripted collaborators:
//! listing, grouping, per-class fetch, materialization, git land, plus the
//! skip and gating paths.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::git::GitClient;
use bridge_traits::instance::{InstanceClient, PageHandler, TableRequest};
use core_sync::{
    machine_value, AppTarget, Entity, EntityRequestParam, GitTarget, OrchestratorConfig,
    ProgressReporter, ProjectStore, PullRequestChecker, RunProgress, RunStore, SyncConfig,
    SyncError, SyncOrchestrator, SyncOutcome, SyncRunId,
};

// ============================================================================
// Scripted Collaborators
// ============================================================================

struct ScriptedRunStore {
    configs: Mutex<HashMap<String, SyncConfig>>,
}

impl ScriptedRunStore {
    fn with_run(run_id: SyncRunId, config: SyncConfig) -> Self {
        let mut configs = HashMap::new();
        configs.insert(run_id.as_str(), config);
        Self {
            configs: Mutex::new(configs),
        }
    }

    fn empty() -> Self {
        Self {
            configs: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl RunStore for ScriptedRunStore {
    async fn get(&self, run_id: SyncRunId) -> BridgeResult<Option<SyncConfig>> {
        Ok(self.configs.lock().unwrap().get(&run_id.as_str()).cloned())
    }
}

#[derive(Default)]
struct RecordingReporter {
    updates: Mutex<Vec<RunProgress>>,
}

#[async_trait]
impl ProgressReporter for RecordingReporter {
    async fn set_progress(&self, _config: &SyncConfig, state: RunProgress) -> BridgeResult<()> {
        self.updates.lock().unwrap().push(state);
        Ok(())
    }
}

#[derive(Default)]
struct RecordingGit {
    calls: Mutex<Vec<String>>,
}

#[async_trait]
impl GitClient for RecordingGit {
    async fn switch_to_branch(&self, branch: &str) -> BridgeResult<()> {
        self.calls.lock().unwrap().push(format!("switch {branch}"));
        Ok(())
    }

    async fn fetch(&self, flags: &[String]) -> BridgeResult<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("fetch {}", flags.join(" ")));
        Ok(())
    }

    async fn add(&self, flags: &[String]) -> BridgeResult<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("add {}", flags.join(" ")));
        Ok(())
    }

    async fn commit(&self, messages: &[String]) -> BridgeResult<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("commit {}", messages.join(" | ")));
        Ok(())
    }

    async fn push(&self) -> BridgeResult<()> {
        self.calls.lock().unwrap().push("push".to_string());
        Ok(())
    }
}

struct ScriptedPullRequests {
    pending: bool,
    checks: Mutex<u32>,
}

impl ScriptedPullRequests {
    fn new(pending: bool) -> Self {
        Self {
            pending,
            checks: Mutex::new(0),
        }
    }
}

#[async_trait]
impl PullRequestChecker for ScriptedPullRequests {
    async fn pending_pull_request(
        &self,
        _config: &SyncConfig,
        _repo_name: &str,
        _from_branch: &str,
    ) -> BridgeResult<bool> {
        *self.checks.lock().unwrap() += 1;
        Ok(self.pending)
    }
}

/// Serves scripted pages per table and records every request it sees.
#[derive(Default)]
struct ScriptedInstance {
    pages: HashMap<String, Vec<Vec<Value>>>,
    requests: Mutex<Vec<TableRequest>>,
}

impl ScriptedInstance {
    fn with_table(mut self, table: &str, pages: Vec<Vec<Value>>) -> Self {
        self.pages.insert(table.to_string(), pages);
        self
    }
}

#[async_trait]
impl InstanceClient for ScriptedInstance {
    async fn get_files_from_table(
        &self,
        request: TableRequest,
        handler: &mut dyn PageHandler,
    ) -> BridgeResult<()> {
        let table = request.table.clone();
        self.requests.lock().unwrap().push(request);
        for page in self.pages.get(&table).cloned().unwrap_or_default() {
            handler.handle_page(page).await?;
        }
        Ok(())
    }

    fn get_host_name(&self) -> String {
        "dev.example.com".to_string()
    }
}

/// In-memory project store; saves records and fails on demand.
struct FakeProject {
    code_root: PathBuf,
    saved: Mutex<Vec<Value>>,
    fail_on: Option<String>,
}

impl FakeProject {
    fn new(code_root: PathBuf) -> Self {
        Self {
            code_root,
            saved: Mutex::new(Vec::new()),
            fail_on: None,
        }
    }

    fn failing_on(code_root: PathBuf, record_id: &str) -> Self {
        Self {
            code_root,
            saved: Mutex::new(Vec::new()),
            fail_on: Some(record_id.to_string()),
        }
    }
}

#[async_trait]
impl ProjectStore for FakeProject {
    fn code_directory(&self) -> PathBuf {
        self.code_root.clone()
    }

    async fn get_entity_request_param(
        &self,
        class_name: &str,
    ) -> BridgeResult<EntityRequestParam> {
        Ok(EntityRequestParam {
            class_name: class_name.to_string(),
            query_field_names: vec![],
            field_names: vec![],
        })
    }

    async fn get_entity(&self, _class_name: &str) -> BridgeResult<Option<Entity>> {
        Ok(None)
    }

    async fn save(&self, record: &Value) -> BridgeResult<Vec<PathBuf>> {
        let id = machine_value(record, "sys_id").unwrap_or_default();
        if self.fail_on.as_deref() == Some(id.as_str()) {
            return Err(BridgeError::OperationFailed("disk full".to_string()));
        }
        self.saved.lock().unwrap().push(record.clone());
        Ok(vec![PathBuf::from(format!("src/{id}.js"))])
    }
}

// ============================================================================
// Test Wiring
// ============================================================================

struct Harness {
    run_id: SyncRunId,
    orchestrator: SyncOrchestrator,
    reporter: Arc<RecordingReporter>,
    git: Arc<RecordingGit>,
    pull_requests: Arc<ScriptedPullRequests>,
    instance: Arc<ScriptedInstance>,
    project: Arc<FakeProject>,
    _tmp: tempfile::TempDir,
}

fn config() -> SyncConfig {
    SyncConfig {
        git: GitTarget {
            branch: "main".to_string(),
            repo_name: "acme/widgets".to_string(),
            check_pending_pull_request: true,
        },
        application: AppTarget {
            sys_id: "app123".to_string(),
            name: "widgets".to_string(),
            scope: "x_acme_widgets".to_string(),
        },
        master_export_enabled: true,
        git_enabled: true,
        working_dir: None,
    }
}

fn harness(
    config: SyncConfig,
    instance: ScriptedInstance,
    pending_pull_request: bool,
    project_fail_on: Option<&str>,
) -> Harness {
    let tmp = tempfile::tempdir().unwrap();
    let run_id = SyncRunId::new();
    let run_store = Arc::new(ScriptedRunStore::with_run(run_id, config));
    let reporter = Arc::new(RecordingReporter::default());
    let git = Arc::new(RecordingGit::default());
    let pull_requests = Arc::new(ScriptedPullRequests::new(pending_pull_request));
    let instance = Arc::new(instance);
    let project = Arc::new(match project_fail_on {
        Some(id) => FakeProject::failing_on(tmp.path().to_path_buf(), id),
        None => FakeProject::new(tmp.path().to_path_buf()),
    });

    let orchestrator = SyncOrchestrator::new(
        OrchestratorConfig::default(),
        run_store,
        reporter.clone(),
        git.clone(),
        pull_requests.clone(),
        instance.clone(),
        project.clone(),
    );

    Harness {
        run_id,
        orchestrator,
        reporter,
        git,
        pull_requests,
        instance,
        project,
        _tmp: tmp,
    }
}

fn listing_record(sys_id: &str, class: &str) -> Value {
    json!({ "sys_id": sys_id, "sys_class_name": class })
}

fn scripted_instance_for_three_files() -> ScriptedInstance {
    ScriptedInstance::default()
        .with_table(
            "sys_metadata",
            vec![vec![
                listing_record("a", "sys_script"),
                listing_record("b", "sys_ui_page"),
                listing_record("c", "sys_script"),
            ]],
        )
        .with_table(
            "sys_script",
            vec![
                vec![json!({ "sys_id": "a", "sys_updated_by": "alice" })],
                vec![json!({ "sys_id": "c", "sys_updated_by": "carol" })],
            ],
        )
        .with_table(
            "sys_ui_page",
            vec![vec![json!({ "sys_id": "b", "sys_updated_by": "bob" })]],
        )
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_full_sync_materializes_classes_in_listing_order() {
    let h = harness(config(), scripted_instance_for_three_files(), false, None);

    let outcome = h.orchestrator.execute(h.run_id).await.unwrap();
    let SyncOutcome::Synced {
        stats,
        written_files,
    } = outcome
    else {
        panic!("expected a synced outcome");
    };

    assert_eq!(stats.classes_synced, 2);
    assert_eq!(stats.records_materialized, 3);
    assert_eq!(stats.files_written, 3);

    // Class order is first-seen listing order; within sys_script the two
    // pages arrive in fetch order.
    assert_eq!(
        written_files,
        vec![
            PathBuf::from("src/a.js"),
            PathBuf::from("src/c.js"),
            PathBuf::from("src/b.js"),
        ]
    );

    // Listing first, then one fetch per class.
    let requests = h.instance.requests.lock().unwrap();
    let tables: Vec<&str> = requests.iter().map(|r| r.table.as_str()).collect();
    assert_eq!(tables, vec!["sys_metadata", "sys_script", "sys_ui_page"]);
    assert_eq!(
        requests[0].query.as_deref(),
        Some("sys_scope=app123")
    );
    assert_eq!(requests[1].query.as_deref(), Some("sys_idINa,c"));
    assert_eq!(requests[2].query.as_deref(), Some("sys_idINb"));
    drop(requests);

    let git_calls = h.git.calls.lock().unwrap();
    assert_eq!(
        *git_calls,
        vec![
            "switch main".to_string(),
            "fetch --prune".to_string(),
            "add -A".to_string(),
            "commit Synchronized update set from dev.example.com onto main".to_string(),
            "push".to_string(),
        ]
    );
    drop(git_calls);

    assert_eq!(
        *h.reporter.updates.lock().unwrap(),
        vec![RunProgress::InProgress, RunProgress::Completed]
    );

    // Provenance rode along on every saved record.
    let saved = h.project.saved.lock().unwrap();
    assert_eq!(saved.len(), 3);
    assert_eq!(saved[0]["__provenance"]["updated_by"], "alice");
    assert_eq!(saved[0]["__provenance"]["host_name"], "dev.example.com");
}

#[tokio::test]
async fn test_pending_pull_request_blocks_the_run() {
    let h = harness(config(), scripted_instance_for_three_files(), true, None);

    let err = h.orchestrator.execute(h.run_id).await.unwrap_err();
    match err {
        SyncError::ConflictingPullRequest { branch } => assert_eq!(branch, "main"),
        other => panic!("unexpected error: {other}"),
    }

    assert_eq!(*h.pull_requests.checks.lock().unwrap(), 1);
    // Nothing touched the working tree or the remote instance.
    assert!(h.git.calls.lock().unwrap().is_empty());
    assert!(h.instance.requests.lock().unwrap().is_empty());

    let updates = h.reporter.updates.lock().unwrap();
    match updates.last() {
        Some(RunProgress::Failed { step, .. }) => assert_eq!(step, "pull_request_check"),
        other => panic!("unexpected final progress: {other:?}"),
    }
}

#[tokio::test]
async fn test_master_export_disabled_records_a_skip() {
    let mut cfg = config();
    cfg.master_export_enabled = false;
    let h = harness(cfg, scripted_instance_for_three_files(), false, None);

    let outcome = h.orchestrator.execute(h.run_id).await.unwrap();
    assert!(matches!(outcome, SyncOutcome::Skipped));

    assert!(h.git.calls.lock().unwrap().is_empty());
    assert!(h.instance.requests.lock().unwrap().is_empty());
    assert_eq!(*h.pull_requests.checks.lock().unwrap(), 0);
    assert_eq!(
        *h.reporter.updates.lock().unwrap(),
        vec![RunProgress::InProgress, RunProgress::Skipped]
    );
}

#[tokio::test]
async fn test_git_disabled_syncs_without_touching_git() {
    let mut cfg = config();
    cfg.git_enabled = false;
    let h = harness(cfg, scripted_instance_for_three_files(), false, None);

    let outcome = h.orchestrator.execute(h.run_id).await.unwrap();
    let SyncOutcome::Synced { stats, .. } = outcome else {
        panic!("expected a synced outcome");
    };
    assert_eq!(stats.records_materialized, 3);

    assert!(h.git.calls.lock().unwrap().is_empty());
    // The pull-request gate is policy-driven and still consulted.
    assert_eq!(*h.pull_requests.checks.lock().unwrap(), 1);
}

#[tokio::test]
async fn test_pull_request_gate_applies_even_with_git_disabled() {
    let mut cfg = config();
    cfg.git_enabled = false;
    let h = harness(cfg, scripted_instance_for_three_files(), true, None);

    let err = h.orchestrator.execute(h.run_id).await.unwrap_err();
    assert!(matches!(err, SyncError::ConflictingPullRequest { .. }));
    assert!(h.instance.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_run_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let reporter = Arc::new(RecordingReporter::default());
    let orchestrator = SyncOrchestrator::new(
        OrchestratorConfig::default(),
        Arc::new(ScriptedRunStore::empty()),
        reporter.clone(),
        Arc::new(RecordingGit::default()),
        Arc::new(ScriptedPullRequests::new(false)),
        Arc::new(ScriptedInstance::default()),
        Arc::new(FakeProject::new(tmp.path().to_path_buf())),
    );

    let run_id = SyncRunId::new();
    let err = orchestrator.execute(run_id).await.unwrap_err();
    match err {
        SyncError::RunNotFound { run_id: reported } => assert_eq!(reported, run_id.as_str()),
        other => panic!("unexpected error: {other}"),
    }
    // No configuration was available, so no progress could be reported.
    assert!(reporter.updates.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_save_failure_surfaces_as_materialize_error() {
    let h = harness(
        config(),
        scripted_instance_for_three_files(),
        false,
        Some("c"),
    );

    let err = h.orchestrator.execute(h.run_id).await.unwrap_err();
    match err {
        SyncError::MaterializeFailed {
            class_name,
            record_id,
            ..
        } => {
            assert_eq!(class_name, "sys_script");
            assert_eq!(record_id, "c");
        }
        other => panic!("unexpected error: {other}"),
    }

    // The earlier record of the class stays materialized; nothing was
    // committed.
    assert_eq!(h.project.saved.lock().unwrap().len(), 1);
    let git_calls = h.git.calls.lock().unwrap();
    assert!(!git_calls.iter().any(|c| c.starts_with("commit")));
    drop(git_calls);

    let updates = h.reporter.updates.lock().unwrap();
    match updates.last() {
        Some(RunProgress::Failed { step, .. }) => assert_eq!(step, "syncing"),
        other => panic!("unexpected final progress: {other:?}"),
    }
}
