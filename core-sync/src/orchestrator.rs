//! # Sync Orchestrator
//!
//! Drives one update-set sync run end to end as a guarded workflow:
//!
//! 1. Load and validate run configuration (`RunNotFound` if absent)
//! 2. Skip path: master export disabled records a skip and finishes
//! 3. Pull-request gate: a pending human-authored change blocks the sync
//! 4. Branch preparation: switch, fetch with pruning, clean the managed
//!    subtree so upstream deletions are reflected locally
//! 5. Enumerate application files, group by class, then per class run
//!    fetch → materialize strictly sequentially
//! 6. Stage, commit (message names host and branch) and push
//!
//! Every step failure is labeled with the failing state, surfaced to the
//! progress reporter and re-raised. Nothing is rolled back: a re-run is
//! idempotent because branch preparation always cleans the subtree first.
//!
//! One logical flow of control per run; classes are processed one at a time
//! to bound remote load and keep per-class failures isolated. The working
//! directory and branch are shared across runs for the same application, so
//! callers must serialize runs per application/branch externally.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::git::{GitClient, GitOperation};
use bridge_traits::instance::{DisplayValue, InstanceClient, PageHandler, TableRequest};
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

use crate::batch::{ClassBatchGrouper, FileDescriptor};
use crate::collaborators::{ProgressReporter, ProjectStore, PullRequestChecker, RunProgress, RunStore};
use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::fetcher::RemoteRecordFetcher;
use crate::materializer::{machine_value, RecordMaterializer};
use crate::run::{SyncRun, SyncRunId, SyncRunState, SyncRunStats};

/// Table holding the lightweight application-file listing.
const APP_FILE_TABLE: &str = "sys_metadata";

/// Orchestrator tuning knobs
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Page size for per-class record fetches
    pub page_size: u32,
    /// Page size for the application-file listing (id/class pairs only)
    pub list_page_size: u32,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            page_size: 100,
            list_page_size: 1000,
        }
    }
}

/// How a run ended.
#[derive(Debug)]
pub enum SyncOutcome {
    /// Master export was disabled; nothing was fetched or written.
    Skipped,
    /// The sync ran; `written_files` preserves materialization order.
    Synced {
        stats: SyncRunStats,
        written_files: Vec<PathBuf>,
    },
}

/// Top-level state machine for update-set synchronization.
pub struct SyncOrchestrator {
    config: OrchestratorConfig,
    run_store: Arc<dyn RunStore>,
    progress: Arc<dyn ProgressReporter>,
    git: Arc<dyn GitClient>,
    pull_requests: Arc<dyn PullRequestChecker>,
    instance: Arc<dyn InstanceClient>,
    project: Arc<dyn ProjectStore>,
}

impl SyncOrchestrator {
    pub fn new(
        config: OrchestratorConfig,
        run_store: Arc<dyn RunStore>,
        progress: Arc<dyn ProgressReporter>,
        git: Arc<dyn GitClient>,
        pull_requests: Arc<dyn PullRequestChecker>,
        instance: Arc<dyn InstanceClient>,
        project: Arc<dyn ProjectStore>,
    ) -> Self {
        Self {
            config,
            run_store,
            progress,
            git,
            pull_requests,
            instance,
            project,
        }
    }

    /// Execute one sync run to completion.
    ///
    /// # Errors
    ///
    /// Any step failure is reported to the progress reporter with the
    /// failing state's label and then re-raised. Already-written files and
    /// an already-switched branch are left as-is; recovery is the
    /// operator's responsibility.
    #[instrument(skip(self), fields(run_id = %run_id))]
    pub async fn execute(&self, run_id: SyncRunId) -> Result<SyncOutcome> {
        let mut run = SyncRun::new(run_id);

        let mut config = match self.load_config(run_id).await {
            Ok(config) => config,
            Err(err) => {
                error!(state = run.state.as_str(), %err, "sync run failed before configuration was available");
                let _ = run.fail(err.to_string());
                return Err(err);
            }
        };

        run.advance(SyncRunState::ConfigLoaded)?;
        config.attach_working_dir(&self.project.code_directory());
        self.report(&config, RunProgress::InProgress).await;

        match self.drive(&mut run, &config).await {
            Ok(outcome) => {
                let state = match &outcome {
                    SyncOutcome::Skipped => RunProgress::Skipped,
                    SyncOutcome::Synced { .. } => RunProgress::Completed,
                };
                self.report(&config, state).await;
                Ok(outcome)
            }
            Err(err) => {
                let step = run.state.as_str().to_string();
                error!(step = %step, %err, "sync run failed");
                let _ = run.fail(err.to_string());
                self.report(
                    &config,
                    RunProgress::Failed {
                        step,
                        message: err.to_string(),
                    },
                )
                .await;
                Err(err)
            }
        }
    }

    async fn load_config(&self, run_id: SyncRunId) -> Result<SyncConfig> {
        let config = self
            .run_store
            .get(run_id)
            .await?
            .ok_or_else(|| SyncError::RunNotFound {
                run_id: run_id.as_str(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// The workflow proper, from `ConfigLoaded` onward. The run's state is
    /// advanced before each step executes so a failure is labeled with the
    /// step it happened in.
    async fn drive(&self, run: &mut SyncRun, config: &SyncConfig) -> Result<SyncOutcome> {
        if !config.master_export_enabled {
            info!(app = %config.application.name, "master export disabled; recording skip");
            run.advance(SyncRunState::Done)?;
            return Ok(SyncOutcome::Skipped);
        }

        // Gated on the policy flag alone: a pending pull request blocks the
        // run even when git operations themselves are disabled.
        if config.git.check_pending_pull_request {
            run.advance(SyncRunState::PullRequestCheck)?;
            let pending = self
                .pull_requests
                .pending_pull_request(config, &config.git.repo_name, &config.git.branch)
                .await?;
            if pending {
                // A human-authored change is in flight; do not overwrite it.
                return Err(SyncError::ConflictingPullRequest {
                    branch: config.git.branch.clone(),
                });
            }
        }

        if config.git_enabled {
            run.advance(SyncRunState::BranchPrepared)?;
            self.prepare_branch(config).await?;
        }

        run.advance(SyncRunState::Syncing)?;
        let (stats, written_files) = self.sync_all_classes(config).await?;
        run.stats = stats;

        if config.git_enabled {
            run.advance(SyncRunState::Committed)?;
            self.commit_and_push(config).await?;
        }

        run.advance(SyncRunState::Done)?;
        info!(
            classes = stats.classes_synced,
            records = stats.records_materialized,
            files = stats.files_written,
            "sync run complete"
        );
        Ok(SyncOutcome::Synced {
            stats,
            written_files,
        })
    }

    /// Switch to the target branch, fetch with pruning, then delete the
    /// managed subtree so materialization starts from a clean slate and
    /// upstream deletions do not linger locally.
    async fn prepare_branch(&self, config: &SyncConfig) -> Result<()> {
        self.git
            .switch_to_branch(&config.git.branch)
            .await
            .map_err(|source| SyncError::GitOperationFailed {
                operation: GitOperation::SwitchBranch,
                source,
            })?;

        self.git
            .fetch(&["--prune".to_string()])
            .await
            .map_err(|source| SyncError::GitOperationFailed {
                operation: GitOperation::Fetch,
                source,
            })?;

        let working_dir = config.working_dir.as_ref().ok_or_else(|| {
            SyncError::InvalidConfig("working directory was not derived".to_string())
        })?;
        match tokio::fs::remove_dir_all(working_dir).await {
            Ok(()) => {
                debug!(path = %working_dir.display(), "cleaned managed subtree");
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(SyncError::CleanFailed {
                path: working_dir.display().to_string(),
                source,
            }),
        }
    }

    /// Enumerate application files, group them by class and run
    /// fetch → materialize for each class in first-seen order.
    async fn sync_all_classes(
        &self,
        config: &SyncConfig,
    ) -> Result<(SyncRunStats, Vec<PathBuf>)> {
        let descriptors = self.list_application_files(config).await?;
        let batches = ClassBatchGrouper::group(descriptors);
        info!(
            classes = batches.len(),
            files = batches.descriptor_count(),
            "grouped application files"
        );

        let fetcher =
            RemoteRecordFetcher::new(self.instance.clone()).with_page_size(self.config.page_size);
        let host_name = self.instance.get_host_name();

        let mut stats = SyncRunStats::default();
        let mut written_files = Vec::new();

        for (class_name, class_descriptors) in batches.iter() {
            let param = self.project.get_entity_request_param(class_name).await?;
            let entity = self.project.get_entity(class_name).await?;

            let mut materializer = RecordMaterializer::new(
                self.project.clone(),
                class_name,
                host_name.clone(),
                config.application.name.clone(),
                config.application.scope.clone(),
            );

            let result = fetcher
                .fetch(
                    class_name,
                    class_descriptors,
                    &param,
                    entity.as_ref(),
                    &mut materializer,
                )
                .await;
            if let Err(err) = result {
                // A save failure surfaces through the page-delivery contract
                // as a bridge error; prefer the typed error it stands for.
                if let Some(materialize_err) = materializer.take_error() {
                    return Err(materialize_err);
                }
                return Err(err);
            }

            stats.classes_synced += 1;
            stats.records_materialized += materializer.records_materialized();
            let files = materializer.take_written();
            stats.files_written += files.len() as u64;
            written_files.extend(files);
        }

        Ok((stats, written_files))
    }

    /// Lightweight listing of `{id, class}` pairs for the application.
    async fn list_application_files(&self, config: &SyncConfig) -> Result<Vec<FileDescriptor>> {
        let request = TableRequest::new(APP_FILE_TABLE)
            .query(format!("sys_scope={}", config.application.sys_id))
            .fields(vec!["sys_id".to_string(), "sys_class_name".to_string()])
            .display_value(DisplayValue::False)
            .page_size(self.config.list_page_size);

        let mut collector = FileListCollector::default();
        self.instance
            .get_files_from_table(request, &mut collector)
            .await
            .map_err(|source| SyncError::RemoteFetchFailed {
                class_name: APP_FILE_TABLE.to_string(),
                source,
            })?;
        Ok(collector.descriptors)
    }

    /// Stage everything (including deletions), commit and push.
    async fn commit_and_push(&self, config: &SyncConfig) -> Result<()> {
        self.git
            .add(&["-A".to_string()])
            .await
            .map_err(|source| SyncError::GitOperationFailed {
                operation: GitOperation::Add,
                source,
            })?;

        let message = format!(
            "Synchronized update set from {} onto {}",
            self.instance.get_host_name(),
            config.git.branch
        );
        self.git
            .commit(&[message])
            .await
            .map_err(|source| SyncError::GitOperationFailed {
                operation: GitOperation::Commit,
                source,
            })?;

        self.git
            .push()
            .await
            .map_err(|source| SyncError::GitOperationFailed {
                operation: GitOperation::Push,
                source,
            })
    }

    async fn report(&self, config: &SyncConfig, state: RunProgress) {
        if let Err(err) = self.progress.set_progress(config, state).await {
            warn!(%err, "failed to report run progress");
        }
    }
}

/// Collects `{id, class}` pairs from the application-file listing.
#[derive(Default)]
struct FileListCollector {
    descriptors: Vec<FileDescriptor>,
}

#[async_trait]
impl PageHandler for FileListCollector {
    async fn handle_page(&mut self, records: Vec<Value>) -> BridgeResult<()> {
        for record in records {
            let Some(record_id) = machine_value(&record, "sys_id") else {
                warn!("listing record without sys_id skipped");
                continue;
            };
            let Some(class_name) = machine_value(&record, "sys_class_name") else {
                warn!(%record_id, "listing record without class skipped");
                continue;
            };
            self.descriptors.push(FileDescriptor {
                record_id,
                class_name,
                raw: record,
            });
        }
        Ok(())
    }
}
