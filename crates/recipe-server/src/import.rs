// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Bulk import of recipes from the foreign system.
//!
//! # Phases
//!
//! ```text
//!  caller ──► authorize ──► fetch dataset ──► resolve namespace ──► "accepted"
//!                │               │                  │
//!                └───────────────┴──────────────────┴──► error to caller
//!
//!  background run (one task per import, records strictly in source order):
//!    for each record:
//!      strip "_id", attach namespace,
//!      every input/output line: strip "_id", item ← IdentifierCache
//!      ok  ─► emit import.recipe
//!      err ─► HaltOnFirst: stop the run | Isolate: record and continue
//!    publish import.completed with the run summary
//! ```
//!
//! Authorization fails closed before any network I/O. Everything after the
//! "accepted" point is reported only through logs, the run registry and the
//! `import.completed` event.
//!
//! Delivery to `import.recipe` consumers is at-least-once and ordered within
//! a run. The foreign `_id` is stripped before emission, so re-running an
//! import re-emits every record with no key to de-duplicate on.

use std::collections::{HashMap, VecDeque};
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::{JoinError, JoinHandle};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::bus::{EventBus, emit_json, topics};
use crate::catalog::{CatalogClient, CatalogError};
use crate::foreign::{ForeignError, ForeignSource};
use crate::identifier_cache::{IdentifierCache, IdentifierError};
use crate::permission::{Authorizer, Principal};

/// Capability required to start an import.
pub const IMPORT_CAPABILITY: &str = "mutation.rcRecipeImport";

/// What a run does after a record fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureMode {
    /// Stop the run at the first failing record.
    #[default]
    HaltOnFirst,
    /// Skip the failing record and continue.
    Isolate,
}

/// A failure mode name that is neither `halt` nor `isolate`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown failure mode '{0}', expected 'halt' or 'isolate'")]
pub struct UnknownFailureMode(pub String);

impl FromStr for FailureMode {
    type Err = UnknownFailureMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "halt" | "halt_on_first" => Ok(Self::HaltOnFirst),
            "isolate" => Ok(Self::Isolate),
            _ => Err(UnknownFailureMode(s.to_string())),
        }
    }
}

/// Errors that prevent an import from starting.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ImportError {
    /// The caller lacks the import capability.
    #[error("Principal '{principal}' is not allowed to use '{capability}'")]
    Forbidden {
        /// Calling principal.
        principal: String,
        /// Missing capability.
        capability: &'static str,
    },

    /// The foreign dataset could not be fetched or parsed.
    #[error("Fetching foreign recipes failed: {0}")]
    Fetch(#[from] ForeignError),

    /// The target namespace could not be resolved.
    #[error("Resolving namespace '{name}' failed: {source}")]
    Namespace {
        /// Namespace name.
        name: String,
        /// Catalog error.
        #[source]
        source: CatalogError,
    },
}

/// Why a single record could not be imported.
#[derive(Debug, Error)]
pub enum RecordError {
    /// The record does not have the expected shape.
    #[error("Malformed record: {0}")]
    Malformed(String),

    /// A line item could not be translated.
    #[error("Item '{foreign_id}' could not be resolved: {source}")]
    Unresolved {
        /// Foreign item identifier.
        foreign_id: String,
        /// Resolution error.
        #[source]
        source: IdentifierError,
    },
}

/// A record that failed during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordFailure {
    /// Position in the foreign dataset.
    pub index: usize,
    /// Failure description.
    pub error: String,
}

/// Outcome of one import run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    /// Run identifier.
    pub run_id: Uuid,
    /// Namespace records were attached to.
    pub namespace_id: String,
    /// Failure handling used.
    pub failure_mode: FailureMode,
    /// Records in the foreign dataset.
    pub total: usize,
    /// Records published on `import.recipe`.
    pub emitted: usize,
    /// Records that failed transformation.
    pub failed: usize,
    /// Records transformed but rejected by the bus.
    pub emit_failures: usize,
    /// The run stopped at a failing record.
    pub halted: bool,
    /// The run was cancelled.
    pub cancelled: bool,
    /// Failed records in processing order.
    pub failures: Vec<RecordFailure>,
    /// When the run was accepted.
    pub started_at: DateTime<Utc>,
    /// When the run ended.
    pub finished_at: DateTime<Utc>,
}

/// A run that has been accepted and not yet finished.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunProgress {
    /// Run identifier.
    pub run_id: Uuid,
    /// Namespace records are attached to.
    pub namespace_id: String,
    /// Records in the foreign dataset.
    pub total: usize,
    /// When the run was accepted.
    pub started_at: DateTime<Utc>,
}

/// Registry view of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    /// Still processing.
    Running(RunProgress),
    /// Ended (completed, halted or cancelled).
    Finished(ImportSummary),
}

/// Finished runs kept by default.
pub const DEFAULT_RUN_HISTORY: usize = 100;

/// In-process record of import runs.
///
/// Running runs are always kept. Finished runs are kept up to the history
/// limit, oldest evicted first.
#[derive(Debug)]
pub struct ImportRegistry {
    history: usize,
    inner: RwLock<Runs>,
}

#[derive(Debug, Default)]
struct Runs {
    by_id: HashMap<Uuid, RunStatus>,
    finished: VecDeque<Uuid>,
}

impl Default for ImportRegistry {
    fn default() -> Self {
        Self::with_history(DEFAULT_RUN_HISTORY)
    }
}

impl ImportRegistry {
    /// Create an empty registry keeping [`DEFAULT_RUN_HISTORY`] finished runs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry keeping at most `history` finished runs.
    pub fn with_history(history: usize) -> Self {
        Self {
            history,
            inner: RwLock::new(Runs::default()),
        }
    }

    /// Status of a run.
    pub async fn get(&self, run_id: Uuid) -> Option<RunStatus> {
        self.inner.read().await.by_id.get(&run_id).cloned()
    }

    /// Number of known runs.
    pub async fn len(&self) -> usize {
        self.inner.read().await.by_id.len()
    }

    /// Whether no run is known.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.by_id.is_empty()
    }

    async fn started(&self, progress: RunProgress) {
        self.inner
            .write()
            .await
            .by_id
            .insert(progress.run_id, RunStatus::Running(progress));
    }

    async fn finished(&self, summary: ImportSummary) {
        let mut runs = self.inner.write().await;
        let run_id = summary.run_id;
        runs.by_id.insert(run_id, RunStatus::Finished(summary));
        runs.finished.push_back(run_id);

        while runs.finished.len() > self.history {
            if let Some(evicted) = runs.finished.pop_front() {
                runs.by_id.remove(&evicted);
            }
        }
    }
}

/// Handle to a background import run.
///
/// Dropping the handle detaches the run; it keeps going.
#[derive(Debug)]
pub struct ImportHandle {
    run_id: Uuid,
    cancel: Arc<AtomicBool>,
    task: JoinHandle<ImportSummary>,
}

impl ImportHandle {
    /// Run identifier.
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Ask the run to stop before its next record.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Whether the run has ended.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the run to end.
    pub async fn wait(self) -> Result<ImportSummary, JoinError> {
        self.task.await
    }
}

/// Import settings.
#[derive(Debug, Clone)]
pub struct ImportConfig {
    /// Name of the namespace imported records land in.
    pub namespace: String,
    /// Per-record failure handling.
    pub failure_mode: FailureMode,
    /// Finished runs kept in the registry.
    pub run_history: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            namespace: "FFXIV".to_string(),
            failure_mode: FailureMode::HaltOnFirst,
            run_history: DEFAULT_RUN_HISTORY,
        }
    }
}

/// Starts import runs.
pub struct ImportPipeline {
    authorizer: Arc<dyn Authorizer>,
    foreign: Arc<dyn ForeignSource>,
    catalog: Arc<dyn CatalogClient>,
    cache: Arc<IdentifierCache>,
    bus: Arc<dyn EventBus>,
    registry: Arc<ImportRegistry>,
    config: ImportConfig,
}

impl ImportPipeline {
    /// Create a pipeline. The cache is shared by every run it starts.
    pub fn new(
        authorizer: Arc<dyn Authorizer>,
        foreign: Arc<dyn ForeignSource>,
        catalog: Arc<dyn CatalogClient>,
        cache: Arc<IdentifierCache>,
        bus: Arc<dyn EventBus>,
        registry: Arc<ImportRegistry>,
        config: ImportConfig,
    ) -> Self {
        Self {
            authorizer,
            foreign,
            catalog,
            cache,
            bus,
            registry,
            config,
        }
    }

    /// Run registry.
    pub fn registry(&self) -> &Arc<ImportRegistry> {
        &self.registry
    }

    /// Check preconditions and start a background run.
    pub async fn start(&self, principal: &Principal) -> Result<ImportHandle, ImportError> {
        if !self.authorizer.is_allowed(principal, IMPORT_CAPABILITY) {
            warn!(principal = %principal, capability = IMPORT_CAPABILITY, "Import denied");
            return Err(ImportError::Forbidden {
                principal: principal.to_string(),
                capability: IMPORT_CAPABILITY,
            });
        }

        let records = self.foreign.fetch_recipes().await?;
        let namespace_id = self
            .catalog
            .namespace_by_name(&self.config.namespace)
            .await
            .map_err(|source| ImportError::Namespace {
                name: self.config.namespace.clone(),
                source,
            })?;

        let progress = RunProgress {
            run_id: Uuid::new_v4(),
            namespace_id,
            total: records.len(),
            started_at: Utc::now(),
        };
        self.registry.started(progress.clone()).await;

        let cancel = Arc::new(AtomicBool::new(false));
        let run = ImportRun {
            progress: progress.clone(),
            records,
            failure_mode: self.config.failure_mode,
            cache: self.cache.clone(),
            bus: self.bus.clone(),
            registry: self.registry.clone(),
            cancel: cancel.clone(),
        };

        info!(
            run_id = %progress.run_id,
            principal = %principal,
            records = progress.total,
            namespace_id = %progress.namespace_id,
            failure_mode = ?self.config.failure_mode,
            "Import accepted"
        );

        Ok(ImportHandle {
            run_id: progress.run_id,
            cancel,
            task: tokio::spawn(run.execute()),
        })
    }
}

struct ImportRun {
    progress: RunProgress,
    records: Vec<Value>,
    failure_mode: FailureMode,
    cache: Arc<IdentifierCache>,
    bus: Arc<dyn EventBus>,
    registry: Arc<ImportRegistry>,
    cancel: Arc<AtomicBool>,
}

impl ImportRun {
    async fn execute(self) -> ImportSummary {
        let run_id = self.progress.run_id;
        let namespace_id = self.progress.namespace_id.as_str();
        let mut emitted = 0;
        let mut emit_failures = 0;
        let mut failures = Vec::new();
        let mut halted = false;
        let mut cancelled = false;

        for (index, record) in self.records.into_iter().enumerate() {
            if self.cancel.load(Ordering::SeqCst) {
                info!(%run_id, index, "Import cancelled");
                cancelled = true;
                break;
            }

            match transform_record(record, namespace_id, &self.cache).await {
                Ok(record) => {
                    match emit_json(self.bus.as_ref(), topics::IMPORT_RECIPE, &record).await {
                        Ok(()) => emitted += 1,
                        Err(e) => {
                            warn!(%run_id, index, error = %e, "Publishing imported record failed");
                            emit_failures += 1;
                        }
                    }
                }
                Err(e) => {
                    error!(%run_id, index, error = %e, "Import record failed");
                    failures.push(RecordFailure {
                        index,
                        error: e.to_string(),
                    });
                    if self.failure_mode == FailureMode::HaltOnFirst {
                        halted = true;
                        break;
                    }
                }
            }
        }

        let summary = ImportSummary {
            run_id,
            namespace_id: self.progress.namespace_id.clone(),
            failure_mode: self.failure_mode,
            total: self.progress.total,
            emitted,
            failed: failures.len(),
            emit_failures,
            halted,
            cancelled,
            failures,
            started_at: self.progress.started_at,
            finished_at: Utc::now(),
        };

        self.registry.finished(summary.clone()).await;
        if let Err(e) = emit_json(self.bus.as_ref(), topics::IMPORT_COMPLETED, &summary).await {
            warn!(%run_id, error = %e, "Publishing import summary failed");
        }

        info!(
            %run_id,
            emitted = summary.emitted,
            failed = summary.failed,
            halted,
            cancelled,
            "Import finished"
        );
        summary
    }
}

/// Rewrite one foreign record into the local shape.
async fn transform_record(
    mut record: Value,
    namespace_id: &str,
    cache: &IdentifierCache,
) -> Result<Value, RecordError> {
    let Value::Object(fields) = &mut record else {
        return Err(RecordError::Malformed("record is not an object".to_string()));
    };
    fields.remove("_id");
    fields.insert(
        "namespace".to_string(),
        Value::String(namespace_id.to_string()),
    );

    for side in ["inputs", "outputs"] {
        let Some(Value::Array(lines)) = fields.get_mut(side) else {
            return Err(RecordError::Malformed(format!("missing '{side}' array")));
        };
        for line in lines.iter_mut() {
            let Value::Object(line) = line else {
                return Err(RecordError::Malformed(format!(
                    "'{side}' entry is not an object"
                )));
            };
            line.remove("_id");
            let Some(foreign_id) = line.get("item").and_then(Value::as_str).map(str::to_string)
            else {
                return Err(RecordError::Malformed(format!(
                    "'{side}' entry has no item reference"
                )));
            };
            let local = cache
                .resolve(&foreign_id, namespace_id)
                .await
                .map_err(|source| RecordError::Unresolved { foreign_id, source })?;
            line.insert("item".to_string(), Value::String(local));
        }
    }

    Ok(record)
}
