//! Runtime orchestrator for batch family assembly.
//!
//! The orchestrator runs the core engine over one input collection:
//! - Normalize and link every record (sequential, whole input)
//! - Fan-out: assemble each root tree on a blocking worker task
//! - Fan-in: collect families back into root order
//! - Isolation: a worker that aborts yields a [`FamilyFailure`], not a batch error

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Semaphore;

use lineage_core::{
    link_records, AssemblyError, ContractFamily, ContractRecord, Diagnostic, FamilyAssembler,
    Hierarchy, IngestError, RawRecord,
};

use crate::config::RuntimeConfig;

/// Errors from the runtime orchestrator.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Ingest error: {0}")]
    Ingest(#[from] IngestError),

    #[error("Assembly error: {0}")]
    Assembly(#[from] AssemblyError),

    #[error("Worker pool closed")]
    PoolClosed,
}

/// A family whose assembly aborted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FamilyFailure {
    /// Identifier of the root record
    pub root_id: String,

    /// Family id the root would have produced
    pub family_id: String,

    pub reason: String,
}

/// Result from a runtime assembly pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuntimeResult {
    /// Successfully assembled families, in root order
    pub families: Vec<ContractFamily>,

    /// Diagnostics from normalization, building and every assembled family
    pub diagnostics: Vec<Diagnostic>,

    /// Families that could not be assembled
    pub failures: Vec<FamilyFailure>,
}

impl RuntimeResult {
    pub fn warning_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_warning()).count()
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Output of one worker: a family plus the diagnostics it produced.
type FamilyOutcome = (ContractFamily, Vec<Diagnostic>);

/// Assembles one root; shared by every worker.
type AssembleFn = Arc<dyn Fn(ContractRecord) -> FamilyOutcome + Send + Sync>;

/// The orchestrator assembles every family of an input collection.
///
/// # Architecture
/// - Linking is global and runs once before any fan-out
/// - Families share nothing, so each is assembled independently
/// - A semaphore bounds in-flight workers to `parallelism.max_concurrency`
pub struct FamilyOrchestrator {
    config: RuntimeConfig,
}

impl FamilyOrchestrator {
    pub fn new(config: RuntimeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Load a record document and assemble it.
    pub async fn assemble_file(&self, path: impl AsRef<Path>) -> Result<RuntimeResult, RuntimeError> {
        let raws = lineage_core::records_from_json_file(path)?;
        self.assemble(raws).await
    }

    /// Assemble every family in `raws`.
    ///
    /// # Execution Flow
    /// 1. Validate, normalize and link records into root trees
    ///    (identifier violations are the only batch-level failure)
    /// 2. Fan-out: assemble each tree
    /// 3. Fan-in: restore root order, log diagnostics
    pub async fn assemble(&self, raws: Vec<RawRecord>) -> Result<RuntimeResult, RuntimeError> {
        let Hierarchy {
            roots,
            mut diagnostics,
        } = link_records(&raws)?;

        let assembler = FamilyAssembler::new(self.config.assembly_options());
        let assemble: AssembleFn = Arc::new(move |root| {
            let mut found = Vec::new();
            let family = assembler.assemble_reporting(root, &mut found);
            (family, found)
        });

        let outcomes = if self.config.parallelism.enabled {
            self.run_parallel(roots, assemble).await?
        } else {
            run_sequential(roots, assemble)
        };

        let mut families = Vec::with_capacity(outcomes.len());
        let mut failures = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok((family, found)) => {
                    tracing::debug!(family = %family.id, contracts = family.family_metrics.total_contracts, "Family assembled");
                    diagnostics.extend(found);
                    families.push(family);
                }
                Err(failure) => {
                    tracing::warn!(
                        family = %failure.family_id,
                        root_id = %failure.root_id,
                        reason = %failure.reason,
                        "Family assembly failed"
                    );
                    failures.push(failure);
                }
            }
        }

        self.log_diagnostics(&diagnostics);

        let result = RuntimeResult {
            families,
            diagnostics,
            failures,
        };
        tracing::info!(
            families = result.families.len(),
            warnings = result.warning_count(),
            failures = result.failures.len(),
            "Assembly complete"
        );
        Ok(result)
    }

    /// Assemble roots on blocking workers, at most `max_concurrency` at a time.
    async fn run_parallel(
        &self,
        roots: Vec<ContractRecord>,
        assemble: AssembleFn,
    ) -> Result<Vec<Result<FamilyOutcome, FamilyFailure>>, RuntimeError> {
        let permits = Arc::new(Semaphore::new(self.config.parallelism.max_concurrency.max(1)));
        let mut handles = Vec::with_capacity(roots.len());

        for root in roots {
            let permit = permits
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| RuntimeError::PoolClosed)?;
            let failure = pending_failure(&root);
            let assemble = Arc::clone(&assemble);
            let handle = tokio::task::spawn_blocking(move || {
                let _permit = permit;
                assemble(root)
            });
            handles.push((failure, handle));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for (mut failure, handle) in handles {
            outcomes.push(match handle.await {
                Ok(outcome) => Ok(outcome),
                Err(e) => {
                    failure.reason = if e.is_panic() {
                        panic_reason(e.into_panic())
                    } else {
                        "worker cancelled".to_string()
                    };
                    Err(failure)
                }
            });
        }
        Ok(outcomes)
    }

    fn log_diagnostics(&self, diagnostics: &[Diagnostic]) {
        for diagnostic in diagnostics {
            if diagnostic.is_warning() {
                tracing::warn!(kind = diagnostic.kind(), "{}", diagnostic);
            } else if self.config.diagnostics.log_informational {
                tracing::debug!(kind = diagnostic.kind(), "{}", diagnostic);
            }
        }
    }
}

impl Default for FamilyOrchestrator {
    fn default() -> Self {
        Self::new(RuntimeConfig::default())
    }
}

/// Assemble roots one after another on the calling thread.
fn run_sequential(
    roots: Vec<ContractRecord>,
    assemble: AssembleFn,
) -> Vec<Result<FamilyOutcome, FamilyFailure>> {
    roots
        .into_iter()
        .map(|root| {
            let mut failure = pending_failure(&root);
            panic::catch_unwind(AssertUnwindSafe(|| assemble(root))).map_err(|payload| {
                failure.reason = panic_reason(payload);
                failure
            })
        })
        .collect()
}

fn pending_failure(root: &ContractRecord) -> FamilyFailure {
    FamilyFailure {
        root_id: root.id.clone(),
        family_id: root.family_key().to_string(),
        reason: String::new(),
    }
}

fn panic_reason(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("worker panicked: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("worker panicked: {}", message)
    } else {
        "worker panicked".to_string()
    }
}
