//! # lineage-runtime
//!
//! Batch orchestration for lineage family assembly.
//!
//! The core engine is pure and synchronous. This crate adds what a batch
//! run needs around it:
//! - File-based runtime configuration (YAML or JSON)
//! - Fan-out of independent families across blocking worker tasks
//! - Per-family failure isolation
//! - Structured logging of every diagnostic through `tracing`

pub mod config;
pub mod orchestrator;

pub use config::{AssemblyConfig, ConfigError, DiagnosticsConfig, ParallelismConfig, RuntimeConfig};
pub use orchestrator::{FamilyFailure, FamilyOrchestrator, RuntimeError, RuntimeResult};
