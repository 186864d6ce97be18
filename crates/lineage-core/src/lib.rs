//! # lineage-core
//!
//! Deterministic contract family assembly engine.
//!
//! This crate turns a flat collection of agreement records into one tree per
//! root agreement and derives, for each tree:
//! - Aggregate metrics (total value, counts, time span, composite risk)
//! - Governance inheritance of every node relative to the root
//! - Business context (parties, industry, relationship type)
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: Same input always produces the same families, in the same order
//! 2. **Terminating**: Parent-reference cycles are detected and excluded
//! 3. **Lossless**: Every record lands in exactly one tree, or in a reported cycle
//! 4. **Non-failing on data**: Bad data degrades to defaults and [`Diagnostic`]s
//!
//! ## Example
//!
//! ```rust,ignore
//! use lineage_core::{assemble_families, records_from_json_file, AssemblyOptions};
//!
//! let raws = records_from_json_file("agreements.json")?;
//! let batch = assemble_families(&raws, &AssemblyOptions::default())?;
//!
//! for family in &batch.families {
//!     println!("{}: {}", family.id, family.summary());
//! }
//! ```

pub mod diagnostics;
pub mod family;
pub mod governance;
pub mod hierarchy;
pub mod metrics;
pub mod record;
pub mod types;

// Re-export main types at crate root
pub use diagnostics::{Diagnostic, DiagnosticSeverity};
pub use family::{relationship_type, AssemblyOptions, FamilyAssembler, FamilyNode};
pub use governance::{compare_to_root, GovernanceResolver, GovernedField, Inheritance, InheritedTerms};
pub use hierarchy::{build, sibling_order, Hierarchy, HierarchyBuilder};
pub use metrics::{composite_risk, parse_date, MetricsAggregator};
pub use record::{normalize, records_from_json, records_from_json_file, IngestError, Normalizer, RawRecord};
pub use types::{
    BusinessContext, ContractFamily, ContractRecord, ContractStatus, ContractType, DocumentLevel,
    FamilyMetrics, FamilySpan, GovernanceFramework, Industry, RelationshipType, RiskLevel,
};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Conditions that make a whole batch unusable.
#[derive(Error, Debug)]
pub enum AssemblyError {
    #[error("Record with empty id")]
    EmptyRecordId,

    #[error("Duplicate record id: {0}")]
    DuplicateRecordId(String),
}

/// Families assembled from one input collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FamilyBatch {
    /// One family per root, in root order
    pub families: Vec<ContractFamily>,

    /// Everything reported by normalization, building and aggregation
    pub diagnostics: Vec<Diagnostic>,
}

impl FamilyBatch {
    pub fn find(&self, id: &str) -> Option<&ContractFamily> {
        self.families.iter().find(|family| family.id == id)
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_warning()).count()
    }
}

/// Record identifiers must be non-empty and unique across the batch.
pub fn validate_ids<'a, I>(ids: I) -> Result<(), AssemblyError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    for id in ids {
        if id.trim().is_empty() {
            return Err(AssemblyError::EmptyRecordId);
        }
        if !seen.insert(id) {
            return Err(AssemblyError::DuplicateRecordId(id.to_string()));
        }
    }
    Ok(())
}

/// Validate, normalize and link the input into root trees.
///
/// The returned diagnostics hold normalizer findings followed by builder
/// findings. Family assembly is left to the caller.
pub fn link_records(raws: &[RawRecord]) -> Result<Hierarchy, AssemblyError> {
    validate_ids(raws.iter().map(|raw| raw.id.as_str()))?;

    let (records, mut diagnostics) = Normalizer::new().normalize_all(raws);
    let hierarchy = HierarchyBuilder::new(records).build();
    diagnostics.extend(hierarchy.diagnostics);

    Ok(Hierarchy {
        roots: hierarchy.roots,
        diagnostics,
    })
}

/// Normalize, link and assemble every family in the input.
///
/// This is the main entry point for lineage assembly. Families are produced
/// sequentially in root order; diagnostics are returned in the order they
/// were found (normalizer, then builder, then per-family aggregation).
///
/// # Errors
///
/// Only identifier violations fail the batch. Data problems are reported
/// as diagnostics.
pub fn assemble_families(
    raws: &[RawRecord],
    options: &AssemblyOptions,
) -> Result<FamilyBatch, AssemblyError> {
    let Hierarchy {
        roots,
        mut diagnostics,
    } = link_records(raws)?;

    let assembler = FamilyAssembler::new(*options);
    let families = roots
        .into_iter()
        .map(|root| assembler.assemble_reporting(root, &mut diagnostics))
        .collect();

    Ok(FamilyBatch {
        families,
        diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(id: &str, kind: &str, number: &str, parent: Option<&str>, value: f64) -> RawRecord {
        let mut record = RawRecord::new(id, kind);
        record.title = Some(format!("{} document", number));
        record.contract_number = Some(number.to_string());
        record.custom_provisions.parent_contract_number = parent.map(str::to_string);
        record.provisions.total_agreement_value = Some(value);
        record.provisions.effective_date = Some("2024-01-01".to_string());
        record.provisions.governing_law = Some("New York".to_string());
        record
    }

    fn scenario() -> Vec<RawRecord> {
        let mut sow = raw("sow-1", "SOW", "SOW-1", Some("MSA-1"), 50_000.0);
        sow.status = "COMPLETE".to_string();
        vec![
            raw("co-1", "ChangeOrder", "CO-1", Some("SOW-1"), 10_000.0),
            raw("msa-1", "Msa", "MSA-1", None, 100_000.0),
            sow,
        ]
    }

    #[test]
    fn test_scenario_family() {
        let batch = assemble_families(&scenario(), &AssemblyOptions::default()).unwrap();

        assert_eq!(batch.families.len(), 1);
        let family = &batch.families[0];
        assert_eq!(family.id, "MSA-1");
        assert_eq!(family.family_metrics.total_contracts, 3);
        assert_eq!(family.family_metrics.total_family_value, 160_000.0);
        assert_eq!(family.family_metrics.active_sow_count, 1);
        assert_eq!(family.family_metrics.total_change_orders, 1);
        assert_eq!(family.family_metrics.avg_risk_level, RiskLevel::Low);
        assert_eq!(batch.warning_count(), 0);
    }

    #[test]
    fn test_assembly_is_idempotent() {
        let options = AssemblyOptions::default();
        let first = assemble_families(&scenario(), &options).unwrap();
        let second = assemble_families(&scenario(), &options).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_total_value_is_sum_over_tree() {
        let mut raws = scenario();
        raws.push(raw("sow-2", "Sow", "SOW-2", Some("MSA-1"), 7_500.0));
        let mut no_value = raw("co-2", "ChangeOrder", "CO-2", Some("SOW-2"), 0.0);
        no_value.provisions.total_agreement_value = None;
        raws.push(no_value);

        let batch = assemble_families(&raws, &AssemblyOptions::default()).unwrap();
        let family = &batch.families[0];
        let summed: f64 = family
            .master_agreement
            .preorder()
            .iter()
            .map(|r| r.total_value.unwrap_or(0.0))
            .sum();
        assert_eq!(family.family_metrics.total_family_value, summed);
        assert_eq!(summed, 167_500.0);
    }

    #[test]
    fn test_governance_inheritance_end_to_end() {
        let mut raws = scenario();
        raws[0].provisions.governing_law = Some("Delaware".to_string());

        let assembler = FamilyAssembler::default();
        let batch = assemble_families(&raws, assembler.options()).unwrap();
        let nodes = assembler.annotate(&batch.families[0]);

        let by_id = |id: &str| nodes.iter().find(|n| n.record_id == id).unwrap();
        assert_eq!(by_id("sow-1").inherited_terms.governing_law.inheritance, Inheritance::Inherited);
        assert_eq!(by_id("co-1").inherited_terms.governing_law.inheritance, Inheritance::Overridden);
    }

    #[test]
    fn test_cycle_pair_excluded_from_every_family() {
        let mut raws = scenario();
        raws.push(raw("a", "Sow", "SOW-A", Some("SOW-B"), 1.0));
        raws.push(raw("b", "Sow", "SOW-B", Some("SOW-A"), 1.0));

        let batch = assemble_families(&raws, &AssemblyOptions::default()).unwrap();
        for family in &batch.families {
            assert!(family
                .master_agreement
                .preorder()
                .iter()
                .all(|r| r.id != "a" && r.id != "b"));
        }
        assert!(batch
            .diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::CycleDetected { .. })));
    }

    #[test]
    fn test_no_orphan_loss_with_dangling_parent() {
        let mut raws = scenario();
        raws.push(raw("stray", "Sow", "SOW-9", Some("MSA-404"), 1.0));

        let batch = assemble_families(&raws, &AssemblyOptions::default()).unwrap();
        let placed: usize = batch
            .families
            .iter()
            .map(|f| f.family_metrics.total_contracts)
            .sum();
        assert_eq!(placed, raws.len());
        assert!(batch.find("SOW-9").is_some());
    }

    #[test]
    fn test_government_flag_drives_risk_and_relationship() {
        let mut raws = scenario();
        raws[1].custom_provisions.government_contract = Some("True".to_string());

        let batch = assemble_families(&raws, &AssemblyOptions::default()).unwrap();
        let family = &batch.families[0];
        assert_eq!(family.family_metrics.avg_risk_level, RiskLevel::Critical);
        assert_eq!(
            family.business_context.relationship_type,
            RelationshipType::GovernmentContract
        );
    }

    #[test]
    fn test_link_records_keeps_normalizer_then_builder_order() {
        let mut raws = scenario();
        raws[1].provisions.governing_law = None;
        raws.push(raw("stray", "Sow", "SOW-9", Some("MSA-404"), 1.0));

        let hierarchy = link_records(&raws).unwrap();
        assert_eq!(hierarchy.roots.len(), 2);
        let kinds: Vec<&str> = hierarchy.diagnostics.iter().map(|d| d.kind()).collect();
        assert_eq!(kinds.first(), Some(&"missing_field"));
        assert_eq!(kinds.last(), Some(&"unresolved_parent_reference"));
    }

    #[test]
    fn test_deep_chain_assembles_one_family() {
        let depth = 10_000;
        let mut raws = vec![raw("k-0", "Msa", "K-0", None, 1.0)];
        for i in 1..depth {
            let parent = format!("K-{}", i - 1);
            raws.push(raw(&format!("k-{}", i), "Sow", &format!("K-{}", i), Some(parent.as_str()), 1.0));
        }

        let assembler = FamilyAssembler::default();
        let batch = assemble_families(&raws, assembler.options()).unwrap();
        assert_eq!(batch.families.len(), 1);
        let family = &batch.families[0];
        assert_eq!(family.family_metrics.total_contracts, depth);
        assert_eq!(family.family_metrics.total_family_value, depth as f64);

        let nodes = assembler.annotate(family);
        assert_eq!(nodes[depth - 1].depth, depth - 1);
    }

    #[test]
    fn test_duplicate_ids_fail_the_batch() {
        let raws = vec![RawRecord::new("x", "Msa"), RawRecord::new("x", "Sow")];
        let result = assemble_families(&raws, &AssemblyOptions::default());
        assert!(matches!(result, Err(AssemblyError::DuplicateRecordId(id)) if id == "x"));
    }
}
