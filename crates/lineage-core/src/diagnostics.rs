//! Recoverable data conditions reported during assembly.
//!
//! None of these abort a batch. Each is resolved locally (a default, an
//! extra root, a dropped branch) and handed back to the caller so it can be
//! logged or shown next to the families it affected.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How loudly a diagnostic should be surfaced.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticSeverity {
    /// A documented default was applied
    Informational,
    /// Data integrity problem; the result differs from what the source declared
    Warning,
}

/// A single condition observed while normalizing, building or aggregating.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A non-critical field was absent and defaulted.
    MissingField { record_id: String, field: String },

    /// The declared parent contract number matches no record. The record
    /// became an additional root.
    UnresolvedParentReference {
        record_id: String,
        parent_contract_number: String,
    },

    /// A contract number recurs in its own ancestor chain. Every listed
    /// record was excluded from the output forest.
    CycleDetected {
        /// Contract numbers along the loop, in discovery order
        cycle: Vec<String>,
        /// Identifiers of the records dropped because of this loop
        record_ids: Vec<String>,
    },

    /// A second record carrying an already-claimed contract number was
    /// reached. The first claimant keeps the children.
    AmbiguousParentClaim {
        contract_number: String,
        claimed_by: String,
        orphaned_claimant: String,
    },

    /// A date could not be parsed and was left out of the family span.
    UnparseableDate {
        record_id: String,
        field: String,
        value: String,
    },
}

impl Diagnostic {
    pub fn severity(&self) -> DiagnosticSeverity {
        match self {
            Diagnostic::MissingField { .. } => DiagnosticSeverity::Informational,
            _ => DiagnosticSeverity::Warning,
        }
    }

    pub fn is_warning(&self) -> bool {
        self.severity() == DiagnosticSeverity::Warning
    }

    /// Short machine-friendly name of the condition.
    pub fn kind(&self) -> &'static str {
        match self {
            Diagnostic::MissingField { .. } => "missing_field",
            Diagnostic::UnresolvedParentReference { .. } => "unresolved_parent_reference",
            Diagnostic::CycleDetected { .. } => "cycle_detected",
            Diagnostic::AmbiguousParentClaim { .. } => "ambiguous_parent_claim",
            Diagnostic::UnparseableDate { .. } => "unparseable_date",
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::MissingField { record_id, field } => {
                write!(f, "{}: missing {}, default applied", record_id, field)
            }
            Diagnostic::UnresolvedParentReference {
                record_id,
                parent_contract_number,
            } => write!(
                f,
                "{}: parent {} not found, treated as root",
                record_id, parent_contract_number
            ),
            Diagnostic::CycleDetected { cycle, record_ids } => write!(
                f,
                "cycle {} excluded {} record(s): {}",
                cycle.join(" -> "),
                record_ids.len(),
                record_ids.join(", ")
            ),
            Diagnostic::AmbiguousParentClaim {
                contract_number,
                claimed_by,
                orphaned_claimant,
            } => write!(
                f,
                "{} claimed by {}; {} left without children",
                contract_number, claimed_by, orphaned_claimant
            ),
            Diagnostic::UnparseableDate {
                record_id,
                field,
                value,
            } => write!(f, "{}: {} '{}' is not a date", record_id, field, value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_missing_field_is_informational() {
        let missing = Diagnostic::MissingField {
            record_id: "r1".to_string(),
            field: "governing_law".to_string(),
        };
        let cycle = Diagnostic::CycleDetected {
            cycle: vec!["A".to_string(), "B".to_string()],
            record_ids: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(missing.severity(), DiagnosticSeverity::Informational);
        assert!(cycle.is_warning());
    }

    #[test]
    fn test_serializes_with_kind_tag() {
        let d = Diagnostic::UnresolvedParentReference {
            record_id: "r1".to_string(),
            parent_contract_number: "MSA-9".to_string(),
        };
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["kind"], "unresolved_parent_reference");
        assert_eq!(json["parent_contract_number"], "MSA-9");
    }

    #[test]
    fn test_display_names_the_cycle() {
        let d = Diagnostic::CycleDetected {
            cycle: vec!["A-1".to_string(), "B-1".to_string()],
            record_ids: vec!["a".to_string(), "b".to_string()],
        };
        assert!(d.to_string().contains("A-1 -> B-1"));
    }
}
