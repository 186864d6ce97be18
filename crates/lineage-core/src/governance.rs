//! Governance Resolver: per-node inheritance of governed terms.
//!
//! Three fields are governed: governing law, jurisdiction and payment terms.
//! Each is classified with the same [`compare_to_root`] rule.

use serde::{Deserialize, Serialize};

use crate::types::{ContractRecord, GovernanceFramework, LiabilityFramework};

/// How a node's governed field relates to its family root.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Inheritance {
    /// The node is the root; it sets the term for the family
    Establishes,
    /// Same value as the root
    Inherited,
    /// Different value from the root
    Overridden,
}

/// Classify one governed field.
pub fn compare_to_root<T: PartialEq + ?Sized>(is_root: bool, value: &T, root_value: &T) -> Inheritance {
    if is_root {
        Inheritance::Establishes
    } else if value == root_value {
        Inheritance::Inherited
    } else {
        Inheritance::Overridden
    }
}

/// A governed field value with its classification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GovernedField {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub inheritance: Inheritance,
}

/// Per-node governance classification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InheritedTerms {
    pub governing_law: GovernedField,
    pub jurisdiction: GovernedField,
    pub payment_terms: GovernedField,
    /// True when at least one field is inherited from the root
    pub uses_parent_governance: bool,
}

impl InheritedTerms {
    pub fn fields(&self) -> [(&'static str, &GovernedField); 3] {
        [
            ("governing_law", &self.governing_law),
            ("jurisdiction", &self.jurisdiction),
            ("payment_terms", &self.payment_terms),
        ]
    }
}

pub struct GovernanceResolver;

impl GovernanceResolver {
    pub fn new() -> Self {
        Self
    }

    /// Classify `node`'s governed fields against `root`. A node is the root
    /// when their identifiers match.
    pub fn resolve(&self, node: &ContractRecord, root: &ContractRecord) -> InheritedTerms {
        let is_root = node.id == root.id;

        let governing_law = GovernedField {
            value: Some(node.governing_law.clone()),
            inheritance: compare_to_root(is_root, node.governing_law.as_str(), root.governing_law.as_str()),
        };
        let jurisdiction = GovernedField {
            value: node.jurisdiction.clone(),
            inheritance: compare_to_root(is_root, &node.jurisdiction, &root.jurisdiction),
        };
        let payment_terms = GovernedField {
            value: Some(node.payment_terms.clone()),
            inheritance: compare_to_root(is_root, node.payment_terms.as_str(), root.payment_terms.as_str()),
        };

        let uses_parent_governance = [&governing_law, &jurisdiction, &payment_terms]
            .iter()
            .any(|field| field.inheritance == Inheritance::Inherited);

        InheritedTerms {
            governing_law,
            jurisdiction,
            payment_terms,
            uses_parent_governance,
        }
    }

    /// Family-level governance: the root's terms plus the family's compliance flags.
    pub fn framework(&self, root: &ContractRecord, compliance_flags: Vec<String>) -> GovernanceFramework {
        GovernanceFramework {
            governing_law: root.governing_law.clone(),
            jurisdiction: root
                .jurisdiction
                .clone()
                .unwrap_or_else(|| root.governing_law.clone()),
            default_payment_terms: root.payment_terms.clone(),
            termination_rights: Some(root.termination_clause.clone()),
            compliance_flags,
            liability_framework: root.liability_cap.as_ref().map(|cap| LiabilityFramework {
                cap_amount: cap.amount,
                cap_currency: cap.currency.clone(),
            }),
        }
    }
}

impl Default for GovernanceResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContractType, LiabilityCap};

    fn root() -> ContractRecord {
        ContractRecord::new("msa", ContractType::Msa, "Master")
            .with_governing_law("New York")
            .with_jurisdiction("New York County")
            .with_payment_terms("Net 30 days")
    }

    #[test]
    fn test_root_establishes_every_field() {
        let root = root();
        let terms = GovernanceResolver::new().resolve(&root, &root);
        for (_, field) in terms.fields() {
            assert_eq!(field.inheritance, Inheritance::Establishes);
        }
        assert!(!terms.uses_parent_governance);
    }

    #[test]
    fn test_matching_law_is_inherited() {
        let root = root();
        let sow = ContractRecord::new("sow", ContractType::Sow, "SOW")
            .with_governing_law("New York")
            .with_payment_terms("Net 45 days");

        let terms = GovernanceResolver::new().resolve(&sow, &root);
        assert_eq!(terms.governing_law.inheritance, Inheritance::Inherited);
        assert_eq!(terms.payment_terms.inheritance, Inheritance::Overridden);
        assert_eq!(terms.jurisdiction.inheritance, Inheritance::Overridden);
        assert!(terms.uses_parent_governance);
    }

    #[test]
    fn test_differing_law_is_overridden() {
        let root = root();
        let sow = ContractRecord::new("sow", ContractType::Sow, "SOW").with_governing_law("Delaware");
        let terms = GovernanceResolver::new().resolve(&sow, &root);
        assert_eq!(terms.governing_law.inheritance, Inheritance::Overridden);
        assert_eq!(terms.governing_law.value.as_deref(), Some("Delaware"));
    }

    #[test]
    fn test_absent_jurisdiction_on_both_is_inherited() {
        let root = ContractRecord::new("msa", ContractType::Msa, "Master");
        let sow = ContractRecord::new("sow", ContractType::Sow, "SOW");
        let terms = GovernanceResolver::new().resolve(&sow, &root);
        assert_eq!(terms.jurisdiction.inheritance, Inheritance::Inherited);
        assert_eq!(terms.jurisdiction.value, None);
    }

    #[test]
    fn test_framework_copies_root_terms() {
        let mut root = root();
        root.liability_cap = Some(LiabilityCap {
            amount: 1_000_000.0,
            currency: "USD".to_string(),
        });
        let framework = GovernanceResolver::new().framework(&root, vec!["SOX".to_string()]);

        assert_eq!(framework.governing_law, "New York");
        assert_eq!(framework.jurisdiction, "New York County");
        assert_eq!(framework.default_payment_terms, "Net 30 days");
        assert_eq!(
            framework.termination_rights.as_deref(),
            Some("Standard termination terms apply")
        );
        assert_eq!(framework.compliance_flags, vec!["SOX"]);
        assert_eq!(
            framework.liability_framework.map(|l| l.cap_amount),
            Some(1_000_000.0)
        );
    }

    #[test]
    fn test_framework_jurisdiction_falls_back_to_law() {
        let root = ContractRecord::new("msa", ContractType::Msa, "Master").with_governing_law("Texas");
        let framework = GovernanceResolver::new().framework(&root, Vec::new());
        assert_eq!(framework.jurisdiction, "Texas");
    }
}
