//! Family Assembler: composes metrics, governance and business context
//! around one root tree.

use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostic;
use crate::governance::{GovernanceResolver, InheritedTerms};
use crate::metrics::{compliance_flags, has_government_signal, MetricsAggregator};
use crate::record::format_currency;
use crate::types::{
    BusinessContext, ContractFamily, ContractRecord, ContractType, DocumentLevel, Industry,
    RelationshipType,
};

/// Engine options that are not fixed policy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AssemblyOptions {
    /// Family value above which a relationship is a strategic partnership
    pub strategic_threshold: f64,
}

impl AssemblyOptions {
    pub const DEFAULT_STRATEGIC_THRESHOLD: f64 = 2_000_000.0;
}

impl Default for AssemblyOptions {
    fn default() -> Self {
        Self {
            strategic_threshold: Self::DEFAULT_STRATEGIC_THRESHOLD,
        }
    }
}

/// One node of a family, annotated for display.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FamilyNode {
    pub family_id: String,
    pub record_id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub contract_type: ContractType,
    /// Root is 0
    pub depth: usize,
    pub document_level: DocumentLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_contract_number: Option<String>,
    /// Contract number (or identifier) of each child, in order
    #[serde(default)]
    pub child_contract_numbers: Vec<String>,
    pub inherited_terms: InheritedTerms,
}

/// Builds [`ContractFamily`] snapshots from root trees.
pub struct FamilyAssembler {
    options: AssemblyOptions,
    metrics: MetricsAggregator,
    governance: GovernanceResolver,
}

impl FamilyAssembler {
    pub fn new(options: AssemblyOptions) -> Self {
        Self {
            options,
            metrics: MetricsAggregator::new(),
            governance: GovernanceResolver::new(),
        }
    }

    pub fn options(&self) -> &AssemblyOptions {
        &self.options
    }

    /// Assemble a family, discarding date diagnostics.
    pub fn assemble(&self, root: ContractRecord) -> ContractFamily {
        let mut ignored = Vec::new();
        self.assemble_reporting(root, &mut ignored)
    }

    /// Assemble a family from a root with its subtree attached.
    pub fn assemble_reporting(
        &self,
        root: ContractRecord,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> ContractFamily {
        let family_metrics = self.metrics.aggregate_reporting(&root, diagnostics);
        let flags = compliance_flags(&root);
        let government = has_government_signal(&flags);
        let industry = root.industry.unwrap_or_default();

        let business_context = BusinessContext {
            parties: vec![root.first_party.clone(), root.third_party.clone()],
            business_unit: root.business_unit.clone(),
            contract_manager: root.contract_manager.clone(),
            industry_category: industry.label().to_string(),
            relationship_type: relationship_type(
                government,
                family_metrics.total_family_value,
                industry,
                self.options.strategic_threshold,
            ),
        };
        let governance_framework = self.governance.framework(&root, flags);

        ContractFamily {
            id: root.family_key().to_string(),
            master_agreement: root,
            family_metrics,
            governance_framework,
            business_context,
        }
    }

    /// Pre-order node list of a family with depth and governance annotations.
    pub fn annotate(&self, family: &ContractFamily) -> Vec<FamilyNode> {
        let root = &family.master_agreement;
        let mut nodes = Vec::new();
        let mut stack: Vec<(&ContractRecord, usize)> = vec![(root, 0)];

        while let Some((record, depth)) = stack.pop() {
            nodes.push(FamilyNode {
                family_id: family.id.clone(),
                record_id: record.id.clone(),
                title: record.title.clone(),
                contract_type: record.contract_type,
                depth,
                document_level: record.contract_type.document_level(),
                contract_number: record.contract_number.clone(),
                parent_contract_number: record.parent_contract_number.clone(),
                child_contract_numbers: record
                    .children
                    .iter()
                    .map(|child| child.family_key().to_string())
                    .collect(),
                inherited_terms: self.governance.resolve(record, root),
            });
            stack.extend(record.children.iter().rev().map(|child| (child, depth + 1)));
        }
        nodes
    }
}

impl Default for FamilyAssembler {
    fn default() -> Self {
        Self::new(AssemblyOptions::default())
    }
}

/// Relationship type, first match wins: government, strategic value,
/// procurement/manufacturing industry, then vendor.
pub fn relationship_type(
    government: bool,
    total_value: f64,
    industry: Industry,
    strategic_threshold: f64,
) -> RelationshipType {
    if government {
        RelationshipType::GovernmentContract
    } else if total_value > strategic_threshold {
        RelationshipType::StrategicPartnership
    } else if matches!(industry, Industry::Procurement | Industry::Manufacturing) {
        RelationshipType::ServiceProvider
    } else {
        RelationshipType::Vendor
    }
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{} {}", count, noun)
    } else {
        format!("{} {}s", count, noun)
    }
}

impl ContractFamily {
    /// One-line description of the relationship.
    pub fn summary(&self) -> String {
        let parties = &self.business_context.parties;
        format!(
            "{} between {} and {} with {} worth {}.",
            self.business_context.relationship_type.label(),
            parties.first().map(String::as_str).unwrap_or_default(),
            parties.get(1).map(String::as_str).unwrap_or_default(),
            plural(self.family_metrics.active_sow_count, "active SOW"),
            format_currency(self.family_metrics.total_family_value, "USD"),
        )
    }

    pub fn hierarchy_label(&self) -> &'static str {
        if self.family_metrics.total_change_orders > 0 {
            "MSA → SOW → Change Order"
        } else {
            "MSA → SOW"
        }
    }

    /// Short bullet facts for overview listings.
    pub fn key_features(&self) -> Vec<String> {
        vec![
            format!("Master agreement: {}", self.master_agreement.title),
            format!(
                "Total value: {}",
                format_currency(self.family_metrics.total_family_value, "USD")
            ),
            plural(self.family_metrics.active_sow_count, "active SOW"),
            format!("Risk level: {:?}", self.family_metrics.avg_risk_level),
            format!("Governing law: {}", self.governance_framework.governing_law),
            format!(
                "Relationship type: {}",
                self.business_context.relationship_type.label()
            ),
        ]
    }
}
