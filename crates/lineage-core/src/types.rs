//! Core types for lineage assembly.
//!
//! These are the canonical records produced by the normalizer, linked into
//! trees by the hierarchy builder, and summarized into families.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Placeholder used wherever a descriptive field was absent from the source.
pub const NOT_SPECIFIED: &str = "Not specified";

/// Placeholder party name used when a record declares no parties.
pub const UNKNOWN_PARTY: &str = "Unknown Party";

/// The document type of a contract record.
///
/// Legacy upper-case tags (`MSA`, `SOW`) are folded into their canonical
/// variants, so counting and ordering never have to care about casing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ContractType {
    #[serde(alias = "MSA")]
    Msa,
    ServicesAgreement,
    #[serde(alias = "SOW")]
    Sow,
    Nda,
    ChangeOrder,
    Consulting,
    License,
    Purchase,
    PurchaseOrder,
    Lease,
    Amendment,
    PrimeContract,
    PrimeConstruction,
    Subcontract,
    SubcontractMsa,
    FlowdownAmendment,
    MasterAffiliation,
    FacilityAgreement,
    PhysicianAgreement,
    CompensationSchedule,
    Sla,
    TradeAgreement,
    ConstructionAmendment,
    EnergyMsa,
    ProjectAgreement,
    WorkOrder,
    FieldTicket,
    MasterTradingAgreement,
    ProductSchedule,
    TransactionConfirmation,
    Novation,
    Other,
}

impl ContractType {
    /// Sort precedence for siblings and roots. Types missing from this list
    /// sort after every listed type.
    pub const PRECEDENCE: [ContractType; 11] = [
        ContractType::Msa,
        ContractType::Sow,
        ContractType::ServicesAgreement,
        ContractType::Consulting,
        ContractType::Nda,
        ContractType::ChangeOrder,
        ContractType::License,
        ContractType::Purchase,
        ContractType::Lease,
        ContractType::Amendment,
        ContractType::Other,
    ];

    /// Parse a source type tag. Unrecognized tags become `Other`.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim() {
            "Msa" | "MSA" => ContractType::Msa,
            "ServicesAgreement" => ContractType::ServicesAgreement,
            "Sow" | "SOW" => ContractType::Sow,
            "Nda" | "NDA" => ContractType::Nda,
            "ChangeOrder" => ContractType::ChangeOrder,
            "Consulting" => ContractType::Consulting,
            "License" => ContractType::License,
            "Purchase" => ContractType::Purchase,
            "PurchaseOrder" => ContractType::PurchaseOrder,
            "Lease" => ContractType::Lease,
            "Amendment" => ContractType::Amendment,
            "PrimeContract" => ContractType::PrimeContract,
            "PrimeConstruction" => ContractType::PrimeConstruction,
            "Subcontract" => ContractType::Subcontract,
            "SubcontractMSA" | "SubcontractMsa" => ContractType::SubcontractMsa,
            "FlowdownAmendment" => ContractType::FlowdownAmendment,
            "MasterAffiliation" => ContractType::MasterAffiliation,
            "FacilityAgreement" => ContractType::FacilityAgreement,
            "PhysicianAgreement" => ContractType::PhysicianAgreement,
            "CompensationSchedule" => ContractType::CompensationSchedule,
            "SLA" | "Sla" => ContractType::Sla,
            "TradeAgreement" => ContractType::TradeAgreement,
            "ConstructionAmendment" => ContractType::ConstructionAmendment,
            "EnergyMSA" | "EnergyMsa" => ContractType::EnergyMsa,
            "ProjectAgreement" => ContractType::ProjectAgreement,
            "WorkOrder" => ContractType::WorkOrder,
            "FieldTicket" => ContractType::FieldTicket,
            "MasterTradingAgreement" => ContractType::MasterTradingAgreement,
            "ProductSchedule" => ContractType::ProductSchedule,
            "TransactionConfirmation" => ContractType::TransactionConfirmation,
            "Novation" => ContractType::Novation,
            _ => ContractType::Other,
        }
    }

    /// Position in [`ContractType::PRECEDENCE`], or the list length for unlisted types.
    pub fn precedence(&self) -> usize {
        Self::PRECEDENCE
            .iter()
            .position(|t| t == self)
            .unwrap_or(Self::PRECEDENCE.len())
    }

    pub fn is_sow(&self) -> bool {
        matches!(self, ContractType::Sow)
    }

    pub fn is_change_order(&self) -> bool {
        matches!(self, ContractType::ChangeOrder)
    }

    /// Coarse document level used for display grouping.
    pub fn document_level(&self) -> DocumentLevel {
        match self {
            ContractType::Msa | ContractType::SubcontractMsa | ContractType::EnergyMsa => {
                DocumentLevel::Msa
            }
            ContractType::Sow => DocumentLevel::Sow,
            ContractType::ChangeOrder => DocumentLevel::ChangeOrder,
            ContractType::Amendment
            | ContractType::FlowdownAmendment
            | ContractType::ConstructionAmendment => DocumentLevel::Amendment,
            _ => DocumentLevel::Other,
        }
    }
}

/// Display grouping of a document within its family.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DocumentLevel {
    #[serde(rename = "MSA")]
    Msa,
    #[serde(rename = "SOW")]
    Sow,
    ChangeOrder,
    Amendment,
    Other,
}

/// Lifecycle status of a contract record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ContractStatus {
    Active,
    Expired,
    Draft,
    Terminated,
}

impl ContractStatus {
    /// Map a source status tag. Only `COMPLETE` counts as active.
    pub fn from_source(tag: &str) -> Self {
        if tag.trim() == "COMPLETE" {
            ContractStatus::Active
        } else {
            ContractStatus::Draft
        }
    }
}

/// Risk classification, ordered from least to most severe.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn parse(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "low" => Some(RiskLevel::Low),
            "medium" => Some(RiskLevel::Medium),
            "high" => Some(RiskLevel::High),
            "critical" => Some(RiskLevel::Critical),
            _ => None,
        }
    }
}

/// Industry category of a record or family.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Industry {
    Procurement,
    Manufacturing,
    Healthcare,
    Construction,
    Energy,
    Financial,
    #[default]
    #[serde(rename = "Business Services")]
    BusinessServices,
    General,
    #[serde(rename = "Human Resources")]
    HumanResources,
}

impl Industry {
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim() {
            "Procurement" => Some(Industry::Procurement),
            "Manufacturing" => Some(Industry::Manufacturing),
            "Healthcare" => Some(Industry::Healthcare),
            "Construction" => Some(Industry::Construction),
            "Energy" => Some(Industry::Energy),
            "Financial" => Some(Industry::Financial),
            "Business Services" | "BusinessServices" => Some(Industry::BusinessServices),
            "General" => Some(Industry::General),
            "Human Resources" | "HumanResources" => Some(Industry::HumanResources),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Industry::Procurement => "Procurement",
            Industry::Manufacturing => "Manufacturing",
            Industry::Healthcare => "Healthcare",
            Industry::Construction => "Construction",
            Industry::Energy => "Energy",
            Industry::Financial => "Financial",
            Industry::BusinessServices => "Business Services",
            Industry::General => "General",
            Industry::HumanResources => "Human Resources",
        }
    }
}

/// A dated milestone within a contract.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Milestone {
    pub date: String,
    pub description: String,
    #[serde(default)]
    pub completed: bool,
}

/// A fixed liability cap declared in a contract's provisions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LiabilityCap {
    pub amount: f64,
    pub currency: String,
}

/// The canonical unit of the engine: one normalized contract record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContractRecord {
    /// Unique identifier
    pub id: String,

    #[serde(rename = "type")]
    pub contract_type: ContractType,

    pub title: String,

    pub first_party: String,

    pub third_party: String,

    /// Effective date as declared by the source
    pub effective_date: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<String>,

    pub governing_law: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jurisdiction: Option<String>,

    pub payment_terms: String,

    pub termination_clause: String,

    pub confidentiality_clause: String,

    pub indemnification_clause: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_value: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,

    /// Contract number of the parent record, if this record declares one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_contract_number: Option<String>,

    /// Key that children use to reference this record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_number: Option<String>,

    /// Children attached during hierarchy building
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ContractRecord>,

    pub status: ContractStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<RiskLevel>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub compliance_requirements: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_milestones: Vec<Milestone>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<Industry>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_manager: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_unit: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liability_cap: Option<LiabilityCap>,

    /// Custom provisions the engine does not interpret
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extensions: BTreeMap<String, serde_json::Value>,
}

impl ContractRecord {
    /// Create a record with every descriptive field at its documented default.
    pub fn new(id: impl Into<String>, contract_type: ContractType, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            contract_type,
            title: title.into(),
            first_party: UNKNOWN_PARTY.to_string(),
            third_party: UNKNOWN_PARTY.to_string(),
            effective_date: NOT_SPECIFIED.to_string(),
            expiration_date: None,
            governing_law: NOT_SPECIFIED.to_string(),
            jurisdiction: None,
            payment_terms: NOT_SPECIFIED.to_string(),
            termination_clause: "Standard termination terms apply".to_string(),
            confidentiality_clause: "Standard confidentiality terms apply".to_string(),
            indemnification_clause: "Standard indemnification terms".to_string(),
            total_value: None,
            currency: None,
            parent_contract_number: None,
            contract_number: None,
            children: Vec::new(),
            status: ContractStatus::Draft,
            risk_level: None,
            compliance_requirements: Vec::new(),
            key_milestones: Vec::new(),
            industry: None,
            contract_manager: None,
            business_unit: None,
            liability_cap: None,
            extensions: BTreeMap::new(),
        }
    }

    pub fn with_contract_number(mut self, number: impl Into<String>) -> Self {
        self.contract_number = Some(number.into());
        self
    }

    pub fn with_parent(mut self, parent_number: impl Into<String>) -> Self {
        self.parent_contract_number = Some(parent_number.into());
        self
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.total_value = Some(value);
        self
    }

    pub fn with_status(mut self, status: ContractStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_parties(mut self, first: impl Into<String>, third: impl Into<String>) -> Self {
        self.first_party = first.into();
        self.third_party = third.into();
        self
    }

    pub fn with_dates(mut self, effective: impl Into<String>, expiration: Option<&str>) -> Self {
        self.effective_date = effective.into();
        self.expiration_date = expiration.map(str::to_string);
        self
    }

    pub fn with_governing_law(mut self, law: impl Into<String>) -> Self {
        self.governing_law = law.into();
        self
    }

    pub fn with_jurisdiction(mut self, jurisdiction: impl Into<String>) -> Self {
        self.jurisdiction = Some(jurisdiction.into());
        self
    }

    pub fn with_payment_terms(mut self, terms: impl Into<String>) -> Self {
        self.payment_terms = terms.into();
        self
    }

    pub fn with_compliance<I, S>(mut self, requirements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.compliance_requirements = requirements.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_industry(mut self, industry: Industry) -> Self {
        self.industry = Some(industry);
        self
    }

    /// Key used to name a family rooted at this record.
    pub fn family_key(&self) -> &str {
        self.contract_number.as_deref().unwrap_or(&self.id)
    }

    /// This record followed by all descendants, depth-first pre-order.
    pub fn preorder(&self) -> Vec<&ContractRecord> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(node.children.iter().rev());
        }
        out
    }
}

impl Drop for ContractRecord {
    // Flatten the subtree first so dropping a deep chain does not recurse.
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut child) = pending.pop() {
            pending.append(&mut child.children);
        }
    }
}

/// How a family relates to its counterparty.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RelationshipType {
    #[serde(rename = "Strategic Partnership")]
    StrategicPartnership,
    Vendor,
    #[serde(rename = "Service Provider")]
    ServiceProvider,
    #[serde(rename = "Government Contract")]
    GovernmentContract,
}

impl RelationshipType {
    pub fn label(&self) -> &'static str {
        match self {
            RelationshipType::StrategicPartnership => "Strategic Partnership",
            RelationshipType::Vendor => "Vendor",
            RelationshipType::ServiceProvider => "Service Provider",
            RelationshipType::GovernmentContract => "Government Contract",
        }
    }
}

/// Earliest effective date to latest expiration date across a family.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct FamilySpan {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<NaiveDate>,
}

/// Aggregates computed over every node of a family tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FamilyMetrics {
    pub total_family_value: f64,
    pub total_contracts: usize,
    pub active_sow_count: usize,
    pub total_change_orders: usize,
    pub family_span: FamilySpan,
    pub avg_risk_level: RiskLevel,
}

/// Liability terms carried over from the root agreement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LiabilityFramework {
    pub cap_amount: f64,
    pub cap_currency: String,
}

/// Governance terms established by the root agreement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GovernanceFramework {
    pub governing_law: String,
    pub jurisdiction: String,
    pub default_payment_terms: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub termination_rights: Option<String>,
    /// Deduplicated compliance requirements observed across the family
    #[serde(default)]
    pub compliance_flags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liability_framework: Option<LiabilityFramework>,
}

/// Who the family is between and how it is managed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BusinessContext {
    pub parties: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_manager: Option<String>,
    pub industry_category: String,
    pub relationship_type: RelationshipType,
}

/// A root agreement with its full subtree and derived snapshots.
///
/// Families are rebuilt on every assembly call; nothing here is mutated
/// after construction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContractFamily {
    pub id: String,
    pub master_agreement: ContractRecord,
    pub family_metrics: FamilyMetrics,
    pub governance_framework: GovernanceFramework,
    pub business_context: BusinessContext,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_tags_fold_into_canonical_variants() {
        assert_eq!(ContractType::from_tag("MSA"), ContractType::Msa);
        assert_eq!(ContractType::from_tag("SOW"), ContractType::Sow);
        assert_eq!(ContractType::from_tag("Sow"), ContractType::Sow);
        assert_eq!(ContractType::from_tag("Widget"), ContractType::Other);
    }

    #[test]
    fn test_unlisted_types_sort_after_other() {
        assert_eq!(ContractType::Msa.precedence(), 0);
        assert_eq!(ContractType::Other.precedence(), 10);
        assert!(ContractType::PrimeContract.precedence() > ContractType::Other.precedence());
    }

    #[test]
    fn test_legacy_casing_deserializes() {
        let t: ContractType = serde_json::from_str("\"SOW\"").unwrap();
        assert_eq!(t, ContractType::Sow);
    }

    #[test]
    fn test_status_only_complete_is_active() {
        assert_eq!(ContractStatus::from_source("COMPLETE"), ContractStatus::Active);
        assert_eq!(ContractStatus::from_source("IN_PROGRESS"), ContractStatus::Draft);
        assert_eq!(ContractStatus::from_source("Active"), ContractStatus::Draft);
    }

    #[test]
    fn test_preorder_visits_parent_before_children() {
        let mut root = ContractRecord::new("r", ContractType::Msa, "Root");
        let mut a = ContractRecord::new("a", ContractType::Sow, "A");
        a.children.push(ContractRecord::new("a1", ContractType::ChangeOrder, "A1"));
        root.children.push(a);
        root.children.push(ContractRecord::new("b", ContractType::Sow, "B"));

        let ids: Vec<&str> = root.preorder().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["r", "a", "a1", "b"]);
    }

    #[test]
    fn test_family_key_falls_back_to_id() {
        let record = ContractRecord::new("id-1", ContractType::Msa, "Root");
        assert_eq!(record.family_key(), "id-1");
        let record = record.with_contract_number("MSA-1");
        assert_eq!(record.family_key(), "MSA-1");
    }
}
