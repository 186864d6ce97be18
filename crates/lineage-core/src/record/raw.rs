//! Raw agreement records as supplied by upstream collaborators.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::types::Milestone;

/// Errors that can occur when loading a record document.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Failed to read record file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Record validation failed: {0}")]
    ValidationError(String),
}

/// A party named in an agreement.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RawParty {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub name_in_agreement: Option<String>,
}

/// Commercial and legal provisions extracted from an agreement.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RawProvisions {
    #[serde(default)]
    pub effective_date: Option<String>,

    /// Used as the record's expiration date
    #[serde(default)]
    pub renewal_notice_date: Option<String>,

    #[serde(default)]
    pub governing_law: Option<String>,

    #[serde(default)]
    pub jurisdiction: Option<String>,

    #[serde(default)]
    pub total_agreement_value: Option<f64>,

    #[serde(default)]
    pub total_agreement_value_currency_code: Option<String>,

    /// Payment-term code such as `THIRTY_DAYS`
    #[serde(default)]
    pub payment_terms_due_date: Option<String>,

    #[serde(default)]
    pub termination_period_for_convenience: Option<String>,

    #[serde(default)]
    pub liability_cap_fixed_amount: Option<f64>,

    #[serde(default)]
    pub liability_cap_currency_code: Option<String>,
}

/// Customer-specific provisions.
///
/// The two keys the engine interprets are typed; everything else is kept
/// verbatim in `extensions` and carried onto the normalized record.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CustomProvisions {
    #[serde(rename = "c_ParentContractNumber", default)]
    pub parent_contract_number: Option<String>,

    /// `"True"` marks a government contract; any other value does not
    #[serde(rename = "c_GovernmentContract", default)]
    pub government_contract: Option<String>,

    #[serde(flatten)]
    pub extensions: BTreeMap<String, serde_json::Value>,
}

impl CustomProvisions {
    pub fn is_government_contract(&self) -> bool {
        self.government_contract.as_deref() == Some("True")
    }
}

/// One loosely-typed input record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawRecord {
    pub id: String,

    #[serde(default)]
    pub title: Option<String>,

    /// Source filename; the contract number is extracted from it
    #[serde(default)]
    pub file_name: Option<String>,

    /// Source type tag (`Msa`, `SOW`, `ChangeOrder`, ...)
    #[serde(rename = "type", default)]
    pub contract_type: String,

    /// Source status tag (`COMPLETE`, `DRAFT`, `IN_PROGRESS`)
    #[serde(default)]
    pub status: String,

    #[serde(default)]
    pub category: Option<String>,

    #[serde(default)]
    pub parties: Vec<RawParty>,

    #[serde(default)]
    pub provisions: RawProvisions,

    #[serde(default)]
    pub custom_provisions: CustomProvisions,

    /// Explicit contract number, taking precedence over filename extraction
    #[serde(default)]
    pub contract_number: Option<String>,

    #[serde(default)]
    pub industry: Option<String>,

    #[serde(default)]
    pub contract_manager: Option<String>,

    #[serde(default)]
    pub business_unit: Option<String>,

    #[serde(default)]
    pub compliance_requirements: Vec<String>,

    #[serde(default)]
    pub milestones: Vec<Milestone>,

    #[serde(default)]
    pub risk_level: Option<String>,
}

impl RawRecord {
    /// Minimal record with only an identifier and type tag.
    pub fn new(id: impl Into<String>, contract_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
            file_name: None,
            contract_type: contract_type.into(),
            status: String::new(),
            category: None,
            parties: Vec::new(),
            provisions: RawProvisions::default(),
            custom_provisions: CustomProvisions::default(),
            contract_number: None,
            industry: None,
            contract_manager: None,
            business_unit: None,
            compliance_requirements: Vec::new(),
            milestones: Vec::new(),
            risk_level: None,
        }
    }
}

/// Accepted document shapes: a bare array or `{ "agreements": [...] }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum RecordDocument {
    Bare(Vec<RawRecord>),
    Wrapped { agreements: Vec<RawRecord> },
}

/// Parse a JSON record document.
pub fn records_from_json(json: &str) -> Result<Vec<RawRecord>, IngestError> {
    let document: RecordDocument = serde_json::from_str(json)?;
    let records = match document {
        RecordDocument::Wrapped { agreements } => agreements,
        RecordDocument::Bare(records) => records,
    };
    validate_records(&records)?;
    Ok(records)
}

/// Read and parse a JSON record document from disk.
pub fn records_from_json_file(path: impl AsRef<Path>) -> Result<Vec<RawRecord>, IngestError> {
    let contents = fs::read_to_string(path)?;
    records_from_json(&contents)
}

/// Identifiers must be present and unique across the whole input.
fn validate_records(records: &[RawRecord]) -> Result<(), IngestError> {
    crate::validate_ids(records.iter().map(|record| record.id.as_str()))
        .map_err(|e| IngestError::ValidationError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const WRAPPED: &str = r#"{
  "agreements": [
    {
      "id": "a-1",
      "title": "Master Services Agreement",
      "file_name": "MSA-99119 Acme.pdf",
      "type": "Msa",
      "status": "COMPLETE",
      "parties": [{"id": "p1", "name_in_agreement": "Acme Corp"}],
      "provisions": {"effective_date": "2023-01-01", "total_agreement_value": 250000},
      "custom_provisions": {"c_GovernmentContract": "True", "c_Region": "EMEA"}
    }
  ]
}"#;

    #[test]
    fn test_parse_wrapped_document() {
        let records = records_from_json(WRAPPED).unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.contract_type, "Msa");
        assert_eq!(record.provisions.total_agreement_value, Some(250000.0));
        assert!(record.custom_provisions.is_government_contract());
        assert_eq!(
            record.custom_provisions.extensions.get("c_Region"),
            Some(&serde_json::Value::String("EMEA".to_string()))
        );
    }

    #[test]
    fn test_parse_bare_array() {
        let records = records_from_json(r#"[{"id": "x", "type": "Sow"}]"#).unwrap();
        assert_eq!(records[0].id, "x");
        assert!(records[0].custom_provisions.parent_contract_number.is_none());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let result = records_from_json(r#"[{"id": "x"}, {"id": "x"}]"#);
        assert!(
            matches!(result, Err(IngestError::ValidationError(msg)) if msg == "Duplicate record id: x")
        );
    }

    #[test]
    fn test_blank_id_rejected() {
        let result = records_from_json(r#"[{"id": "  "}]"#);
        assert!(
            matches!(result, Err(IngestError::ValidationError(msg)) if msg == "Record with empty id")
        );
    }

    #[test]
    fn test_government_flag_requires_exact_true() {
        let mut custom = CustomProvisions::default();
        custom.government_contract = Some("true".to_string());
        assert!(!custom.is_government_contract());
        custom.government_contract = Some("True".to_string());
        assert!(custom.is_government_contract());
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(matches!(
            records_from_json("{not json"),
            Err(IngestError::JsonError(_))
        ));
    }
}
