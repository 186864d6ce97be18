//! Record ingestion and normalization.
//!
//! Raw records arrive loosely typed from upstream collaborators. This module
//! loads record documents and turns each raw record into a canonical
//! [`crate::types::ContractRecord`].

mod normalizer;
mod raw;

pub use normalizer::{
    default_risk_level, extract_contract_number, format_currency, format_payment_terms,
    normalize, Normalizer, GOVERNMENT_REQUIREMENT,
};
pub use raw::{
    records_from_json, records_from_json_file, CustomProvisions, IngestError, RawParty,
    RawProvisions, RawRecord,
};
