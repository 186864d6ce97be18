//! Record Normalizer: raw input record -> canonical [`ContractRecord`].
//!
//! Normalization never fails. Absent or unusable values fall back to the
//! defaults below, and each fallback is reported as a
//! [`Diagnostic::MissingField`].
//!
//! | Field | Default |
//! |-------|---------|
//! | title | `Untitled Agreement` |
//! | parties | `Unknown Party` |
//! | effective date | `Not specified` |
//! | governing law | `Not specified` |
//! | payment terms | `Not specified` |
//! | currency | `USD` |
//! | industry | `Business Services` |
//! | contract manager | `Contract Administrator` |

use lazy_static::lazy_static;
use regex::Regex;

use crate::diagnostics::Diagnostic;
use crate::types::{
    ContractRecord, ContractStatus, ContractType, Industry, LiabilityCap, RiskLevel,
    NOT_SPECIFIED, UNKNOWN_PARTY,
};

use super::raw::RawRecord;

/// Compliance requirement added to government contracts.
pub const GOVERNMENT_REQUIREMENT: &str = "Government Contract Requirements";

const DEFAULT_CURRENCY: &str = "USD";
const DEFAULT_CONTRACT_MANAGER: &str = "Contract Administrator";
const UNTITLED: &str = "Untitled Agreement";

lazy_static! {
    /// Contract-number prefixes recognized in source filenames.
    static ref CONTRACT_NUMBER_PATTERN: Regex = Regex::new(
        r"(MSA|SOW|CN|CO|NDA|SLA|CONS|PA|CLIENT)-(\d+)"
    ).unwrap();
}

/// Converts raw records into canonical records.
pub struct Normalizer;

impl Normalizer {
    /// Records above this value default to `High` risk.
    pub const HIGH_RISK_VALUE: f64 = 500_000.0;

    /// Records above this value default to `Medium` risk.
    pub const MEDIUM_RISK_VALUE: f64 = 100_000.0;

    pub fn new() -> Self {
        Self
    }

    /// Normalize one record, discarding diagnostics.
    pub fn normalize(&self, raw: &RawRecord) -> ContractRecord {
        let mut diagnostics = Vec::new();
        self.normalize_reporting(raw, &mut diagnostics)
    }

    /// Normalize one record, appending a `MissingField` diagnostic for every
    /// default applied.
    pub fn normalize_reporting(
        &self,
        raw: &RawRecord,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> ContractRecord {
        let mut missing = |field: &str| {
            diagnostics.push(Diagnostic::MissingField {
                record_id: raw.id.clone(),
                field: field.to_string(),
            });
        };

        let provisions = &raw.provisions;

        let title = match non_empty(raw.title.as_deref()) {
            Some(title) => title.to_string(),
            None => {
                missing("title");
                UNTITLED.to_string()
            }
        };

        let first_name = raw
            .parties
            .first()
            .and_then(|p| non_empty(p.name_in_agreement.as_deref()));
        let second_name = raw
            .parties
            .get(1)
            .and_then(|p| non_empty(p.name_in_agreement.as_deref()));
        if first_name.is_none() {
            missing("parties");
        }
        let first_party = first_name.unwrap_or(UNKNOWN_PARTY).to_string();
        let third_party = second_name.or(first_name).unwrap_or(UNKNOWN_PARTY).to_string();

        let effective_date = match non_empty(provisions.effective_date.as_deref()) {
            Some(date) => date.to_string(),
            None => {
                missing("effective_date");
                NOT_SPECIFIED.to_string()
            }
        };

        let governing_law = match non_empty(provisions.governing_law.as_deref()) {
            Some(law) => law.to_string(),
            None => {
                missing("governing_law");
                NOT_SPECIFIED.to_string()
            }
        };

        let payment_code = non_empty(provisions.payment_terms_due_date.as_deref());
        if payment_code.is_none() {
            missing("payment_terms");
        }
        let payment_terms = format_payment_terms(payment_code);

        let currency = match non_empty(provisions.total_agreement_value_currency_code.as_deref()) {
            Some(code) => code.to_string(),
            None => {
                if provisions.total_agreement_value.is_some() {
                    missing("currency");
                }
                DEFAULT_CURRENCY.to_string()
            }
        };

        let termination_clause =
            match non_empty(provisions.termination_period_for_convenience.as_deref()) {
                Some(period) => format!("Termination with {} notice", period),
                None => "Standard termination terms apply".to_string(),
            };

        let liability_cap = provisions.liability_cap_fixed_amount.map(|amount| LiabilityCap {
            amount,
            currency: non_empty(provisions.liability_cap_currency_code.as_deref())
                .unwrap_or(DEFAULT_CURRENCY)
                .to_string(),
        });
        let indemnification_clause = match &liability_cap {
            Some(cap) => format!("Liability cap: {}", format_currency(cap.amount, &cap.currency)),
            None => "Standard indemnification terms".to_string(),
        };

        let contract_number = non_empty(raw.contract_number.as_deref())
            .map(str::to_string)
            .or_else(|| raw.file_name.as_deref().and_then(extract_contract_number));

        let mut compliance_requirements: Vec<String> = Vec::new();
        for requirement in &raw.compliance_requirements {
            if !compliance_requirements.contains(requirement) {
                compliance_requirements.push(requirement.clone());
            }
        }
        if raw.custom_provisions.is_government_contract()
            && !compliance_requirements.iter().any(|r| r == GOVERNMENT_REQUIREMENT)
        {
            compliance_requirements.push(GOVERNMENT_REQUIREMENT.to_string());
        }

        let risk_level = raw
            .risk_level
            .as_deref()
            .and_then(RiskLevel::parse)
            .unwrap_or_else(|| default_risk_level(provisions.total_agreement_value));

        let industry = match raw.industry.as_deref().and_then(Industry::parse) {
            Some(industry) => industry,
            None => {
                missing("industry");
                Industry::default()
            }
        };

        let contract_manager = match non_empty(raw.contract_manager.as_deref()) {
            Some(manager) => manager.to_string(),
            None => {
                missing("contract_manager");
                DEFAULT_CONTRACT_MANAGER.to_string()
            }
        };

        let business_unit = match non_empty(raw.business_unit.as_deref()) {
            Some(unit) => unit.to_string(),
            None if raw.category.as_deref() == Some("BusinessServices") => {
                "Business Services Division".to_string()
            }
            None => "General Division".to_string(),
        };

        ContractRecord {
            id: raw.id.clone(),
            contract_type: ContractType::from_tag(&raw.contract_type),
            title,
            first_party,
            third_party,
            effective_date,
            expiration_date: non_empty(provisions.renewal_notice_date.as_deref())
                .map(str::to_string),
            governing_law,
            jurisdiction: non_empty(provisions.jurisdiction.as_deref()).map(str::to_string),
            payment_terms,
            termination_clause,
            confidentiality_clause: "Standard confidentiality terms apply".to_string(),
            indemnification_clause,
            total_value: provisions.total_agreement_value,
            currency: Some(currency),
            parent_contract_number: non_empty(
                raw.custom_provisions.parent_contract_number.as_deref(),
            )
            .map(str::to_string),
            contract_number,
            children: Vec::new(),
            status: ContractStatus::from_source(&raw.status),
            risk_level: Some(risk_level),
            compliance_requirements,
            key_milestones: raw.milestones.clone(),
            industry: Some(industry),
            contract_manager: Some(contract_manager),
            business_unit: Some(business_unit),
            liability_cap,
            extensions: raw.custom_provisions.extensions.clone(),
        }
    }

    /// Normalize a whole batch in input order.
    pub fn normalize_all(&self, raws: &[RawRecord]) -> (Vec<ContractRecord>, Vec<Diagnostic>) {
        let mut diagnostics = Vec::new();
        let records = raws
            .iter()
            .map(|raw| self.normalize_reporting(raw, &mut diagnostics))
            .collect();
        (records, diagnostics)
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Normalize one raw record with the default normalizer.
pub fn normalize(raw: &RawRecord) -> ContractRecord {
    Normalizer::new().normalize(raw)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Map a payment-term code to its display label. Unknown codes pass through.
pub fn format_payment_terms(code: Option<&str>) -> String {
    match code {
        None => NOT_SPECIFIED.to_string(),
        Some("THIRTY_DAYS") => "Net 30 days".to_string(),
        Some("FORTY_FIVE_DAYS") => "Net 45 days".to_string(),
        Some("SIXTY_DAYS") => "Net 60 days".to_string(),
        Some("OTHER") => "As per agreement terms".to_string(),
        Some(other) => other.to_string(),
    }
}

/// Extract a contract number such as `SOW-1234` from a filename-like string.
pub fn extract_contract_number(file_name: &str) -> Option<String> {
    CONTRACT_NUMBER_PATTERN
        .captures(file_name)
        .map(|caps| format!("{}-{}", &caps[1], &caps[2]))
}

/// Per-record risk bucket from declared value. Absent value is `Low`.
pub fn default_risk_level(total_value: Option<f64>) -> RiskLevel {
    match total_value {
        Some(v) if v > Normalizer::HIGH_RISK_VALUE => RiskLevel::High,
        Some(v) if v > Normalizer::MEDIUM_RISK_VALUE => RiskLevel::Medium,
        _ => RiskLevel::Low,
    }
}

/// Render an amount with a currency symbol, thousands separators and cents.
pub fn format_currency(amount: f64, currency: &str) -> String {
    let cents = (amount.abs() * 100.0).round() as u128;
    let whole = (cents / 100).to_string();
    let fraction = cents % 100;

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if amount < 0.0 { "-" } else { "" };
    let symbol = match currency {
        "USD" => "$".to_string(),
        "EUR" => "€".to_string(),
        "GBP" => "£".to_string(),
        other => format!("{} ", other),
    };
    format!("{}{}{}.{:02}", sign, symbol, grouped, fraction)
}
