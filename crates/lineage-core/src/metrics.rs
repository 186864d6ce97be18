//! Metrics Aggregator: whole-tree totals, counts, time span and composite risk.
//!
//! The composite risk rules are fixed policy, evaluated in this order:
//! 1. A government signal anywhere in the family → `Critical`
//! 2. More than [`MetricsAggregator::MAX_COMPLIANCE_FLAGS`] distinct flags → `Critical`
//! 3. Total value at or above [`MetricsAggregator::HIGH_VALUE`] → `High`
//! 4. Total value above [`MetricsAggregator::MEDIUM_VALUE`] → `Medium`
//! 5. Otherwise → `Low`

use chrono::{DateTime, NaiveDate};

use crate::diagnostics::Diagnostic;
use crate::types::{ContractRecord, ContractStatus, FamilyMetrics, FamilySpan, RiskLevel};

/// Computes [`FamilyMetrics`] over a root and all of its descendants.
pub struct MetricsAggregator;

impl MetricsAggregator {
    /// Families worth at least this much are `High` risk.
    pub const HIGH_VALUE: f64 = 2_000_000.0;

    /// Families worth more than this are at least `Medium` risk.
    pub const MEDIUM_VALUE: f64 = 500_000.0;

    /// A family with more distinct compliance flags than this is `Critical`.
    pub const MAX_COMPLIANCE_FLAGS: usize = 2;

    pub fn new() -> Self {
        Self
    }

    /// Aggregate a tree, discarding date diagnostics.
    pub fn aggregate(&self, root: &ContractRecord) -> FamilyMetrics {
        let mut ignored = Vec::new();
        self.aggregate_reporting(root, &mut ignored)
    }

    /// Aggregate a tree, pushing an `UnparseableDate` for every date that
    /// could not be placed on the timeline.
    pub fn aggregate_reporting(
        &self,
        root: &ContractRecord,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> FamilyMetrics {
        let nodes = root.preorder();

        let mut total_family_value = 0.0;
        let mut active_sow_count = 0;
        let mut total_change_orders = 0;
        let mut start: Option<NaiveDate> = None;
        let mut end: Option<NaiveDate> = None;

        for node in &nodes {
            total_family_value += node.total_value.unwrap_or(0.0);

            if node.contract_type.is_sow() && node.status == ContractStatus::Active {
                active_sow_count += 1;
            }
            if node.contract_type.is_change_order() {
                total_change_orders += 1;
            }

            match parse_date(&node.effective_date) {
                Some(date) => start = Some(start.map_or(date, |s| s.min(date))),
                None => diagnostics.push(Diagnostic::UnparseableDate {
                    record_id: node.id.clone(),
                    field: "effective_date".to_string(),
                    value: node.effective_date.clone(),
                }),
            }

            if let Some(expiration) = &node.expiration_date {
                match parse_date(expiration) {
                    Some(date) => end = Some(end.map_or(date, |e| e.max(date))),
                    None => diagnostics.push(Diagnostic::UnparseableDate {
                        record_id: node.id.clone(),
                        field: "expiration_date".to_string(),
                        value: expiration.clone(),
                    }),
                }
            }
        }

        let flags = compliance_flags(root);
        let avg_risk_level =
            composite_risk(total_family_value, has_government_signal(&flags), flags.len());

        FamilyMetrics {
            total_family_value,
            total_contracts: nodes.len(),
            active_sow_count,
            total_change_orders,
            family_span: FamilySpan { start, end },
            avg_risk_level,
        }
    }
}

impl Default for MetricsAggregator {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a declared date.
///
/// Accepts `YYYY-MM-DD`, an RFC 3339 timestamp (date part kept) and `MM/DD/YYYY`.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|dt| dt.date_naive())
        })
        .or_else(|| NaiveDate::parse_from_str(value, "%m/%d/%Y").ok())
}

/// Distinct compliance requirements across the tree, in first-seen pre-order.
pub fn compliance_flags(root: &ContractRecord) -> Vec<String> {
    let mut flags: Vec<String> = Vec::new();
    for node in root.preorder() {
        for requirement in &node.compliance_requirements {
            if !flags.contains(requirement) {
                flags.push(requirement.clone());
            }
        }
    }
    flags
}

/// True when any flag names a government requirement.
pub fn has_government_signal(flags: &[String]) -> bool {
    flags
        .iter()
        .any(|flag| flag.to_lowercase().contains("government"))
}

/// Family-level risk from total value and compliance signals.
pub fn composite_risk(total_value: f64, government: bool, flag_count: usize) -> RiskLevel {
    if government || flag_count > MetricsAggregator::MAX_COMPLIANCE_FLAGS {
        RiskLevel::Critical
    } else if total_value >= MetricsAggregator::HIGH_VALUE {
        RiskLevel::High
    } else if total_value > MetricsAggregator::MEDIUM_VALUE {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ContractType;

    fn scenario() -> ContractRecord {
        let mut co = ContractRecord::new("co", ContractType::ChangeOrder, "CO-1")
            .with_contract_number("CO-1")
            .with_parent("SOW-1")
            .with_value(10_000.0)
            .with_dates("2023-06-01", None);
        co.status = ContractStatus::Draft;

        let mut sow = ContractRecord::new("sow", ContractType::Sow, "SOW-1")
            .with_contract_number("SOW-1")
            .with_parent("MSA-1")
            .with_value(50_000.0)
            .with_status(ContractStatus::Active)
            .with_dates("2023-02-01", Some("2024-12-31"));
        sow.children.push(co);

        let mut root = ContractRecord::new("msa", ContractType::Msa, "MSA-1")
            .with_contract_number("MSA-1")
            .with_value(100_000.0)
            .with_dates("2023-01-15", Some("2025-01-14"));
        root.children.push(sow);
        root
    }

    #[test]
    fn test_scenario_metrics() {
        let metrics = MetricsAggregator::new().aggregate(&scenario());

        assert_eq!(metrics.total_contracts, 3);
        assert_eq!(metrics.total_family_value, 160_000.0);
        assert_eq!(metrics.active_sow_count, 1);
        assert_eq!(metrics.total_change_orders, 1);
        assert_eq!(metrics.avg_risk_level, RiskLevel::Low);
        assert_eq!(
            metrics.family_span.start,
            NaiveDate::from_ymd_opt(2023, 1, 15)
        );
        assert_eq!(metrics.family_span.end, NaiveDate::from_ymd_opt(2025, 1, 14));
    }

    #[test]
    fn test_draft_sow_not_counted_active() {
        let mut root = ContractRecord::new("m", ContractType::Msa, "M");
        root.children
            .push(ContractRecord::new("s", ContractType::Sow, "S").with_status(ContractStatus::Draft));
        assert_eq!(MetricsAggregator::new().aggregate(&root).active_sow_count, 0);
    }

    #[test]
    fn test_risk_boundary_at_two_million() {
        assert_eq!(composite_risk(2_000_000.0, false, 1), RiskLevel::High);
        assert_eq!(composite_risk(1_999_999.0, false, 1), RiskLevel::Medium);
        assert_eq!(composite_risk(500_000.0, false, 0), RiskLevel::Low);
        assert_eq!(composite_risk(500_001.0, false, 0), RiskLevel::Medium);
    }

    #[test]
    fn test_government_signal_forces_critical() {
        assert_eq!(composite_risk(2_000_001.0, true, 1), RiskLevel::Critical);
        assert_eq!(composite_risk(0.0, true, 1), RiskLevel::Critical);
    }

    #[test]
    fn test_too_many_flags_is_critical() {
        assert_eq!(composite_risk(0.0, false, 2), RiskLevel::Low);
        assert_eq!(composite_risk(0.0, false, 3), RiskLevel::Critical);
    }

    #[test]
    fn test_single_non_government_flag_at_boundary() {
        let root = ContractRecord::new("m", ContractType::Msa, "M")
            .with_value(2_000_000.0)
            .with_compliance(["SOX"]);
        assert_eq!(MetricsAggregator::new().aggregate(&root).avg_risk_level, RiskLevel::High);
    }

    #[test]
    fn test_government_flag_anywhere_in_tree() {
        let mut root = ContractRecord::new("m", ContractType::Msa, "M").with_value(10.0);
        root.children.push(
            ContractRecord::new("s", ContractType::Sow, "S")
                .with_compliance(["Government Contract Requirements"]),
        );
        assert_eq!(
            MetricsAggregator::new().aggregate(&root).avg_risk_level,
            RiskLevel::Critical
        );
    }

    #[test]
    fn test_compliance_flags_deduplicated_in_order() {
        let mut root = ContractRecord::new("m", ContractType::Msa, "M").with_compliance(["SOX", "GDPR"]);
        root.children
            .push(ContractRecord::new("s", ContractType::Sow, "S").with_compliance(["HIPAA", "SOX"]));
        assert_eq!(compliance_flags(&root), vec!["SOX", "GDPR", "HIPAA"]);
    }

    #[test]
    fn test_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 9);
        assert_eq!(parse_date("2024-03-09"), expected);
        assert_eq!(parse_date("2024-03-09T10:30:00Z"), expected);
        assert_eq!(parse_date("03/09/2024"), expected);
        assert_eq!(parse_date("Not specified"), None);
        assert_eq!(parse_date("2024-13-40"), None);
    }

    #[test]
    fn test_unparseable_dates_excluded_and_reported() {
        let mut root = ContractRecord::new("m", ContractType::Msa, "M")
            .with_dates("sometime", Some("never"));
        root.children.push(
            ContractRecord::new("s", ContractType::Sow, "S").with_dates("2022-05-01", None),
        );

        let mut diagnostics = Vec::new();
        let metrics = MetricsAggregator::new().aggregate_reporting(&root, &mut diagnostics);

        assert_eq!(metrics.family_span.start, NaiveDate::from_ymd_opt(2022, 5, 1));
        assert_eq!(metrics.family_span.end, None);
        assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics
            .iter()
            .all(|d| matches!(d, Diagnostic::UnparseableDate { record_id, .. } if record_id == "m")));
    }

    #[test]
    fn test_no_parseable_effective_date_leaves_start_empty() {
        let root = ContractRecord::new("m", ContractType::Msa, "M");
        assert_eq!(MetricsAggregator::new().aggregate(&root).family_span.start, None);
    }
}
