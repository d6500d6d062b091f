use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A reimbursement claim filed by a congressperson under the expense quota.
///
/// One reimbursement can cover several fiscal documents issued by the same
/// supplier, which is why the value fields carry comma-separated lists
/// (e.g. `"1.99,2.99"`) exactly as published in the chamber's dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reimbursement {
    /// Public document identifier, unique across the dataset
    pub document_id: i64,
    pub applicant_id: i64,
    pub year: i64,
    pub month: i64,
    pub congressperson_name: Option<String>,
    /// Two-letter state code of the congressperson
    pub state: Option<String>,
    /// Supplier tax id (CNPJ for companies, CPF for individuals)
    pub cnpj_cpf: Option<String>,
    pub supplier: String,
    pub subquota_id: i64,
    pub subquota_description: String,
    pub issue_date: NaiveDate,
    /// Comma-separated net value of each covered document
    pub net_values: String,
    /// Comma-separated reimbursement values, absent for unreimbursed claims
    pub reimbursement_values: Option<String>,
    /// Comma-separated reimbursement numbers
    pub reimbursement_numbers: String,
    pub total_net_value: f64,
    /// Flagged by the irregularity analysis
    pub suspicious: bool,
    /// Suspicion probability, when the analysis produced one
    pub probability: Option<f64>,
    /// Whether the receipt existence check already ran for this record
    pub receipt_fetched: bool,
    /// Result of the receipt existence check; only meaningful once
    /// `receipt_fetched` is set
    pub receipt_url: Option<String>,
}

impl Reimbursement {
    /// Net values as numbers, in document order.
    pub fn all_net_values(&self) -> Vec<f64> {
        parse_number_list(&self.net_values)
    }

    /// Reimbursement values as numbers; empty when none were recorded.
    pub fn all_reimbursement_values(&self) -> Vec<f64> {
        self.reimbursement_values
            .as_deref()
            .map(parse_number_list)
            .unwrap_or_default()
    }

    /// Reimbursement numbers as integers.
    pub fn all_reimbursement_numbers(&self) -> Vec<i64> {
        parse_number_list(&self.reimbursement_numbers)
    }
}

/// Splits a comma-separated list, dropping fragments that fail to parse.
/// The published dataset occasionally carries stray whitespace around values.
fn parse_number_list<T: FromStr>(raw: &str) -> Vec<T> {
    raw.split(',')
        .filter_map(|fragment| fragment.trim().parse().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Reimbursement {
        Reimbursement {
            document_id: 20,
            applicant_id: 1,
            year: 2017,
            month: 3,
            congressperson_name: Some("Example Deputy".to_string()),
            state: Some("SP".to_string()),
            cnpj_cpf: Some("12345678901".to_string()),
            supplier: "Example Supplier".to_string(),
            subquota_id: 22,
            subquota_description: "Flight tickets".to_string(),
            issue_date: NaiveDate::from_ymd_opt(2017, 3, 14).unwrap(),
            net_values: "1.99,2.99".to_string(),
            reimbursement_values: Some("200.00,500.00".to_string()),
            reimbursement_numbers: "2,3".to_string(),
            total_net_value: 4.98,
            suspicious: false,
            probability: None,
            receipt_fetched: false,
            receipt_url: None,
        }
    }

    #[test]
    fn test_net_values_parse_in_order() {
        assert_eq!(vec![1.99, 2.99], sample().all_net_values());
    }

    #[test]
    fn test_reimbursement_values_default_to_empty() {
        let mut record = sample();
        record.reimbursement_values = None;
        assert!(record.all_reimbursement_values().is_empty());
    }

    #[test]
    fn test_number_list_ignores_garbage_fragments() {
        assert_eq!(vec![2, 3], parse_number_list::<i64>("2, 3,,x"));
    }

    #[test]
    fn test_issue_date_serializes_as_iso() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!("2017-03-14", json["issue_date"]);
    }
}
