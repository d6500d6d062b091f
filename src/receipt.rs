//! Outbound receipt existence checks.
//!
//! Receipts are published by the chamber as PDFs under a predictable path,
//! so the check is a single HEAD request against the canonical URL. The
//! HTTP layer memoizes the outcome on the record; this module only knows
//! how to build the URL and ask whether something is there.

use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

use crate::models::Reimbursement;

/// Receipt probe errors
#[derive(Error, Debug)]
pub enum ReceiptError {
    #[error("failed to build receipt HTTP client: {0}")]
    Build(reqwest::Error),

    #[error("receipt probe failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// HEAD prober for receipt documents on the chamber's host.
#[derive(Clone)]
pub struct ReceiptClient {
    client: reqwest::Client,
    base_url: String,
}

impl ReceiptClient {
    pub fn new(base_url: &str, timeout_ms: u64) -> Result<Self, ReceiptError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .user_agent(concat!("quotawatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ReceiptError::Build)?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// The canonical published location of a record's receipt PDF.
    pub fn canonical_url(&self, record: &Reimbursement) -> String {
        format!(
            "{}/cota-parlamentar/documentos/publ/{}/{}/{}.pdf",
            self.base_url, record.applicant_id, record.year, record.document_id
        )
    }

    /// Issues a HEAD request; 200 means the receipt exists, any other
    /// status means it does not. Transport failures bubble up so callers
    /// can distinguish "absent" from "unreachable".
    pub async fn exists(&self, url: &str) -> Result<bool, ReceiptError> {
        let response = self.client.head(url).send().await?;
        log::debug!("receipt probe {} -> {}", url, response.status());
        Ok(response.status() == StatusCode::OK)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn sample() -> Reimbursement {
        Reimbursement {
            document_id: 20,
            applicant_id: 1,
            year: 2017,
            month: 3,
            congressperson_name: None,
            state: None,
            cnpj_cpf: None,
            supplier: "Example Supplier".to_string(),
            subquota_id: 22,
            subquota_description: "Flight tickets".to_string(),
            issue_date: NaiveDate::from_ymd_opt(2017, 3, 14).unwrap(),
            net_values: "1.99,2.99".to_string(),
            reimbursement_values: None,
            reimbursement_numbers: "2,3".to_string(),
            total_net_value: 4.98,
            suspicious: false,
            probability: None,
            receipt_fetched: false,
            receipt_url: None,
        }
    }

    #[test]
    fn test_canonical_url_layout() {
        let client = ReceiptClient::new("https://www.camara.gov.br", 5_000).unwrap();
        assert_eq!(
            "https://www.camara.gov.br/cota-parlamentar/documentos/publ/1/2017/20.pdf",
            client.canonical_url(&sample())
        );
    }

    #[test]
    fn test_trailing_slash_in_base_url_is_tolerated() {
        let client = ReceiptClient::new("https://www.camara.gov.br/", 5_000).unwrap();
        assert_eq!(
            "https://www.camara.gov.br/cota-parlamentar/documentos/publ/1/2017/20.pdf",
            client.canonical_url(&sample())
        );
    }
}
