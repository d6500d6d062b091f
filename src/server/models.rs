use serde::{Deserialize, Serialize};

use crate::models::Reimbursement;

/// Query parameters accepted by the list endpoint.
///
/// `document_id` and `suspicious` stay raw strings: the portal hands out
/// multi-id lists with mixed separators, and the suspicious flag accepts
/// the `1`/`true`/`0`/`false` literals only.
#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub cnpj_cpf: Option<String>,
    pub subquota_id: Option<i64>,
    pub applicant_id: Option<i64>,
    pub year: Option<i64>,
    pub document_id: Option<String>,
    pub suspicious: Option<String>,
    pub issue_date_start: Option<String>,
    pub issue_date_end: Option<String>,
    pub order_by: Option<String>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

/// Query parameters for the receipt endpoint. `?force` is a bare flag;
/// its presence alone requests a re-check.
#[derive(Debug, Deserialize)]
pub struct ReceiptParams {
    pub force: Option<String>,
}

/// Page envelope for list responses
#[derive(Debug, Serialize)]
pub struct PageEnvelope {
    /// Total records matching the filter, across all pages
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<ReimbursementPayload>,
}

/// A reimbursement as served over the API: every stored field plus the
/// multi-value columns re-exposed as parsed lists.
#[derive(Debug, Serialize)]
pub struct ReimbursementPayload {
    #[serde(flatten)]
    pub record: Reimbursement,
    pub all_net_values: Vec<f64>,
    pub all_reimbursement_values: Vec<f64>,
    pub all_reimbursement_numbers: Vec<i64>,
}

impl From<Reimbursement> for ReimbursementPayload {
    fn from(record: Reimbursement) -> Self {
        Self {
            all_net_values: record.all_net_values(),
            all_reimbursement_values: record.all_reimbursement_values(),
            all_reimbursement_numbers: record.all_reimbursement_numbers(),
            record,
        }
    }
}

/// Response for the receipt existence check
#[derive(Debug, Serialize)]
pub struct ReceiptResponse {
    pub url: Option<String>,
}
