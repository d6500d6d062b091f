//! CSV importer for the reimbursement dataset.
//!
//! The chamber publishes the dataset as CSV snapshots; `--import-csv`
//! replays one into the store. Receipt state is not part of the dataset,
//! so imported rows start unfetched and re-imports keep whatever receipt
//! checks already ran.

use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;

use crate::models::Reimbursement;
use crate::storage::{ReimbursementStore, StorageError};

/// Import errors
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read dataset: {0}")]
    Csv(#[from] csv::Error),

    #[error("row {row}: {source}")]
    Row { row: u64, source: csv::Error },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// One dataset row. Mirrors [`Reimbursement`] minus the receipt columns,
/// which the dataset does not carry.
#[derive(Debug, Deserialize)]
struct CsvRecord {
    document_id: i64,
    applicant_id: i64,
    year: i64,
    month: i64,
    congressperson_name: Option<String>,
    state: Option<String>,
    cnpj_cpf: Option<String>,
    supplier: String,
    subquota_id: i64,
    subquota_description: String,
    issue_date: NaiveDate,
    net_values: String,
    reimbursement_values: Option<String>,
    reimbursement_numbers: String,
    total_net_value: f64,
    suspicious: bool,
    probability: Option<f64>,
}

impl From<CsvRecord> for Reimbursement {
    fn from(row: CsvRecord) -> Self {
        Reimbursement {
            document_id: row.document_id,
            applicant_id: row.applicant_id,
            year: row.year,
            month: row.month,
            congressperson_name: row.congressperson_name,
            state: row.state,
            cnpj_cpf: row.cnpj_cpf,
            supplier: row.supplier,
            subquota_id: row.subquota_id,
            subquota_description: row.subquota_description,
            issue_date: row.issue_date,
            net_values: row.net_values,
            reimbursement_values: row.reimbursement_values,
            reimbursement_numbers: row.reimbursement_numbers,
            total_net_value: row.total_net_value,
            suspicious: row.suspicious,
            probability: row.probability,
            receipt_fetched: false,
            receipt_url: None,
        }
    }
}

/// Import statistics
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub inserted: u64,
    pub updated: u64,
}

/// Reads a dataset CSV and upserts every row. A malformed row aborts the
/// whole import with its 1-based file line in the error.
pub fn import_csv(store: &ReimbursementStore, path: &Path) -> Result<ImportReport, LoadError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut report = ImportReport::default();

    for (index, result) in reader.deserialize::<CsvRecord>().enumerate() {
        // +2 accounts for the header line and 1-based numbering
        let record = result.map_err(|source| LoadError::Row {
            row: index as u64 + 2,
            source,
        })?;
        if store.upsert(&record.into())? {
            report.inserted += 1;
        } else {
            report.updated += 1;
        }
    }

    log::info!(
        "Imported {} new and {} updated reimbursements from {}",
        report.inserted,
        report.updated,
        path.display()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const HEADER: &str = "document_id,applicant_id,year,month,congressperson_name,state,cnpj_cpf,supplier,subquota_id,subquota_description,issue_date,net_values,reimbursement_values,reimbursement_numbers,total_net_value,suspicious,probability";

    fn write_csv(rows: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}", HEADER).unwrap();
        for row in rows {
            writeln!(file, "{}", row).unwrap();
        }
        file
    }

    #[test]
    fn test_import_inserts_and_parses_fields() {
        let store = ReimbursementStore::open_in_memory().unwrap();
        let file = write_csv(&[
            "20,1,2017,3,Example Deputy,SP,12345678901,Example Supplier,22,Flight tickets,2017-03-14,\"1.99,2.99\",\"200.00,500.00\",\"2,3\",4.98,false,",
        ]);

        let report = import_csv(&store, file.path()).unwrap();
        assert_eq!(ImportReport { inserted: 1, updated: 0 }, report);

        let record = store.get_by_document_id(20).unwrap().unwrap();
        assert_eq!("Example Supplier", record.supplier);
        assert_eq!("1.99,2.99", record.net_values);
        assert_eq!(None, record.probability);
        assert!(!record.receipt_fetched);
    }

    #[test]
    fn test_reimport_counts_updates() {
        let store = ReimbursementStore::open_in_memory().unwrap();
        let file = write_csv(&[
            "20,1,2017,3,Example Deputy,SP,12345678901,Example Supplier,22,Flight tickets,2017-03-14,\"1.99,2.99\",,\"2,3\",4.98,false,0.5",
        ]);

        import_csv(&store, file.path()).unwrap();
        let report = import_csv(&store, file.path()).unwrap();
        assert_eq!(ImportReport { inserted: 0, updated: 1 }, report);
    }

    #[test]
    fn test_malformed_row_reports_line_number() {
        let store = ReimbursementStore::open_in_memory().unwrap();
        let file = write_csv(&[
            "20,1,2017,3,Example Deputy,SP,12345678901,Example Supplier,22,Flight tickets,2017-03-14,\"1.99,2.99\",,\"2,3\",4.98,false,",
            "21,1,2017,3,Example Deputy,SP,12345678901,Example Supplier,22,Flight tickets,not-a-date,\"1.99\",,\"2\",1.99,false,",
        ]);

        let err = import_csv(&store, file.path()).unwrap_err();
        match err {
            LoadError::Row { row, .. } => assert_eq!(3, row),
            other => panic!("expected row error, got {other:?}"),
        }
    }
}
