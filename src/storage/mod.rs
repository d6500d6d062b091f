//! SQLite-backed store for reimbursement records.
//!
//! The dataset is read-mostly: the importer upserts records in bulk and the
//! HTTP layer runs filtered page queries plus the occasional receipt-state
//! update. A single WAL-mode connection behind a mutex covers that profile.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use thiserror::Error;

use crate::models::Reimbursement;

mod filter;

pub use filter::{parse_document_ids, parse_suspicious, OrderBy, ReimbursementFilter};

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("store connection mutex poisoned")]
    Poisoned,
}

/// Column list shared by every SELECT so the row mapper stays in sync.
const COLUMNS: &str = "document_id, applicant_id, year, month, \
     congressperson_name, state, cnpj_cpf, supplier, subquota_id, \
     subquota_description, issue_date, net_values, reimbursement_values, \
     reimbursement_numbers, total_net_value, suspicious, probability, \
     receipt_fetched, receipt_url";

/// One page of query results plus the total number of matching records.
#[derive(Debug)]
pub struct RecordPage {
    pub records: Vec<Reimbursement>,
    pub total: u64,
}

/// Handle to the reimbursement database, cheap to clone across handlers.
#[derive(Clone)]
pub struct ReimbursementStore {
    conn: Arc<Mutex<Connection>>,
}

impl ReimbursementStore {
    /// Opens (and migrates) the database at `path`. `":memory:"` yields a
    /// private in-memory database, used by tests and throwaway runs.
    pub fn open(path: &str) -> Result<Self, StorageError> {
        if path == ":memory:" {
            return Self::open_in_memory();
        }
        let conn = Connection::open(path)?;
        // WAL keeps readers unblocked while the importer writes
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StorageError> {
        setup_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::Poisoned)
    }

    /// Inserts a record or refreshes the dataset fields of an existing one.
    /// Receipt state is left untouched on update so a re-import does not
    /// discard memoized receipt checks. Returns true for a fresh insert.
    pub fn upsert(&self, record: &Reimbursement) -> Result<bool, StorageError> {
        let conn = self.lock()?;
        let existed: bool = conn
            .query_row(
                "SELECT 1 FROM reimbursements WHERE document_id = ?1",
                params![record.document_id],
                |_| Ok(()),
            )
            .optional()?
            .is_some();

        conn.execute(
            "INSERT INTO reimbursements (
                document_id, applicant_id, year, month, congressperson_name,
                state, cnpj_cpf, supplier, subquota_id, subquota_description,
                issue_date, net_values, reimbursement_values,
                reimbursement_numbers, total_net_value, suspicious,
                probability, receipt_fetched, receipt_url
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                      ?14, ?15, ?16, ?17, ?18, ?19)
            ON CONFLICT(document_id) DO UPDATE SET
                applicant_id = excluded.applicant_id,
                year = excluded.year,
                month = excluded.month,
                congressperson_name = excluded.congressperson_name,
                state = excluded.state,
                cnpj_cpf = excluded.cnpj_cpf,
                supplier = excluded.supplier,
                subquota_id = excluded.subquota_id,
                subquota_description = excluded.subquota_description,
                issue_date = excluded.issue_date,
                net_values = excluded.net_values,
                reimbursement_values = excluded.reimbursement_values,
                reimbursement_numbers = excluded.reimbursement_numbers,
                total_net_value = excluded.total_net_value,
                suspicious = excluded.suspicious,
                probability = excluded.probability",
            params![
                record.document_id,
                record.applicant_id,
                record.year,
                record.month,
                record.congressperson_name,
                record.state,
                record.cnpj_cpf,
                record.supplier,
                record.subquota_id,
                record.subquota_description,
                record.issue_date.to_string(),
                record.net_values,
                record.reimbursement_values,
                record.reimbursement_numbers,
                record.total_net_value,
                record.suspicious,
                record.probability,
                record.receipt_fetched,
                record.receipt_url,
            ],
        )?;

        Ok(!existed)
    }

    pub fn get_by_document_id(
        &self,
        document_id: i64,
    ) -> Result<Option<Reimbursement>, StorageError> {
        let conn = self.lock()?;
        let sql = format!("SELECT {COLUMNS} FROM reimbursements WHERE document_id = ?1");
        let record = conn
            .query_row(&sql, params![document_id], row_to_reimbursement)
            .optional()?;
        Ok(record)
    }

    /// Persists the outcome of a receipt existence check and marks the
    /// record as fetched.
    pub fn update_receipt(
        &self,
        document_id: i64,
        receipt_url: Option<&str>,
    ) -> Result<(), StorageError> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE reimbursements
             SET receipt_url = ?1, receipt_fetched = 1
             WHERE document_id = ?2",
            params![receipt_url, document_id],
        )?;
        Ok(())
    }

    /// Runs a filtered page query. The count and the page share the same
    /// WHERE clause so `total` always matches the filter, not the page.
    pub fn query(&self, filter: &ReimbursementFilter) -> Result<RecordPage, StorageError> {
        let conn = self.lock()?;
        let (where_sql, binds) = filter.where_clause();

        let count_sql = format!("SELECT COUNT(*) FROM reimbursements{where_sql}");
        let total: i64 =
            conn.query_row(&count_sql, params_from_iter(binds.iter()), |row| row.get(0))?;

        let page_sql = format!(
            "SELECT {COLUMNS} FROM reimbursements{where_sql} ORDER BY {} LIMIT ? OFFSET ?",
            filter.order_by.sql()
        );
        let mut page_binds = binds;
        page_binds.push(Value::Integer(i64::try_from(filter.limit).unwrap_or(i64::MAX)));
        page_binds.push(Value::Integer(i64::try_from(filter.offset).unwrap_or(i64::MAX)));

        let mut stmt = conn.prepare(&page_sql)?;
        let records = stmt
            .query_map(params_from_iter(page_binds.iter()), row_to_reimbursement)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RecordPage {
            records,
            total: u64::try_from(total).unwrap_or(0),
        })
    }

    pub fn count(&self) -> Result<u64, StorageError> {
        let conn = self.lock()?;
        let total: i64 = conn.query_row("SELECT COUNT(*) FROM reimbursements", [], |row| row.get(0))?;
        Ok(u64::try_from(total).unwrap_or(0))
    }
}

fn setup_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS reimbursements (
            document_id INTEGER PRIMARY KEY,
            applicant_id INTEGER NOT NULL,
            year INTEGER NOT NULL,
            month INTEGER NOT NULL,
            congressperson_name TEXT,
            state TEXT,
            cnpj_cpf TEXT,
            supplier TEXT NOT NULL,
            subquota_id INTEGER NOT NULL,
            subquota_description TEXT NOT NULL,
            issue_date TEXT NOT NULL,
            net_values TEXT NOT NULL,
            reimbursement_values TEXT,
            reimbursement_numbers TEXT NOT NULL,
            total_net_value REAL NOT NULL,
            suspicious INTEGER NOT NULL DEFAULT 0,
            probability REAL,
            receipt_fetched INTEGER NOT NULL DEFAULT 0,
            receipt_url TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_issue_date ON reimbursements(issue_date)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_cnpj_cpf ON reimbursements(cnpj_cpf)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_subquota ON reimbursements(subquota_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_applicant_year ON reimbursements(applicant_id, year)",
        [],
    )?;

    Ok(())
}

fn row_to_reimbursement(row: &Row<'_>) -> rusqlite::Result<Reimbursement> {
    let issue_date: String = row.get("issue_date")?;
    let issue_date = NaiveDate::parse_from_str(&issue_date, "%Y-%m-%d").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(10, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Reimbursement {
        document_id: row.get("document_id")?,
        applicant_id: row.get("applicant_id")?,
        year: row.get("year")?,
        month: row.get("month")?,
        congressperson_name: row.get("congressperson_name")?,
        state: row.get("state")?,
        cnpj_cpf: row.get("cnpj_cpf")?,
        supplier: row.get("supplier")?,
        subquota_id: row.get("subquota_id")?,
        subquota_description: row.get("subquota_description")?,
        issue_date,
        net_values: row.get("net_values")?,
        reimbursement_values: row.get("reimbursement_values")?,
        reimbursement_numbers: row.get("reimbursement_numbers")?,
        total_net_value: row.get("total_net_value")?,
        suspicious: row.get("suspicious")?,
        probability: row.get("probability")?,
        receipt_fetched: row.get("receipt_fetched")?,
        receipt_url: row.get("receipt_url")?,
    })
}
