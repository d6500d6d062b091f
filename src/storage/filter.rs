use chrono::NaiveDate;
use rusqlite::types::Value;

/// Result ordering for list queries. Everything is served newest-first;
/// the suspicion ranking additionally floats analyzed records to the top
/// (SQLite sorts NULL probabilities last under DESC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderBy {
    #[default]
    IssueDate,
    Probability,
}

impl OrderBy {
    /// Maps the `order_by` query parameter; unknown values fall back to
    /// the issue-date default instead of failing the request.
    pub fn from_param(raw: &str) -> Self {
        match raw {
            "probability" => OrderBy::Probability,
            _ => OrderBy::IssueDate,
        }
    }

    pub(crate) fn sql(self) -> &'static str {
        match self {
            OrderBy::IssueDate => "issue_date DESC, document_id DESC",
            OrderBy::Probability => "probability DESC, document_id DESC",
        }
    }
}

/// Filter set accepted by the list endpoint, translated into a dynamic
/// WHERE clause with positional binds.
#[derive(Debug, Clone, Default)]
pub struct ReimbursementFilter {
    pub cnpj_cpf: Option<String>,
    pub subquota_id: Option<i64>,
    pub applicant_id: Option<i64>,
    pub year: Option<i64>,
    pub document_ids: Vec<i64>,
    pub suspicious: Option<bool>,
    /// Inclusive lower bound on `issue_date`
    pub issue_date_start: Option<NaiveDate>,
    /// Exclusive upper bound on `issue_date`
    pub issue_date_end: Option<NaiveDate>,
    pub order_by: OrderBy,
    pub limit: u64,
    pub offset: u64,
}

impl ReimbursementFilter {
    /// Builds the WHERE clause (leading space included) and its binds.
    /// Returns an empty string when no filter is active.
    pub(crate) fn where_clause(&self) -> (String, Vec<Value>) {
        let mut conditions: Vec<String> = Vec::new();
        let mut binds: Vec<Value> = Vec::new();

        if let Some(cnpj_cpf) = &self.cnpj_cpf {
            conditions.push("cnpj_cpf = ?".to_string());
            binds.push(Value::Text(cnpj_cpf.clone()));
        }
        if let Some(subquota_id) = self.subquota_id {
            conditions.push("subquota_id = ?".to_string());
            binds.push(Value::Integer(subquota_id));
        }
        if let Some(applicant_id) = self.applicant_id {
            conditions.push("applicant_id = ?".to_string());
            binds.push(Value::Integer(applicant_id));
        }
        if let Some(year) = self.year {
            conditions.push("year = ?".to_string());
            binds.push(Value::Integer(year));
        }
        if !self.document_ids.is_empty() {
            let placeholders = vec!["?"; self.document_ids.len()].join(", ");
            conditions.push(format!("document_id IN ({placeholders})"));
            binds.extend(self.document_ids.iter().map(|id| Value::Integer(*id)));
        }
        if let Some(suspicious) = self.suspicious {
            conditions.push("suspicious = ?".to_string());
            binds.push(Value::Integer(i64::from(suspicious)));
        }
        // ISO-8601 text compares in date order, so the bounds stay plain
        // string comparisons against the stored column.
        if let Some(start) = self.issue_date_start {
            conditions.push("issue_date >= ?".to_string());
            binds.push(Value::Text(start.to_string()));
        }
        if let Some(end) = self.issue_date_end {
            conditions.push("issue_date < ?".to_string());
            binds.push(Value::Text(end.to_string()));
        }

        if conditions.is_empty() {
            (String::new(), binds)
        } else {
            (format!(" WHERE {}", conditions.join(" AND ")), binds)
        }
    }
}

/// Parses the `document_id` list parameter. The dataset portal hands out
/// ids separated by commas, spaces, or both (`"42,84 126, 168"`);
/// non-numeric fragments are dropped.
pub fn parse_document_ids(raw: &str) -> Vec<i64> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter_map(|fragment| fragment.parse().ok())
        .collect()
}

/// Parses the `suspicious` query parameter. Anything other than the four
/// accepted literals leaves the filter inactive.
pub fn parse_suspicious(raw: &str) -> Option<bool> {
    match raw {
        "1" | "true" => Some(true),
        "0" | "false" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("42,84 126, 168", vec![42, 84, 126, 168] ; "mixed separators")]
    #[test_case("42", vec![42] ; "single id")]
    #[test_case("42,,84", vec![42, 84] ; "empty fragment")]
    #[test_case("42,abc,84", vec![42, 84] ; "garbage fragment")]
    #[test_case("", Vec::<i64>::new() ; "empty input")]
    fn test_parse_document_ids(raw: &str, expected: Vec<i64>) {
        assert_eq!(expected, parse_document_ids(raw));
    }

    #[test_case("1", Some(true))]
    #[test_case("true", Some(true))]
    #[test_case("0", Some(false))]
    #[test_case("false", Some(false))]
    #[test_case("maybe", None)]
    #[test_case("True", None)]
    fn test_parse_suspicious(raw: &str, expected: Option<bool>) {
        assert_eq!(expected, parse_suspicious(raw));
    }

    #[test]
    fn test_where_clause_empty_filter() {
        let (sql, binds) = ReimbursementFilter::default().where_clause();
        assert_eq!("", sql);
        assert!(binds.is_empty());
    }

    #[test]
    fn test_where_clause_combines_conditions_with_and() {
        let filter = ReimbursementFilter {
            cnpj_cpf: Some("12345678901".to_string()),
            subquota_id: Some(22),
            suspicious: Some(true),
            ..Default::default()
        };
        let (sql, binds) = filter.where_clause();
        assert_eq!(
            " WHERE cnpj_cpf = ? AND subquota_id = ? AND suspicious = ?",
            sql
        );
        assert_eq!(3, binds.len());
    }

    #[test]
    fn test_where_clause_document_id_list() {
        let filter = ReimbursementFilter {
            document_ids: vec![42, 84],
            ..Default::default()
        };
        let (sql, binds) = filter.where_clause();
        assert_eq!(" WHERE document_id IN (?, ?)", sql);
        assert_eq!(2, binds.len());
    }

    #[test]
    fn test_order_by_falls_back_to_issue_date() {
        assert_eq!(OrderBy::IssueDate, OrderBy::from_param("net_value"));
        assert_eq!(OrderBy::Probability, OrderBy::from_param("probability"));
    }
}
