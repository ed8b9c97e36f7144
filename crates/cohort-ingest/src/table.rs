/// One export snapshot as read: ordered headers and ordered rows.
///
/// Every row has exactly one cell per header; a `None` cell is blank in the
/// export. Row order is input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl RawTable {
    /// Build a table, padding short rows and truncating long ones to the
    /// header width.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, None);
                row
            })
            .collect();
        Self { headers, rows }
    }

    /// Convenience constructor from string cells; blank cells become `None`.
    pub fn from_strings(headers: &[&str], rows: &[&[&str]]) -> Self {
        Self::new(
            headers.iter().map(|header| (*header).to_string()).collect(),
            rows.iter()
                .map(|row| row.iter().map(|cell| normalize_cell(cell)).collect())
                .collect(),
        )
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    pub fn value(&self, row: usize, column: usize) -> Option<&str> {
        self.rows.get(row)?.get(column)?.as_deref()
    }
}

/// Trim a cell and strip a stray byte-order mark; blank cells become `None`.
pub fn normalize_cell(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_matches('\u{feff}').trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Trim a header, strip a byte-order mark, and collapse inner whitespace.
pub fn normalize_header(raw: &str) -> String {
    raw.trim()
        .trim_matches('\u{feff}')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_aligned_to_headers() {
        let table = RawTable::new(
            vec!["a".to_string(), "b".to_string()],
            vec![
                vec![Some("1".to_string())],
                vec![Some("1".to_string()), None, Some("x".to_string())],
            ],
        );
        assert_eq!(table.rows()[0], vec![Some("1".to_string()), None]);
        assert_eq!(table.rows()[1].len(), 2);
        assert_eq!(table.value(0, 1), None);
        assert_eq!(table.value(5, 0), None);
    }

    #[test]
    fn normalizes_headers_and_cells() {
        assert_eq!(normalize_header("\u{feff} record   id "), "record id");
        assert_eq!(normalize_cell("  "), None);
        assert_eq!(normalize_cell(" TH-001 "), Some("TH-001".to_string()));
    }
}
