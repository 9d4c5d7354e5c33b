use rack_core::RawTable;

use crate::error::FetchError;

/// Parses a CSV export into a [`RawTable`].
///
/// The first record is the header. Column names are trimmed; cell values are
/// kept verbatim so the field mapper decides what counts as blank. Rows may
/// be shorter or longer than the header.
///
/// # Errors
///
/// Returns [`FetchError::InvalidCsv`] if the body is not well-formed CSV.
pub fn parse_csv(body: &str) -> Result<RawTable, FetchError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(body.as_bytes());

    let columns: Vec<String> = reader
        .headers()
        .map_err(|source| FetchError::InvalidCsv { source })?
        .iter()
        .map(|h| h.trim().to_owned())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|source| FetchError::InvalidCsv { source })?;
        rows.push(record.iter().map(str::to_owned).collect());
    }

    Ok(RawTable::new(columns, rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_are_trimmed() {
        let table = parse_csv(" No ,Title,  Rack\n7,Atlas Shrugged,A3\n").expect("valid csv");
        assert_eq!(table.columns(), ["No", "Title", "Rack"]);
        assert_eq!(table.cell(0, 1), "Atlas Shrugged");
    }

    #[test]
    fn quoted_cells_keep_commas_and_whitespace() {
        let table = parse_csv("No,Title\n1,\" Crime, and Punishment \"\n").expect("valid csv");
        assert_eq!(table.cell(0, 1), " Crime, and Punishment ");
    }

    #[test]
    fn ragged_rows_are_accepted() {
        let table = parse_csv("No,Title,Rack\n1,Emma\n2,Dune,C2,extra\n").expect("flexible");
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(0, 2), "");
        assert_eq!(table.cell(1, 2), "C2");
    }

    #[test]
    fn header_only_is_an_empty_table() {
        let table = parse_csv("No,Title,Rack\n").expect("valid csv");
        assert!(table.is_empty());
        assert_eq!(table.columns().len(), 3);
    }
}
