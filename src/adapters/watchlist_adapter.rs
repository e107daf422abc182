//! Tab-delimited watch-list files.

use crate::domain::error::ScanError;
use crate::domain::table::Table;
use std::fs;
use std::path::Path;

pub fn read_table<P: AsRef<Path>>(path: P) -> Result<Table, ScanError> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_path(path.as_ref())?;
    let headers: Vec<String> = rdr
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();
    let records = rdr
        .records()
        .map(|record| record.map(|r| r.iter().map(String::from).collect()))
        .collect::<Result<Vec<Vec<String>>, _>>()?;
    Ok(Table::from_records(&headers, &records))
}

/// Writes `table` with a header row; missing cells are left empty.
pub fn write_table<P: AsRef<Path>>(table: &Table, path: P) -> Result<(), ScanError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut wtr = csv::WriterBuilder::new().delimiter(b'\t').from_path(path)?;
    wtr.write_record(table.column_names())?;
    for row in 0..table.len() {
        wtr.write_record(table.row_strings(row))?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::table::Cell;
    use tempfile::TempDir;

    #[test]
    fn reads_tab_delimited_watch_list() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("watch.tsv");
        fs::write(
            &path,
            "Symbol\tIndustry\tZacks Rank\nAAPL\tComputers\t2\nXOM\tOil and Gas - Integrated\tNA\n",
        )
        .unwrap();

        let table = read_table(&path).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.text(0, "Symbol").as_deref(), Some("AAPL"));
        assert_eq!(table.number(0, "Zacks Rank"), Some(2.0));
        assert!(table.get(1, "Zacks Rank").unwrap().is_missing());
    }

    #[test]
    fn write_then_read_keeps_columns_in_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("watch.tsv");
        let mut table = Table::from_records(
            &["Symbol".to_string(), "PL".to_string()],
            &[vec!["MSFT".to_string(), "NA".to_string()]],
        );
        table.set(0, "Sort", Cell::Number(1.5));

        write_table(&table, &path).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "Symbol\tPL\tSort\nMSFT\t\t1.5\n");
    }

    #[test]
    fn unreadable_file_is_an_error() {
        assert!(read_table("/nonexistent/watch.tsv").is_err());
    }
}
