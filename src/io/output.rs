use anyhow::Context;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::orchestration::table::Table;

fn format_value(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else {
        value.to_string()
    }
}

/// Writes a table as CSV: the index column first, then every data column in
/// name order. NaN cells are left empty.
pub fn write_table<W: Write>(table: &Table, writer: W) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header = vec![table.index_name.as_str()];
    header.extend(table.columns.keys().map(String::as_str));
    wtr.write_record(&header)?;

    for (i, key) in table.index.iter().enumerate() {
        let mut row = vec![key.clone()];
        row.extend(table.columns.values().map(|values| format_value(values[i])));
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_table_csv<P: AsRef<Path>>(table: &Table, path: P) -> anyhow::Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .context(format!("Could not create output directory: {:?}", parent))?;
    }
    let file = File::create(path).with_context(|| format!("failed to create {:?}", path))?;
    write_table(table, file).with_context(|| format!("failed to write table to {:?}", path))?;
    log::info!(
        "wrote {} rows x {} columns to {:?}",
        table.n_rows(),
        table.columns.len(),
        path
    );
    Ok(())
}

#[cfg(test)]
mod output_tests {
    use super::*;

    fn sample() -> Table {
        let mut table = Table::new("branch", vec!["b0".into(), "b1".into()]);
        table.insert_column("length_02", vec![1.5, f64::NAN]).unwrap();
        table.insert_column("length_01", vec![1.0, 2.0]).unwrap();
        table
    }

    #[test]
    fn test_write_table_layout() {
        let mut buffer = Vec::new();
        write_table(&sample(), &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(text, "branch,length_01,length_02\nb0,1,1.5\nb1,2,\n");
    }

    #[test]
    fn test_write_table_csv_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("branches.csv");
        write_table_csv(&sample(), &path).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(&headers[0], "branch");
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[1][2], "");
    }
}
