use std::io::{Read, Write};

use crate::error::MergeError;
use crate::table::Table;
use crate::value::Value;

/// Read a CSV table. `header_row` is the zero-based line holding the real
/// header; lines above it are discarded (statistics exports carry a grouping
/// row above the header). Short records are padded with nulls; a record wider
/// than the header is [`MergeError::RaggedRow`].
pub fn read_csv<R: Read>(reader: R, header_row: usize) -> Result<Table, MergeError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut records = reader.records();
    for _ in 0..header_row {
        if records.next().transpose()?.is_none() {
            return Ok(Table::default());
        }
    }
    let Some(header) = records.next().transpose()? else {
        return Ok(Table::default());
    };

    let columns: Vec<String> = header.iter().map(|h| h.to_string()).collect();
    let mut rows = Vec::new();
    for record in records {
        let mut row: Vec<Value> = record?.iter().map(Value::from_field).collect();
        if row.len() < columns.len() {
            row.resize(columns.len(), Value::Null);
        }
        rows.push(row);
    }
    Table::from_rows("csv", columns, rows)
}

/// Write a table as CSV with a header row. Nulls are written as empty fields.
pub fn write_csv<W: Write>(table: &Table, writer: W) -> Result<(), MergeError> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(table.columns())?;
    for row in table.rows() {
        writer.write_record(row.iter().map(|v| v.to_text()))?;
    }
    writer.flush()?;
    Ok(())
}
