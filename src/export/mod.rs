// src/export/mod.rs
use std::io::{Read, Write};

use crate::extractors::codes::{CodeRecord, CodeType, UNKNOWN_SOURCE};
use crate::utils::error::ExportError;

/// Fixed column order of every exported CSV.
pub const CSV_COLUMNS: [&str; 6] = [
    "code",
    "code_type",
    "payer_name",
    "line_of_business",
    "year",
    "source_file",
];

/// Suggested download file name.
pub const CSV_FILE_NAME: &str = "extracted_codes.csv";

/// Writes `records` as CSV with a header row, in `CSV_COLUMNS` order.
pub fn write_codes_csv<'a, W, I>(writer: W, records: I) -> Result<(), ExportError>
where
    W: Write,
    I: IntoIterator<Item = &'a CodeRecord>,
{
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(CSV_COLUMNS)?;

    let mut rows = 0usize;
    for record in records {
        let year = record.year.to_string();
        csv_writer.write_record([
            record.code.as_str(),
            record.code_type.as_str(),
            record.payer_name.as_str(),
            record.line_of_business.as_str(),
            year.as_str(),
            record.source_file.as_str(),
        ])?;
        rows += 1;
    }

    csv_writer.flush()?;
    tracing::info!("CSV generation successful ({} rows)", rows);
    Ok(())
}

/// Renders `records` to a CSV string.
pub fn codes_to_csv<'a, I>(records: I) -> Result<String, ExportError>
where
    I: IntoIterator<Item = &'a CodeRecord>,
{
    let mut buffer = Vec::new();
    write_codes_csv(&mut buffer, records)?;
    Ok(String::from_utf8(buffer)?)
}

/// Parses CSV produced by [`write_codes_csv`]. Columns are located by header
/// name. `code_type` and `year` must be present and valid; a missing or blank
/// `source_file` reads as `"Unknown"`, other missing text columns as `""`.
pub fn read_codes_csv<R: Read>(reader: R) -> Result<Vec<CodeRecord>, ExportError> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let headers = csv_reader.headers()?.clone();
    let position = |name: &str| headers.iter().position(|h| h == name);
    let columns: Vec<Option<usize>> = CSV_COLUMNS.iter().map(|c| position(*c)).collect();

    let mut records = Vec::new();
    for row in csv_reader.records() {
        let row = row?;
        let field = |i: usize| columns[i].and_then(|p| row.get(p)).unwrap_or("");

        let code_type: CodeType = field(1).parse().map_err(|_| ExportError::InvalidValue {
            column: CSV_COLUMNS[1],
            value: field(1).to_string(),
        })?;
        let year: i32 = field(4).trim().parse().map_err(|_| ExportError::InvalidValue {
            column: CSV_COLUMNS[4],
            value: field(4).to_string(),
        })?;

        records.push(CodeRecord {
            code: field(0).to_string(),
            code_type,
            payer_name: field(2).to_string(),
            year,
            line_of_business: field(3).to_string(),
            source_file: match field(5).trim() {
                "" => UNKNOWN_SOURCE.to_string(),
                source => source.to_string(),
            },
        });
    }

    Ok(records)
}
