// ========================================================================================
//
//                      Delimited sample tables in, score tables out
//
// ========================================================================================
//
// Input tables carry a header row. Cells that read as a missing token become `None`;
// anything else must parse as a number. `.csv` files are comma-separated, every other
// extension is treated as tab-separated.

use crate::types::{AbpsInput, AbpsReport, Interpretation, OffScoreReport};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

/// Tokens read as a missing measurement (compared case-insensitively).
const MISSING_TOKENS: [&str; 4] = ["", "NA", "NAN", "."];

/// Text written for an undefined score.
const MISSING_OUTPUT: &str = "NA";

#[derive(Error, Debug)]
pub enum DataError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to read or write delimited table: {0}")]
    CsvError(#[from] csv::Error),
    #[error("Input table '{0}' has no header row.")]
    MissingHeader(String),
    #[error("Value '{value}' in column '{column}' at data row {row} is not a number or a missing-value token.")]
    NonNumeric {
        column: String,
        row: usize,
        value: String,
    },
    #[error("The required column '{0}' was not found in the input table. Please check spelling.")]
    ColumnNotFound(String),
}

/// A labelled numeric table as read from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<f64>>>,
}

impl Table {
    /// Values of the column whose label matches `label` (ASCII case-insensitive).
    /// Rows too short to reach the column read as missing.
    pub fn column(&self, label: &str) -> Result<Vec<Option<f64>>, DataError> {
        let position = self
            .columns
            .iter()
            .position(|c| c.trim().eq_ignore_ascii_case(label))
            .ok_or_else(|| DataError::ColumnNotFound(label.to_string()))?;
        Ok(self
            .rows
            .iter()
            .map(|row| row.get(position).copied().flatten())
            .collect())
    }
}

impl From<Table> for AbpsInput {
    fn from(table: Table) -> Self {
        AbpsInput::Table {
            columns: table.columns,
            rows: table.rows,
        }
    }
}

fn delimiter_for(path: &Path) -> u8 {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("csv") => b',',
        _ => b'\t',
    }
}

fn parse_cell(token: &str) -> Option<Option<f64>> {
    let token = token.trim();
    if MISSING_TOKENS
        .iter()
        .any(|missing| missing.eq_ignore_ascii_case(token))
    {
        return Some(None);
    }
    token.parse::<f64>().ok().map(Some)
}

/// Reads a delimited table of numeric columns from `path`.
pub fn read_table(path: &Path) -> Result<Table, DataError> {
    let file = File::open(path)?;
    read_table_from(file, delimiter_for(path), &path.display().to_string())
}

/// Reads a delimited table from any reader. `source` names the input in errors.
pub fn read_table_from<R: std::io::Read>(
    reader: R,
    delimiter: u8,
    source: &str,
) -> Result<Table, DataError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(false)
        .from_reader(reader);

    let columns: Vec<String> = reader
        .headers()?
        .iter()
        .map(|label| label.trim().to_string())
        .collect();
    if columns.is_empty() || columns.iter().all(|c| c.is_empty()) {
        return Err(DataError::MissingHeader(source.to_string()));
    }

    let mut rows = Vec::new();
    for (row_index, record) in reader.records().enumerate() {
        let record = record?;
        let row = record
            .iter()
            .zip(&columns)
            .map(|(token, column)| {
                parse_cell(token).ok_or_else(|| DataError::NonNumeric {
                    column: column.clone(),
                    row: row_index + 1,
                    value: token.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        rows.push(row);
    }

    log::debug!(
        "Read {} row(s) with {} column(s) from {source}",
        rows.len(),
        columns.len()
    );
    Ok(Table { columns, rows })
}

fn format_score(value: f64) -> String {
    if value.is_nan() {
        MISSING_OUTPUT.to_string()
    } else {
        value.to_string()
    }
}

/// Writes one line per input row: `row`, optionally `bayes` and `svm`, then `abps`
/// and its interpretation band.
pub fn write_abps_report<W: Write>(
    writer: W,
    report: &AbpsReport,
    include_components: bool,
) -> Result<(), DataError> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(writer);

    let mut header = vec!["row"];
    if include_components {
        header.extend(["bayes", "svm"]);
    }
    header.extend(["abps", "interpretation"]);
    writer.write_record(&header)?;

    for (row, &score) in report.scores.iter().enumerate() {
        let mut record = vec![(row + 1).to_string()];
        if include_components {
            record.push(format_score(report.bayes[row]));
            record.push(format_score(report.svm[row]));
        }
        record.push(format_score(score));
        record.push(
            Interpretation::from_score(score)
                .map(Interpretation::label)
                .unwrap_or(MISSING_OUTPUT)
                .to_string(),
        );
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes one line per (HGB, RETP) pair: `row`, `off_score`.
pub fn write_off_report<W: Write>(writer: W, report: &OffScoreReport) -> Result<(), DataError> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(writer);
    writer.write_record(["row", "off_score"])?;
    for (row, &score) in report.scores.iter().enumerate() {
        writer.write_record([(row + 1).to_string(), format_score(score)])?;
    }
    writer.flush()?;
    Ok(())
}
