//! Row parsing: raw spreadsheet bytes to typed candidate records.
//!
//! Reading is split in two steps. A [`SourceReader`] tokenizes the file into
//! physical rows (CSV or workbook); [`RowParser`] then applies the fixed
//! positional layout, drops the preamble and rows without an organization name.

use calamine::Reader;
use metrics::counter;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info};

use crate::config::SourceConfig;
use crate::error::{Result, SyncError};
use crate::metrics::{ROWS_DROPPED, ROWS_PARSED};
use crate::types::{CandidateRecord, ConfirmationStatus, ContactInfo, FeatureFlags};

/// One physical row of the source, before any interpretation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceRow {
    /// 1-based physical line in the source, kept for display only
    pub line: usize,
    pub cells: Vec<String>,
}

pub trait SourceReader: Send + Sync {
    fn read_rows(&self, bytes: &[u8]) -> Result<Vec<SourceRow>>;
}

/// Delimited text. Records may have differing lengths.
pub struct CsvSourceReader {
    pub delimiter: u8,
}

impl Default for CsvSourceReader {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl SourceReader for CsvSourceReader {
    fn read_rows(&self, bytes: &[u8]) -> Result<Vec<SourceRow>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(self.delimiter)
            .from_reader(bytes);

        let mut rows = Vec::new();
        for (index, record) in reader.records().enumerate() {
            let record = record?;
            // Prefer the reader's line position; it stays correct across quoted multi-line cells
            let line = record
                .position()
                .map(|p| p.line() as usize)
                .unwrap_or(index + 1);
            rows.push(SourceRow {
                line,
                cells: record.iter().map(str::to_string).collect(),
            });
        }
        debug!("CsvSourceReader: read {} records", rows.len());
        Ok(rows)
    }
}

/// First worksheet of an xlsx/xls/ods workbook
#[derive(Default)]
pub struct WorkbookSourceReader;

impl SourceReader for WorkbookSourceReader {
    fn read_rows(&self, bytes: &[u8]) -> Result<Vec<SourceRow>> {
        let mut workbook = calamine::open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| SyncError::Source("workbook has no worksheets".to_string()))??;

        // A range starts at its first non-empty cell, not necessarily at A1.
        // Pad back to A1 so row and column positions match the sheet.
        let (start_row, start_col) = range.start().unwrap_or((0, 0));
        let mut rows: Vec<SourceRow> = (0..start_row as usize)
            .map(|i| SourceRow {
                line: i + 1,
                cells: Vec::new(),
            })
            .collect();
        rows.extend(range.rows().enumerate().map(|(i, cells)| {
            let mut values = vec![String::new(); start_col as usize];
            values.extend(cells.iter().map(|c| c.to_string()));
            SourceRow {
                line: start_row as usize + i + 1,
                cells: values,
            }
        }));
        debug!("WorkbookSourceReader: read {} rows", rows.len());
        Ok(rows)
    }
}

/// Pick a reader from the file extension. Anything that is not a workbook is read as CSV.
pub fn reader_for_path(path: &Path) -> Box<dyn SourceReader> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Box::new(WorkbookSourceReader),
        "tsv" => Box::new(CsvSourceReader { delimiter: b'\t' }),
        _ => Box::new(CsvSourceReader::default()),
    }
}

/// SHA-256 of the raw source bytes, hex encoded
pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Candidates parsed from one source file
#[derive(Debug, Clone, Serialize)]
pub struct ParsedSource {
    pub source_name: String,
    pub fingerprint: String,
    pub candidates: Vec<CandidateRecord>,
    /// Data rows dropped for having no organization name
    pub dropped_rows: usize,
}

pub struct RowParser {
    config: SourceConfig,
}

impl RowParser {
    pub fn new(config: SourceConfig) -> Self {
        Self { config }
    }

    /// Read and parse a source file from disk.
    pub fn parse_file(&self, path: &Path) -> Result<ParsedSource> {
        let bytes = std::fs::read(path).map_err(|e| {
            SyncError::Source(format!("failed to read '{}': {}", path.display(), e))
        })?;
        let reader = reader_for_path(path);
        let source_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        self.parse_bytes(&source_name, &bytes, reader.as_ref())
    }

    pub fn parse_bytes(
        &self,
        source_name: &str,
        bytes: &[u8],
        reader: &dyn SourceReader,
    ) -> Result<ParsedSource> {
        let rows = reader.read_rows(bytes)?;
        let (candidates, dropped_rows) = self.parse_rows(&rows);

        info!(
            "Parsed {} candidates from {} ({} rows without organization dropped)",
            candidates.len(),
            source_name,
            dropped_rows
        );
        counter!(ROWS_PARSED).increment(candidates.len() as u64);
        counter!(ROWS_DROPPED).increment(dropped_rows as u64);

        Ok(ParsedSource {
            source_name: source_name.to_string(),
            fingerprint: fingerprint(bytes),
            candidates,
            dropped_rows,
        })
    }

    /// Apply the positional layout to already tokenized rows.
    /// The preamble is counted in records; a quoted cell spanning several
    /// lines is still one row. Returns the candidates and the number of data
    /// rows dropped.
    pub fn parse_rows(&self, rows: &[SourceRow]) -> (Vec<CandidateRecord>, usize) {
        let mut candidates = Vec::new();
        let mut dropped = 0;

        for row in rows.iter().skip(self.config.preamble_rows) {
            match self.parse_row(row) {
                Some(candidate) => candidates.push(candidate),
                None => dropped += 1,
            }
        }
        (candidates, dropped)
    }

    fn parse_row(&self, row: &SourceRow) -> Option<CandidateRecord> {
        let cols = &self.config.columns;
        let organization_name = cell(row, cols.organization).trim().to_string();
        if organization_name.is_empty() {
            return None;
        }

        Some(CandidateRecord {
            source_row: row.line,
            organization_name,
            booth: cell(row, cols.booth).trim().to_string(),
            status: ConfirmationStatus::parse(cell(row, cols.confirmation)),
            features: FeatureFlags {
                fee_waiver: self.is_truthy(cell(row, cols.fee_waiver)),
                scholarship_offer: self.is_truthy(cell(row, cols.scholarship)),
                on_spot_admission: self.is_truthy(cell(row, cols.on_spot_admission)),
            },
            contact: ContactInfo {
                name: optional(cell(row, cols.contact_name)),
                phone: optional(cell(row, cols.contact_phone)),
                email: optional(cell(row, cols.contact_email)),
            },
        })
    }

    fn is_truthy(&self, raw: &str) -> bool {
        raw.trim().eq_ignore_ascii_case(&self.config.truthy_token)
    }
}

fn cell(row: &SourceRow, index: usize) -> &str {
    row.cells.get(index).map(String::as_str).unwrap_or("")
}

fn optional(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser(preamble_rows: usize) -> RowParser {
        RowParser::new(SourceConfig {
            preamble_rows,
            ..SourceConfig::default()
        })
    }

    fn csv_rows(text: &str) -> Vec<SourceRow> {
        CsvSourceReader::default().read_rows(text.as_bytes()).unwrap()
    }

    #[test]
    fn test_parse_full_row() {
        let rows = csv_rows(
            "TRUE,A12,Fort Bragg Education Center,,,,true,FALSE,True,,,Jane Doe,555-0100,jane@example.org\n",
        );
        let (candidates, dropped) = parser(0).parse_rows(&rows);

        assert_eq!(dropped, 0);
        assert_eq!(candidates.len(), 1);
        let c = &candidates[0];
        assert_eq!(c.source_row, 1);
        assert_eq!(c.organization_name, "Fort Bragg Education Center");
        assert_eq!(c.booth, "A12");
        assert_eq!(c.status, ConfirmationStatus::Confirmed);
        assert!(c.features.fee_waiver);
        assert!(!c.features.scholarship_offer);
        assert!(c.features.on_spot_admission);
        assert_eq!(c.contact.name.as_deref(), Some("Jane Doe"));
        assert_eq!(c.contact.phone.as_deref(), Some("555-0100"));
        assert_eq!(c.contact.email.as_deref(), Some("jane@example.org"));
    }

    #[test]
    fn test_preamble_is_discarded() {
        let text = "Expo Registration Export\nGenerated 2026-10-01\nStatus,Booth,Organization\nTRUE,B1,Acme College\n";
        let (candidates, _) = parser(3).parse_rows(&csv_rows(text));
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].organization_name, "Acme College");
        assert_eq!(candidates[0].source_row, 4);
    }

    #[test]
    fn test_preamble_counts_blank_rows() {
        let text = "title,,\n,,\nheader,,\nTRUE,B1,Acme College\n";
        let (candidates, _) = parser(3).parse_rows(&csv_rows(text));
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].source_row, 4);
    }

    #[test]
    fn test_preamble_counts_records_not_lines() {
        let text = "\"Expo Registration Export\nFall 2026\",,\nGenerated 2026-10-01,,\nConfirmed,Booth,Organization\nTRUE,B1,Acme College\n";
        let (candidates, dropped) = parser(3).parse_rows(&csv_rows(text));
        let names: Vec<&str> = candidates.iter().map(|c| c.organization_name.as_str()).collect();
        assert_eq!(names, vec!["Acme College"]);
        assert_eq!(dropped, 0);
        // The title spans two physical lines, so the data record starts on line 5
        assert_eq!(candidates[0].source_row, 5);
    }

    #[test]
    fn test_blank_organization_rows_are_dropped() {
        let text = "TRUE,B1,Acme College\nTRUE,B2,   \n,,\nFALSE,,Beta Institute\n";
        let (candidates, dropped) = parser(0).parse_rows(&csv_rows(text));
        assert_eq!(candidates.len(), 2);
        assert_eq!(dropped, 2);
        assert_eq!(candidates[1].organization_name, "Beta Institute");
        assert_eq!(candidates[1].booth, "");
    }

    #[test]
    fn test_short_rows_default_missing_cells() {
        let (candidates, _) = parser(0).parse_rows(&csv_rows("PENDING,C3,Gamma Foundation\n"));
        let c = &candidates[0];
        assert_eq!(c.status, ConfirmationStatus::Pending);
        assert_eq!(c.features, FeatureFlags::default());
        assert_eq!(c.contact, ContactInfo::default());
    }

    #[test]
    fn test_truthy_token_is_literal() {
        let (candidates, _) = parser(0).parse_rows(&csv_rows("TRUE,C3,Gamma,,,,yes,1,x\n"));
        assert_eq!(candidates[0].features, FeatureFlags::default());
    }

    #[test]
    fn test_invalid_utf8_is_fatal() {
        let bytes = b"TRUE,A1,\xff\xfe\xfd\n";
        let result = RowParser::new(SourceConfig::default()).parse_bytes(
            "bad.csv",
            bytes,
            &CsvSourceReader::default(),
        );
        assert!(matches!(result, Err(SyncError::Csv(_))));
    }

    #[test]
    fn test_garbage_workbook_is_fatal() {
        let result = WorkbookSourceReader.read_rows(b"definitely not a zip archive");
        assert!(result.is_err());
    }

    #[test]
    fn test_reader_selection_and_fingerprint() {
        let parsed = parser(0)
            .parse_bytes("x.csv", b"TRUE,A1,Acme\n", reader_for_path(Path::new("x.CSV")).as_ref())
            .unwrap();
        assert_eq!(parsed.candidates.len(), 1);
        assert_eq!(parsed.fingerprint.len(), 64);
        assert_eq!(parsed.fingerprint, fingerprint(b"TRUE,A1,Acme\n"));
    }
}
