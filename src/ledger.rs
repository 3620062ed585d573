//! Append-only audit ledger of evaluated transactions.
//!
//! The CSV backend keeps one row per evaluation with the record fields
//! followed by `is_fraud`. Rows are never rewritten; each append is a single
//! write to a file opened in append mode, serialized by a writer lock. A row
//! left half-written by an interrupted append is cut off before the next one.

use crate::error::LedgerError;
use crate::types::{FeatureRecord, ModelLabel};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// Column order of the ledger table
pub const LEDGER_COLUMNS: [&str; 9] = [
    "account_number",
    "account_holder",
    "transaction_amount",
    "account_age_days",
    "device_trust_score",
    "location_distance_km",
    "previous_fraud_reports",
    "transactions_last_hour",
    "is_fraud",
];

/// One persisted evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub record: FeatureRecord,
    pub model_label: ModelLabel,
}

impl LedgerEntry {
    pub fn new(record: FeatureRecord, model_label: ModelLabel) -> Self {
        Self {
            record,
            model_label,
        }
    }
}

/// Durable, append-only store of ledger entries
pub trait Ledger: Send + Sync {
    /// Durably append one entry
    fn append(&self, entry: &LedgerEntry) -> Result<(), LedgerError>;

    /// All entries in append order
    fn load_all(&self) -> Result<Vec<LedgerEntry>, LedgerError>;
}

/// Flat row layout, field order matches [`LEDGER_COLUMNS`]
#[derive(Debug, Serialize, Deserialize)]
struct LedgerRow {
    account_number: String,
    account_holder: Option<String>,
    transaction_amount: f64,
    account_age_days: u32,
    device_trust_score: f64,
    location_distance_km: f64,
    previous_fraud_reports: u32,
    transactions_last_hour: u32,
    is_fraud: u8,
}

impl From<&LedgerEntry> for LedgerRow {
    fn from(entry: &LedgerEntry) -> Self {
        let r = &entry.record;
        Self {
            account_number: r.account_number.clone(),
            account_holder: r.account_holder.clone(),
            transaction_amount: r.transaction_amount,
            account_age_days: r.account_age_days,
            device_trust_score: r.device_trust_score,
            location_distance_km: r.location_distance_km,
            previous_fraud_reports: r.previous_fraud_reports,
            transactions_last_hour: r.transactions_last_hour,
            is_fraud: entry.model_label.is_fraud(),
        }
    }
}

impl LedgerRow {
    fn into_entry(self, row: usize) -> Result<LedgerEntry, LedgerError> {
        let model_label = match self.is_fraud {
            0 => ModelLabel::Legitimate,
            1 => ModelLabel::Fraudulent,
            other => {
                return Err(LedgerError::Malformed {
                    row,
                    reason: format!("is_fraud must be 0 or 1, got {}", other),
                })
            }
        };

        Ok(LedgerEntry {
            record: FeatureRecord {
                account_number: self.account_number,
                account_holder: self.account_holder.filter(|h| !h.is_empty()),
                transaction_amount: self.transaction_amount,
                account_age_days: self.account_age_days,
                device_trust_score: self.device_trust_score,
                location_distance_km: self.location_distance_km,
                previous_fraud_reports: self.previous_fraud_reports,
                transactions_last_hour: self.transactions_last_hour,
            },
            model_label,
        })
    }
}

/// CSV file ledger
pub struct CsvLedger {
    path: PathBuf,
    writer_lock: Mutex<()>,
}

impl CsvLedger {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            writer_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Encode one row, with the header when the file is still empty
    fn encode(entry: &LedgerEntry, with_header: bool) -> Result<Vec<u8>, LedgerError> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        if with_header {
            writer.write_record(LEDGER_COLUMNS)?;
        }
        writer.serialize(LedgerRow::from(entry))?;
        writer
            .into_inner()
            .map_err(|e| LedgerError::Io(e.into_error()))
    }

    fn check_header(headers: &csv::StringRecord) -> Result<(), LedgerError> {
        if headers.iter().ne(LEDGER_COLUMNS.iter().copied()) {
            return Err(LedgerError::Malformed {
                row: 0,
                reason: format!("unexpected header {:?}", headers),
            });
        }
        Ok(())
    }

    /// Length of the file up to and including its last newline
    fn complete_len(file: &mut File, len: u64) -> Result<u64, LedgerError> {
        if len == 0 {
            return Ok(0);
        }

        let mut buf = [0u8; 4096];
        let mut end = len;
        let keep = loop {
            if end == 0 {
                break 0;
            }
            let start = end.saturating_sub(buf.len() as u64);
            let chunk = &mut buf[..(end - start) as usize];
            file.seek(SeekFrom::Start(start))?;
            file.read_exact(chunk)?;
            if let Some(pos) = chunk.iter().rposition(|&b| b == b'\n') {
                break start + pos as u64 + 1;
            }
            end = start;
        };
        Ok(keep)
    }
}

impl Ledger for CsvLedger {
    fn append(&self, entry: &LedgerEntry) -> Result<(), LedgerError> {
        let _guard = self.writer_lock.lock().map_err(|_| LedgerError::Poisoned)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .read(true)
            .create(true)
            .append(true)
            .open(&self.path)?;

        let written = file.metadata()?.len();
        let len = Self::complete_len(&mut file, written)?;

        let is_new = len == 0;
        if is_new {
            info!(path = %self.path.display(), "Creating ledger");
        } else {
            let mut reader = csv::ReaderBuilder::new()
                .has_headers(true)
                .from_path(&self.path)?;
            Self::check_header(reader.headers()?)?;
        }

        // Left by an interrupted append, never acknowledged
        if len < written {
            warn!(
                path = %self.path.display(),
                dropped_bytes = written - len,
                "Dropping partial ledger row"
            );
            file.set_len(len)?;
        }

        let bytes = Self::encode(entry, is_new)?;
        if let Err(e) = file.write_all(&bytes).and_then(|()| file.sync_data()) {
            if let Err(rollback) = file.set_len(len) {
                warn!(
                    path = %self.path.display(),
                    error = %rollback,
                    "Failed to roll back partial ledger row"
                );
            }
            return Err(e.into());
        }

        debug!(
            account_number = %entry.record.account_number,
            is_fraud = entry.model_label.is_fraud(),
            "Ledger entry appended"
        );
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<LedgerEntry>, LedgerError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(&self.path)?;

        // Created but never written
        let headers = reader.headers()?.clone();
        if headers.is_empty() {
            return Ok(Vec::new());
        }
        Self::check_header(&headers)?;

        reader
            .deserialize::<LedgerRow>()
            .enumerate()
            .map(|(i, row)| row?.into_entry(i + 1))
            .collect()
    }
}
