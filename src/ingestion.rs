//! Spreadsheet table ingestion.
//!
//! The spreadsheet export delivers every sheet as an array of rows where row 0
//! holds the column names. [`RawTable`] wraps that shape and offers typed cell
//! access; the `*Columns` structs resolve header names to column indices once
//! per table so engines never index rows by guesswork.

use crate::error::{Result, VersabotError};
use crate::utils::parse_cell_date;
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Whether a missing job-state column is a schema error or read as always empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobStatePolicy {
    #[default]
    Strict,
    Lenient,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawTable {
    rows: Vec<Vec<Value>>,
}

impl RawTable {
    pub fn new(rows: Vec<Vec<Value>>) -> Self {
        Self { rows }
    }

    /// Builds a table from plain strings, mostly useful for fixtures.
    pub fn from_strings<R, S>(rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(|c| Value::String(c.into())).collect())
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of rows after the header.
    pub fn data_len(&self) -> usize {
        self.rows.len().saturating_sub(1)
    }

    /// Lowercased, trimmed header names. Empty when the table has no rows.
    pub fn headers(&self) -> Vec<String> {
        self.rows
            .first()
            .map(|row| row.iter().map(|h| cell_text(Some(h)).to_lowercase()).collect())
            .unwrap_or_default()
    }

    pub fn data_rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().skip(1).map(|cells| Row { cells })
    }
}

/// One data row. Out-of-range reads behave like empty cells.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    cells: &'a [Value],
}

impl<'a> Row<'a> {
    pub fn cell(&self, idx: Option<usize>) -> Option<&'a Value> {
        idx.and_then(|i| self.cells.get(i))
    }

    /// Trimmed text of the cell, empty when absent.
    pub fn text(&self, idx: Option<usize>) -> String {
        cell_text(self.cell(idx))
    }

    pub fn lower(&self, idx: Option<usize>) -> String {
        self.text(idx).to_lowercase()
    }

    pub fn date(&self, idx: Option<usize>) -> Option<NaiveDate> {
        self.cell(idx).and_then(parse_cell_date)
    }

    pub fn number(&self, idx: Option<usize>) -> Option<f64> {
        self.cell(idx).and_then(cell_number)
    }

    pub fn cells(&self) -> &'a [Value] {
        self.cells
    }
}

pub fn cell_text(cell: Option<&Value>) -> String {
    match cell {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(other) => other.to_string(),
    }
}

/// Reads a numeric cell, tolerating currency symbols and thousands separators.
pub fn cell_number(cell: &Value) -> Option<f64> {
    match cell {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let cleaned: String = s
                .trim()
                .chars()
                .filter(|c| !matches!(c, '£' | '$' | '€' | ',' | ' '))
                .collect();
            if cleaned.is_empty() {
                return None;
            }
            cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
        }
        _ => None,
    }
}

fn find_exact(headers: &[String], names: &[&str]) -> Option<usize> {
    names
        .iter()
        .find_map(|name| headers.iter().position(|h| h == name))
}

fn find_containing(headers: &[String], needles: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| needles.iter().all(|n| h.contains(n)))
}

fn missing_names(required: &[(&str, Option<usize>)]) -> Vec<String> {
    required
        .iter()
        .filter(|(_, idx)| idx.is_none())
        .map(|(name, _)| name.to_string())
        .collect()
}

/// Column layout of the marketing/service history sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketingColumns {
    pub source: usize,
    pub state: usize,
    pub job_state: Option<usize>,
    pub created: Option<usize>,
    pub last_done: Option<usize>,
    pub service: Option<usize>,
    pub frequency: Option<usize>,
}

impl MarketingColumns {
    pub fn resolve(table: &RawTable, policy: JobStatePolicy) -> Result<Self> {
        let headers = table.headers();
        let source = find_exact(&headers, &["source"]);
        let state = find_exact(&headers, &["state"]);
        let job_state = find_containing(&headers, &["job", "state"]);

        let mut required = vec![("source", source), ("state", state)];
        if policy == JobStatePolicy::Strict {
            required.push(("job state", job_state));
        }
        let missing = missing_names(&required);
        if !missing.is_empty() {
            return Err(VersabotError::schema("marketing", missing, &headers));
        }

        Ok(Self {
            source: source.unwrap_or_default(),
            state: state.unwrap_or_default(),
            job_state,
            created: find_exact(&headers, &["created"]),
            last_done: find_exact(&headers, &["last done"]),
            service: find_exact(&headers, &["services", "service"]),
            frequency: find_exact(&headers, &["frequency"]),
        })
    }
}

/// Column layout of the service history sheet as read by the cashflow forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryColumns {
    pub name: usize,
    pub price: usize,
    pub last_done: Option<usize>,
    pub next_due: Option<usize>,
}

impl HistoryColumns {
    pub fn resolve(table: &RawTable) -> Result<Self> {
        let headers = table.headers();
        let name = find_exact(&headers, &["name", "customer", "customer name"])
            .or_else(|| find_containing(&headers, &["customer", "name"]));
        let price = find_exact(&headers, &["price"]);

        let missing = missing_names(&[("name", name), ("price", price)]);
        if !missing.is_empty() {
            return Err(VersabotError::schema("history", missing, &headers));
        }

        Ok(Self {
            name: name.unwrap_or_default(),
            price: price.unwrap_or_default(),
            last_done: find_exact(&headers, &["last done"]),
            next_due: find_exact(&headers, &["next due", "next due date"]),
        })
    }
}

/// Column layout of the jobs sheet: a fixed name column plus every payment
/// processor column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobsColumns {
    pub name: usize,
    pub processors: Vec<usize>,
}

pub const PAYMENT_PROCESSORS: &[&str] = &["gocardless", "stripe"];

impl JobsColumns {
    pub fn resolve(table: &RawTable, name_column: usize) -> Self {
        let processors = table
            .headers()
            .iter()
            .enumerate()
            .filter(|(_, h)| PAYMENT_PROCESSORS.iter().any(|p| h.contains(p)))
            .map(|(i, _)| i)
            .collect();

        Self {
            name: name_column,
            processors,
        }
    }
}

/// Why a row was left out of an aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    UnparseableCreated,
    BeforeTrackingStart,
    NotWindowCleaning,
    UnsupportedFrequency,
    ActiveWithOpenJob,
    OtherLifecycleState,
    NoAutopay,
    NoServiceDate,
    OutsideWindow,
    MissingPrice,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::UnparseableCreated => "created date missing or unparseable",
            Self::BeforeTrackingStart => "created before tracking start",
            Self::NotWindowCleaning => "not a window cleaning service",
            Self::UnsupportedFrequency => "frequency is not 4 or 8 weekly",
            Self::ActiveWithOpenJob => "active customer with a job state set",
            Self::OtherLifecycleState => "lifecycle state neither active nor inactive",
            Self::NoAutopay => "customer has no active autopay",
            Self::NoServiceDate => "no valid last done or next due date",
            Self::OutsideWindow => "forecast payment outside tracking window",
            Self::MissingPrice => "price missing or not numeric",
        };
        f.write_str(text)
    }
}

/// Tally of skipped rows keyed by reason.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipLog {
    counts: BTreeMap<SkipReason, usize>,
}

impl SkipLog {
    pub fn record(&mut self, reason: SkipReason) {
        *self.counts.entry(reason).or_insert(0) += 1;
    }

    pub fn count(&self, reason: SkipReason) -> usize {
        self.counts.get(&reason).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SkipReason, usize)> + '_ {
        self.counts.iter().map(|(r, c)| (*r, *c))
    }
}
