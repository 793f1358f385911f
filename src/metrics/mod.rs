//! Reader for per-structure `*_metrics` exports from the dose calculator.

use std::collections::BTreeMap;
use std::path::Path;
use log::debug;
use crate::config::MissingValuePolicy;
use crate::error::{DoseError, DoseResult};
use crate::mapping::StructureMapping;

/// Lines of export header preceding the metric rows.
pub const HEADER_LINES: usize = 2;

/// Output field name to value; `None` is rendered as an empty cell.
pub type FieldMap = BTreeMap<String, Option<f64>>;

pub struct MetricReader<'a> {
    policy: MissingValuePolicy,
    missing_marker: &'a str,
}

impl<'a> MetricReader<'a> {
    pub fn new(policy: MissingValuePolicy, missing_marker: &'a str) -> Self {
        Self { policy, missing_marker }
    }

    /// Collects the fields of `mapping` whose metric label appears in the file.
    /// Rows with unknown labels are ignored.
    pub fn read<P: AsRef<Path>>(&self, path: P, mapping: &StructureMapping) -> DoseResult<FieldMap> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| DoseError::MetricsRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let body = skip_lines(&content, HEADER_LINES);

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(body.as_bytes());

        let mut fields = FieldMap::new();
        for result in reader.records() {
            let record = result.map_err(|e| DoseError::MalformedMetrics {
                path: path.to_path_buf(),
                line: e.position().map_or(0, |p| p.line()) + HEADER_LINES as u64,
                message: e.to_string(),
            })?;
            let line = record.position().map_or(0, |p| p.line()) + HEADER_LINES as u64;

            // whitespace-only lines trim down to a single empty field
            if record.iter().all(str::is_empty) {
                continue;
            }

            if record.len() < 2 {
                return Err(DoseError::MalformedMetrics {
                    path: path.to_path_buf(),
                    line,
                    message: format!("expected label and value columns, found {}", record.len()),
                });
            }

            let label = &record[0];
            let Some(field) = mapping.field_for(label) else {
                continue;
            };

            let value = self.parse_value(&record[1]).ok_or_else(|| DoseError::MalformedMetrics {
                path: path.to_path_buf(),
                line,
                message: format!("value '{}' for '{}' is not numeric", &record[1], label),
            })?;

            debug!("{}: {} -> {} = {:?}", path.display(), label, field, value);
            fields.insert(field.to_string(), value);
        }

        Ok(fields)
    }

    /// `None` when the cell is not a number or the missing marker;
    /// `Some(None)` for an absent value.
    fn parse_value(&self, raw: &str) -> Option<Option<f64>> {
        if raw.is_empty() {
            return Some(None);
        }

        if raw.eq_ignore_ascii_case(self.missing_marker) {
            return Some(match self.policy {
                MissingValuePolicy::Zero => Some(0.0),
                MissingValuePolicy::Nan => None,
            });
        }

        let value: f64 = raw.parse().ok()?;
        Some(if value.is_nan() { None } else { Some(value) })
    }
}

fn skip_lines(content: &str, count: usize) -> &str {
    let mut rest = content;
    for _ in 0..count {
        match rest.find('\n') {
            Some(idx) => rest = &rest[idx + 1..],
            None => return "",
        }
    }
    rest
}
