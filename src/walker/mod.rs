pub mod record;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use log::{debug, info, warn};
use regex::Regex;
use crate::completeness;
use crate::config::Config;
use crate::error::{DoseError, DoseResult};
use crate::mapping::{MappingTable, MethodMappings, Structure};
use crate::metrics::MetricReader;

pub use record::*;

/// Metric exports are recognised by this file-stem suffix.
pub const METRICS_SUFFIX: &str = "_metrics";

/// Extensions of text exports; other `*_metrics` files are left alone.
pub const METRICS_EXTENSIONS: &[&str] = &["csv", "txt"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkSummary {
    pub entries_seen: usize,
    pub included: usize,
    pub skipped_name: usize,
    pub skipped_excluded: usize,
    pub skipped_range: usize,
    pub skipped_no_method_folders: usize,
    pub duplicate_ids: usize,
}

#[derive(Debug, Clone)]
pub struct WalkOutcome {
    pub records: Vec<PatientRecord>,
    pub summary: WalkSummary,
}

enum Admission {
    Admitted(u32),
    BadName,
    Excluded(u32),
    OutOfRange(u32),
}

pub struct PatientWalker<'a> {
    config: &'a Config,
    mappings: &'a MappingTable,
    reader: MetricReader<'a>,
    patient_pattern: Regex,
}

impl<'a> PatientWalker<'a> {
    pub fn new(config: &'a Config, mappings: &'a MappingTable) -> DoseResult<Self> {
        let patient_pattern = Regex::new(r"^PT(\d{4})")
            .map_err(|e| DoseError::InvalidConfig(format!("patient folder pattern: {}", e)))?;

        Ok(Self {
            config,
            mappings,
            reader: MetricReader::new(config.missing_values, &config.missing_marker),
            patient_pattern,
        })
    }

    /// Walks every patient folder under the root directory.
    ///
    /// Records come back in directory order; sorting is left to the table.
    pub fn walk(&self) -> DoseResult<WalkOutcome> {
        let root = &self.config.root_dir;
        info!(
            "Scanning {} for patient folders (ids {}-{}, excluded: {:?})",
            root.display(),
            self.config.min_id,
            self.config.max_id,
            self.config.exclude
        );

        let mut records = Vec::new();
        let mut summary = WalkSummary::default();
        let mut emitted = BTreeSet::new();

        for path in sorted_entries(root)? {
            summary.entries_seen += 1;

            if !path.is_dir() {
                debug!("Ignoring non-directory entry {}", path.display());
                continue;
            }

            let name = file_name(&path);
            let patient_id = match self.admit(&name) {
                Admission::Admitted(id) => id,
                Admission::BadName => {
                    info!("Skipping {}: not a patient folder (expected PT####).", name);
                    summary.skipped_name += 1;
                    continue;
                }
                Admission::Excluded(id) => {
                    info!("Skipping {} (record_id {}): in exclusion list.", name, id);
                    summary.skipped_excluded += 1;
                    continue;
                }
                Admission::OutOfRange(id) => {
                    info!(
                        "Skipping {} (record_id {}): out of range ({}-{}).",
                        name, id, self.config.min_id, self.config.max_id
                    );
                    summary.skipped_range += 1;
                    continue;
                }
            };

            match self.process_patient(&path, &name, patient_id)? {
                Some(record) => {
                    if !emitted.insert(patient_id) {
                        warn!(
                            "{} repeats record_id {}; the table will hold more than one row for it.",
                            name, record.record_id
                        );
                        summary.duplicate_ids += 1;
                    }
                    summary.included += 1;
                    records.push(record);
                }
                None => summary.skipped_no_method_folders += 1,
            }
        }

        info!(
            "Walk finished: {} entries, {} patients included, {} skipped (name {}, excluded {}, range {}, no calculation folders {}), {} repeated record ids",
            summary.entries_seen,
            summary.included,
            summary.skipped_name
                + summary.skipped_excluded
                + summary.skipped_range
                + summary.skipped_no_method_folders,
            summary.skipped_name,
            summary.skipped_excluded,
            summary.skipped_range,
            summary.skipped_no_method_folders,
            summary.duplicate_ids
        );

        Ok(WalkOutcome { records, summary })
    }

    fn admit(&self, name: &str) -> Admission {
        let Some(id) = self
            .patient_pattern
            .captures(name)
            .and_then(|caps| caps[1].parse::<u32>().ok())
        else {
            return Admission::BadName;
        };

        if self.config.exclude.contains(&id) {
            Admission::Excluded(id)
        } else if !self.config.in_range(id) {
            Admission::OutOfRange(id)
        } else {
            Admission::Admitted(id)
        }
    }

    fn process_patient(
        &self,
        patient_dir: &Path,
        name: &str,
        patient_id: u32,
    ) -> DoseResult<Option<PatientRecord>> {
        let any_method_folder = self
            .mappings
            .methods()
            .iter()
            .any(|m| patient_dir.join(m.method.folder_name()).is_dir());
        if !any_method_folder {
            warn!("Skipping {}: both TG43 and TG186 folders are missing.", name);
            return Ok(None);
        }

        info!("Processing {} with record_id {}.", name, patient_id);
        let mut record = PatientRecord::new(
            patient_id,
            &self.config.record_id_prefix,
            &self.config.event_name,
        );

        for method in self.mappings.methods() {
            let method_dir = patient_dir.join(method.method.folder_name());
            if self.process_method(&mut record, &method_dir, method)? {
                let status = completeness::evaluate(
                    self.config.completion,
                    &record.fields,
                    &method.expected_fields(),
                );
                record.set_completion(method.completion_field(), status);
                info!("{} set to {} for {}.", method.completion_field(), status, name);
            }
        }

        Ok(Some(record))
    }

    /// Merges every structure file of one calculation folder into the record.
    /// Returns false when the folder is absent or empty.
    fn process_method(
        &self,
        record: &mut PatientRecord,
        method_dir: &Path,
        method: &MethodMappings,
    ) -> DoseResult<bool> {
        if !method_dir.is_dir() {
            warn!("{} folder missing: {}", method.method.folder_name(), method_dir.display());
            return Ok(false);
        }

        let entries = sorted_entries(method_dir)?;
        if entries.is_empty() {
            warn!("{} folder is empty: {}", method.method.folder_name(), method_dir.display());
            return Ok(false);
        }

        info!("Processing folder: {}", method_dir.display());
        let mut seen = BTreeSet::new();

        for path in entries.into_iter().filter(|p| is_metrics_file(p)) {
            let name = file_name(&path);
            if !has_text_extension(&path) {
                info!("Skipping {}: not a text export.", path.display());
                continue;
            }
            let Some(structure) = Structure::classify(&name) else {
                info!("Skipping {}: no known structure in filename.", path.display());
                continue;
            };
            let Some(mapping) = method.mapping(structure) else {
                warn!("No {} mapping for structure {}", method.method.folder_name(), structure.keyword());
                continue;
            };

            if !seen.insert(structure) {
                warn!(
                    "Duplicate {} file in {}: {} overwrites earlier values",
                    structure.keyword(),
                    method_dir.display(),
                    name
                );
            }

            info!("Processing file: {} for structure: {}", path.display(), structure.keyword());
            let fields = self.reader.read(&path, mapping)?;
            record.merge(fields);
        }

        Ok(true)
    }
}

fn sorted_entries(dir: &Path) -> DoseResult<Vec<PathBuf>> {
    let mut paths = std::fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()?;
    paths.sort();
    Ok(paths)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn is_metrics_file(path: &Path) -> bool {
    path.is_file()
        && path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .map(|stem| stem.ends_with(METRICS_SUFFIX))
            .unwrap_or(false)
}

fn has_text_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| METRICS_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
        .unwrap_or(false)
}
