use crate::config::Config;
use crate::error::{DoseError, DoseResult};
use crate::mapping::MappingTable;
use crate::walker::{PatientRecord, PatientWalker};
use std::path::{Path, PathBuf};
use log::{debug, info};

/// The REDCap upload table: a fixed column schema and one row per patient.
#[derive(Debug, Clone)]
pub struct OutputTable {
    columns: Vec<String>,
    rows: Vec<PatientRecord>,
}

impl OutputTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, record: PatientRecord) {
        self.rows.push(record);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Orders rows by patient id. Every `record_id` must still read as a
    /// number once `prefix` is stripped.
    pub fn sort_by_record_id(&mut self, prefix: &str) -> DoseResult<()> {
        for row in &self.rows {
            numeric_record_id(&row.record_id, prefix)?;
        }

        self.rows.sort_by_key(|row| row.patient_id);
        Ok(())
    }

    /// Every row rendered against every column, blanks for unpopulated fields.
    pub fn cells(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| self.columns.iter().map(|column| row.cell(column)).collect())
            .collect()
    }

    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> DoseResult<()> {
        let mut writer = csv::Writer::from_path(path)?;

        writer.write_record(&self.columns)?;
        for (row, cells) in self.rows.iter().zip(self.cells()) {
            debug!("Writing row for record_id {}", row.record_id);
            writer.write_record(&cells)?;
        }

        writer.flush()?;
        Ok(())
    }
}

fn numeric_record_id(record_id: &str, prefix: &str) -> DoseResult<u32> {
    record_id
        .strip_prefix(prefix)
        .unwrap_or(record_id)
        .parse()
        .map_err(|_| DoseError::InvalidRecordId(record_id.to_string()))
}

/// Runs the walker over the configured root and returns the sorted table.
pub fn assemble(config: &Config, mappings: &MappingTable) -> DoseResult<OutputTable> {
    let walker = PatientWalker::new(config, mappings)?;
    let outcome = walker.walk()?;

    let mut table = OutputTable::new(mappings.columns());
    for record in outcome.records {
        table.push(record);
    }
    table.sort_by_record_id(&config.record_id_prefix)?;

    info!("Assembled {} rows x {} columns", table.len(), table.columns().len());
    Ok(table)
}

/// Name encoding the id range, exclusions, completion policy and run timestamp.
pub fn output_file_name(config: &Config, timestamp: &str) -> String {
    let excluded = if config.exclude.is_empty() {
        "none".to_string()
    } else {
        config
            .exclude
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join("-")
    };

    format!(
        "redcap_upload_{}-{}_excl-{}_{}_{}.csv",
        config.min_id, config.max_id, excluded, config.completion, timestamp
    )
}

pub fn save_table(table: &OutputTable, config: &Config, timestamp: &str) -> DoseResult<PathBuf> {
    let path = config.output_dir().join(output_file_name(config, timestamp));
    table.write_csv(&path)?;
    info!("CSV file saved to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompletionPolicy;
    use tempfile::TempDir;

    const HEADER: &str = "Patient,PT\nMetric,Value\n";

    fn write_metrics(root: &Path, relative: &str, rows: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, format!("{}{}", HEADER, rows)).unwrap();
    }

    fn read_back(path: &Path) -> (csv::StringRecord, Vec<csv::StringRecord>) {
        let mut reader = csv::Reader::from_path(path).unwrap();
        let headers = reader.headers().unwrap().clone();
        let rows = reader.records().map(|r| r.unwrap()).collect();
        (headers, rows)
    }

    #[test]
    fn test_end_to_end_single_patient() {
        let dir = TempDir::new().unwrap();
        write_metrics(dir.path(), "PT0001/TG43/prostate_metrics.csv", "D90 (%) / Gy,150.2\n");

        let mut config = Config::new(dir.path());
        config.max_id = 93;
        config.completion = CompletionPolicy::AnyPresent;
        let mappings = MappingTable::builtin();

        let table = assemble(&config, &mappings).unwrap();
        let path = save_table(&table, &config, "20240101_120000").unwrap();

        let (headers, rows) = read_back(&path);
        assert_eq!(headers.len(), 56);
        assert_eq!(rows.len(), 1);

        let column = |name: &str| headers.iter().position(|h| h == name).unwrap();
        let row = &rows[0];
        assert_eq!(&row[column("record_id")], "1");
        assert_eq!(&row[column("redcap_event_name")], "baseline_arm_1");
        assert_eq!(&row[column("ctv_d90")], "150.2");
        assert_eq!(&row[column("ctv_d99")], "");
        assert_eq!(&row[column("dose_parameters_tg43_complete")], "2");
        assert_eq!(&row[column("dose_parameters_mc_complete")], "");
        assert_eq!(row.len(), headers.len());
    }

    #[test]
    fn test_rows_sorted_numerically() {
        let dir = TempDir::new().unwrap();
        for id in ["PT0010", "PT0002", "PT0001"] {
            write_metrics(dir.path(), &format!("{}/TG43/prostate_metrics.csv", id), "D90 (%) / Gy,150\n");
        }

        let mut config = Config::new(dir.path());
        config.record_id_prefix = "P".to_string();
        let table = assemble(&config, &MappingTable::builtin()).unwrap();

        let ids: Vec<&str> = table.rows.iter().map(|r| r.record_id.as_str()).collect();
        assert_eq!(ids, vec!["P1", "P2", "P10"]);
    }

    #[test]
    fn test_non_numeric_record_id_rejected() {
        let mut table = OutputTable::new(MappingTable::builtin().columns());
        let mut record = PatientRecord::new(3, "", "baseline_arm_1");
        record.record_id = "three".to_string();
        table.push(record);

        let err = table.sort_by_record_id("").unwrap_err();
        assert!(matches!(err, DoseError::InvalidRecordId(_)));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_sort_orders_by_patient_id() {
        let mut table = OutputTable::new(MappingTable::builtin().columns());
        for id in [42, 7, 100] {
            table.push(PatientRecord::new(id, "MDBC-", "baseline_arm_1"));
        }

        table.sort_by_record_id("MDBC-").unwrap();
        let ids: Vec<u32> = table.rows.iter().map(|r| r.patient_id).collect();
        assert_eq!(ids, vec![7, 42, 100]);
    }

    #[test]
    fn test_every_row_has_every_column() {
        let mut table = OutputTable::new(MappingTable::builtin().columns());
        table.push(PatientRecord::new(1, "", "baseline_arm_1"));
        table.push(PatientRecord::new(2, "", "baseline_arm_1"));

        for cells in table.cells() {
            assert_eq!(cells.len(), table.columns().len());
            assert!(cells[4..].iter().all(|c| c.is_empty()));
        }
    }

    #[test]
    fn test_repeated_runs_identical() {
        let dir = TempDir::new().unwrap();
        write_metrics(dir.path(), "PT0003/TG43/rectum_metrics.csv", "D2 (cc) / Gy,4.1\nV100 / %,n/a\n");
        write_metrics(dir.path(), "PT0003/TG186/rectum_metrics.csv", "D2 (cc) / Gy,4.3\n");
        write_metrics(dir.path(), "PT0001/TG186/urethra_metrics.csv", "D0.1 (cc) / Gy,130\n");

        let config = Config::new(dir.path());
        let mappings = MappingTable::builtin();
        let first = assemble(&config, &mappings).unwrap().cells();
        let second = assemble(&config, &mappings).unwrap().cells();
        assert_eq!(first, second);
    }

    #[test]
    fn test_output_file_name() {
        let mut config = Config::new("/data");
        config.max_id = 93;
        assert_eq!(
            output_file_name(&config, "20240101_120000"),
            "redcap_upload_1-93_excl-none_any-present_20240101_120000.csv"
        );

        config.exclude.extend([30, 7]);
        config.completion = CompletionPolicy::Strict;
        assert_eq!(
            output_file_name(&config, "20240101_120000"),
            "redcap_upload_1-93_excl-7-30_strict_20240101_120000.csv"
        );
    }
}
