use std::collections::BTreeMap;
use crate::completeness::CompletionStatus;
use crate::mapping::{EVENT_NAME, RECORD_ID, REPEAT_INSTANCE, REPEAT_INSTRUMENT};
use crate::metrics::FieldMap;

/// One REDCap row for a patient folder.
#[derive(Debug, Clone, PartialEq)]
pub struct PatientRecord {
    pub patient_id: u32,
    pub record_id: String,
    pub event_name: String,
    pub repeat_instrument: String,
    pub repeat_instance: String,
    pub fields: FieldMap,
    pub completion: BTreeMap<String, CompletionStatus>,
}

impl PatientRecord {
    pub fn new(patient_id: u32, record_id_prefix: &str, event_name: &str) -> Self {
        Self {
            patient_id,
            record_id: format!("{}{}", record_id_prefix, patient_id),
            event_name: event_name.to_string(),
            repeat_instrument: String::new(),
            repeat_instance: String::new(),
            fields: FieldMap::new(),
            completion: BTreeMap::new(),
        }
    }

    /// Last write wins: a field read again replaces the earlier value.
    pub fn merge(&mut self, fields: FieldMap) {
        self.fields.extend(fields);
    }

    pub fn set_completion(&mut self, field: &str, status: CompletionStatus) {
        self.completion.insert(field.to_string(), status);
    }

    /// Cell text for `column`; anything never populated renders empty.
    pub fn cell(&self, column: &str) -> String {
        match column {
            RECORD_ID => self.record_id.clone(),
            EVENT_NAME => self.event_name.clone(),
            REPEAT_INSTRUMENT => self.repeat_instrument.clone(),
            REPEAT_INSTANCE => self.repeat_instance.clone(),
            _ => {
                if let Some(status) = self.completion.get(column) {
                    return status.code().to_string();
                }
                match self.fields.get(column) {
                    Some(Some(value)) => value.to_string(),
                    _ => String::new(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_metadata() {
        let record = PatientRecord::new(7, "MDBC-", "baseline_arm_1");
        assert_eq!(record.cell(RECORD_ID), "MDBC-7");
        assert_eq!(record.cell(EVENT_NAME), "baseline_arm_1");
        assert_eq!(record.cell(REPEAT_INSTRUMENT), "");
        assert_eq!(record.cell("ctv_d90"), "");
    }

    #[test]
    fn test_merge_last_write_wins() {
        let mut record = PatientRecord::new(1, "", "baseline_arm_1");
        record.merge(FieldMap::from([("ctv_d90".to_string(), Some(140.0))]));
        record.merge(FieldMap::from([
            ("ctv_d90".to_string(), Some(150.2)),
            ("ctv_v100".to_string(), None),
        ]));

        assert_eq!(record.cell("ctv_d90"), "150.2");
        assert_eq!(record.cell("ctv_v100"), "");
    }

    #[test]
    fn test_completion_cell() {
        let mut record = PatientRecord::new(1, "", "baseline_arm_1");
        record.set_completion("dose_parameters_tg43_complete", CompletionStatus::Complete);
        assert_eq!(record.cell("dose_parameters_tg43_complete"), "2");
        assert_eq!(record.cell("dose_parameters_mc_complete"), "");
    }

    #[test]
    fn test_zero_renders_as_zero() {
        let mut record = PatientRecord::new(1, "", "baseline_arm_1");
        record.merge(FieldMap::from([("rect_v100".to_string(), Some(0.0))]));
        assert_eq!(record.cell("rect_v100"), "0");
    }
}
