//! Built-in metric-label to REDCap-field tables, one per anatomical structure
//! and calculation method, plus the fixed output column schema.

use std::collections::{BTreeMap, BTreeSet, HashMap};

pub const RECORD_ID: &str = "record_id";
pub const EVENT_NAME: &str = "redcap_event_name";
pub const REPEAT_INSTRUMENT: &str = "redcap_repeat_instrument";
pub const REPEAT_INSTANCE: &str = "redcap_repeat_instance";

const PROSTATE_METRICS: &[(&str, &str)] = &[
    ("D99.9 (%) / Gy", "ctv_d999"),
    ("D99 (%) / Gy", "ctv_d99"),
    ("D90 (%) / Gy", "ctv_d90"),
    ("V100 / %", "ctv_v100"),
    ("V150 / %", "ctv_v150"),
    ("V200 / %", "ctv_v200"),
];

const RECTUM_METRICS: &[(&str, &str)] = &[
    ("D2 (cc) / Gy", "rect_d2cc"),
    ("D1 (cc) / Gy", "rect_d1cc"),
    ("D0.1 (cc) / Gy", "rect_d01cc"),
    ("V50 / %", "rect_v50"),
    ("V80 / %", "rect_v80"),
    ("V100 / %", "rect_v100"),
];

const URETHRA_METRICS: &[(&str, &str)] = &[("D0.1 (cc) / Gy", "uret_d01cc")];

const BLADDER_METRICS: &[(&str, &str)] = &[
    ("D1 (cc) / Gy", "blad_d1cc"),
    ("D2 (cc) / Gy", "blad_d2cm3"),
    ("V50 / %", "blad_v50"),
    ("V80 / %", "blad_v80"),
    ("V100 / %", "blad_v100"),
];

/// Per-method column block, before the method suffix is applied.
/// Some columns (ptv_*, uret_d1cc, uret_d5cc) have no feeding metric and stay empty.
const METHOD_COLUMNS: &[&str] = &[
    "ctv_d999", "ctv_d99", "ctv_d90", "ctv_v100", "ctv_v150", "ctv_v200",
    "ptv_d90", "ptv_d99", "ptv_v100", "ptv_v150", "ptv_v200",
    "rect_d2cc", "rect_d1cc", "rect_d01cc", "rect_v50", "rect_v80", "rect_v100",
    "uret_d01cc", "uret_d1cc", "uret_d5cc",
    "blad_d1cc", "blad_d2cm3", "blad_v50", "blad_v80", "blad_v100",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Structure {
    Bladder,
    Rectum,
    Prostate,
    Urethra,
}

impl Structure {
    /// Classification order: the first keyword found in a filename wins.
    pub const PRIORITY: [Structure; 4] = [
        Structure::Bladder,
        Structure::Rectum,
        Structure::Prostate,
        Structure::Urethra,
    ];

    pub fn keyword(&self) -> &'static str {
        match self {
            Structure::Bladder => "bladder",
            Structure::Rectum => "rectum",
            Structure::Prostate => "prostate",
            Structure::Urethra => "urethra",
        }
    }

    /// Case-insensitive substring match of a filename against the structure keywords.
    pub fn classify(file_name: &str) -> Option<Structure> {
        let lowered = file_name.to_lowercase();
        Self::PRIORITY
            .into_iter()
            .find(|structure| lowered.contains(structure.keyword()))
    }

    fn base_metrics(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Structure::Bladder => BLADDER_METRICS,
            Structure::Rectum => RECTUM_METRICS,
            Structure::Prostate => PROSTATE_METRICS,
            Structure::Urethra => URETHRA_METRICS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CalcMethod {
    Tg43,
    Tg186,
}

impl CalcMethod {
    pub const ALL: [CalcMethod; 2] = [CalcMethod::Tg43, CalcMethod::Tg186];

    /// Subfolder name inside a patient folder.
    pub fn folder_name(&self) -> &'static str {
        match self {
            CalcMethod::Tg43 => "TG43",
            CalcMethod::Tg186 => "TG186",
        }
    }

    pub fn field_suffix(&self) -> &'static str {
        match self {
            CalcMethod::Tg43 => "",
            CalcMethod::Tg186 => "_v2",
        }
    }

    pub fn completion_field(&self) -> &'static str {
        match self {
            CalcMethod::Tg43 => "dose_parameters_tg43_complete",
            CalcMethod::Tg186 => "dose_parameters_mc_complete",
        }
    }
}

/// Metric label to output field lookup for one structure.
#[derive(Debug, Clone, Default)]
pub struct StructureMapping {
    fields: HashMap<String, String>,
}

impl StructureMapping {
    pub fn new<I, L, F>(entries: I) -> Self
    where
        I: IntoIterator<Item = (L, F)>,
        L: Into<String>,
        F: Into<String>,
    {
        Self {
            fields: entries
                .into_iter()
                .map(|(label, field)| (label.into(), field.into()))
                .collect(),
        }
    }

    pub fn field_for(&self, label: &str) -> Option<&str> {
        self.fields.get(label).map(String::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.values().map(String::as_str)
    }
}

#[derive(Debug, Clone)]
pub struct MethodMappings {
    pub method: CalcMethod,
    structures: BTreeMap<Structure, StructureMapping>,
}

impl MethodMappings {
    pub fn new(method: CalcMethod, structures: BTreeMap<Structure, StructureMapping>) -> Self {
        Self { method, structures }
    }

    /// Built-in table for a method, with the method's field suffix applied.
    pub fn builtin(method: CalcMethod) -> Self {
        let suffix = method.field_suffix();
        let structures = Structure::PRIORITY
            .into_iter()
            .map(|structure| {
                let mapping = StructureMapping::new(
                    structure
                        .base_metrics()
                        .iter()
                        .map(|(label, field)| (*label, format!("{}{}", field, suffix))),
                );
                (structure, mapping)
            })
            .collect();

        Self::new(method, structures)
    }

    pub fn mapping(&self, structure: Structure) -> Option<&StructureMapping> {
        self.structures.get(&structure)
    }

    /// Union of every field any structure of this method can populate.
    pub fn expected_fields(&self) -> BTreeSet<String> {
        self.structures
            .values()
            .flat_map(|mapping| mapping.fields().map(str::to_string))
            .collect()
    }

    pub fn completion_field(&self) -> &'static str {
        self.method.completion_field()
    }

    pub fn columns(&self) -> Vec<String> {
        let suffix = self.method.field_suffix();
        METHOD_COLUMNS
            .iter()
            .map(|column| format!("{}{}", column, suffix))
            .chain(std::iter::once(self.completion_field().to_string()))
            .collect()
    }
}

/// Every calculation method's mappings, loaded once per run.
#[derive(Debug, Clone)]
pub struct MappingTable {
    methods: Vec<MethodMappings>,
}

impl MappingTable {
    pub fn new(methods: Vec<MethodMappings>) -> Self {
        Self { methods }
    }

    pub fn builtin() -> Self {
        Self::new(CalcMethod::ALL.into_iter().map(MethodMappings::builtin).collect())
    }

    pub fn methods(&self) -> &[MethodMappings] {
        &self.methods
    }

    /// Output column order: metadata, then each method's block and completion field.
    pub fn columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = [RECORD_ID, EVENT_NAME, REPEAT_INSTRUMENT, REPEAT_INSTANCE]
            .iter()
            .map(|c| c.to_string())
            .collect();
        for method in &self.methods {
            columns.extend(method.columns());
        }
        columns
    }
}
