//! Delimited-file loader for equipment datasets.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, Trim};
use thiserror::Error;

use super::{
    CATEGORY_COLUMN, Category, Covariate, CovariateVector, DURATION_COLUMN, DataOrigin, Dataset,
    EVENT_COLUMN, EquipmentRecord, ID_COLUMN, NAME_COLUMN, RecordId,
};

const UTF8_BOM: char = '\u{feff}';
const CANDIDATE_DELIMITERS: [u8; 3] = [b',', b';', b'\t'];

#[derive(Debug, Error)]
pub enum DatasetLoadError {
    #[error("dataset file not found: {path}")]
    NotFound { path: PathBuf },
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("dataset is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),
    #[error("malformed delimited data: {0}")]
    Csv(#[from] csv::Error),
    #[error("missing required columns: {missing:?}\navailable columns: {present:?}")]
    Schema {
        missing: Vec<String>,
        present: Vec<String>,
    },
    #[error("line {line}, column {column}: {reason} (value {value:?})")]
    Parse {
        line: u64,
        column: String,
        value: String,
        reason: &'static str,
    },
}

/// Load a dataset from a delimited file.
pub fn load(path: &Path) -> Result<Dataset, DatasetLoadError> {
    let bytes = std::fs::read(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            DatasetLoadError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            DatasetLoadError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;
    let text = std::str::from_utf8(&bytes)?;
    parse_csv(text, DataOrigin::File(path.to_path_buf()))
}

/// Parse delimited text into a dataset.
///
/// Only column presence and per-cell typing are checked; display columns are
/// left as found so callers decide when to back-fill.
pub fn parse_csv(text: &str, origin: DataOrigin) -> Result<Dataset, DatasetLoadError> {
    let text = text.strip_prefix(UTF8_BOM).unwrap_or(text);
    let mut reader = ReaderBuilder::new()
        .delimiter(sniff_delimiter(text))
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    let layout = ColumnLayout::resolve(&headers)?;

    let mut records = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let raw = result?;
        records.push(layout.parse_record(&raw, row)?);
    }
    let extra_columns = layout.extras.iter().map(|(_, name)| name.clone()).collect();
    Ok(Dataset::new(records, origin).with_extra_columns(extra_columns))
}

fn sniff_delimiter(text: &str) -> u8 {
    let header = text.lines().next().unwrap_or_default();
    CANDIDATE_DELIMITERS
        .into_iter()
        .max_by_key(|&delimiter| header.bytes().filter(|&b| b == delimiter).count())
        .filter(|&delimiter| header.as_bytes().contains(&delimiter))
        .unwrap_or(b',')
}

/// Column positions resolved from the header row.
struct ColumnLayout {
    names: Vec<String>,
    duration: usize,
    event: usize,
    covariates: [usize; Covariate::COUNT],
    id: Option<usize>,
    name: Option<usize>,
    category: Option<usize>,
    extras: Vec<(usize, String)>,
}

impl ColumnLayout {
    fn resolve(headers: &StringRecord) -> Result<Self, DatasetLoadError> {
        let names: Vec<String> = headers
            .iter()
            .map(|name| name.trim_start_matches(UTF8_BOM).trim().to_string())
            .collect();
        let mut positions = HashMap::new();
        for (idx, name) in names.iter().enumerate() {
            positions.entry(name.to_ascii_lowercase()).or_insert(idx);
        }
        let find = |column: &str| positions.get(column).copied();

        let mut missing = Vec::new();
        let mut require = |column: &str| {
            let found = find(column);
            if found.is_none() {
                missing.push(column.to_string());
            }
            found
        };
        let duration = require(DURATION_COLUMN);
        let event = require(EVENT_COLUMN);
        let covariates = Covariate::ALL.map(|covariate| require(covariate.column()));
        if !missing.is_empty() {
            return Err(DatasetLoadError::Schema {
                missing,
                present: names,
            });
        }

        let known = |name: &str| {
            let lower = name.to_ascii_lowercase();
            [DURATION_COLUMN, EVENT_COLUMN, ID_COLUMN, NAME_COLUMN, CATEGORY_COLUMN]
                .contains(&lower.as_str())
                || Covariate::from_column(name).is_some()
        };
        let extras = names
            .iter()
            .enumerate()
            .filter(|(_, name)| !name.is_empty() && !known(name))
            .map(|(idx, name)| (idx, name.clone()))
            .collect();

        Ok(Self {
            duration: duration.unwrap_or_default(),
            event: event.unwrap_or_default(),
            covariates: covariates.map(Option::unwrap_or_default),
            id: find(ID_COLUMN),
            name: find(NAME_COLUMN),
            category: find(CATEGORY_COLUMN),
            extras,
            names,
        })
    }

    fn parse_record(
        &self,
        raw: &StringRecord,
        row: usize,
    ) -> Result<EquipmentRecord, DatasetLoadError> {
        let line = raw.position().map(|pos| pos.line()).unwrap_or(row as u64 + 2);
        let cell = |idx: usize| raw.get(idx).unwrap_or_default();
        let parse_error = |idx: usize, reason: &'static str| DatasetLoadError::Parse {
            line,
            column: self.names[idx].clone(),
            value: cell(idx).to_string(),
            reason,
        };
        let number = |idx: usize| -> Result<f64, DatasetLoadError> {
            let value = cell(idx);
            if value.is_empty() {
                return Err(parse_error(idx, "missing value"));
            }
            value
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| parse_error(idx, "expected a finite number"))
        };

        let duration = number(self.duration)?;
        if duration < 0.0 {
            return Err(parse_error(self.duration, "duration must not be negative"));
        }
        let event = parse_event(cell(self.event))
            .ok_or_else(|| parse_error(self.event, "expected 0/1 or a boolean"))?;

        let mut values = [0.0; Covariate::COUNT];
        for (slot, &idx) in values.iter_mut().zip(self.covariates.iter()) {
            *slot = number(idx)?;
        }

        let id = self
            .id
            .map(cell)
            .filter(|value| !value.is_empty())
            .map(RecordId::new)
            .unwrap_or_else(|| RecordId::from_row_number(row));
        let name = self
            .name
            .map(cell)
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        let category = self.category.and_then(|idx| Category::parse(cell(idx)));
        let extras = self
            .extras
            .iter()
            .map(|(idx, column)| (column.clone(), cell(*idx).to_string()))
            .collect();

        Ok(EquipmentRecord {
            id,
            duration,
            event,
            covariates: CovariateVector::new(values),
            name,
            category,
            extras,
        })
    }
}

/// Coerce a textual or numeric event cell to a failure flag.
pub fn parse_event(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "1.0" | "true" | "t" | "yes" | "y" => Some(true),
        "0" | "0.0" | "false" | "f" | "no" | "n" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const HEADER: &str = "id,duration,event,load_mw,capacity_mw,utilization,\
                          temperature_c,wind_speed_ms,holiday,age_years";

    fn origin() -> DataOrigin {
        DataOrigin::Synthetic { seed: None }
    }

    #[test]
    fn parses_rows_with_optional_columns_absent() {
        let text = format!(
            "{HEADER}\n1,120,1,4500,6100,0.7,12.5,4.2,0,17\n2,80,false,3100,4000,0.55,-3,9.9,1,3\n"
        );
        let dataset = parse_csv(&text, origin()).unwrap();
        assert_eq!(dataset.len(), 2);
        let first = &dataset.records()[0];
        assert_eq!(first.id.as_str(), "1");
        assert!(first.event);
        assert_eq!(first.covariates.get(Covariate::Capacity), 6100.0);
        assert_eq!(first.name, None);
        assert_eq!(first.category, None);
        assert!(!dataset.records()[1].event);
        assert_eq!(dataset.records()[1].covariates.get(Covariate::Temperature), -3.0);
    }

    #[test]
    fn reports_missing_and_present_columns() {
        let text = "duration,event,load_mw\n10,1,3000\n";
        let err = parse_csv(text, origin()).unwrap_err();
        match err {
            DatasetLoadError::Schema { missing, present } => {
                assert_eq!(
                    missing,
                    vec![
                        "capacity_mw",
                        "utilization",
                        "temperature_c",
                        "wind_speed_ms",
                        "holiday",
                        "age_years"
                    ]
                );
                assert_eq!(present, vec!["duration", "event", "load_mw"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn tolerates_bom_and_semicolons_and_keeps_extra_columns() {
        let text = "\u{feff}duration;event;load_mw;capacity_mw;utilization;temperature_c;\
                    wind_speed_ms;holiday;age_years;name;category;region\n\
                    55;yes;3500;5300;0.6;20;3;0;8;Tie line 4;Substation;West\n";
        let dataset = parse_csv(text, origin()).unwrap();
        let record = &dataset.records()[0];
        assert_eq!(record.id.as_str(), "1");
        assert!(record.event);
        assert_eq!(record.name.as_deref(), Some("Tie line 4"));
        assert_eq!(record.category, Some(Category::Substation));
        assert_eq!(record.extras, vec![("region".to_string(), "West".to_string())]);
        assert_eq!(dataset.extra_columns(), ["region".to_string()]);
    }

    #[test]
    fn rejects_bad_cells_with_line_numbers() {
        let text = format!(
            "{HEADER}\n1,120,1,4500,6100,0.7,12.5,4.2,0,17\n2,-5,1,3100,4000,0.55,-3,9.9,1,3\n"
        );
        match parse_csv(&text, origin()).unwrap_err() {
            DatasetLoadError::Parse { line, column, .. } => {
                assert_eq!(line, 3);
                assert_eq!(column, "duration");
            }
            other => panic!("unexpected error: {other}"),
        }

        let text = format!("{HEADER}\n1,120,maybe,4500,6100,0.7,12.5,4.2,0,17\n");
        assert!(matches!(
            parse_csv(&text, origin()),
            Err(DatasetLoadError::Parse { .. })
        ));

        let text = format!("{HEADER}\n1,120,1,,6100,0.7,12.5,4.2,0,17\n");
        assert!(matches!(
            parse_csv(&text, origin()),
            Err(DatasetLoadError::Parse {
                reason: "missing value",
                ..
            })
        ));
    }

    #[test]
    fn missing_file_is_reported_as_not_found() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.csv");
        assert!(matches!(load(&path), Err(DatasetLoadError::NotFound { .. })));
    }

    #[test]
    fn load_records_file_origin() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("grid.csv");
        std::fs::write(&path, format!("{HEADER}\n9,30,0,3000,4000,0.5,0,0,0,1\n")).unwrap();
        let dataset = load(&path).unwrap();
        assert_eq!(dataset.origin(), &DataOrigin::File(path));
        assert_eq!(dataset.origin().label(), "grid.csv");
    }

    #[test]
    fn event_coercion_accepts_common_encodings() {
        assert_eq!(parse_event("1"), Some(true));
        assert_eq!(parse_event("TRUE"), Some(true));
        assert_eq!(parse_event("0.0"), Some(false));
        assert_eq!(parse_event(" no "), Some(false));
        assert_eq!(parse_event("2"), None);
    }
}
