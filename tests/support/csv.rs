use std::path::Path;

use gridsurv::dataset::synthetic::synthesize_seeded;
use gridsurv::dataset::{Covariate, DURATION_COLUMN, EVENT_COLUMN, ID_COLUMN};

/// Write `rows` generated records to a CSV file without name or category columns.
pub fn write_equipment_csv(path: &Path, rows: usize, seed: u64, delimiter: char) {
    let dataset = synthesize_seeded(rows, seed);
    let mut header = vec![ID_COLUMN, DURATION_COLUMN, EVENT_COLUMN];
    header.extend(Covariate::ALL.iter().map(|covariate| covariate.column()));
    let separator = delimiter.to_string();
    let mut text = header.join(&separator);
    text.push('\n');
    for record in dataset.records() {
        let mut cells = vec![
            format!("U-{}", record.id),
            record.duration.to_string(),
            if record.event { "1" } else { "0" }.to_string(),
        ];
        cells.extend(record.covariates.as_slice().iter().map(f64::to_string));
        text.push_str(&cells.join(&separator));
        text.push('\n');
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create csv parent dirs");
    }
    std::fs::write(path, text).expect("write csv");
}
