//! CSV export for forecast trajectories.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::forecast::ForecastStep;

/// Leading columns; feature columns follow in vector order.
const HEADER: [&str; 2] = ["date", "predicted_load"];

/// Exports forecast steps to a CSV file at the given path.
///
/// # Arguments
///
/// * `steps` - Forecast trajectory
/// * `path` - Output file path
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_csv(steps: &[ForecastStep], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let buf = io::BufWriter::new(file);
    write_csv(steps, buf)
}

/// Writes forecast steps as CSV to any writer.
///
/// Writes `date,predicted_load` followed by the feature names of the first
/// step, then one row per step. Output is deterministic for identical input.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_csv(steps: &[ForecastStep], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    let feature_names: Vec<&str> = steps
        .first()
        .map(|s| s.features.names().collect())
        .unwrap_or_default();
    wtr.write_record(HEADER.iter().chain(feature_names.iter()))?;

    for step in steps {
        let mut row = Vec::with_capacity(HEADER.len() + feature_names.len());
        row.push(step.date.format("%Y-%m-%d").to_string());
        row.push(format!("{:.4}", step.predicted_load));
        row.extend(step.features.values().map(|v| format!("{v:.4}")));
        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    Ok(())
}
