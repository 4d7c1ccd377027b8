use std::io::Write;

use anyhow::{Context, Result};

use crate::models::TimeSeriesRow;

/// Write time-series rows as CSV with a `time,kcal,carbs_pct,fat_pct,protein_pct`
/// header.
pub fn write_time_series_csv<W, I>(writer: W, rows: I) -> Result<usize>
where
    W: Write,
    I: IntoIterator<Item = TimeSeriesRow>,
{
    let mut wtr = csv::Writer::from_writer(writer);
    let mut written = 0;
    for row in rows {
        wtr.serialize(row)
            .with_context(|| format!("Failed to write time series row {written}"))?;
        written += 1;
    }
    if written == 0 {
        wtr.write_record(["time", "kcal", "carbs_pct", "fat_pct", "protein_pct"])?;
    }
    wtr.flush().context("Failed to flush time series CSV")?;
    Ok(written)
}
