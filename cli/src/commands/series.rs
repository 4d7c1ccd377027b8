use anyhow::Result;
use chrono::Local;
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use fat_core::export::write_time_series_csv;
use fat_core::models::TimeSeriesRow;

use crate::LogArgs;
use crate::config::Config;

use super::helpers::{format_time, load_window, no_neg_zero, print_json};

pub(crate) fn cmd_time_series(
    config: &Config,
    args: &LogArgs,
    step: f64,
    window: f64,
    csv: bool,
    json: bool,
) -> Result<()> {
    let (db, _) = load_window(config, args)?;
    let series = db.time_series(&Local, step, window)?;

    if csv {
        write_time_series_csv(std::io::stdout().lock(), series)?;
        return Ok(());
    }

    let rows: Vec<TimeSeriesRow> = series.collect();
    if json {
        return print_json(&rows);
    }

    if rows.is_empty() {
        eprintln!("No days in the selected window");
        process::exit(2);
    }

    println!("{}", series_table(&rows));
    Ok(())
}

fn series_table(rows: &[TimeSeriesRow]) -> String {
    #[derive(Tabled)]
    struct SeriesRow {
        #[tabled(rename = "Day")]
        day: String,
        #[tabled(rename = "Calories")]
        kcal: String,
        #[tabled(rename = "Carbs")]
        carbs: String,
        #[tabled(rename = "Fat")]
        fat: String,
        #[tabled(rename = "Protein")]
        protein: String,
    }

    let table_rows: Vec<SeriesRow> = rows
        .iter()
        .map(|r| SeriesRow {
            day: format_time(r.time),
            kcal: format!("{:.0}", no_neg_zero(r.kcal)),
            carbs: format!("{:.1}%", no_neg_zero(r.carbs_pct)),
            fat: format!("{:.1}%", no_neg_zero(r.fat_pct)),
            protein: format!("{:.1}%", no_neg_zero(r.protein_pct)),
        })
        .collect();

    Table::new(&table_rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..)).with(Alignment::right()))
        .to_string()
}
