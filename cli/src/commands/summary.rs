use anyhow::Result;
use chrono::Local;
use serde::Serialize;
use std::process;

use fat_core::models::{Meal, Stats};

use crate::LogArgs;
use crate::config::Config;

use super::helpers::{epoch_seconds, load_window, midnight, print_json, print_stats};

pub(crate) fn cmd_summary(config: &Config, args: &LogArgs, json: bool) -> Result<()> {
    let (db, _) = load_window(config, args)?;
    let mean = db.mean_daily_stats();

    if json {
        return print_json(&mean);
    }

    if db.meals().is_empty() {
        eprintln!("No meals in the selected window");
        process::exit(2);
    }

    print_stats("Daily Average", &mean);
    Ok(())
}

pub(crate) fn cmd_today(config: &Config, args: &LogArgs, json: bool) -> Result<()> {
    #[derive(Serialize)]
    struct Today<'a> {
        begin: f64,
        end: f64,
        eaten: &'a [Meal],
        totals: Stats,
    }

    let (db, now) = load_window(config, args)?;
    let begin = midnight(&now, 0)?;
    let end = epoch_seconds(&now);
    let today = db.filtered_range(begin, end);
    let totals = today.total_stats();

    if json {
        return print_json(&Today {
            begin,
            end,
            eaten: today.meals(),
            totals,
        });
    }

    println!("{}", today.dump(&Local));
    print_stats("Today", &totals);
    Ok(())
}
