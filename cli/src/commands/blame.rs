use anyhow::Result;
use serde::Serialize;
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use fat_core::models::{Blame, Culprit, Granularity};

use crate::LogArgs;
use crate::config::Config;

use super::helpers::{load_window, print_json, truncate};

pub(crate) fn cmd_blame(config: &Config, args: &LogArgs, top: usize, json: bool) -> Result<()> {
    #[derive(Serialize)]
    struct BlameReport {
        ingredients: Blame,
        meals: Blame,
    }

    let (db, _) = load_window(config, args)?;
    let report = BlameReport {
        ingredients: db.blame(Granularity::Ingredient)?,
        meals: db.blame(Granularity::Meal)?,
    };

    if json {
        return print_json(&report);
    }

    if db.meals().is_empty() {
        eprintln!("No meals in the selected window");
        process::exit(2);
    }

    for (mode, blame) in [("Ingredients", &report.ingredients), ("Meals", &report.meals)] {
        println!("{mode}:");
        println!("{}", leaderboard_table(blame, top));
        println!();
    }
    Ok(())
}

fn leaderboard_table(blame: &Blame, top: usize) -> String {
    #[derive(Tabled)]
    struct BlameRow {
        #[tabled(rename = "#")]
        rank: usize,
        #[tabled(rename = "Calories")]
        kcal: String,
        #[tabled(rename = "Carbs")]
        carbs: String,
        #[tabled(rename = "Fat")]
        fat: String,
        #[tabled(rename = "Protein")]
        protein: String,
    }

    let cell = |board: &[Culprit], i: usize| {
        board.get(i).map_or_else(String::new, |c| {
            let name = truncate(&c.name, 25);
            format!("{name} {:4.1}%", c.percent)
        })
    };

    let rows: Vec<BlameRow> = (0..top.min(blame.kcal.len()))
        .map(|i| BlameRow {
            rank: i + 1,
            kcal: cell(&blame.kcal, i),
            carbs: cell(&blame.carbs, i),
            fat: cell(&blame.fat, i),
            protein: cell(&blame.protein, i),
        })
        .collect();

    Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(0..1)).with(Alignment::right()))
        .to_string()
}
