use anyhow::Result;
use chrono::Local;

use crate::LogArgs;
use crate::config::Config;

use super::helpers::{load_window, print_json};

pub(crate) fn cmd_dump(config: &Config, args: &LogArgs, json: bool) -> Result<()> {
    let (db, _) = load_window(config, args)?;

    if json {
        return print_json(&db.dump_data());
    }

    print!("{}", db.dump(&Local));
    Ok(())
}
