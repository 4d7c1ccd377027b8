use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::db::{FoodDb, FoodLog};

/// Where food log text comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Stdin,
    File(PathBuf),
}

impl Source {
    /// `-` means standard input; anything else is a path.
    #[must_use]
    pub fn from_arg(arg: &Path) -> Self {
        if arg.as_os_str() == "-" {
            Source::Stdin
        } else {
            Source::File(arg.to_path_buf())
        }
    }

    #[must_use]
    pub fn id(&self) -> String {
        match self {
            Source::Stdin => "<stdin>".to_string(),
            Source::File(path) => path.display().to_string(),
        }
    }

    fn read(&self) -> Result<String> {
        match self {
            Source::Stdin => {
                let mut text = String::new();
                std::io::stdin()
                    .read_to_string(&mut text)
                    .context("Failed to read food log from stdin")?;
                Ok(text)
            }
            Source::File(path) => std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read food log: {}", path.display())),
        }
    }
}

/// Read every source in order into one log, then sort and seal it.
///
/// Any bad record aborts the whole load; no partial database is returned.
pub fn load_sources(sources: &[Source], now: f64) -> Result<FoodDb> {
    let mut log = FoodLog::new();
    for source in sources {
        let text = source.read()?;
        log.integrate(&source.id(), &text)?;
    }
    Ok(log.finish(now))
}

pub fn load_paths<P: AsRef<Path>>(paths: &[P], now: f64) -> Result<FoodDb> {
    let sources: Vec<Source> = paths.iter().map(|p| Source::from_arg(p.as_ref())).collect();
    load_sources(&sources, now)
}

/// Load from any reader, labelling errors with `source_id`.
pub fn load_reader<R: Read>(mut reader: R, source_id: &str, now: f64) -> Result<FoodDb> {
    let mut text = String::new();
    reader
        .read_to_string(&mut text)
        .with_context(|| format!("Failed to read food log: {source_id}"))?;
    let mut log = FoodLog::new();
    log.integrate(source_id, &text)?;
    Ok(log.finish(now))
}
