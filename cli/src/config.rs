use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Environment variable naming the default food log.
pub const FOOD_LOG_ENV: &str = "FAT_FOOD_LOG";

pub struct Config {
    pub food_log: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self> {
        if let Some(path) = std::env::var_os(FOOD_LOG_ENV).filter(|p| !p.is_empty()) {
            return Ok(Config {
                food_log: PathBuf::from(path),
            });
        }

        let proj_dirs =
            ProjectDirs::from("", "", "fat").context("Could not determine home directory")?;
        Ok(Config::in_dir(proj_dirs.data_dir()))
    }

    pub fn in_dir(data_dir: &Path) -> Self {
        Config {
            food_log: data_dir.join("food.log"),
        }
    }

    /// Files given on the command line, or the configured log when none were.
    pub fn resolve_files(&self, given: &[PathBuf]) -> Result<Vec<PathBuf>> {
        if !given.is_empty() {
            return Ok(given.to_vec());
        }
        if !self.food_log.exists() {
            bail!(
                "No food log given and {} does not exist (set {FOOD_LOG_ENV} or pass files)",
                self.food_log.display()
            );
        }
        Ok(vec![self.food_log.clone()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_files_prefers_arguments() {
        let config = Config::in_dir(Path::new("/nowhere"));
        let given = vec![PathBuf::from("a.log"), PathBuf::from("b.log")];
        assert_eq!(config.resolve_files(&given).unwrap(), given);
    }

    #[test]
    fn test_resolve_files_default_log() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::in_dir(dir.path());
        assert!(config.resolve_files(&[]).is_err());

        std::fs::write(&config.food_log, "# empty\n").unwrap();
        assert_eq!(
            config.resolve_files(&[]).unwrap(),
            vec![dir.path().join("food.log")]
        );
    }
}
