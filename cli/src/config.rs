use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

pub struct Config {
    pub db_path: PathBuf,
}

impl Config {
    /// Resolve the database location.
    ///
    /// An explicit path (from `--db` or `RECIPEBOX_DB`) wins; otherwise the
    /// database lives in the platform data directory.
    pub fn load(db_override: Option<PathBuf>) -> Result<Self> {
        if let Some(db_path) = db_override {
            if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create database directory: {}", parent.display())
                })?;
            }
            return Ok(Config { db_path });
        }

        let proj_dirs =
            ProjectDirs::from("", "", "recipebox").context("Could not determine home directory")?;

        let data_dir = proj_dirs.data_dir().to_path_buf();
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        let db_path = data_dir.join("recipebox.db");

        Ok(Config { db_path })
    }
}
