use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RefwriteConfig {
    /// SQLite database the requests are applied to
    pub database: Option<String>,
    /// Dialect used to render statements (`postgres`, `mysql`, `sqlite`)
    pub dialect: Option<String>,
    /// SQL script applied before each run (e.g. `CREATE TABLE IF NOT EXISTS ...`)
    pub schema: Option<String>,
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("refwrite.toml")
}

pub fn default_database_path() -> PathBuf {
    PathBuf::from("refwrite.db")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<RefwriteConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: RefwriteConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &RefwriteConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
