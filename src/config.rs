//! Runtime configuration, resolved once at startup from environment variables
//! with defaults under the user's home directory.

use std::env;
use std::path::{Path, PathBuf};

use directories::BaseDirs;
use tracing::Level;

use crate::stats::BucketRule;

/// Folder name used beneath the user's home directory for application data.
const DATA_DIR_NAME: &str = ".book-tracker";
/// SQLite file name stored inside the application data directory.
const DB_FILE_NAME: &str = "books.sqlite";
/// Log file name stored inside the application data directory.
const LOG_FILE_NAME: &str = "book-tracker.log";

pub const DB_PATH_VAR: &str = "BOOK_TRACKER_DB";
pub const LOG_PATH_VAR: &str = "BOOK_TRACKER_LOG";
pub const BUCKET_VAR: &str = "BOOK_TRACKER_BUCKET";
pub const EXPORT_DIR_VAR: &str = "BOOK_TRACKER_EXPORT_DIR";
pub const LOG_LEVEL_VAR: &str = "RUST_LOG";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not locate home directory; set {0} explicitly")]
    NoHomeDir(&'static str),
    #[error("invalid value for the environment variable {0}: {1}")]
    InvalidValue(&'static str, String),
}

#[derive(Clone, Debug)]
pub struct Config {
    pub db_path: PathBuf,
    pub log_path: PathBuf,
    pub log_level: Level,
    pub bucket_rule: BucketRule,
    /// Directory offered as the default export destination.
    pub export_dir: PathBuf,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup so tests do not
    /// have to mutate the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let data_dir = || -> Result<PathBuf, ConfigError> {
            let base_dirs = BaseDirs::new().ok_or(ConfigError::NoHomeDir(DB_PATH_VAR))?;
            Ok(base_dirs.home_dir().join(DATA_DIR_NAME))
        };

        let db_path = match var(DB_PATH_VAR) {
            Some(path) => PathBuf::from(path),
            None => data_dir()?.join(DB_FILE_NAME),
        };

        // Keep the log next to the database unless told otherwise.
        let log_path = match var(LOG_PATH_VAR) {
            Some(path) => PathBuf::from(path),
            None => parent_dir(&db_path).join(LOG_FILE_NAME),
        };

        let log_level = match var(LOG_LEVEL_VAR) {
            Some(raw) => raw.trim().parse::<Level>().map_err(|_| {
                ConfigError::InvalidValue(
                    LOG_LEVEL_VAR,
                    format!("'{raw}' is not a valid log level"),
                )
            })?,
            None => Level::INFO,
        };

        let bucket_rule = match var(BUCKET_VAR) {
            Some(raw) => raw
                .parse::<BucketRule>()
                .map_err(|err| ConfigError::InvalidValue(BUCKET_VAR, err.to_string()))?,
            None => BucketRule::default(),
        };

        let export_dir = match var(EXPORT_DIR_VAR) {
            Some(dir) => PathBuf::from(dir),
            None => parent_dir(&db_path),
        };

        Ok(Self {
            db_path,
            log_path,
            log_level,
            bucket_rule,
            export_dir,
        })
    }
}

/// Directory containing `path`, or `.` for bare file names.
fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_with(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn explicit_paths_win_over_defaults() {
        let config = config_with(&[
            (DB_PATH_VAR, "/tmp/catalog/books.db"),
            (BUCKET_VAR, "start"),
            (LOG_LEVEL_VAR, "debug"),
        ])
        .unwrap();

        assert_eq!(config.db_path, PathBuf::from("/tmp/catalog/books.db"));
        assert_eq!(config.log_path, PathBuf::from("/tmp/catalog/book-tracker.log"));
        assert_eq!(config.export_dir, PathBuf::from("/tmp/catalog"));
        assert_eq!(config.bucket_rule, BucketRule::StartDate);
        assert_eq!(config.log_level, Level::DEBUG);
    }

    #[test]
    fn invalid_values_name_the_variable() {
        let err = config_with(&[(DB_PATH_VAR, "books.db"), (BUCKET_VAR, "sideways")])
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(BUCKET_VAR, _)));

        let err = config_with(&[(DB_PATH_VAR, "books.db"), (LOG_LEVEL_VAR, "chatty")])
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(LOG_LEVEL_VAR, _)));
    }

    #[test]
    fn blank_variables_fall_back_to_defaults() {
        let config = config_with(&[(DB_PATH_VAR, "books.db"), (BUCKET_VAR, "  ")]).unwrap();
        assert_eq!(config.bucket_rule, BucketRule::EndOrStart);
        assert_eq!(config.log_level, Level::INFO);
    }
}
