use std::path::{Path, PathBuf};

pub const DEFAULT_DATABASE_FILE: &str = "commands.db";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub data_dir: PathBuf,
    pub database_file: String,
}

impl CoreConfig {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            database_file: DEFAULT_DATABASE_FILE.to_string(),
        }
    }

    /// `<platform data dir>/jotter`, or `./jotter_data` when the platform
    /// has no data directory.
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .map(|dir| dir.join("jotter"))
            .unwrap_or_else(|| PathBuf::from("jotter_data"))
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_file)
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self::new(Self::default_data_dir())
    }
}
