//! Small key-value store for UI preferences such as the colour theme.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub trait PreferenceStore {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// Preferences kept in a flat TOML table on disk. Written on every `set`.
pub struct FilePreferences {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl FilePreferences {
    /// Open the store at `path`; a missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read preferences: {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse preferences: {}", path.display()))?
        } else {
            BTreeMap::new()
        };
        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PreferenceStore for FilePreferences {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let contents = toml::to_string(&self.values)?;
        std::fs::write(&self.path, contents)
            .with_context(|| format!("Failed to write preferences: {}", self.path.display()))
    }
}
