use crate::{catalog::Catalog, error::Result, version::VersionScope};
use serde::{Deserialize, Serialize};
use std::{
    fs::{read_to_string, write},
    path::{Path, PathBuf},
};

/// Engine settings.
///
/// ```toml
/// version_scope = "definition-and-study"
/// catalog = "catalog.toml"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub version_scope: VersionScope,
    /// Catalog file to load instead of the built-in one. Relative paths resolve against the
    /// directory of the config file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<PathBuf>,
}

impl EngineConfig {
    pub fn load_catalog(&self) -> Result<Catalog> {
        match self.catalog.as_ref() {
            Some(path) => Catalog::from_path(path),
            None => Catalog::builtin(),
        }
    }
}

pub trait EngineConfigProvider: Send + Sync {
    fn get_config(&self) -> Result<EngineConfig>;
    fn set_config(&self, config: &EngineConfig) -> Result<()>;
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TomlConfigProvider {
    path: PathBuf,
}

impl TomlConfigProvider {
    pub fn new(path: PathBuf) -> Self {
        TomlConfigProvider { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EngineConfigProvider for TomlConfigProvider {
    fn get_config(&self) -> Result<EngineConfig> {
        tracing::debug!("Attempting to read engine config from: {:?}", &self.path);
        if !self.path.exists() {
            tracing::debug!("Config file not found, using defaults.");
            return Ok(EngineConfig::default());
        }
        let content = read_to_string(&self.path)?;
        let mut config: EngineConfig = toml::from_str(&content)?;
        if let (Some(catalog), Some(dir)) = (config.catalog.as_ref(), self.path.parent()) {
            if catalog.is_relative() {
                config.catalog = Some(dir.join(catalog));
            }
        }
        Ok(config)
    }

    fn set_config(&self, config: &EngineConfig) -> Result<()> {
        tracing::debug!("Attempting to write engine config to: {:?}", &self.path);
        let toml_string = toml::to_string(config)?;
        write(&self.path, toml_string)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let provider = TomlConfigProvider::new(dir.path().join("provenance.toml"));
        let config = provider.get_config().unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.version_scope, VersionScope::Definition);
        assert_eq!(config.load_catalog().unwrap().definitions.len(), 16);
    }

    #[test]
    fn test_round_trip_and_relative_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let provider = TomlConfigProvider::new(dir.path().join("provenance.toml"));
        provider
            .set_config(&EngineConfig {
                version_scope: VersionScope::DefinitionAndStudy,
                catalog: Some(PathBuf::from("catalog.toml")),
            })
            .unwrap();

        let config = provider.get_config().unwrap();
        assert_eq!(config.version_scope, VersionScope::DefinitionAndStudy);
        assert_eq!(config.catalog, Some(dir.path().join("catalog.toml")));
    }
}
