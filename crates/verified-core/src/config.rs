use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "verified.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(std::io::Error),
    #[error("failed to parse toml: {0}")]
    Parse(toml::de::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Config {
    #[serde(default)]
    pub artifacts: ArtifactsSection,
    #[serde(default)]
    pub sources: SourcesSection,
    #[serde(default)]
    pub paths: PathsSection,
    #[serde(default)]
    pub http: HttpSection,
}

impl Config {
    pub fn load_from_path(path: &Path) -> Result<Config, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Read)?;
        let config = toml::from_str(&content).map_err(ConfigError::Parse)?;
        Ok(config)
    }

    /// Loads `verified.toml` from the project root, falling back to defaults
    /// when the file does not exist.
    pub fn load_or_default(root: &Path) -> Result<Config, ConfigError> {
        let path = root.join(CONFIG_FILE_NAME);
        match Config::load_from_path(&path) {
            Ok(config) => Ok(config),
            Err(ConfigError::Read(err)) if err.kind() == std::io::ErrorKind::NotFound => {
                Ok(Config::default())
            }
            Err(err) => Err(err),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ArtifactsSection {
    pub raw_base_url: String,
    pub repo_url: String,
}

impl Default for ArtifactsSection {
    fn default() -> Self {
        ArtifactsSection {
            raw_base_url:
                "https://raw.githubusercontent.com/DeployDAO/verified-program-artifacts"
                    .to_string(),
            repo_url: "https://github.com/DeployDAO/verified-program-artifacts".to_string(),
        }
    }
}

impl ArtifactsSection {
    /// Name of the artifacts repository (`owner/name`), derived from `repo_url`.
    pub fn repo_slug(&self) -> String {
        self.repo_url
            .trim_end_matches('/')
            .trim_start_matches("https://github.com/")
            .to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SourcesSection {
    pub raw_base_url: String,
}

impl Default for SourcesSection {
    fn default() -> Self {
        SourcesSection {
            raw_base_url: "https://raw.githubusercontent.com".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsSection {
    pub index_dir: String,
    pub workflows_dir: String,
    pub cache_dir: String,
}

impl Default for PathsSection {
    fn default() -> Self {
        PathsSection {
            index_dir: "index".to_string(),
            workflows_dir: "out/.github/workflows".to_string(),
            cache_dir: ".cache/manifests".to_string(),
        }
    }
}

impl PathsSection {
    pub fn index_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.index_dir)
    }

    pub fn workflows_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.workflows_dir)
    }

    pub fn cache_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.cache_dir)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HttpSection {
    pub timeout_secs: u64,
}

impl Default for HttpSection {
    fn default() -> Self {
        HttpSection { timeout_secs: 30 }
    }
}
