use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const ORG_URL_ENV: &str = "AZURE_DEVOPS_EXT_ORG_SERVICE_URL";
pub const PROJECT_ENV: &str = "AZURE_DEVOPS_EXT_PROJECT";

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    pub azure: Option<AzureConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct AzureConfig {
    pub org_url: Option<String>,
    pub project: Option<String>,
    pub az_path: Option<String>,
}

/// How to invoke `az`. Organization and project are handed to the child
/// process through its environment; unset values fall through to whatever
/// the caller's environment or `az devops configure` already provide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AzConfig {
    pub program: PathBuf,
    pub org_url: Option<String>,
    pub project: Option<String>,
}

impl Default for AzConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("az"),
            org_url: None,
            project: None,
        }
    }
}

impl AzConfig {
    /// Command-line values win over the config file.
    pub fn resolve(
        org_url: Option<String>,
        project: Option<String>,
        az_path: Option<PathBuf>,
        file: &AppConfig,
    ) -> Self {
        let azure = file.azure.clone().unwrap_or_default();
        let non_empty = |s: Option<String>| s.filter(|v| !v.trim().is_empty());
        Self {
            program: az_path
                .or_else(|| azure.az_path.map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from("az")),
            org_url: non_empty(org_url).or_else(|| non_empty(azure.org_url)),
            project: non_empty(project).or_else(|| non_empty(azure.project)),
        }
    }

    /// Environment overrides to apply to every `az` invocation.
    pub fn env_overrides(&self) -> Vec<(&'static str, &str)> {
        let mut vars = Vec::new();
        if let Some(url) = &self.org_url {
            vars.push((ORG_URL_ENV, url.as_str()));
        }
        if let Some(project) = &self.project {
            vars.push((PROJECT_ENV, project.as_str()));
        }
        vars
    }
}

pub fn config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".work-context")
        .join("config.toml")
}

pub fn load_config() -> Result<AppConfig> {
    load_config_from(&config_path())
}

pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    let config: AppConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(config)
}
