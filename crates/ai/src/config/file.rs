//! File-backed configuration source.
//!
//! Reads `.taskmaster/config.json` under the project root on every lookup.

use std::path::{Path, PathBuf};

use super::credentials::{lookup_api_key, SessionEnv};
use super::resolver::{ConfigSource, RoleParameters, RoleSettings};
use super::role::Role;
use crate::entities::{ModelSettings, TaskmasterConfig};
use crate::errors::{AiError, AiResult};

/// Directory holding project configuration
pub const CONFIG_DIR: &str = ".taskmaster";

/// Configuration file name
pub const CONFIG_FILE: &str = "config.json";

/// Configuration source reading the project's config file.
///
/// A missing file yields the default configuration.
#[derive(Debug, Clone, Default)]
pub struct FileConfigSource;

impl FileConfigSource {
    /// Create a new file-backed source.
    pub fn new() -> Self {
        Self
    }

    /// Path of the config file for `project_root`.
    pub fn config_path(project_root: &Path) -> PathBuf {
        project_root.join(CONFIG_DIR).join(CONFIG_FILE)
    }

    /// Load the configuration for `project_root`.
    pub fn load(project_root: &Path) -> AiResult<TaskmasterConfig> {
        let path = Self::config_path(project_root);

        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(TaskmasterConfig::default());
        }

        let content = std::fs::read_to_string(&path)?;
        serde_json::from_str(&content).map_err(|e| {
            AiError::config(format!("Invalid configuration in {}: {e}", path.display()))
        })
    }

    /// Write `config` for `project_root`, creating the directory if needed.
    pub fn save(project_root: &Path, config: &TaskmasterConfig) -> AiResult<()> {
        let path = Self::config_path(project_root);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(config)?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    fn settings(role: Role, project_root: &Path) -> AiResult<Option<ModelSettings>> {
        Ok(Self::load(project_root)?.models.for_role(role).cloned())
    }

    fn parameters(settings: &ModelSettings) -> RoleParameters {
        RoleParameters {
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
        }
    }

    fn base_url(config: &TaskmasterConfig, role: Role) -> Option<String> {
        let settings = config.models.for_role(role)?;

        // Ollama roles inherit the global server URL unless they set their own
        match &settings.base_url {
            Some(url) => Some(url.clone()),
            None if settings.provider.eq_ignore_ascii_case("ollama") => {
                config.global.ollama_base_url.clone()
            }
            None => None,
        }
    }
}

impl ConfigSource for FileConfigSource {
    fn provider_for_role(&self, role: Role, project_root: &Path) -> AiResult<Option<String>> {
        Ok(Self::settings(role, project_root)?.map(|s| s.provider))
    }

    fn model_for_role(&self, role: Role, project_root: &Path) -> AiResult<Option<String>> {
        Ok(Self::settings(role, project_root)?.map(|s| s.model_id))
    }

    fn parameters_for_role(&self, role: Role, project_root: &Path) -> AiResult<RoleParameters> {
        let settings = Self::settings(role, project_root)?.unwrap_or_default();
        Ok(Self::parameters(&settings))
    }

    fn base_url_for_role(&self, role: Role, project_root: &Path) -> AiResult<Option<String>> {
        Ok(Self::base_url(&Self::load(project_root)?, role))
    }

    fn role_settings(&self, role: Role, project_root: &Path) -> AiResult<RoleSettings> {
        let config = Self::load(project_root)?;
        let settings = config.models.for_role(role);

        Ok(RoleSettings {
            provider: settings.map(|s| s.provider.clone()),
            model_id: settings.map(|s| s.model_id.clone()),
            parameters: Self::parameters(&settings.cloned().unwrap_or_default()),
            base_url: Self::base_url(&config, role),
        })
    }

    fn credential_for(
        &self,
        provider: &str,
        session: &SessionEnv,
        _project_root: &Path,
    ) -> Option<String> {
        lookup_api_key(provider, session)
    }
}
