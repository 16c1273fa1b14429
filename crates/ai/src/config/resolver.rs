//! Role Configuration Resolver.
//!
//! Turns a [`Role`] into the [`ProviderBinding`] that serves it and answers
//! whether a credential is available for a provider. Lookups go through a
//! [`ConfigSource`] on every call, so configuration edits take effect on the
//! next request. No network calls are made here.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::credentials::{is_credential_exempt, SessionEnv};
use super::role::Role;
use crate::errors::{AiError, AiResult};

/// Project-level context for a lookup.
#[derive(Debug, Clone, Default)]
pub struct ProjectContext {
    /// Root of the project whose configuration applies.
    pub project_root: PathBuf,
    /// Session-supplied environment (checked before the process env).
    pub session: SessionEnv,
}

impl ProjectContext {
    /// Context for `project_root` with an empty session.
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            session: SessionEnv::default(),
        }
    }

    /// Attach a session environment.
    #[must_use]
    pub fn with_session(mut self, session: SessionEnv) -> Self {
        self.session = session;
        self
    }
}

/// Generation parameters bound to a role.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoleParameters {
    /// Maximum output tokens.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
}

/// Everything configured for a role, as read in one pass over the source.
#[derive(Debug, Clone, PartialEq)]
pub struct RoleSettings {
    /// Provider name, `None` when unbound.
    pub provider: Option<String>,
    /// Model ID, `None` when unbound.
    pub model_id: Option<String>,
    /// Generation parameters.
    pub parameters: RoleParameters,
    /// Endpoint override.
    pub base_url: Option<String>,
}

/// Provider, model and parameters serving a role, resolved per call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderBinding {
    /// Role this binding serves.
    pub role: Role,
    /// Provider name.
    pub provider: String,
    /// Model ID.
    pub model_id: String,
    /// Maximum output tokens.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// Optional endpoint override.
    pub base_url: Option<String>,
}

/// Configuration collaborator.
///
/// Implementations must not perform network calls.
pub trait ConfigSource: Send + Sync {
    /// Provider bound to `role`, `None` when unbound.
    fn provider_for_role(&self, role: Role, project_root: &Path) -> AiResult<Option<String>>;

    /// Model bound to `role`, `None` when unbound.
    fn model_for_role(&self, role: Role, project_root: &Path) -> AiResult<Option<String>>;

    /// Generation parameters for `role`.
    fn parameters_for_role(&self, role: Role, project_root: &Path) -> AiResult<RoleParameters>;

    /// Endpoint override for `role`.
    fn base_url_for_role(&self, _role: Role, _project_root: &Path) -> AiResult<Option<String>> {
        Ok(None)
    }

    /// All settings for `role` from a single read.
    ///
    /// Sources backed by storage that can change between reads should
    /// override this so one resolve never mixes two versions.
    fn role_settings(&self, role: Role, project_root: &Path) -> AiResult<RoleSettings> {
        Ok(RoleSettings {
            provider: self.provider_for_role(role, project_root)?,
            model_id: self.model_for_role(role, project_root)?,
            parameters: self.parameters_for_role(role, project_root)?,
            base_url: self.base_url_for_role(role, project_root)?,
        })
    }

    /// Credential value for `provider`, if one is set.
    fn credential_for(
        &self,
        provider: &str,
        session: &SessionEnv,
        project_root: &Path,
    ) -> Option<String>;

    /// Whether a credential is set for `provider`.
    fn is_credential_set(&self, provider: &str, session: &SessionEnv, project_root: &Path) -> bool {
        self.credential_for(provider, session, project_root).is_some()
    }
}

/// Resolves roles to provider bindings and gates on credentials.
#[derive(Clone)]
pub struct RoleResolver {
    source: Arc<dyn ConfigSource>,
}

impl RoleResolver {
    /// Create a resolver over a configuration source.
    pub fn new(source: Arc<dyn ConfigSource>) -> Self {
        Self { source }
    }

    /// Resolve the binding for `role`.
    ///
    /// A role without a provider or model is a configuration error.
    pub fn resolve(&self, role: Role, ctx: &ProjectContext) -> AiResult<ProviderBinding> {
        let settings = self.source.role_settings(role, &ctx.project_root)?;

        let provider = settings
            .provider
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| AiError::config(format!("No provider configured for role '{role}'")))?;

        let model_id = settings
            .model_id
            .filter(|m| !m.trim().is_empty())
            .ok_or_else(|| {
                AiError::config(format!(
                    "No model configured for role '{role}' (provider '{provider}')"
                ))
            })?;

        Ok(ProviderBinding {
            role,
            provider,
            model_id,
            max_tokens: settings.parameters.max_tokens,
            temperature: settings.parameters.temperature,
            base_url: settings.base_url,
        })
    }

    /// Whether `provider` is subject to credential gating.
    pub fn requires_credential(&self, provider: &str) -> bool {
        !is_credential_exempt(provider)
    }

    /// Whether a credential is present for `provider`. Exempt providers
    /// always have one.
    pub fn has_credential(&self, provider: &str, ctx: &ProjectContext) -> bool {
        if is_credential_exempt(provider) {
            return true;
        }
        self.source
            .is_credential_set(provider, &ctx.session, &ctx.project_root)
    }

    /// Credential value to hand to the adapter.
    pub fn api_key(&self, provider: &str, ctx: &ProjectContext) -> Option<String> {
        if is_credential_exempt(provider) {
            return None;
        }
        self.source
            .credential_for(provider, &ctx.session, &ctx.project_root)
    }
}

impl std::fmt::Debug for RoleResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoleResolver").finish_non_exhaustive()
    }
}
