//! Role configuration: roles, bindings, credentials and configuration sources.

pub mod credentials;
mod file;
mod resolver;
mod role;

pub use credentials::{is_credential_exempt, SessionEnv, CREDENTIAL_EXEMPT_PROVIDERS};
pub use file::{FileConfigSource, CONFIG_DIR, CONFIG_FILE};
pub use resolver::{
    ConfigSource, ProjectContext, ProviderBinding, RoleParameters, RoleResolver, RoleSettings,
};
pub use role::Role;
