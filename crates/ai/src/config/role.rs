//! Roles and the fallback sequence.

use serde::{Deserialize, Serialize};

/// A named purpose slot bound to a provider and model by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Default role for generation and updates
    Main,
    /// Research-backed generation
    Research,
    /// Used when the primary role fails
    Fallback,
}

/// Fixed priority order used to fill the rest of a fallback sequence.
const PRIORITY: [Role; 3] = [Role::Main, Role::Fallback, Role::Research];

impl Role {
    /// Get the role name as a lowercase string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Research => "research",
            Self::Fallback => "fallback",
        }
    }

    /// All roles in priority order.
    #[must_use]
    pub const fn all() -> [Role; 3] {
        PRIORITY
    }

    /// Attempt order for a request that starts at `initial`.
    ///
    /// The requested role comes first, followed by the remaining roles in
    /// `main → fallback → research` order; every role appears once.
    #[must_use]
    pub fn fallback_sequence(initial: Role) -> Vec<Role> {
        std::iter::once(initial)
            .chain(PRIORITY.into_iter().filter(move |r| *r != initial))
            .collect()
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "main" => Ok(Self::Main),
            "research" => Ok(Self::Research),
            "fallback" => Ok(Self::Fallback),
            other => Err(format!("Unknown role: {other}")),
        }
    }
}
