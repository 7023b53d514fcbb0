use std::time::Duration;

/// Errors raised by the player, its control bar and its providers.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PlayerError {
    /// The selector did not resolve to any element
    #[error("no element matches selector '{0}'")]
    TargetNotFound(String),

    /// The element cannot host the requested provider
    #[error("element <{tag}> cannot host a {provider} player")]
    IncompatibleTarget {
        /// Tag name of the rejected element
        tag: String,
        /// Provider that rejected it
        provider: String,
    },

    /// No provider is registered under the requested name
    #[error("unknown provider '{0}'")]
    UnknownProvider(String),

    /// The target element lacks an attribute the provider needs
    #[error("element is missing required attribute '{0}'")]
    MissingAttribute(&'static str),

    /// The provider does not implement a capability
    #[error("provider '{provider}' does not implement '{capability}'")]
    NotImplemented {
        /// Provider name
        provider: String,
        /// Missing capability
        capability: &'static str,
    },

    /// The backend has not reported readiness yet
    #[error("backend is not ready")]
    NotReady,

    /// A backend query failed
    #[error("backend query '{query}' failed: {reason}")]
    QueryFailed {
        /// Query that failed
        query: &'static str,
        /// Failure details
        reason: String,
    },

    /// A backend query got no answer in time
    #[error("backend query '{query}' timed out after {timeout:?}")]
    Timeout {
        /// Query that timed out
        query: &'static str,
        /// How long the reply was awaited
        timeout: Duration,
    },

    /// The backend sent something the provider could not understand
    #[error("protocol error: {0}")]
    Protocol(String),

    /// `build()` was called more than once
    #[error("player is already built")]
    AlreadyBuilt,

    /// Background work needs a tokio runtime and none is running
    #[error("no tokio runtime is running")]
    NoRuntime,
}

impl PlayerError {
    /// Whether the failure only affects the current update and may be skipped.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::NotReady | Self::QueryFailed { .. } | Self::Timeout { .. } | Self::Protocol(_)
        )
    }
}

/// Result alias for player operations.
pub type Result<T> = std::result::Result<T, PlayerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_implemented_names_capability() {
        let error = PlayerError::NotImplemented {
            provider: "bare".into(),
            capability: "play",
        };

        assert_eq!(
            error.to_string(),
            "provider 'bare' does not implement 'play'"
        );
        assert!(!error.is_transient());
    }

    #[test]
    fn query_failures_are_transient() {
        let timeout = PlayerError::Timeout {
            query: "getDuration",
            timeout: Duration::from_millis(50),
        };

        assert!(timeout.is_transient());
        assert!(PlayerError::NotReady.is_transient());
        assert!(!PlayerError::TargetNotFound("#x".into()).is_transient());
    }
}
