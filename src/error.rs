use thiserror::Error;

/// Error returned by configuration, hashing and routing operations.
///
/// A token that fails to decode is not an error: converters hand the
/// original value back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("Invalid parameter name '{name}'")]
    InvalidParameter { name: String },

    #[error("Cannot encode '{value}': {reason}")]
    EncodingFailed { value: String, reason: String },

    #[error("Hasher '{name}' is not configured")]
    HasherNotFound { name: String },

    #[error("Invalid configuration for hasher '{hasher}': {reason}")]
    Configuration { hasher: String, reason: String },

    #[error("Controller reference '{reference}' cannot be resolved")]
    InvalidController { reference: String },

    #[error("Handler {class}::{method} does not exist")]
    MissingClassOrMethod { class: String, method: String },

    #[error("Route '{name}' does not exist")]
    RouteNotFound { name: String },

    #[error("Missing parameters [{}] to generate a URL for route '{route}'", .parameters.join(", "))]
    MissingParameters {
        route: String,
        parameters: Vec<String>,
    },

    #[error("Parameter '{name}' has a value that cannot be placed in a URL: '{value}'")]
    InvalidParameterValue { name: String, value: String },

    #[error("No route matches path '{path}'")]
    NoMatch { path: String },
}

impl Error {
    /// Whether URL generation may ignore this error and continue without
    /// rewriting parameters.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::InvalidController { .. }
                | Error::MissingClassOrMethod { .. }
                | Error::HasherNotFound { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = Error::MissingParameters {
            route: "order_show".to_string(),
            parameters: vec!["id".to_string(), "slug".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Missing parameters [id, slug] to generate a URL for route 'order_show'"
        );
        assert_eq!(
            Error::HasherNotFound {
                name: "secure".to_string()
            }
            .to_string(),
            "Hasher 'secure' is not configured"
        );
    }

    #[test]
    fn test_recoverable() {
        assert!(Error::InvalidController {
            reference: "::".to_string()
        }
        .is_recoverable());
        assert!(!Error::InvalidParameter {
            name: "1id".to_string()
        }
        .is_recoverable());
    }
}
