use std::path::PathBuf;

use thiserror::Error;

/// Convenient result alias for the hit-counter construct library.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level library error type.
#[derive(Debug, Error)]
pub enum Error {
    /// A managed policy referenced by name does not exist in the target environment.
    #[error("managed policy not found: {name}{}", format_suggestions(.suggestions))]
    ManagedPolicyNotFound {
        name: String,
        suggestions: Vec<String>,
    },

    /// Raised when a construct id is declared twice within the same scope.
    #[error("construct id '{id}' is already used within scope '{scope}'")]
    DuplicateConstructId { scope: String, id: String },

    /// Raised when a construct id is empty or contains a path separator.
    #[error("invalid construct id '{id}': ids must be non-empty and must not contain '/'")]
    InvalidConstructId { id: String },

    /// Raised when a stack name is not a valid CloudFormation stack name.
    #[error("invalid stack name '{name}': must start with a letter and contain only letters, digits and '-'")]
    InvalidStackName { name: String },

    /// Raised when two construct paths collapse onto the same logical id.
    #[error("logical id {logical_id} for {path} collides with an existing resource")]
    DuplicateLogicalId { logical_id: String, path: String },

    /// A resource references an entity that is not declared in the same stack.
    #[error("resource {source_id} references {target}, which is not declared in this stack")]
    UnresolvedReference { source_id: String, target: String },

    /// The resource graph contains a reference cycle.
    #[error("dependency cycle detected: {}", .cycle.join(" -> "))]
    DependencyCycle { cycle: Vec<String> },

    /// Raised when the application configuration is unusable.
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Raised when a configuration file cannot be read or parsed.
    #[error("failed to load configuration from {path}: {message}")]
    ConfigLoad { path: PathBuf, message: String },

    /// Wrapper for JSON serialization errors.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Wrapper for IO errors.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn format_suggestions(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else if suggestions.len() == 1 {
        format!(". Did you mean '{}'?", suggestions[0])
    } else {
        format!(
            ". Did you mean one of: {}?",
            suggestions
                .iter()
                .map(|s| format!("'{}'", s))
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}
