//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, limits > 0)
//! - Reject module names that would escape the modules directory
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>

use crate::config::schema::ServerConfig;

/// One failed semantic check.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
    #[error("{field} must not be empty")]
    Empty { field: &'static str },
    #[error("invalid module name '{0}' in extensions.autoload")]
    ModuleName(String),
}

pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let listener = &config.listener;

    if listener.max_connections == 0 {
        errors.push(ValidationError::Zero { field: "listener.max_connections" });
    }
    if listener.max_line_bytes == 0 {
        errors.push(ValidationError::Zero { field: "listener.max_line_bytes" });
    }
    if listener.read_timeout_secs == 0 {
        errors.push(ValidationError::Zero { field: "listener.read_timeout_secs" });
    }
    if listener.handshake_timeout_secs == 0 {
        errors.push(ValidationError::Zero { field: "listener.handshake_timeout_secs" });
    }
    if listener.host.trim().is_empty() {
        errors.push(ValidationError::Empty { field: "listener.host" });
    }
    if config.extensions.bootstrap.trim().is_empty() {
        errors.push(ValidationError::Empty { field: "extensions.bootstrap" });
    }
    for name in &config.extensions.autoload {
        if !is_valid_module_name(name) {
            errors.push(ValidationError::ModuleName(name.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Module names become file names; path separators and parent hops are refused.
pub fn is_valid_module_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&ServerConfig::default()).is_ok());
    }

    #[test]
    fn rejects_traversal_in_autoload() {
        let mut config = ServerConfig::default();
        config.extensions.autoload = vec!["../etc".into(), "Echo".into()];
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::ModuleName("../etc".into())]);
    }

    #[test]
    fn module_name_rules() {
        assert!(is_valid_module_name("Echo"));
        assert!(!is_valid_module_name(""));
        assert!(!is_valid_module_name(".."));
        assert!(!is_valid_module_name("a/b"));
    }
}
