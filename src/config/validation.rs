//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Value ranges (interval > 0, address parses)
//! - Domain integrity (sources present, no two domains sharing a reader name)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>

use std::collections::HashSet;
use std::fmt;
use std::net::SocketAddr;

use tracing_subscriber::EnvFilter;

use crate::config::schema::AppConfig;

/// A single semantic problem, located by its settings path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.loader.refresh_interval_secs == 0 {
        errors.push(ValidationError::new(
            "loader.refresh_interval_secs",
            "must be greater than zero",
        ));
    }

    let mut readers = HashSet::new();
    for (i, domain) in config.domains.iter().enumerate() {
        let field = |name: &str| format!("domains[{i}].{name}");

        if domain.scope.trim().is_empty() {
            errors.push(ValidationError::new(field("scope"), "must not be empty"));
        }
        if domain.files.is_empty() {
            errors.push(ValidationError::new(field("files"), "at least one source is required"));
        }
        if domain.root().is_empty() {
            errors.push(ValidationError::new(field("root"), "must not be empty"));
        }

        let mut seen = HashSet::new();
        for file in &domain.files {
            if !seen.insert(file.as_str()) {
                errors.push(ValidationError::new(field("files"), format!("duplicate source `{file}`")));
            }
        }

        let reader = format!("{}/{}", domain.scope, domain.root());
        if !readers.insert(reader.clone()) {
            errors.push(ValidationError::new(
                field("root"),
                format!("reader `{reader}` is already defined"),
            ));
        }
    }

    if EnvFilter::try_new(&config.observability.log_level).is_err() {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("invalid level `{}`", config.observability.log_level),
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("invalid socket address `{}`", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
