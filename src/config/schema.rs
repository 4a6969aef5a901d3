//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::loader::LoaderSettings;
use crate::parser::MissingTypePolicy;

/// Root application settings.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Refresh scheduling.
    pub loader: LoaderConfig,

    /// Where content is fetched from.
    pub source: SourceConfig,

    /// Configuration domains to load.
    pub domains: Vec<DomainConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Refresh scheduling.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Delay between the end of one cycle and the start of the next.
    pub refresh_interval_secs: u64,

    /// Consecutive unchanged cycles skipped before a forced re-publish.
    pub max_skips: u32,

    /// What to do with entries that cannot be typed or decoded.
    pub missing_types: MissingTypePolicy,

    /// Time in-flight cycles get to finish on shutdown.
    pub shutdown_grace_secs: u64,
}

impl LoaderConfig {
    pub fn settings(&self) -> LoaderSettings {
        LoaderSettings {
            refresh_interval: Duration::from_secs(self.refresh_interval_secs),
            shutdown_grace: Duration::from_secs(self.shutdown_grace_secs),
        }
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 30,
            max_skips: 0,
            missing_types: MissingTypePolicy::default(),
            shutdown_grace_secs: 3,
        }
    }
}

/// Filesystem content source.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Directory holding one subdirectory per scope.
    pub base_path: PathBuf,

    /// Leave absent files out of a cycle instead of failing it.
    pub skip_missing: bool,

    /// Trigger a refresh when files under `base_path` change.
    pub watch: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("./config"),
            skip_missing: false,
            watch: false,
        }
    }
}

/// Kind of values a domain holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DomainKind {
    /// Boolean flags under `feature-flags`.
    FeatureFlags,
    /// Untyped JSON values under `configs`.
    JsonConfigs,
}

impl DomainKind {
    pub fn default_root(&self) -> &'static str {
        match self {
            DomainKind::FeatureFlags => "feature-flags",
            DomainKind::JsonConfigs => "configs",
        }
    }
}

/// One configuration domain.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DomainConfig {
    pub kind: DomainKind,

    /// Scope passed to the fetcher (an application name).
    pub scope: String,

    /// Source ids, merged in this order.
    #[serde(default)]
    pub files: Vec<String>,

    /// Root field override.
    #[serde(default)]
    pub root: Option<String>,
}

impl DomainConfig {
    pub fn root(&self) -> &str {
        self.root.as_deref().unwrap_or_else(|| self.kind.default_root())
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.loader.refresh_interval_secs, 30);
        assert_eq!(config.loader.max_skips, 0);
        assert_eq!(config.loader.missing_types, MissingTypePolicy::SkipAndCount);
        assert_eq!(config.loader.settings(), LoaderSettings::default());
        assert!(config.domains.is_empty());
        assert!(!config.observability.metrics_enabled);
    }

    #[test]
    fn test_domains_parse() {
        let config: AppConfig = toml::from_str(
            r#"
            [loader]
            refresh_interval_secs = 5
            missing_types = "fail"

            [[domains]]
            kind = "feature-flags"
            scope = "myapp"
            files = ["/featureflags.json"]

            [[domains]]
            kind = "json-configs"
            scope = "myapp"
            files = ["/a.json", "/b.json"]
            root = "settings"
            "#,
        )
        .unwrap();

        assert_eq!(config.loader.missing_types, MissingTypePolicy::Fail);
        assert_eq!(config.domains.len(), 2);
        assert_eq!(config.domains[0].kind, DomainKind::FeatureFlags);
        assert_eq!(config.domains[0].root(), "feature-flags");
        assert_eq!(config.domains[1].root(), "settings");
        assert_eq!(config.domains[1].files, vec!["/a.json", "/b.json"]);
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let result: Result<AppConfig, _> = toml::from_str(
            r#"
            [[domains]]
            kind = "yaml"
            scope = "myapp"
            "#,
        );
        assert!(result.is_err());
    }
}
