//! Startup wiring.
//!
//! [`Startup`] is the context object every domain is registered on: it
//! owns the fetcher, the skip budget and the missing-type policy, collects
//! a reader per domain and hands them all to one [`Loader`].
//!
//! ```text
//! Startup::new(fetcher)
//!     .feature_flags("myapp").source("/featureflags.json").build()   → FeatureFlagManager
//!     .json_configs("myapp").source("/configs.json").build()         → JsonConfigManager
//!     .configs("myapp", registry).source("/typed.json").build()      → ConfigManager
//!     .create_and_start_loader(settings)                             → Loader
//! ```

use std::sync::Arc;

use serde_json::Value;

use crate::config::schema::{AppConfig, DomainKind};
use crate::context::ConfigurationContext;
use crate::fetch::{Fetcher, FilesystemFetcher};
use crate::loader::{Loader, LoaderError, LoaderSettings};
use crate::manager::{ConfigManager, ConfigurationManager, FeatureFlagManager, JsonConfigManager};
use crate::parser::{ConfigObject, MissingTypePolicy, Parser, TypeRegistry, TypeResolver, Uniform};
use crate::reader::{Reader, Refresh};
use crate::store::Store;

pub const FEATURE_FLAGS_ROOT: &str = "feature-flags";
pub const CONFIGS_ROOT: &str = "configs";

/// Collects readers for one loader.
pub struct Startup {
    fetcher: Arc<dyn Fetcher>,
    max_skips: u32,
    policy: MissingTypePolicy,
    readers: Vec<Arc<dyn Refresh>>,
}

impl Startup {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            fetcher,
            max_skips: 0,
            policy: MissingTypePolicy::default(),
            readers: Vec::new(),
        }
    }

    /// Unchanged cycles each reader may skip before re-publishing anyway.
    pub fn with_max_skips(mut self, max_skips: u32) -> Self {
        self.max_skips = max_skips;
        self
    }

    pub fn with_missing_type_policy(mut self, policy: MissingTypePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Boolean flags read from the `feature-flags` root.
    pub fn feature_flags(&mut self, scope: impl Into<String>) -> DomainBuilder<'_, bool, FeatureFlagManager> {
        DomainBuilder::new(self, scope, FEATURE_FLAGS_ROOT, Arc::new(Uniform::<bool>::new()), FeatureFlagManager::new)
    }

    /// Untyped JSON values read from the `configs` root.
    pub fn json_configs(&mut self, scope: impl Into<String>) -> DomainBuilder<'_, Value, JsonConfigManager> {
        DomainBuilder::new(self, scope, CONFIGS_ROOT, Arc::new(Uniform::<Value>::new()), JsonConfigManager::new)
    }

    /// Typed objects read from the `configs` root, decoded through `registry`.
    pub fn configs(
        &mut self,
        scope: impl Into<String>,
        registry: TypeRegistry<ConfigObject>,
    ) -> DomainBuilder<'_, ConfigObject, ConfigManager> {
        DomainBuilder::new(self, scope, CONFIGS_ROOT, Arc::new(registry), ConfigManager::new)
    }

    /// Register an already-built reader.
    pub fn register(&mut self, reader: Arc<dyn Refresh>) {
        tracing::debug!(reader = %reader.name(), "Registered reader");
        self.readers.push(reader);
    }

    /// Names of readers registered since the last loader was created.
    pub fn pending_readers(&self) -> Vec<String> {
        self.readers.iter().map(|r| r.name().to_string()).collect()
    }

    /// Hand every registered reader to a new loader.
    pub fn create_loader(&mut self, settings: LoaderSettings) -> Loader {
        Loader::new(std::mem::take(&mut self.readers), settings)
    }

    /// [`Startup::create_loader`], then start it.
    pub fn create_and_start_loader(&mut self, settings: LoaderSettings) -> Result<Loader, LoaderError> {
        let loader = self.create_loader(settings);
        loader.start()?;
        Ok(loader)
    }
}

/// Describes one domain before its reader is registered.
pub struct DomainBuilder<'a, T, M> {
    startup: &'a mut Startup,
    scope: String,
    root: String,
    sources: Vec<String>,
    resolver: Arc<dyn TypeResolver<T>>,
    wrap: fn(ConfigurationManager<T>) -> M,
}

impl<'a, T, M> DomainBuilder<'a, T, M>
where
    T: Send + Sync + 'static,
{
    fn new(
        startup: &'a mut Startup,
        scope: impl Into<String>,
        root: &str,
        resolver: Arc<dyn TypeResolver<T>>,
        wrap: fn(ConfigurationManager<T>) -> M,
    ) -> Self {
        Self {
            startup,
            scope: scope.into(),
            root: root.to_string(),
            sources: Vec::new(),
            resolver,
            wrap,
        }
    }

    /// Add a source. Later sources win name collisions.
    pub fn source(mut self, source_id: impl Into<String>) -> Self {
        self.sources.push(source_id.into());
        self
    }

    pub fn sources<I, S>(mut self, source_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sources.extend(source_ids.into_iter().map(Into::into));
        self
    }

    /// Read entries from `root` instead of the default field.
    pub fn root(mut self, root: impl Into<String>) -> Self {
        self.root = root.into();
        self
    }

    /// Register the reader and return the manager over its store.
    pub fn build(self) -> M {
        let store = Arc::new(Store::new());
        let parser = Parser::with_shared_resolver(self.root.clone(), self.resolver, self.startup.policy);
        let reader = Reader::new(
            self.sources,
            self.scope,
            self.startup.fetcher.clone(),
            parser,
            store.clone(),
            self.startup.max_skips,
        );
        self.startup.register(Arc::new(reader));
        (self.wrap)(ConfigurationManager::new(self.root, store))
    }
}

/// Manager of a domain declared in the settings file.
#[derive(Clone)]
pub enum DomainManager {
    FeatureFlags(FeatureFlagManager),
    JsonConfigs(JsonConfigManager),
}

impl DomainManager {
    pub fn root(&self) -> &str {
        match self {
            DomainManager::FeatureFlags(m) => m.root(),
            DomainManager::JsonConfigs(m) => m.root(),
        }
    }

    pub fn names(&self) -> Vec<String> {
        match self {
            DomainManager::FeatureFlags(m) => m.names(),
            DomainManager::JsonConfigs(m) => m.names(),
        }
    }

    /// The resolved value as JSON, if `name` exists.
    pub fn resolve_json(&self, name: &str, context: &ConfigurationContext) -> Option<Value> {
        match self {
            DomainManager::FeatureFlags(m) => m.resolve(name, context).map(Value::Bool),
            DomainManager::JsonConfigs(m) => m.resolve(name, context),
        }
    }

    pub fn as_json(&self) -> Result<String, serde_json::Error> {
        match self {
            DomainManager::FeatureFlags(m) => m.as_json(),
            DomainManager::JsonConfigs(m) => m.as_json(),
        }
    }
}

/// A domain declared in the settings file.
pub struct Domain {
    /// Reader name, `<scope>/<root>`.
    pub name: String,
    pub manager: DomainManager,
}

/// Everything wired from the settings file, not yet started.
pub struct Application {
    pub fetcher: Arc<FilesystemFetcher>,
    pub loader: Loader,
    pub domains: Vec<Domain>,
}

impl Application {
    /// Build the fetcher, one reader per declared domain, and the loader.
    pub fn from_config(config: &AppConfig) -> Self {
        let fetcher = Arc::new(FilesystemFetcher::new(
            config.source.base_path.clone(),
            config.source.skip_missing,
        ));
        let mut startup = Startup::new(fetcher.clone())
            .with_max_skips(config.loader.max_skips)
            .with_missing_type_policy(config.loader.missing_types);

        let domains = config
            .domains
            .iter()
            .map(|domain| {
                let manager = match domain.kind {
                    DomainKind::FeatureFlags => DomainManager::FeatureFlags(
                        startup
                            .feature_flags(domain.scope.clone())
                            .root(domain.root())
                            .sources(domain.files.iter().cloned())
                            .build(),
                    ),
                    DomainKind::JsonConfigs => DomainManager::JsonConfigs(
                        startup
                            .json_configs(domain.scope.clone())
                            .root(domain.root())
                            .sources(domain.files.iter().cloned())
                            .build(),
                    ),
                };
                Domain {
                    name: format!("{}/{}", domain.scope, domain.root()),
                    manager,
                }
            })
            .collect();

        let loader = startup.create_loader(config.loader.settings());
        Self {
            fetcher,
            loader,
            domains,
        }
    }

    /// Look up a domain by reader name or, when unambiguous, by root field.
    pub fn domain(&self, key: &str) -> Option<&Domain> {
        if let Some(domain) = self.domains.iter().find(|d| d.name == key) {
            return Some(domain);
        }
        let mut by_root = self.domains.iter().filter(|d| d.manager.root() == key);
        match (by_root.next(), by_root.next()) {
            (Some(domain), None) => Some(domain),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::DomainConfig;
    use crate::fetch::{FetchResult, SourceContents};
    use async_trait::async_trait;

    struct Static(SourceContents);

    #[async_trait]
    impl Fetcher for Static {
        async fn fetch(&self, source_ids: &[String], _scope: &str) -> FetchResult<SourceContents> {
            Ok(source_ids
                .iter()
                .filter_map(|id| self.0.get(id).map(|c| (id.clone(), c.clone())))
                .collect())
        }
    }

    fn fetcher() -> Arc<dyn Fetcher> {
        let mut contents = SourceContents::new();
        contents.insert(
            "/featureflags.json".into(),
            r#"{ "feature-flags": { "enable-all": { "value": true } } }"#.into(),
        );
        contents.insert(
            "/configs.json".into(),
            r#"{ "configs": { "limits": { "value": { "max": 3 } } } }"#.into(),
        );
        Arc::new(Static(contents))
    }

    #[tokio::test]
    async fn test_builders_register_readers() {
        let mut startup = Startup::new(fetcher());
        let flags = startup.feature_flags("myapp").source("/featureflags.json").build();
        let configs = startup.json_configs("myapp").source("/configs.json").build();
        assert_eq!(startup.pending_readers(), vec!["myapp/feature-flags", "myapp/configs"]);

        let loader = startup.create_and_start_loader(LoaderSettings::default()).unwrap();
        assert!(startup.pending_readers().is_empty());
        loader.wait_for_initial_load().await;

        let ctx = ConfigurationContext::new();
        assert!(flags.is_active("enable-all", &ctx));
        assert_eq!(configs.get_config("limits", &ctx), serde_json::json!({ "max": 3 }));
        loader.shutdown().await.unwrap();
    }

    #[test]
    fn test_root_override() {
        let mut startup = Startup::new(fetcher());
        let flags = startup.feature_flags("myapp").root("toggles").build();
        assert_eq!(flags.root(), "toggles");
        assert_eq!(startup.pending_readers(), vec!["myapp/toggles"]);
    }

    #[test]
    fn test_application_domain_lookup() {
        let mut config = AppConfig::default();
        for (kind, scope) in [
            (DomainKind::FeatureFlags, "a"),
            (DomainKind::JsonConfigs, "a"),
            (DomainKind::JsonConfigs, "b"),
        ] {
            config.domains.push(DomainConfig {
                kind,
                scope: scope.to_string(),
                files: vec!["/x.json".to_string()],
                root: None,
            });
        }

        let app = Application::from_config(&config);
        assert_eq!(app.loader.reader_names(), vec!["a/feature-flags", "a/configs", "b/configs"]);
        assert_eq!(app.domain("b/configs").map(|d| d.name.as_str()), Some("b/configs"));
        assert_eq!(app.domain("feature-flags").map(|d| d.name.as_str()), Some("a/feature-flags"));
        assert!(app.domain("configs").is_none());
    }
}
