//! Caller-facing lookups over a domain's store.
//!
//! Every call reads one snapshot: a lookup never mixes entries from two
//! publishes.

use std::ops::Deref;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::catalog::Catalog;
use crate::context::ConfigurationContext;
use crate::parser::{writer, ConfigObject};
use crate::store::Store;

/// Lookups over one domain's published catalog.
pub struct ConfigurationManager<T> {
    root: String,
    store: Arc<Store<T>>,
}

impl<T> Clone for ConfigurationManager<T> {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
            store: self.store.clone(),
        }
    }
}

impl<T> ConfigurationManager<T> {
    pub fn new(root: impl Into<String>, store: Arc<Store<T>>) -> Self {
        Self {
            root: root.into(),
            store,
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn store(&self) -> &Arc<Store<T>> {
        &self.store
    }

    pub fn snapshot(&self) -> Arc<Catalog<T>> {
        self.store.read()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.store.read().contains(name)
    }

    /// Names in the current snapshot, sorted.
    pub fn names(&self) -> Vec<String> {
        self.store.read().names().map(str::to_string).collect()
    }

    /// Resolve `name` and map the value without cloning it out of the snapshot.
    pub fn resolve_with<R>(
        &self,
        name: &str,
        context: &ConfigurationContext,
        f: impl FnOnce(&T) -> R,
    ) -> Option<R> {
        self.store.read().resolve(name, context).map(f)
    }
}

impl<T: Clone> ConfigurationManager<T> {
    /// The value `name` resolves to under `context`, if the entry exists.
    pub fn resolve(&self, name: &str, context: &ConfigurationContext) -> Option<T> {
        self.resolve_with(name, context, T::clone)
    }

    /// The value `name` resolves to under `context`, or `default`.
    pub fn get(&self, name: &str, context: &ConfigurationContext, default: T) -> T {
        self.resolve(name, context).unwrap_or(default)
    }
}

impl<T: Serialize> ConfigurationManager<T> {
    /// The whole current snapshot in content format.
    pub fn as_json(&self) -> Result<String, serde_json::Error> {
        writer::write_catalog(&self.root, &self.store.read())
    }

    /// One entry in content format; an empty root when `name` is absent.
    pub fn entry_as_json(&self, name: &str) -> Result<String, serde_json::Error> {
        let entry = self.store.lookup(name);
        writer::write_entry(&self.root, entry.as_deref())
    }
}

/// Boolean feature flags.
#[derive(Clone)]
pub struct FeatureFlagManager {
    inner: ConfigurationManager<bool>,
}

impl FeatureFlagManager {
    pub fn new(inner: ConfigurationManager<bool>) -> Self {
        Self { inner }
    }

    /// Whether `name` is on under `context`. Unknown flags are off.
    pub fn is_active(&self, name: &str, context: &ConfigurationContext) -> bool {
        self.inner.get(name, context, false)
    }

    pub fn is_active_or(&self, name: &str, context: &ConfigurationContext, default: bool) -> bool {
        self.inner.get(name, context, default)
    }
}

impl Deref for FeatureFlagManager {
    type Target = ConfigurationManager<bool>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// Untyped JSON configuration values.
#[derive(Clone)]
pub struct JsonConfigManager {
    inner: ConfigurationManager<Value>,
}

impl JsonConfigManager {
    pub fn new(inner: ConfigurationManager<Value>) -> Self {
        Self { inner }
    }

    /// The resolved value, or an empty JSON object when `name` is unknown.
    pub fn get_config(&self, name: &str, context: &ConfigurationContext) -> Value {
        self.inner
            .resolve(name, context)
            .unwrap_or_else(|| Value::Object(Map::new()))
    }
}

impl Deref for JsonConfigManager {
    type Target = ConfigurationManager<Value>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// Configuration objects decoded through a type registry.
#[derive(Clone)]
pub struct ConfigManager {
    inner: ConfigurationManager<ConfigObject>,
}

impl ConfigManager {
    pub fn new(inner: ConfigurationManager<ConfigObject>) -> Self {
        Self { inner }
    }

    /// The resolved object as `C`, if `name` exists and was registered as `C`.
    pub fn try_get_config<C>(&self, name: &str, context: &ConfigurationContext) -> Option<C>
    where
        C: Clone + 'static,
    {
        self.inner
            .resolve_with(name, context, |object| object.downcast_ref::<C>().cloned())
            .flatten()
    }

    /// The resolved object as `C`, or `C::default()`.
    pub fn get_config<C>(&self, name: &str, context: &ConfigurationContext) -> C
    where
        C: Clone + Default + 'static,
    {
        self.try_get_config(name, context).unwrap_or_default()
    }
}

impl Deref for ConfigManager {
    type Target = ConfigurationManager<ConfigObject>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ConfigurationEntry;
    use crate::context::ContextNode;
    use serde::Deserialize;
    use serde_json::json;

    fn user(name: &str) -> ConfigurationContext {
        ConfigurationContext::new().with("user", name)
    }

    fn flags() -> FeatureFlagManager {
        let store = Arc::new(Store::new());
        store.publish(
            [
                ConfigurationEntry::new(
                    "enable-one",
                    ContextNode::with_overrides(false, "user", [("joe", ContextNode::leaf(true))]),
                ),
                ConfigurationEntry::new("enable-all", ContextNode::leaf(true)),
            ]
            .into_iter()
            .collect(),
        );
        FeatureFlagManager::new(ConfigurationManager::new("feature-flags", store))
    }

    #[test]
    fn test_flags_resolve_per_context() {
        let flags = flags();
        assert!(flags.is_active("enable-one", &user("joe")));
        assert!(!flags.is_active("enable-one", &user("bob")));
        assert!(flags.is_active("enable-all", &ConfigurationContext::new()));
    }

    #[test]
    fn test_unknown_flag_uses_default() {
        let flags = flags();
        assert!(!flags.is_active("missing", &user("joe")));
        assert!(flags.is_active_or("missing", &user("joe"), true));
        assert_eq!(flags.names(), vec!["enable-all", "enable-one"]);
    }

    #[test]
    fn test_entry_as_json_absent_is_empty_root() {
        let flags = flags();
        assert_eq!(
            flags.entry_as_json("missing").unwrap(),
            "{\n  \"feature-flags\": {}\n}"
        );
        let one: Value = serde_json::from_str(&flags.entry_as_json("enable-all").unwrap()).unwrap();
        assert_eq!(one, json!({ "feature-flags": { "enable-all": { "value": true } } }));
    }

    #[test]
    fn test_json_config_defaults_to_empty_object() {
        let store = Arc::new(Store::new());
        store.publish(
            [ConfigurationEntry::new("limits", ContextNode::leaf(json!({ "max": 5 })))]
                .into_iter()
                .collect(),
        );
        let configs = JsonConfigManager::new(ConfigurationManager::new("configs", store));

        assert_eq!(configs.get_config("limits", &ConfigurationContext::new()), json!({ "max": 5 }));
        assert_eq!(configs.get_config("missing", &ConfigurationContext::new()), json!({}));
    }

    #[derive(Debug, Clone, Default, PartialEq, Deserialize)]
    struct Limits {
        max: u32,
    }

    #[derive(Debug, Clone, Default, PartialEq, Deserialize)]
    struct Other {
        name: String,
    }

    #[test]
    fn test_typed_config_downcasts_or_defaults() {
        let store = Arc::new(Store::new());
        let object = ConfigObject::decode::<Limits>(&json!({ "max": 7 })).unwrap();
        store.publish(
            [ConfigurationEntry::new("limits", ContextNode::leaf(object))]
                .into_iter()
                .collect(),
        );
        let configs = ConfigManager::new(ConfigurationManager::new("configs", store));
        let ctx = ConfigurationContext::new();

        assert_eq!(configs.get_config::<Limits>("limits", &ctx), Limits { max: 7 });
        assert_eq!(configs.try_get_config::<Other>("limits", &ctx), None);
        assert_eq!(configs.get_config::<Other>("limits", &ctx), Other::default());
        assert_eq!(configs.get_config::<Limits>("missing", &ctx), Limits::default());
    }

    #[test]
    fn test_manager_sees_new_snapshot() {
        let flags = flags();
        flags
            .store()
            .publish([ConfigurationEntry::new("enable-one", ContextNode::leaf(true))].into_iter().collect());
        assert!(flags.is_active("enable-one", &user("bob")));
        assert!(!flags.contains("enable-all"));
    }
}
