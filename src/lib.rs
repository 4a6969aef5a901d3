//! Hierarchical, context-dependent configuration and feature flags.
//!
//! Values are declared once with a default and a tree of overrides keyed
//! on context dimensions (`environment`, `user`, `cluster`, ...). Readers
//! fetch the declarations periodically, publish immutable catalogs into
//! lock-free stores, and managers resolve names against a caller's
//! [`ConfigurationContext`].

// Model
pub mod catalog;
pub mod context;
pub mod store;

// Content
pub mod fetch;
pub mod parser;

// Refresh
pub mod loader;
pub mod reader;

// Caller surface
pub mod manager;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;

pub use catalog::{Catalog, ConfigurationEntry};
pub use context::{ConfigurationContext, ContextNode};
pub use fetch::{FetchError, Fetcher, FilesystemFetcher};
pub use lifecycle::Startup;
pub use loader::{Loader, LoaderError, LoaderSettings};
pub use manager::{ConfigManager, ConfigurationManager, FeatureFlagManager, JsonConfigManager};
pub use parser::{ConfigObject, MissingTypePolicy, Parser, TypeRegistry};
pub use reader::{Reader, Refresh};
pub use store::Store;
