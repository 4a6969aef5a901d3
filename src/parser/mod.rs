//! Textual content → catalog.
//!
//! # Data Flow
//! ```text
//! JSON text
//!     → document[root] (MissingRoot if absent)
//!     → per entry: resolver(name) → decoder
//!     → node object { value, modifiers? } → ContextNode<T>
//!     → Catalog<T>
//! ```
//!
//! # Design Decisions
//! - Per-entry failures obey `MissingTypePolicy`: abort the whole parse or skip and count
//! - No coercion between shapes: an object where a scalar is expected is a failure
//! - A `comment` field on a node is ignored; any other unknown field is an error

pub mod registry;
pub mod writer;

pub use registry::{ConfigObject, Decoder, TypeRegistry, TypeResolver, Uniform};

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::catalog::{Catalog, ConfigurationEntry};
use crate::context::{ContextNode, Overrides};

const VALUE_FIELD: &str = "value";
const MODIFIERS_FIELD: &str = "modifiers";
const COMMENT_FIELD: &str = "comment";
const TYPE_FIELD: &str = "type";
const CONTEXTS_FIELD: &str = "contexts";

/// What to do with an entry that cannot be typed or decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingTypePolicy {
    /// Abort the parse and surface the error.
    Fail,
    /// Leave the entry out and count it.
    #[default]
    SkipAndCount,
}

/// Errors raised while parsing a document.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The text is not a JSON document.
    #[error("Malformed document: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The document has no field named after the configured root.
    #[error("Missing root field `{0}`")]
    MissingRoot(String),

    /// The root field is not a mapping of entry names.
    #[error("Root field `{0}` is not an object")]
    InvalidRoot(String),

    /// No type is registered for the entry.
    #[error("No type registered for `{0}`")]
    UnresolvedType(String),

    /// The entry's value does not decode into its type.
    #[error("Cannot deserialize `{name}`: {source}")]
    Deserialization {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    /// The entry's node structure is not `{ value, modifiers? }`.
    #[error("Invalid node in `{name}`: {reason}")]
    InvalidNode { name: String, reason: String },
}

/// Result type for parsing.
pub type ParseResult<T> = Result<T, ParseError>;

/// Output of a successful parse.
#[derive(Debug)]
pub struct ParseOutcome<T> {
    /// Entries that parsed.
    pub catalog: Catalog<T>,
    /// Entries left out under `MissingTypePolicy::SkipAndCount`.
    pub skipped: u64,
}

/// Parser for one configuration domain.
pub struct Parser<T> {
    root: String,
    resolver: Arc<dyn TypeResolver<T>>,
    policy: MissingTypePolicy,
}

impl<T> Clone for Parser<T> {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
            resolver: self.resolver.clone(),
            policy: self.policy,
        }
    }
}

impl<T> Parser<T> {
    pub fn new(
        root: impl Into<String>,
        resolver: impl TypeResolver<T> + 'static,
        policy: MissingTypePolicy,
    ) -> Self {
        Self::with_shared_resolver(root, Arc::new(resolver), policy)
    }

    /// Like [`Parser::new`], for a resolver already shared elsewhere.
    pub fn with_shared_resolver(
        root: impl Into<String>,
        resolver: Arc<dyn TypeResolver<T>>,
        policy: MissingTypePolicy,
    ) -> Self {
        Self {
            root: root.into(),
            resolver,
            policy,
        }
    }

    /// Root field this parser reads entries from.
    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn policy(&self) -> MissingTypePolicy {
        self.policy
    }

    /// Parse `text` into a catalog.
    pub fn parse(&self, text: &str) -> ParseResult<ParseOutcome<T>> {
        let document: Value = serde_json::from_str(text)?;
        let root = document
            .get(&self.root)
            .ok_or_else(|| ParseError::MissingRoot(self.root.clone()))?;
        let entries = root
            .as_object()
            .ok_or_else(|| ParseError::InvalidRoot(self.root.clone()))?;

        let mut parsed = Vec::with_capacity(entries.len());
        let mut skipped = 0;
        for (name, node) in entries {
            match self.parse_entry(name, node) {
                Ok(entry) => parsed.push(entry),
                Err(e) => match self.policy {
                    MissingTypePolicy::Fail => return Err(e),
                    MissingTypePolicy::SkipAndCount => {
                        tracing::warn!(root = %self.root, entry = %name, error = %e, "Skipping entry");
                        skipped += 1;
                    }
                },
            }
        }

        Ok(ParseOutcome {
            catalog: parsed.into_iter().collect(),
            skipped,
        })
    }

    fn parse_entry(&self, name: &str, node: &Value) -> ParseResult<ConfigurationEntry<T>> {
        let decoder = self
            .resolver
            .resolve(name)
            .ok_or_else(|| ParseError::UnresolvedType(name.to_string()))?;
        let root = decode_node(name, node, decoder)?;
        Ok(ConfigurationEntry::new(name, root))
    }
}

impl<T: Serialize> Parser<T> {
    /// Serialize `catalog` back into the document shape this parser reads.
    pub fn write(&self, catalog: &Catalog<T>) -> Result<String, serde_json::Error> {
        writer::write_catalog(&self.root, catalog)
    }
}

fn decode_node<T>(name: &str, json: &Value, decoder: Decoder<T>) -> ParseResult<ContextNode<T>> {
    let object = as_object(name, json, "node")?;
    reject_unknown(name, object, &[VALUE_FIELD, MODIFIERS_FIELD, COMMENT_FIELD])?;

    let raw = object
        .get(VALUE_FIELD)
        .ok_or_else(|| invalid(name, "missing field `value`"))?;
    let value = decoder(raw).map_err(|source| ParseError::Deserialization {
        name: name.to_string(),
        source,
    })?;

    let overrides = match object.get(MODIFIERS_FIELD) {
        None | Some(Value::Null) => None,
        Some(modifiers) => Some(decode_overrides(name, modifiers, decoder)?),
    };

    Ok(ContextNode { value, overrides })
}

fn decode_overrides<T>(name: &str, json: &Value, decoder: Decoder<T>) -> ParseResult<Overrides<T>> {
    let object = as_object(name, json, "modifiers")?;
    reject_unknown(name, object, &[TYPE_FIELD, CONTEXTS_FIELD])?;

    let dimension = object
        .get(TYPE_FIELD)
        .and_then(Value::as_str)
        .ok_or_else(|| invalid(name, "modifiers need a string `type`"))?;
    let contexts = object
        .get(CONTEXTS_FIELD)
        .ok_or_else(|| invalid(name, "modifiers need `contexts`"))?;
    let contexts = as_object(name, contexts, "contexts")?;

    let mut branches = BTreeMap::new();
    for (dimension_value, child) in contexts {
        branches.insert(dimension_value.clone(), decode_node(name, child, decoder)?);
    }

    Ok(Overrides {
        dimension: dimension.to_string(),
        branches,
    })
}

fn as_object<'a>(name: &str, json: &'a Value, what: &str) -> ParseResult<&'a Map<String, Value>> {
    json.as_object()
        .ok_or_else(|| invalid(name, format!("{} is not an object", what)))
}

fn reject_unknown(name: &str, object: &Map<String, Value>, known: &[&str]) -> ParseResult<()> {
    match object.keys().find(|key| !known.contains(&key.as_str())) {
        Some(key) => Err(invalid(name, format!("unknown field `{}`", key))),
        None => Ok(()),
    }
}

fn invalid(name: &str, reason: impl Into<String>) -> ParseError {
    ParseError::InvalidNode {
        name: name.to_string(),
        reason: reason.into(),
    }
}
