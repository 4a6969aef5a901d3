//! Entry name → value decoder lookup.
//!
//! # Responsibilities
//! - Decide, per entry name, which concrete type its values decode into
//! - Provide the decoder as a plain function over `serde_json::Value`
//!
//! # Design Decisions
//! - Explicit registries instead of runtime type introspection
//! - `Uniform` covers domains where every entry shares one type (flags, raw JSON)
//! - `ConfigObject` type-erases heterogeneous typed configs but keeps the
//!   source JSON so catalogs can still be written back out

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// Turns the JSON under a node's `value` field into a `T`.
pub type Decoder<T> = fn(&Value) -> Result<T, serde_json::Error>;

/// Finds the decoder for an entry name.
pub trait TypeResolver<T>: Send + Sync {
    /// `None` when no type is known for `name`.
    fn resolve(&self, name: &str) -> Option<Decoder<T>>;
}

impl<T, F> TypeResolver<T> for F
where
    F: Fn(&str) -> Option<Decoder<T>> + Send + Sync,
{
    fn resolve(&self, name: &str) -> Option<Decoder<T>> {
        self(name)
    }
}

/// Strict serde decode of `value` into `T`.
pub fn decode_as<T: DeserializeOwned>(value: &Value) -> Result<T, serde_json::Error> {
    <T as Deserialize>::deserialize(value)
}

/// Resolves every name to the same type.
pub struct Uniform<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> Uniform<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for Uniform<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: DeserializeOwned> TypeResolver<T> for Uniform<T> {
    fn resolve(&self, _name: &str) -> Option<Decoder<T>> {
        Some(decode_as::<T>)
    }
}

/// Explicit name → decoder map.
pub struct TypeRegistry<T> {
    decoders: HashMap<String, Decoder<T>>,
}

impl<T> TypeRegistry<T> {
    pub fn new() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// Register `decoder` for entries called `name`.
    pub fn with_decoder(mut self, name: impl Into<String>, decoder: Decoder<T>) -> Self {
        self.decoders.insert(name.into(), decoder);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.decoders.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }
}

impl TypeRegistry<ConfigObject> {
    /// Register `C` as the type of entries called `name`.
    pub fn register<C>(self, name: impl Into<String>) -> Self
    where
        C: DeserializeOwned + Send + Sync + 'static,
    {
        self.with_decoder(name, decode_object::<C>)
    }
}

impl<T> Default for TypeRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TypeResolver<T> for TypeRegistry<T> {
    fn resolve(&self, name: &str) -> Option<Decoder<T>> {
        self.decoders.get(name).copied()
    }
}

/// A decoded configuration object of some registered type.
#[derive(Clone)]
pub struct ConfigObject {
    type_name: &'static str,
    value: Arc<dyn Any + Send + Sync>,
    raw: Value,
}

impl ConfigObject {
    /// Decode `raw` as `C`.
    pub fn decode<C>(raw: &Value) -> Result<Self, serde_json::Error>
    where
        C: DeserializeOwned + Send + Sync + 'static,
    {
        let value = <C as Deserialize>::deserialize(raw)?;
        Ok(Self {
            type_name: std::any::type_name::<C>(),
            value: Arc::new(value),
            raw: raw.clone(),
        })
    }

    pub fn downcast_ref<C: 'static>(&self) -> Option<&C> {
        self.value.downcast_ref::<C>()
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The JSON this object was decoded from.
    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

fn decode_object<C>(raw: &Value) -> Result<ConfigObject, serde_json::Error>
where
    C: DeserializeOwned + Send + Sync + 'static,
{
    ConfigObject::decode::<C>(raw)
}

impl fmt::Debug for ConfigObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigObject")
            .field("type_name", &self.type_name)
            .field("raw", &self.raw)
            .finish()
    }
}

impl PartialEq for ConfigObject {
    fn eq(&self, other: &Self) -> bool {
        self.type_name == other.type_name && self.raw == other.raw
    }
}

impl Serialize for ConfigObject {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}
