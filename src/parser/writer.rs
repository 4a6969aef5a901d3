//! Catalog → textual content.
//!
//! Produces the same `{ "<root>": { name: node, ... } }` shape the parser
//! reads, pretty-printed. The root field is always present, even when the
//! catalog is empty.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::catalog::{Catalog, ConfigurationEntry};

struct Document<'a, T> {
    root: &'a str,
    entries: Entries<'a, T>,
}

enum Entries<'a, T> {
    All(&'a Catalog<T>),
    One(Option<&'a ConfigurationEntry<T>>),
}

impl<T: Serialize> Serialize for Document<'_, T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.root, &self.entries)?;
        map.end()
    }
}

impl<T: Serialize> Serialize for Entries<'_, T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Entries::All(catalog) => {
                let mut map = serializer.serialize_map(Some(catalog.len()))?;
                for entry in catalog.entries() {
                    map.serialize_entry(entry.name(), entry.root())?;
                }
                map.end()
            }
            Entries::One(entry) => {
                let mut map = serializer.serialize_map(Some(usize::from(entry.is_some())))?;
                if let Some(entry) = entry {
                    map.serialize_entry(entry.name(), entry.root())?;
                }
                map.end()
            }
        }
    }
}

/// Write every entry of `catalog` under `root`.
pub fn write_catalog<T: Serialize>(root: &str, catalog: &Catalog<T>) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&Document {
        root,
        entries: Entries::All(catalog),
    })
}

/// Write a single entry under `root`, or an empty root when it is absent.
pub fn write_entry<T: Serialize>(
    root: &str,
    entry: Option<&ConfigurationEntry<T>>,
) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&Document {
        root,
        entries: Entries::One(entry),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextNode;

    #[derive(Debug, Clone, PartialEq, Serialize)]
    struct NumberConfig {
        number: i64,
    }

    #[test]
    fn test_write_single_value() {
        let catalog: Catalog<NumberConfig> =
            [ConfigurationEntry::new("number-config", ContextNode::leaf(NumberConfig { number: 1 }))]
                .into_iter()
                .collect();

        let expected = "{\n  \"configs\": {\n    \"number-config\": {\n      \"value\": {\n        \"number\": 1\n      }\n    }\n  }\n}";
        assert_eq!(write_catalog("configs", &catalog).unwrap(), expected);
    }

    #[test]
    fn test_write_empty_keeps_root() {
        let catalog: Catalog<NumberConfig> = Catalog::empty();
        assert_eq!(write_catalog("configs", &catalog).unwrap(), "{\n  \"configs\": {}\n}");
        assert_eq!(
            write_entry::<NumberConfig>("configs", None).unwrap(),
            "{\n  \"configs\": {}\n}"
        );
    }

    #[test]
    fn test_write_modifiers_shape() {
        let entry = ConfigurationEntry::new(
            "enable-one",
            ContextNode::with_overrides(false, "environment", [("qa", ContextNode::leaf(true))]),
        );
        let written = write_entry("feature-flags", Some(&entry)).unwrap();
        let json: serde_json::Value = serde_json::from_str(&written).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "feature-flags": {
                    "enable-one": {
                        "value": false,
                        "modifiers": {
                            "type": "environment",
                            "contexts": { "qa": { "value": true } }
                        }
                    }
                }
            })
        );
    }
}
