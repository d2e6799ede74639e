//! Schema entities produced by reflection normalization.
//!
//! All entities are immutable once produced and carry a root-relative,
//! dot-qualified `full_name` (never a leading separator). They are built
//! once per generation run and consumed read-only by the resolver and the
//! synthesizers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One message field. `required` defaults to false (optional) and is set
/// either by a proto2 `required` rule or an `@required` comment directive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    /// Scalar keyword or short/qualified type name, as written in the schema.
    pub proto_type: String,
    pub id: u32,
    #[serde(default)]
    pub repeated: bool,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default_value: Option<serde_json::Value>,
    #[serde(default)]
    pub is_bytes: bool,
    #[serde(default)]
    pub comment: Option<String>,
}

/// A message type. Field order is declaration order and must be preserved
/// in emitted output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub name: String,
    pub full_name: String,
    pub fields: Vec<Field>,
    #[serde(default)]
    pub comment: Option<String>,
}

/// An enumeration. Value insertion order is irrelevant; emission sorts by
/// symbol, which the `BTreeMap` provides structurally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumType {
    pub name: String,
    pub full_name: String,
    pub values: BTreeMap<String, i64>,
    #[serde(default)]
    pub comment: Option<String>,
}

/// One RPC method. `request_type`/`response_type` are short or qualified
/// proto type names resolved lazily at synthesis time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Method {
    pub name: String,
    pub full_name: String,
    pub request_type: String,
    pub response_type: String,
    #[serde(default)]
    pub request_stream: bool,
    #[serde(default)]
    pub response_stream: bool,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
}

/// A service declaration. Methods are not nested here; the client
/// synthesizer matches them by package-prefix equality against
/// `full_name` (see `grpcgen-emit`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
    pub full_name: String,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
}

/// Flat, deduplicated entity lists for one generation run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatSchema {
    pub messages: Vec<Message>,
    pub enums: Vec<EnumType>,
    pub services: Vec<Service>,
    pub methods: Vec<Method>,
}

/// Index of user-defined types by full name, consulted by the resolver.
#[derive(Debug, Default)]
pub struct TypeIndex {
    messages: BTreeMap<String, Message>,
    enums: BTreeMap<String, EnumType>,
}

impl TypeIndex {
    pub fn build(schema: &FlatSchema) -> Self {
        let mut index = TypeIndex::default();
        for message in &schema.messages {
            index
                .messages
                .insert(message.full_name.clone(), message.clone());
        }
        for enum_type in &schema.enums {
            index
                .enums
                .insert(enum_type.full_name.clone(), enum_type.clone());
        }
        index
    }

    pub fn contains(&self, full_name: &str) -> bool {
        self.messages.contains_key(full_name) || self.enums.contains_key(full_name)
    }

    pub fn message(&self, full_name: &str) -> Option<&Message> {
        self.messages.get(full_name)
    }

    pub fn enum_type(&self, full_name: &str) -> Option<&EnumType> {
        self.enums.get(full_name)
    }

    /// Flat lookup by short name across the whole schema, used as the
    /// resolver's last resort. Returns the lexicographically first match
    /// so the fallback stays deterministic.
    pub fn lookup_short(&self, short_name: &str) -> Option<&str> {
        let matches = |full: &str| {
            full == short_name
                || full
                    .rsplit_once('.')
                    .is_some_and(|(_, last)| last == short_name)
        };
        self.messages
            .keys()
            .chain(self.enums.keys())
            .filter(|full| matches(full))
            .min()
            .map(String::as_str)
    }
}

/// Package path of a full name: everything before the final segment.
/// `"pkg.sub.Type"` → `"pkg.sub"`, `"Type"` → `""`.
pub fn package_of(full_name: &str) -> &str {
    match full_name.rsplit_once('.') {
        Some((package, _)) => package,
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(full_name: &str) -> Message {
        Message {
            name: full_name.rsplit('.').next().unwrap().to_string(),
            full_name: full_name.to_string(),
            fields: Vec::new(),
            comment: None,
        }
    }

    #[test]
    fn package_of_strips_last_segment() {
        assert_eq!(package_of("pkg.sub.Type"), "pkg.sub");
        assert_eq!(package_of("pkg.Type"), "pkg");
        assert_eq!(package_of("Type"), "");
    }

    #[test]
    fn lookup_short_matches_last_segment() {
        let schema = FlatSchema {
            messages: vec![message("a.b.User"), message("x.User"), message("RootOnly")],
            ..Default::default()
        };
        let index = TypeIndex::build(&schema);

        // Deterministic: lexicographically first full name wins.
        assert_eq!(index.lookup_short("User"), Some("a.b.User"));
        assert_eq!(index.lookup_short("RootOnly"), Some("RootOnly"));
        assert_eq!(index.lookup_short("Missing"), None);
    }

    #[test]
    fn lookup_short_ignores_partial_segment_matches() {
        let schema = FlatSchema {
            messages: vec![message("a.SuperUser")],
            ..Default::default()
        };
        let index = TypeIndex::build(&schema);
        assert_eq!(index.lookup_short("User"), None);
    }
}
