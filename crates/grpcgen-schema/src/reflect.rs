//! Reflection normalizer: flattens a parsed reflection root into uniform
//! entity lists.
//!
//! The input is the JSON form of a protobuf-js reflection tree (the
//! `root.toJSON({ keepComments: true })` shape). Nodes are classified by
//! the structural capabilities they carry — `nested`, `fields`, `methods`,
//! `values` — and a node may expose more than one (a message with nested
//! types is both a namespace and a message).
//!
//! Comment post-processing happens here: an `@required` directive on a
//! field comment strips the token and marks the field required; an
//! `@author <name>` directive on a service or method comment strips the
//! token and fills the `author` field.

use crate::model::{EnumType, Field, FlatSchema, Message, Method, Service};
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Malformed or incomplete reflection input. Fatal to the generation root
/// that produced it; other roots in the same invocation are unaffected.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("reflection root has no nested declarations")]
    EmptyRoot,
    #[error("malformed reflection node `{full_name}`: {reason}")]
    MalformedNode { full_name: String, reason: String },
    #[error("conflicting definitions for `{0}` (same name, different declaration)")]
    ConflictingDefinition(String),
}

static REQUIRED_DIRECTIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n?\s*@required").expect("valid regex"));
static AUTHOR_DIRECTIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n?\s*@author\s+([^\n]+)").expect("valid regex"));

/// Walk a reflection root and collect deduplicated (by full name) lists of
/// messages, enums, services and methods.
///
/// Duplicates arise when a schema is merged from multiple sources that
/// redeclare shared types. Identical redeclarations collapse to the first
/// occurrence; a divergent redeclaration of the same full name is a hard
/// [`SchemaError::ConflictingDefinition`].
pub fn inspect_root(root: &Value) -> Result<FlatSchema, SchemaError> {
    inspect_merged(std::slice::from_ref(root))
}

/// Like [`inspect_root`], but over several reflection roots merged into one
/// generation run (shared library schemas redeclared by multiple sources).
/// Entities are deduplicated by full name across all roots; the first
/// occurrence wins.
pub fn inspect_merged(roots: &[Value]) -> Result<FlatSchema, SchemaError> {
    let mut collector = Collector::default();
    for root in roots {
        let Some(nested) = root.get("nested").and_then(Value::as_object) else {
            return Err(SchemaError::EmptyRoot);
        };
        for (name, node) in nested {
            collector.walk(name, "", node)?;
        }
    }
    Ok(collector.schema)
}

#[derive(Default)]
struct Collector {
    schema: FlatSchema,
    // Full name -> index into the matching schema list.
    seen_messages: HashMap<String, usize>,
    seen_enums: HashMap<String, usize>,
    seen_services: HashMap<String, usize>,
    seen_methods: HashMap<String, usize>,
}

impl Collector {
    fn walk(&mut self, name: &str, prefix: &str, node: &Value) -> Result<(), SchemaError> {
        let full_name = join_name(prefix, name);

        if let Some(children) = node.get("nested").and_then(Value::as_object) {
            for (child_name, child) in children {
                self.walk(child_name, &full_name, child)?;
            }
        }
        if node.get("fields").is_some() {
            self.collect_message(name, &full_name, node)?;
        }
        if node.get("methods").is_some() {
            self.collect_service(name, &full_name, node)?;
        }
        if node.get("values").is_some() {
            self.collect_enum(name, &full_name, node)?;
        }
        Ok(())
    }

    fn collect_message(
        &mut self,
        name: &str,
        full_name: &str,
        node: &Value,
    ) -> Result<(), SchemaError> {
        let field_map = node
            .get("fields")
            .and_then(Value::as_object)
            .ok_or_else(|| malformed(full_name, "fields is not an object"))?;

        let mut fields = Vec::with_capacity(field_map.len());
        for (field_name, field_node) in field_map {
            fields.push(parse_field(field_name, full_name, field_node)?);
        }

        let message = Message {
            name: name.to_string(),
            full_name: full_name.to_string(),
            fields,
            comment: comment_of(node),
        };
        match self.seen_messages.get(full_name) {
            Some(&at) => {
                if self.schema.messages[at] != message {
                    return Err(SchemaError::ConflictingDefinition(full_name.to_string()));
                }
            }
            None => {
                self.seen_messages
                    .insert(full_name.to_string(), self.schema.messages.len());
                self.schema.messages.push(message);
            }
        }
        Ok(())
    }

    fn collect_enum(
        &mut self,
        name: &str,
        full_name: &str,
        node: &Value,
    ) -> Result<(), SchemaError> {
        let value_map = node
            .get("values")
            .and_then(Value::as_object)
            .ok_or_else(|| malformed(full_name, "values is not an object"))?;

        let mut values = std::collections::BTreeMap::new();
        for (symbol, value) in value_map {
            let value = value
                .as_i64()
                .ok_or_else(|| malformed(full_name, "enum value is not an integer"))?;
            values.insert(symbol.clone(), value);
        }

        let enum_type = EnumType {
            name: name.to_string(),
            full_name: full_name.to_string(),
            values,
            comment: comment_of(node),
        };
        match self.seen_enums.get(full_name) {
            Some(&at) => {
                if self.schema.enums[at] != enum_type {
                    return Err(SchemaError::ConflictingDefinition(full_name.to_string()));
                }
            }
            None => {
                self.seen_enums
                    .insert(full_name.to_string(), self.schema.enums.len());
                self.schema.enums.push(enum_type);
            }
        }
        Ok(())
    }

    fn collect_service(
        &mut self,
        name: &str,
        full_name: &str,
        node: &Value,
    ) -> Result<(), SchemaError> {
        let method_map = node
            .get("methods")
            .and_then(Value::as_object)
            .ok_or_else(|| malformed(full_name, "methods is not an object"))?;

        let (comment, author) = strip_author(comment_of(node));

        for (method_name, method_node) in method_map {
            let method = parse_method(method_name, full_name, method_node)?;
            match self.seen_methods.get(&method.full_name) {
                Some(&at) => {
                    if self.schema.methods[at] != method {
                        return Err(SchemaError::ConflictingDefinition(method.full_name));
                    }
                }
                None => {
                    self.seen_methods
                        .insert(method.full_name.clone(), self.schema.methods.len());
                    self.schema.methods.push(method);
                }
            }
        }

        let service = Service {
            name: name.to_string(),
            full_name: full_name.to_string(),
            comment,
            author,
        };
        match self.seen_services.get(full_name) {
            Some(&at) => {
                if self.schema.services[at] != service {
                    return Err(SchemaError::ConflictingDefinition(full_name.to_string()));
                }
            }
            None => {
                self.seen_services
                    .insert(full_name.to_string(), self.schema.services.len());
                self.schema.services.push(service);
            }
        }
        Ok(())
    }
}

fn parse_field(name: &str, message_full_name: &str, node: &Value) -> Result<Field, SchemaError> {
    let proto_type = node
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| malformed(message_full_name, &format!("field `{name}` has no type")))?
        .to_string();
    let id = node
        .get("id")
        .and_then(Value::as_u64)
        .ok_or_else(|| malformed(message_full_name, &format!("field `{name}` has no id")))?
        as u32;

    let rule = node.get("rule").and_then(Value::as_str);
    let (comment, directive_required) = strip_required(comment_of(node));

    Ok(Field {
        name: name.to_string(),
        is_bytes: proto_type == "bytes",
        proto_type,
        id,
        repeated: rule == Some("repeated"),
        required: rule == Some("required") || directive_required,
        default_value: node.pointer("/options/default").cloned(),
        comment,
    })
}

fn parse_method(name: &str, service_full_name: &str, node: &Value) -> Result<Method, SchemaError> {
    let request_type = node
        .get("requestType")
        .and_then(Value::as_str)
        .ok_or_else(|| malformed(service_full_name, &format!("method `{name}` has no requestType")))?
        .to_string();
    let response_type = node
        .get("responseType")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            malformed(service_full_name, &format!("method `{name}` has no responseType"))
        })?
        .to_string();

    let (comment, author) = strip_author(comment_of(node));

    Ok(Method {
        name: name.to_string(),
        full_name: join_name(service_full_name, name),
        request_type,
        response_type,
        request_stream: node.get("requestStream").and_then(Value::as_bool) == Some(true),
        response_stream: node.get("responseStream").and_then(Value::as_bool) == Some(true),
        comment,
        author,
    })
}

fn comment_of(node: &Value) -> Option<String> {
    node.get("comment")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|comment| !comment.is_empty())
        .map(String::from)
}

/// Strip the first `@required` directive, reporting whether it was present.
fn strip_required(comment: Option<String>) -> (Option<String>, bool) {
    match comment {
        Some(text) if REQUIRED_DIRECTIVE.is_match(&text) => {
            let stripped = REQUIRED_DIRECTIVE.replace(&text, "").trim().to_string();
            (Some(stripped).filter(|c| !c.is_empty()), true)
        }
        other => (other, false),
    }
}

/// Extract and strip an `@author <name>` directive.
fn strip_author(comment: Option<String>) -> (Option<String>, Option<String>) {
    let Some(text) = comment else {
        return (None, None);
    };
    let Some(captures) = AUTHOR_DIRECTIVE.captures(&text) else {
        return (Some(text), None);
    };
    let author = captures[1].trim().to_string();
    let stripped = AUTHOR_DIRECTIVE.replace(&text, "").trim().to_string();
    (
        Some(stripped).filter(|c| !c.is_empty()),
        Some(author).filter(|a| !a.is_empty()),
    )
}

fn join_name(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

fn malformed(full_name: &str, reason: &str) -> SchemaError {
    SchemaError::MalformedNode {
        full_name: full_name.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_root() -> Value {
        json!({
            "nested": {
                "pkg": {
                    "nested": {
                        "User": {
                            "comment": "A user record",
                            "fields": {
                                "name": { "type": "string", "id": 1, "comment": "@required" },
                                "ids": { "rule": "repeated", "type": "int64", "id": 2 }
                            }
                        },
                        "Status": {
                            "values": { "ACTIVE": 0, "DISABLED": 1 }
                        },
                        "UserService": {
                            "comment": "User lookup\n@author ops-team",
                            "methods": {
                                "GetUser": {
                                    "requestType": "User",
                                    "responseType": "User",
                                    "comment": "Fetch one user\n@author alice"
                                }
                            }
                        }
                    }
                }
            }
        })
    }

    #[test]
    fn flattens_all_entity_kinds_with_full_names() {
        let schema = inspect_root(&sample_root()).unwrap();

        assert_eq!(schema.messages.len(), 1);
        assert_eq!(schema.messages[0].full_name, "pkg.User");
        assert_eq!(schema.enums.len(), 1);
        assert_eq!(schema.enums[0].full_name, "pkg.Status");
        assert_eq!(schema.services.len(), 1);
        assert_eq!(schema.services[0].full_name, "pkg.UserService");
        assert_eq!(schema.methods.len(), 1);
        assert_eq!(schema.methods[0].full_name, "pkg.UserService.GetUser");
    }

    #[test]
    fn required_directive_is_stripped_and_applied() {
        let schema = inspect_root(&sample_root()).unwrap();
        let user = &schema.messages[0];

        assert!(user.fields[0].required);
        assert_eq!(user.fields[0].comment, None);
        assert!(!user.fields[1].required);
        assert!(user.fields[1].repeated);
    }

    #[test]
    fn author_directive_is_extracted_from_services_and_methods() {
        let schema = inspect_root(&sample_root()).unwrap();

        assert_eq!(schema.services[0].author.as_deref(), Some("ops-team"));
        assert_eq!(schema.services[0].comment.as_deref(), Some("User lookup"));
        assert_eq!(schema.methods[0].author.as_deref(), Some("alice"));
        assert_eq!(schema.methods[0].comment.as_deref(), Some("Fetch one user"));
    }

    #[test]
    fn field_declaration_order_is_preserved() {
        let root = json!({
            "nested": {
                "M": {
                    "fields": {
                        "zebra": { "type": "string", "id": 1 },
                        "alpha": { "type": "string", "id": 2 },
                        "mid": { "type": "string", "id": 3 }
                    }
                }
            }
        });
        let schema = inspect_root(&root).unwrap();
        let names: Vec<&str> = schema.messages[0]
            .fields
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(names, ["zebra", "alpha", "mid"]);
    }

    #[test]
    fn message_with_nested_types_is_both_namespace_and_message() {
        let root = json!({
            "nested": {
                "pkg": {
                    "nested": {
                        "Outer": {
                            "fields": { "inner": { "type": "Inner", "id": 1 } },
                            "nested": {
                                "Inner": { "fields": { "x": { "type": "int32", "id": 1 } } }
                            }
                        }
                    }
                }
            }
        });
        let schema = inspect_root(&root).unwrap();
        let names: Vec<&str> = schema
            .messages
            .iter()
            .map(|m| m.full_name.as_str())
            .collect();
        assert!(names.contains(&"pkg.Outer"));
        assert!(names.contains(&"pkg.Outer.Inner"));
    }

    #[test]
    fn merged_roots_deduplicate_shared_declarations() {
        // Two schema roots both declare common.Status; one generation run
        // must not emit it twice.
        let status = json!({
            "nested": {
                "common": {
                    "nested": {
                        "Status": { "values": { "OK": 0, "FAILED": 1 } }
                    }
                }
            }
        });
        let schema = inspect_merged(&[status.clone(), status]).unwrap();

        assert_eq!(schema.enums.len(), 1);
        assert_eq!(schema.enums[0].full_name, "common.Status");
    }

    #[test]
    fn merged_roots_with_divergent_declarations_are_rejected() {
        let declare_user = |field: &str| {
            json!({
                "nested": {
                    "pkg": {
                        "nested": {
                            "User": {
                                "fields": { field: { "type": "string", "id": 1 } }
                            }
                        }
                    }
                }
            })
        };
        let err = inspect_merged(&[declare_user("name"), declare_user("email")]).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::ConflictingDefinition(name) if name == "pkg.User"
        ));
    }

    #[test]
    fn root_without_nested_is_rejected() {
        assert!(matches!(
            inspect_root(&json!({})),
            Err(SchemaError::EmptyRoot)
        ));
    }

    #[test]
    fn method_without_request_type_is_malformed() {
        let root = json!({
            "nested": {
                "Svc": { "methods": { "Broken": { "responseType": "X" } } }
            }
        });
        assert!(matches!(
            inspect_root(&root),
            Err(SchemaError::MalformedNode { .. })
        ));
    }
}
