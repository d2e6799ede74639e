//! Namespace tree builder: regroups flat entity lists into a nested
//! package tree.
//!
//! Each entity's package path is re-derived from its full name, so the
//! tree shape is independent of how declarations were nested in the
//! source. `BTreeMap` children give the synthesizer its lexicographic
//! emission order structurally.

use crate::model::{EnumType, Message, package_of};
use crate::reflect::SchemaError;
use std::collections::BTreeMap;

/// Recursive namespace container. One node holds both messages and enums
/// because one emitted scope block holds both.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Namespace {
    pub messages: BTreeMap<String, Message>,
    pub enums: BTreeMap<String, EnumType>,
    pub nested: BTreeMap<String, Namespace>,
}

impl Namespace {
    /// Build the tree for one generation run.
    ///
    /// Identical redeclarations (schema merged from multiple roots)
    /// collapse; colliding non-identical definitions at the same path are
    /// a hard error rather than a silent overwrite. A message and an enum
    /// may not share a name either: both land in the same emitted scope
    /// block.
    pub fn build(messages: &[Message], enums: &[EnumType]) -> Result<Self, SchemaError> {
        let mut root = Namespace::default();
        for message in messages {
            let node = root.descend(package_of(&message.full_name));
            if node.enums.contains_key(&message.name) {
                return Err(SchemaError::ConflictingDefinition(message.full_name.clone()));
            }
            if let Some(existing) = node.messages.get(&message.name) {
                if existing != message {
                    return Err(SchemaError::ConflictingDefinition(message.full_name.clone()));
                }
                continue;
            }
            node.messages.insert(message.name.clone(), message.clone());
        }
        for enum_type in enums {
            let node = root.descend(package_of(&enum_type.full_name));
            if node.messages.contains_key(&enum_type.name) {
                return Err(SchemaError::ConflictingDefinition(
                    enum_type.full_name.clone(),
                ));
            }
            if let Some(existing) = node.enums.get(&enum_type.name) {
                if existing != enum_type {
                    return Err(SchemaError::ConflictingDefinition(
                        enum_type.full_name.clone(),
                    ));
                }
                continue;
            }
            node.enums.insert(enum_type.name.clone(), enum_type.clone());
        }
        Ok(root)
    }

    /// Descend to the node at `package`, creating intermediate nodes on
    /// demand. An empty package is the root itself.
    fn descend(&mut self, package: &str) -> &mut Namespace {
        debug_assert!(
            package.is_empty() || package.split('.').all(|segment| !segment.is_empty()),
            "malformed package path `{package}`"
        );
        let mut node = self;
        if package.is_empty() {
            return node;
        }
        for segment in package.split('.') {
            node = node.nested.entry(segment.to_string()).or_default();
        }
        node
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty() && self.enums.is_empty() && self.nested.is_empty()
    }
}
