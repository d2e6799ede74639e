//! Type-binding synthesizer: renders a namespace tree into TypeScript
//! declarations.
//!
//! Pure function of the tree and the resolver — no I/O. Messages, enums
//! and nested namespaces come out lexicographically sorted (reproducible
//! diffs); fields keep their declaration order, never re-sorted.

use crate::render::{header, indent};
use grpcgen_schema::{
    EnumType, LoaderOptions, Message, Namespace, TypeIndex, UnresolvedTypeError, field_ts_type,
};

/// Render the whole type-binding module (`types.ts`).
pub fn generate_type_bindings(
    namespace: &Namespace,
    index: &TypeIndex,
    options: LoaderOptions,
) -> Result<String, UnresolvedTypeError> {
    let mut out = header();
    out.push('\n');
    render_namespace(&mut out, namespace, 0, index, options)?;
    Ok(out)
}

fn render_namespace(
    out: &mut String,
    namespace: &Namespace,
    depth: usize,
    index: &TypeIndex,
    options: LoaderOptions,
) -> Result<(), UnresolvedTypeError> {
    for message in namespace.messages.values() {
        render_message(out, message, depth, index, options)?;
        out.push('\n');
    }
    for enum_type in namespace.enums.values() {
        render_enum(out, enum_type, depth);
        out.push('\n');
    }
    for (name, child) in &namespace.nested {
        let pad = indent(depth);
        out.push_str(&format!("{pad}export namespace {name} {{\n"));
        render_namespace(out, child, depth + 1, index, options)?;
        out.push_str(&format!("{pad}}}\n\n"));
    }
    Ok(())
}

fn render_message(
    out: &mut String,
    message: &Message,
    depth: usize,
    index: &TypeIndex,
    options: LoaderOptions,
) -> Result<(), UnresolvedTypeError> {
    let pad = indent(depth);
    out.push_str(&format!("{pad}export interface {} {{\n", message.name));
    for field in &message.fields {
        // Field types resolve in the scope of the enclosing message so
        // nested declarations shadow outer ones.
        let ts_type = field_ts_type(field, &message.full_name, index, options)?;
        let optional = if field.required { "" } else { "?" };
        out.push_str(&format!("{pad}  '{}'{optional}: {ts_type};\n", field.name));
    }
    out.push_str(&format!("{pad}}}\n"));
    Ok(())
}

fn render_enum(out: &mut String, enum_type: &EnumType, depth: usize) {
    let pad = indent(depth);
    out.push_str(&format!("{pad}export enum {} {{\n", enum_type.name));
    // Values sorted by symbol; integer values verbatim, never renumbered.
    for (symbol, value) in &enum_type.values {
        out.push_str(&format!("{pad}  {symbol} = {value},\n"));
    }
    out.push_str(&format!("{pad}}}\n"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use grpcgen_schema::{Field, FlatSchema, inspect_root};
    use serde_json::json;

    fn generate(root: serde_json::Value, options: LoaderOptions) -> String {
        let schema = inspect_root(&root).unwrap();
        let tree = Namespace::build(&schema.messages, &schema.enums).unwrap();
        let index = TypeIndex::build(&schema);
        generate_type_bindings(&tree, &index, options).unwrap()
    }

    #[test]
    fn required_and_repeated_fields_render_correctly() {
        // pkg.A { required string name; repeated int64 ids; }
        let root = json!({
            "nested": {
                "pkg": {
                    "nested": {
                        "A": {
                            "fields": {
                                "name": { "type": "string", "id": 1, "comment": "@required" },
                                "ids": { "rule": "repeated", "type": "int64", "id": 2 }
                            }
                        }
                    }
                }
            }
        });

        let ts = generate(root.clone(), LoaderOptions::default());
        assert!(ts.contains("export namespace pkg {"));
        assert!(ts.contains("'name': string;"));
        assert!(ts.contains("'ids'?: number[];"));

        let ts = generate(
            root,
            LoaderOptions {
                longs_as_strings: true,
            },
        );
        assert!(ts.contains("'ids'?: string[];"));
    }

    #[test]
    fn fields_keep_declaration_order_while_types_sort() {
        let root = json!({
            "nested": {
                "Zebra": {
                    "fields": {
                        "second": { "type": "string", "id": 2 },
                        "first": { "type": "string", "id": 1 }
                    }
                },
                "Alpha": { "fields": {} },
                "zoo": { "nested": { "Inner": { "fields": {} } } },
                "aaa": { "nested": { "Inner": { "fields": {} } } }
            }
        });
        let ts = generate(root, LoaderOptions::default());

        // Interfaces sorted: Alpha before Zebra; namespaces aaa before zoo.
        let alpha = ts.find("interface Alpha").unwrap();
        let zebra = ts.find("interface Zebra").unwrap();
        assert!(alpha < zebra);
        let aaa = ts.find("namespace aaa").unwrap();
        let zoo = ts.find("namespace zoo").unwrap();
        assert!(aaa < zoo);

        // Fields unsorted: declaration order survives.
        let second = ts.find("'second'").unwrap();
        let first = ts.find("'first'").unwrap();
        assert!(second < first);
    }

    #[test]
    fn enum_values_are_sorted_and_verbatim() {
        let root = json!({
            "nested": {
                "Status": { "values": { "ZULU": 7, "ALPHA": 3 } }
            }
        });
        let ts = generate(root, LoaderOptions::default());
        assert!(ts.contains("export enum Status {"));
        let alpha = ts.find("ALPHA = 3,").unwrap();
        let zulu = ts.find("ZULU = 7,").unwrap();
        assert!(alpha < zulu);
    }

    #[test]
    fn user_types_render_fully_qualified() {
        let root = json!({
            "nested": {
                "pkg": {
                    "nested": {
                        "User": { "fields": { "status": { "type": "Status", "id": 1 } } },
                        "Status": { "values": { "OK": 0 } }
                    }
                }
            }
        });
        let ts = generate(root, LoaderOptions::default());
        assert!(ts.contains("'status'?: pkg.Status;"));
    }

    #[test]
    fn generation_is_deterministic() {
        let root = json!({
            "nested": {
                "pkg": {
                    "nested": {
                        "B": { "fields": { "x": { "type": "int32", "id": 1 } } },
                        "A": { "fields": { "b": { "type": "B", "id": 1 } } }
                    }
                }
            }
        });
        let first = generate(root.clone(), LoaderOptions::default());
        let second = generate(root, LoaderOptions::default());
        assert_eq!(first, second);
    }

    #[test]
    fn unresolved_field_type_aborts_generation() {
        let schema = FlatSchema {
            messages: vec![Message {
                name: "Broken".to_string(),
                full_name: "pkg.Broken".to_string(),
                fields: vec![Field {
                    name: "x".to_string(),
                    proto_type: "Missing".to_string(),
                    id: 1,
                    repeated: false,
                    required: false,
                    default_value: None,
                    is_bytes: false,
                    comment: None,
                }],
                comment: None,
            }],
            ..Default::default()
        };
        let tree = Namespace::build(&schema.messages, &schema.enums).unwrap();
        let index = TypeIndex::build(&schema);
        let err = generate_type_bindings(&tree, &index, LoaderOptions::default()).unwrap_err();
        assert_eq!(err.type_name, "Missing");
    }
}
