//! Qualified type resolver: scope-walking short-name lookup with a global
//! fallback.
//!
//! This is the single source of truth for "scalar vs user type" and for
//! the target-language spelling of every field and method type. It is a
//! pure function of the type index so it stays unit-testable in isolation
//! from text output.

use crate::model::{Field, TypeIndex};
use serde::Deserialize;

/// Options handed down from the schema loader.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct LoaderOptions {
    /// Render 64-bit integer scalars as `string` instead of `number`.
    /// Native numbers lose precision above 2^53.
    pub longs_as_strings: bool,
}

/// Resolution failure: the type name has no target reachable from the
/// scope. Hard synthesis-time error; generation aborts for that root.
#[derive(Debug, thiserror::Error)]
#[error("cannot resolve type `{type_name}` referenced from `{scope}`")]
pub struct UnresolvedTypeError {
    pub type_name: String,
    pub scope: String,
}

/// A resolved type reference.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedType {
    /// TypeScript spelling: a scalar keyword mapping or a fully-qualified
    /// user type path.
    pub ts_type: String,
    pub scalar: bool,
}

/// Scalar keyword mapping. Signedness and width collapse into `number`
/// except for the 64-bit integer scalars under `longs_as_strings`.
pub fn scalar_ts_type(proto_type: &str, options: LoaderOptions) -> Option<&'static str> {
    match proto_type {
        "double" | "float" | "int32" | "uint32" | "sint32" | "fixed32" | "sfixed32" => {
            Some("number")
        }
        "int64" | "uint64" | "sint64" | "fixed64" | "sfixed64" => {
            if options.longs_as_strings {
                Some("string")
            } else {
                Some("number")
            }
        }
        "bool" => Some("boolean"),
        "string" | "bytes" => Some("string"),
        _ => None,
    }
}

/// Resolve `proto_type` as referenced from inside `scope` (a full name:
/// the enclosing message for fields, the enclosing package for methods).
///
/// Order: scalar table, verbatim if already dot-qualified, scope-walking
/// from innermost to root (`a.b.c.T`, `a.b.T`, `a.T`, `T`), then one flat
/// short-name lookup over the whole merged schema.
pub fn resolve(
    proto_type: &str,
    scope: &str,
    index: &TypeIndex,
    options: LoaderOptions,
) -> Result<ResolvedType, UnresolvedTypeError> {
    if let Some(scalar) = scalar_ts_type(proto_type, options) {
        return Ok(ResolvedType {
            ts_type: scalar.to_string(),
            scalar: true,
        });
    }

    // Already qualified: trust the caller.
    if proto_type.contains('.') {
        return Ok(ResolvedType {
            ts_type: proto_type.to_string(),
            scalar: false,
        });
    }

    if let Some(full_name) = walk_package_path(scope, proto_type, index) {
        return Ok(ResolvedType {
            ts_type: full_name,
            scalar: false,
        });
    }

    // Covers types declared outside the scope chain, e.g. a sibling
    // package from a merged shared-library root.
    if let Some(full_name) = index.lookup_short(proto_type) {
        return Ok(ResolvedType {
            ts_type: full_name.to_string(),
            scalar: false,
        });
    }

    Err(UnresolvedTypeError {
        type_name: proto_type.to_string(),
        scope: scope.to_string(),
    })
}

/// TypeScript spelling for a field, with the collection wrapper applied
/// when the field is repeated.
pub fn field_ts_type(
    field: &Field,
    scope: &str,
    index: &TypeIndex,
    options: LoaderOptions,
) -> Result<String, UnresolvedTypeError> {
    let resolved = resolve(&field.proto_type, scope, index, options)?;
    if field.repeated {
        Ok(format!("{}[]", resolved.ts_type))
    } else {
        Ok(resolved.ts_type)
    }
}

/// Nearest-enclosing-scope lookup: test `scope.type`, strip the last scope
/// segment, retry; the innermost match wins (shadowing).
fn walk_package_path(scope: &str, type_name: &str, index: &TypeIndex) -> Option<String> {
    let mut scope = scope;
    loop {
        let candidate = if scope.is_empty() {
            type_name.to_string()
        } else {
            format!("{scope}.{type_name}")
        };
        if index.contains(&candidate) {
            return Some(candidate);
        }
        if scope.is_empty() {
            return None;
        }
        scope = match scope.rsplit_once('.') {
            Some((outer, _)) => outer,
            None => "",
        };
    }
}
