//! Generation pipeline: fan-out across schema roots, sequential steps
//! within each root.
//!
//! Each root runs load → normalize → tree → synthesize → write as one
//! independent task; roots share no mutable state and their outputs live
//! in disjoint directories, so a failed root aborts only itself. The
//! final report is assembled after all tasks join.

use crate::config::{GenConfig, GenRoot};
use grpcgen_emit::{
    generate_get_grpc_client, generate_grpc_obj, generate_service_module,
    generate_service_wrapper, generate_type_bindings,
};
use grpcgen_schema::{Namespace, SchemaError, TypeIndex, UnresolvedTypeError, inspect_merged};
use rayon::prelude::*;
use serde_json::Value;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum GenError {
    #[error("failed to read `{path}`: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid JSON in `{path}`: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Unresolved(#[from] UnresolvedTypeError),
    #[error("no schema roots configured")]
    NoRoots,
    #[error("root `{0}` lists no schema files")]
    EmptyRootSpec(String),
}

/// Outcome of one root's generation task.
#[derive(Debug, PartialEq)]
pub enum RootOutcome {
    Ok { files: Vec<PathBuf> },
    Error { message: String },
}

#[derive(Debug, PartialEq)]
pub struct RootResult {
    pub name: String,
    pub outcome: RootOutcome,
}

/// Aggregated report across all roots of one invocation.
#[derive(Debug)]
pub struct GenReport {
    pub base_dir: PathBuf,
    pub roots: Vec<RootResult>,
}

impl GenReport {
    pub fn has_errors(&self) -> bool {
        self.roots
            .iter()
            .any(|root| matches!(root.outcome, RootOutcome::Error { .. }))
    }
}

/// Run the full generation pipeline. The base directory is recreated
/// fresh; partial output of a failed root is left behind (no
/// transactional cleanup).
pub fn generate(config: &GenConfig) -> Result<GenReport, GenError> {
    let roots = config.resolved_roots();
    if roots.is_empty() {
        return Err(GenError::NoRoots);
    }

    if config.base_dir.exists() {
        std::fs::remove_dir_all(&config.base_dir).map_err(|source| GenError::Io {
            path: config.base_dir.clone(),
            source,
        })?;
        tracing::info!(dir = %config.base_dir.display(), "cleaned output dir");
    }
    std::fs::create_dir_all(&config.base_dir).map_err(|source| GenError::Io {
        path: config.base_dir.clone(),
        source,
    })?;

    let results: Vec<RootResult> = roots
        .par_iter()
        .map(|root| {
            let outcome = match generate_root(root, config) {
                Ok(files) => {
                    tracing::info!(root = %root.name, files = files.len(), "root generated");
                    RootOutcome::Ok { files }
                }
                Err(err) => {
                    tracing::error!(root = %root.name, error = %err, "root failed");
                    RootOutcome::Error {
                        message: err.to_string(),
                    }
                }
            };
            RootResult {
                name: root.name.clone(),
                outcome,
            }
        })
        .collect();

    Ok(GenReport {
        base_dir: config.base_dir.clone(),
        roots: results,
    })
}

/// Sequential steps for one root: every later stage consumes the output
/// of the previous one.
fn generate_root(root: &GenRoot, config: &GenConfig) -> Result<Vec<PathBuf>, GenError> {
    if root.files.is_empty() {
        return Err(GenError::EmptyRootSpec(root.name.clone()));
    }
    let out_dir = config.base_dir.join(&root.name);

    let mut values = Vec::with_capacity(root.files.len());
    for file in &root.files {
        let text = std::fs::read_to_string(file).map_err(|source| GenError::Io {
            path: file.clone(),
            source,
        })?;
        let value: Value = serde_json::from_str(&text).map_err(|source| GenError::Json {
            path: file.clone(),
            source,
        })?;
        values.push(value);
    }

    let schema = inspect_merged(&values)?;
    let tree = Namespace::build(&schema.messages, &schema.enums)?;
    let index = TypeIndex::build(&schema);
    let emit = config.emit_options();

    let mut files = Vec::new();
    let mut write = |relative: &str, source: String| -> Result<(), GenError> {
        let path = out_dir.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| GenError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(&path, source).map_err(|source| GenError::Io {
            path: path.clone(),
            source,
        })?;
        files.push(path);
        Ok(())
    };

    write(
        "types.ts",
        generate_type_bindings(&tree, &index, config.loader_options)?,
    )?;
    write("serviceWrapper.ts", generate_service_wrapper(&emit))?;
    write("getGrpcClient.ts", generate_get_grpc_client(&emit))?;
    write(
        "grpcObj.ts",
        generate_grpc_obj(&emit, config.loader_options),
    )?;

    // Merged reflection root, written for the generated grpcObj loader.
    let merged = merge_roots(&values);
    let merged_json = serde_json::to_string(&merged).map_err(|source| GenError::Json {
        path: out_dir.join("root.json"),
        source,
    })?;
    write("root.json", merged_json)?;

    for service in &schema.services {
        let module = generate_service_module(service, &schema.methods, &index)?;
        write(&module.relative_path, module.source)?;
    }

    files.sort();
    Ok(files)
}

/// Merge reflection roots the way the normalizer merges entities: first
/// declaration wins, `nested` subtrees merge recursively.
fn merge_roots(values: &[Value]) -> Value {
    let Some((first, rest)) = values.split_first() else {
        return Value::Null;
    };
    let mut merged = first.clone();
    for value in rest {
        merge_into(&mut merged, value);
    }
    merged
}

fn merge_into(dst: &mut Value, src: &Value) {
    let (Some(dst_map), Some(src_map)) = (dst.as_object_mut(), src.as_object()) else {
        return;
    };
    for (key, src_child) in src_map {
        match dst_map.get_mut(key) {
            None => {
                dst_map.insert(key.clone(), src_child.clone());
            }
            Some(dst_child) if key == "nested" || dst_child.get("nested").is_some() => {
                merge_into(dst_child, src_child);
            }
            Some(_) => {}
        }
    }
}
