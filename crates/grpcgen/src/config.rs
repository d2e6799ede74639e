//! Generation configuration: a JSON config file merged under CLI flags.

use grpcgen_emit::EmitOptions;
use grpcgen_schema::LoaderOptions;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::pipeline::GenError;

/// One generation root: one output directory fed by one or more
/// reflection-root JSON files merged into a single run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RootSpec {
    Path(PathBuf),
    Merged { name: String, files: Vec<PathBuf> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenRoot {
    pub name: String,
    pub files: Vec<PathBuf>,
}

impl RootSpec {
    /// Normalize to a named root; bare paths take their file stem.
    pub fn resolved(&self) -> GenRoot {
        match self {
            RootSpec::Path(path) => GenRoot {
                name: path
                    .file_stem()
                    .and_then(|stem| stem.to_str())
                    .unwrap_or("root")
                    .to_string(),
                files: vec![path.clone()],
            },
            RootSpec::Merged { name, files } => GenRoot {
                name: name.clone(),
                files: files.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct GenConfig {
    pub roots: Vec<RootSpec>,
    pub base_dir: PathBuf,
    pub grpc_npm_name: String,
    pub loader_options: LoaderOptions,
    pub call_options: CallOptionsConfig,
    pub log_options: LogOptionsConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct CallOptionsConfig {
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct LogOptionsConfig {
    pub enabled: bool,
}

impl Default for LogOptionsConfig {
    fn default() -> Self {
        LogOptionsConfig { enabled: true }
    }
}

impl Default for GenConfig {
    fn default() -> Self {
        GenConfig {
            roots: Vec::new(),
            base_dir: PathBuf::from("code-gen"),
            grpc_npm_name: "grpc".to_string(),
            loader_options: LoaderOptions::default(),
            call_options: CallOptionsConfig::default(),
            log_options: LogOptionsConfig::default(),
        }
    }
}

impl GenConfig {
    pub fn load(path: &Path) -> Result<Self, GenError> {
        let text = std::fs::read_to_string(path).map_err(|source| GenError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| GenError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn resolved_roots(&self) -> Vec<GenRoot> {
        self.roots.iter().map(RootSpec::resolved).collect()
    }

    pub fn emit_options(&self) -> EmitOptions {
        EmitOptions {
            grpc_npm_name: self.grpc_npm_name.clone(),
            default_timeout_ms: self.call_options.timeout_ms,
            log_enabled: self.log_options.enabled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_config() {
        let config = GenConfig::default();
        assert_eq!(config.base_dir, PathBuf::from("code-gen"));
        assert_eq!(config.grpc_npm_name, "grpc");
        assert!(config.log_options.enabled);
        assert!(!config.loader_options.longs_as_strings);
    }

    #[test]
    fn parses_both_root_spec_shapes() {
        let config: GenConfig = serde_json::from_str(
            r#"{
                "roots": [
                    "schemas/user.json",
                    { "name": "billing", "files": ["a.json", "b.json"] }
                ],
                "grpc_npm_name": "@grpc/grpc-js",
                "loader_options": { "longs_as_strings": true },
                "call_options": { "timeout_ms": 5000 }
            }"#,
        )
        .unwrap();

        let roots = config.resolved_roots();
        assert_eq!(roots[0].name, "user");
        assert_eq!(roots[1].name, "billing");
        assert_eq!(roots[1].files.len(), 2);
        assert!(config.loader_options.longs_as_strings);
        assert_eq!(config.emit_options().default_timeout_ms, Some(5000));
        assert_eq!(config.emit_options().grpc_npm_name, "@grpc/grpc-js");
    }
}
