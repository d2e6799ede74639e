//! TypeScript gRPC client generation from schema reflection roots.
//!
//! `grpcgen` reassembles parsed RPC schema reflection trees into a
//! namespace hierarchy, resolves every type reference to a
//! fully-qualified target, and synthesizes typed data structures plus
//! resilient service-client bindings (timeout injection, structured
//! logging, bounded retry, reconnect-on-failure).
//!
//! The pipeline fans out across independent schema roots; each root's
//! output lands in its own directory and a failure there leaves the
//! other roots untouched.
//!
//! ```no_run
//! use grpcgen::config::{GenConfig, RootSpec};
//!
//! let config = GenConfig {
//!     roots: vec![RootSpec::Path("schemas/user.json".into())],
//!     ..Default::default()
//! };
//! let report = grpcgen::pipeline::generate(&config)?;
//! assert!(!report.has_errors());
//! # Ok::<(), grpcgen::pipeline::GenError>(())
//! ```

pub mod config;
pub mod pipeline;

pub use config::{GenConfig, GenRoot, RootSpec};
pub use pipeline::{GenError, GenReport, RootOutcome, RootResult, generate};
