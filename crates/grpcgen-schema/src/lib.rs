//! Schema resolution core for grpcgen.
//!
//! Turns a parsed RPC schema reflection root into the resolved model the
//! code synthesizers consume:
//!
//! ```text
//! reflection JSON ──> reflect (flatten + directives)
//!                        │
//!                        ├──> namespace (package tree)
//!                        └──> model::TypeIndex ──> resolve (scope-walking lookup)
//! ```
//!
//! Parsing `.proto` sources and fetching them from source control are the
//! schema provider's job; this crate starts from the provider's JSON
//! reflection tree (protobuf-js `toJSON` shape).

pub mod model;
pub mod namespace;
pub mod reflect;
pub mod resolve;

pub use model::{EnumType, Field, FlatSchema, Message, Method, Service, TypeIndex, package_of};
pub use namespace::Namespace;
pub use reflect::{SchemaError, inspect_merged, inspect_root};
pub use resolve::{LoaderOptions, ResolvedType, UnresolvedTypeError, field_ts_type, resolve};
