//! Code synthesis for grpcgen.
//!
//! Takes the resolved schema model from `grpcgen-schema` and produces
//! TypeScript source text:
//!
//! ```text
//! Namespace tree ──> types    ──> types.ts
//! Services/Methods ─> client  ──> <pkg>/<Service>.ts   (one per service)
//! EmitOptions ──────> runtime ──> serviceWrapper.ts, getGrpcClient.ts, grpcObj.ts
//! ```
//!
//! All generators are pure string producers; file layout and I/O belong
//! to the pipeline crate. The `resilience` module is the single
//! definition of the retry/reconnect policy embedded into generated
//! clients.

pub mod client;
pub mod render;
pub mod resilience;
pub mod runtime;
pub mod types;

pub use client::{ServiceModule, generate_service_module, methods_of};
pub use runtime::{
    EmitOptions, generate_get_grpc_client, generate_grpc_obj, generate_service_wrapper,
};
pub use types::generate_type_bindings;
