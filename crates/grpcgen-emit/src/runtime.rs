//! Emitters for the shared runtime-support modules.
//!
//! Three files back every generated client:
//!
//! - `serviceWrapper.ts` — the resilience decorator: arity normalization,
//!   timeout-to-deadline injection, structured call logging, bounded
//!   retry, and the pattern classifiers the per-service facades use for
//!   reconnect decisions.
//! - `getGrpcClient.ts` — connection factory: endpoint/credential lookup
//!   from `grpc-service.config.json` plus default channel options.
//! - `grpcObj.ts` — loads the merged reflection JSON into the grpc
//!   runtime's package definition object.
//!
//! The decorator wraps the runtime's call surface at the module boundary;
//! nothing here rewrites shared runtime prototypes.

use crate::render::header;
use crate::resilience::{
    MAX_ATTEMPTS, RETRY_BACKOFF_MS, reconnect_js_regexes, transient_js_regexes,
};
use grpcgen_schema::LoaderOptions;

/// Knobs shared by the runtime-support emitters.
#[derive(Debug, Clone, PartialEq)]
pub struct EmitOptions {
    /// npm package providing the grpc runtime (`grpc` or `@grpc/grpc-js`).
    pub grpc_npm_name: String,
    /// Default per-call timeout merged under per-call overrides.
    pub default_timeout_ms: Option<u64>,
    /// Emit call logging into the wrapper.
    pub log_enabled: bool,
}

impl Default for EmitOptions {
    fn default() -> Self {
        EmitOptions {
            grpc_npm_name: "grpc".to_string(),
            default_timeout_ms: None,
            log_enabled: true,
        }
    }
}

pub fn generate_service_wrapper(options: &EmitOptions) -> String {
    let grpc = &options.grpc_npm_name;
    let default_call_options = match options.default_timeout_ms {
        Some(timeout) => format!("{{ timeout: {timeout} }}"),
        None => "{}".to_string(),
    };
    let log_enabled = options.log_enabled;
    let transient = transient_js_regexes();
    let reconnect = reconnect_js_regexes();

    format!(
        "{header}\
         import * as grpc from '{grpc}';\n\
         import {{ Metadata }} from '{grpc}';\n\n\
         export type MetadataMap = {{ [key: string]: string | number | Buffer }};\n\n\
         export interface CallOptions {{\n\
         \x20 timeout?: number;\n\
         \x20 deadline?: number;\n\
         \x20 flags?: number;\n\
         \x20 host?: string;\n\
         }}\n\n\
         export interface CallResult<R> {{\n\
         \x20 response: R;\n\
         \x20 metadata: Metadata;\n\
         }}\n\n\
         const maxAttempts = {MAX_ATTEMPTS};\n\
         const retryBackoffMs = {RETRY_BACKOFF_MS};\n\
         const logEnabled = {log_enabled};\n\
         const defaultCallOptions: CallOptions = {default_call_options};\n\n\
         const transientPatterns = [{transient}];\n\
         const reconnectPatterns = [{reconnect}];\n\n\
         function errorMessage(err: any): string {{\n\
         \x20 return ('' + ((err && (err.details || err.message || err.data)) || '')).toLowerCase();\n\
         }}\n\n\
         export function needRetry(err: any): boolean {{\n\
         \x20 const message = errorMessage(err);\n\
         \x20 return transientPatterns.some((pattern) => pattern.test(message));\n\
         }}\n\n\
         export function shouldReconnect(err: any): boolean {{\n\
         \x20 const message = errorMessage(err);\n\
         \x20 return reconnectPatterns.some((pattern) => pattern.test(message));\n\
         }}\n\n\
         function toMetadata(metadata: MetadataMap): Metadata {{\n\
         \x20 const out = new grpc.Metadata();\n\
         \x20 if (metadata && typeof metadata === 'object') {{\n\
         \x20   Object.keys(metadata).forEach((key) => {{\n\
         \x20     out.add(key, '' + metadata[key]);\n\
         \x20   }});\n\
         \x20 }}\n\
         \x20 return out;\n\
         }}\n\n\
         function delay(ms: number): Promise<void> {{\n\
         \x20 return new Promise((resolve) => setTimeout(resolve, ms));\n\
         }}\n\n\
         function invoke(\n\
         \x20 client: any,\n\
         \x20 method: string,\n\
         \x20 request: any,\n\
         \x20 metadata: MetadataMap,\n\
         \x20 options: CallOptions,\n\
         ): Promise<CallResult<any>> {{\n\
         \x20 return new Promise((resolve, reject) => {{\n\
         \x20   client[method](request, toMetadata(metadata), options, (err: any, response: any, metadataRes: Metadata) => {{\n\
         \x20     if (err) {{\n\
         \x20       reject(err);\n\
         \x20     }} else {{\n\
         \x20       resolve({{ response, metadata: metadataRes }});\n\
         \x20     }}\n\
         \x20   }});\n\
         \x20 }});\n\
         }}\n\n\
         export async function callWithResilience(\n\
         \x20 client: any,\n\
         \x20 methodId: string,\n\
         \x20 method: string,\n\
         \x20 request: any,\n\
         \x20 metadata?: MetadataMap,\n\
         \x20 options?: CallOptions,\n\
         ): Promise<CallResult<any>> {{\n\
         \x20 const merged: CallOptions = Object.assign({{}}, defaultCallOptions, options);\n\
         \x20 let attempt = 1;\n\
         \x20 for (;;) {{\n\
         \x20   if (typeof merged.timeout === 'number') {{\n\
         \x20     merged.deadline = Date.now() + merged.timeout;\n\
         \x20   }}\n\
         \x20   const start = Date.now();\n\
         \x20   try {{\n\
         \x20     const result = await invoke(client, method, request, metadata || {{}}, merged);\n\
         \x20     if (logEnabled) {{\n\
         \x20       console.info(\n\
         \x20         'grpc invoke:', methodId,\n\
         \x20         'duration:', ((Date.now() - start) / 1000) + 's',\n\
         \x20         'request:', JSON.stringify(request),\n\
         \x20       );\n\
         \x20     }}\n\
         \x20     return result;\n\
         \x20   }} catch (err) {{\n\
         \x20     if (logEnabled) {{\n\
         \x20       console.error(\n\
         \x20         'grpc invoke:', methodId,\n\
         \x20         'duration:', ((Date.now() - start) / 1000) + 's',\n\
         \x20         'request:', JSON.stringify(request),\n\
         \x20         'err:', err,\n\
         \x20       );\n\
         \x20     }}\n\
         \x20     if (attempt < maxAttempts && needRetry(err)) {{\n\
         \x20       attempt++;\n\
         \x20       await delay(retryBackoffMs);\n\
         \x20       continue;\n\
         \x20     }}\n\
         \x20     throw err;\n\
         \x20   }}\n\
         \x20 }}\n\
         }}\n",
        header = header(),
    )
}

pub fn generate_get_grpc_client(options: &EmitOptions) -> String {
    let grpc = &options.grpc_npm_name;
    format!(
        "{header}\
         import * as grpc from '{grpc}';\n\
         import * as fs from 'fs';\n\
         import * as path from 'path';\n\n\
         interface ServiceEndpoint {{\n\
         \x20 server_name: string;\n\
         \x20 server_port: number;\n\
         \x20 cert_pem_path?: string;\n\
         }}\n\n\
         const configPath = path.resolve(process.cwd(), 'grpc-service.config.json');\n\
         if (!fs.existsSync(configPath)) {{\n\
         \x20 console.error('Missing grpc-service.config.json, please generate it first');\n\
         \x20 process.exit(-1);\n\
         }}\n\
         const serviceConfig: {{ [serverName: string]: ServiceEndpoint }} =\n\
         \x20 JSON.parse(fs.readFileSync(configPath, 'utf8'));\n\n\
         export default function getGrpcClient(\n\
         \x20 grpcObject: any,\n\
         \x20 servicePath: string,\n\
         \x20 serverName: string,\n\
         ): any {{\n\
         \x20 const config = serviceConfig[serverName];\n\
         \x20 if (!config) {{\n\
         \x20   throw new Error(`${{serverName}} config not exists!`);\n\
         \x20 }}\n\
         \x20 const credentials = config.cert_pem_path\n\
         \x20   ? grpc.credentials.createSsl(fs.readFileSync(path.resolve(process.cwd(), config.cert_pem_path)))\n\
         \x20   : grpc.credentials.createInsecure();\n\
         \x20 const channelOptions = {{\n\
         \x20   'grpc.ssl_target_name_override': serverName,\n\
         \x20   'grpc.keepalive_time_ms': 3000,\n\
         \x20   'grpc.keepalive_timeout_ms': 2000,\n\
         \x20 }};\n\
         \x20 const Ctor = servicePath\n\
         \x20   .split('.')\n\
         \x20   .reduce((obj: any, key: string) => obj && obj[key], grpcObject);\n\
         \x20 if (!Ctor) {{\n\
         \x20   throw new Error(`${{servicePath}} not found in schema object`);\n\
         \x20 }}\n\
         \x20 return new Ctor(`${{config.server_name}}:${{config.server_port}}`, credentials, channelOptions);\n\
         }}\n",
        header = header(),
    )
}

pub fn generate_grpc_obj(options: &EmitOptions, loader: LoaderOptions) -> String {
    let grpc = &options.grpc_npm_name;
    let loader_options = if loader.longs_as_strings {
        "{ defaults: true, longs: String }"
    } else {
        "{ defaults: true }"
    };
    format!(
        "{header}\
         import * as grpc from '{grpc}';\n\
         import {{ loadFromJson }} from 'load-proto';\n\n\
         const root = require('./root.json');\n\n\
         const grpcObject = grpc.loadPackageDefinition(loadFromJson(root, {loader_options}));\n\n\
         export default grpcObject;\n",
        header = header(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapper_embeds_the_policy_constants() {
        let ts = generate_service_wrapper(&EmitOptions::default());
        assert!(ts.contains("const maxAttempts = 3;"));
        assert!(ts.contains("const retryBackoffMs = 25;"));
        assert!(ts.contains("/tcp.+read.+failed/"));
        assert!(ts.contains("/cannot.+read.+property/"));
        assert!(ts.contains("merged.deadline = Date.now() + merged.timeout;"));
        assert!(ts.contains("export async function callWithResilience("));
    }

    #[test]
    fn wrapper_honors_call_and_log_options() {
        let ts = generate_service_wrapper(&EmitOptions {
            default_timeout_ms: Some(5000),
            log_enabled: false,
            ..Default::default()
        });
        assert!(ts.contains("const defaultCallOptions: CallOptions = { timeout: 5000 };"));
        assert!(ts.contains("const logEnabled = false;"));
    }

    #[test]
    fn client_factory_wires_credentials_and_channel_options() {
        let ts = generate_get_grpc_client(&EmitOptions {
            grpc_npm_name: "@grpc/grpc-js".to_string(),
            ..Default::default()
        });
        assert!(ts.contains("import * as grpc from '@grpc/grpc-js';"));
        assert!(ts.contains("grpc.credentials.createInsecure()"));
        assert!(ts.contains("'grpc.keepalive_time_ms': 3000,"));
    }

    #[test]
    fn grpc_obj_reflects_loader_options() {
        let plain = generate_grpc_obj(&EmitOptions::default(), LoaderOptions::default());
        assert!(plain.contains("loadFromJson(root, { defaults: true })"));

        let longs = generate_grpc_obj(
            &EmitOptions::default(),
            LoaderOptions {
                longs_as_strings: true,
            },
        );
        assert!(longs.contains("{ defaults: true, longs: String }"));
    }
}
