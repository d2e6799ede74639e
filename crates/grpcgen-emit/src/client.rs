//! Service-client synthesizer.
//!
//! Emits one TypeScript module per service: a typed client interface
//! (legacy positional call shapes plus the `V2` structured-object shape)
//! and a runtime binding that owns a lazily built client singleton with
//! `restartServer`/`closeServer`, wrapping every method with the
//! resilience layer from `serviceWrapper.ts`.
//!
//! The method list is schema-driven: the binding decorates exactly the
//! methods the schema declares, never an introspected member list.

use crate::render::{header, import_prefix};
use grpcgen_schema::{
    LoaderOptions, Method, Service, TypeIndex, UnresolvedTypeError, package_of, resolve,
};

/// One generated service module and its output path relative to the
/// generation root (package segments become directories).
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceModule {
    pub relative_path: String,
    pub source: String,
}

/// Select the methods belonging to `service`: package-prefix equality
/// against the service's full name, sorted by name.
pub fn methods_of<'a>(service: &Service, methods: &'a [Method]) -> Vec<&'a Method> {
    let mut own: Vec<&Method> = methods
        .iter()
        .filter(|method| package_of(&method.full_name) == service.full_name)
        .collect();
    own.sort_by(|a, b| a.name.cmp(&b.name));
    own
}

pub fn generate_service_module(
    service: &Service,
    methods: &[Method],
    index: &TypeIndex,
) -> Result<ServiceModule, UnresolvedTypeError> {
    let package = package_of(&service.full_name);
    let depth = if package.is_empty() {
        0
    } else {
        package.split('.').count()
    };
    let prefix = import_prefix(depth);
    let own_methods = methods_of(service, methods);

    let mut out = header();
    if let Some(author) = &service.author {
        out.push_str(&format!("// author: {author}\n"));
    }
    out.push('\n');
    out.push_str(&format!(
        "import * as types from '{prefix}types';\n\
         import grpcObject from '{prefix}grpcObj';\n\
         import getGrpcClient from '{prefix}getGrpcClient';\n\
         import {{\n\
         \x20 CallOptions,\n\
         \x20 CallResult,\n\
         \x20 MetadataMap,\n\
         \x20 callWithResilience,\n\
         \x20 shouldReconnect,\n\
         }} from '{prefix}serviceWrapper';\n\n"
    ));

    render_interface(&mut out, service, &own_methods, index)?;
    render_binding(&mut out, service, &own_methods);

    let relative_path = format!("{}.ts", service.full_name.replace('.', "/"));
    Ok(ServiceModule {
        relative_path,
        source: out,
    })
}

/// Resolve a method's request or response type. Must land on a message
/// reachable from the service's package, not a scalar or an enum, so the
/// loader's scalar options never apply here.
fn message_type(
    type_name: &str,
    scope: &str,
    index: &TypeIndex,
) -> Result<String, UnresolvedTypeError> {
    let resolved = resolve(type_name, scope, index, LoaderOptions::default())?;
    if resolved.scalar || index.message(&resolved.ts_type).is_none() {
        return Err(UnresolvedTypeError {
            type_name: type_name.to_string(),
            scope: scope.to_string(),
        });
    }
    Ok(format!("types.{}", resolved.ts_type))
}

fn render_interface(
    out: &mut String,
    service: &Service,
    methods: &[&Method],
    index: &TypeIndex,
) -> Result<(), UnresolvedTypeError> {
    let scope = package_of(&service.full_name);

    out.push_str(&format!("export interface I{} {{\n", service.name));
    for method in methods {
        let request = message_type(&method.request_type, scope, index)?;
        let response = message_type(&method.response_type, scope, index)?;

        if let Some(comment) = &method.comment {
            out.push_str(&format!("  /** {} */\n", comment.replace('\n', " ")));
        }
        out.push_str(&format!(
            "  {name}(request: {request}, options?: CallOptions): Promise<{response}>;\n\
             \x20 {name}(request: {request}, metadata: MetadataMap, options?: CallOptions): Promise<{response}>;\n\
             \x20 {name}V2(option: {{\n\
             \x20   request: {request};\n\
             \x20   metadata?: MetadataMap;\n\
             \x20   options?: CallOptions;\n\
             \x20 }}): Promise<CallResult<{response}>>;\n",
            name = method.name,
        ));
    }
    out.push_str("}\n\n");
    Ok(())
}

fn render_binding(out: &mut String, service: &Service, methods: &[&Method]) {
    let server_name = service
        .full_name
        .split('.')
        .next()
        .unwrap_or(&service.full_name);
    let method_list = methods
        .iter()
        .map(|method| format!("'{}'", method.name))
        .collect::<Vec<_>>()
        .join(", ");
    let name = &service.name;
    let camel = camel_case(name);

    out.push_str(&format!(
        "const SERVICE_PATH = '{full_name}';\n\
         const SERVER_NAME = '{server_name}';\n\
         const METHOD_NAMES: string[] = [{method_list}];\n\n\
         function buildClient(): any {{\n\
         \x20 return getGrpcClient(grpcObject, SERVICE_PATH, SERVER_NAME);\n\
         }}\n\n\
         let client: any = null;\n\n\
         function ensureClient(): any {{\n\
         \x20 if (!client) {{\n\
         \x20   client = buildClient();\n\
         \x20 }}\n\
         \x20 return client;\n\
         }}\n\n\
         export function closeServer(): void {{\n\
         \x20 if (client) {{\n\
         \x20   client.close();\n\
         \x20 }}\n\
         \x20 client = null;\n\
         }}\n\n\
         export function restartServer(): void {{\n\
         \x20 closeServer();\n\
         \x20 client = buildClient();\n\
         }}\n\n\
         function callService(\n\
         \x20 method: string,\n\
         \x20 request: any,\n\
         \x20 metadata: MetadataMap,\n\
         \x20 options?: CallOptions,\n\
         ): Promise<CallResult<any>> {{\n\
         \x20 return callWithResilience(\n\
         \x20   ensureClient(),\n\
         \x20   `${{SERVICE_PATH}}.${{method}}`,\n\
         \x20   method,\n\
         \x20   request,\n\
         \x20   metadata,\n\
         \x20   options,\n\
         \x20 ).catch((err: Error) => {{\n\
         \x20   if (shouldReconnect(err)) {{\n\
         \x20     console.info('grpc client rebuilt:', SERVICE_PATH);\n\
         \x20     restartServer();\n\
         \x20   }}\n\
         \x20   throw err;\n\
         \x20 }});\n\
         }}\n\n\
         export const {name} = {{}} as I{name};\n\n\
         METHOD_NAMES.forEach((method) => {{\n\
         \x20 ({name} as any)[method] = function (request: any, metadataOrOptions?: any, maybeOptions?: any) {{\n\
         \x20   let metadata: MetadataMap = {{}};\n\
         \x20   let options: CallOptions | undefined;\n\
         \x20   if (arguments.length >= 3) {{\n\
         \x20     metadata = metadataOrOptions || {{}};\n\
         \x20     options = maybeOptions;\n\
         \x20   }} else if (arguments.length === 2) {{\n\
         \x20     options = metadataOrOptions;\n\
         \x20   }}\n\
         \x20   return callService(method, request, metadata, options).then((result) => result.response);\n\
         \x20 }};\n\
         \x20 ({name} as any)[`${{method}}V2`] = function (option: {{ request: any; metadata?: MetadataMap; options?: CallOptions }}) {{\n\
         \x20   return callService(method, option.request, option.metadata || {{}}, option.options);\n\
         \x20 }};\n\
         }});\n\n\
         export const {camel}: I{name} = {name};\n\
         export default {name};\n",
        full_name = service.full_name,
    ));
}

fn camel_case(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => format!("{}{}", first.to_lowercase(), chars.as_str()),
        None => String::new(),
    }
}
