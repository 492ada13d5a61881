// Copyright (c) 2020-present, UMD Database Group.
//
// This program is free software: you can use, redistribute, and/or modify
// it under the terms of the GNU Affero General Public License, version 3
// or later ("AGPL"), as published by the Free Software Foundation.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <http://www.gnu.org/licenses/>.

//! [`FunctionInvoker`] serves a catalog function as a Google Cloud Function,
//! both as an [`HttpFunction`] and as a [`RawBackgroundFunction`].
//!
//! The function is resolved once, when the invoker is created at cold start,
//! and reused for every invocation afterwards.

use crate::context::Context;
use crate::host::{HttpFunction, HttpRequest, HttpResponse, RawBackgroundFunction};
use cloud_function::prelude::*;
use log::{debug, info, warn};
use std::sync::Arc;

/// Header of an outbound message that carries the HTTP status code.
pub const HTTP_STATUS_CODE: &str = "statusCode";

/// Header of an inbound background message that carries the event
/// [`Context`].
pub const GCF_CONTEXT: &str = "gcf_context";

/// Looks up `definition`, falling back to the routing function.
///
/// Handles whose output is a stream skip output conversion: the invoker
/// writes the raw payloads itself.
pub fn resolve_function(
    catalog: &dyn FunctionCatalog,
    definition: &str,
) -> Result<FunctionInvocationWrapper> {
    let mut function = match catalog.lookup(definition, &DEFAULT_CONTENT_TYPE) {
        Some(function) => function,
        None => {
            debug!(
                "No function '{}' among {:?}, falling back to '{}'",
                definition,
                catalog.names(None),
                *ROUTING_FUNCTION_NAME
            );
            catalog
                .lookup(&ROUTING_FUNCTION_NAME, &DEFAULT_CONTENT_TYPE)
                .ok_or_else(|| CloudFunctionError::FunctionNotFound(definition.to_owned()))?
        }
    };

    if function.is_output_type_publisher() {
        function.set_skip_output_conversion(true);
    }
    Ok(function)
}

/// The Google Cloud Functions adapter.
pub struct FunctionInvoker {
    function_name: String,
    catalog: Arc<dyn FunctionCatalog>,
    function: FunctionInvocationWrapper,
}

impl FunctionInvoker {
    /// Resolves `definition` in `catalog`. An empty definition resolves the
    /// routing function.
    pub fn new(catalog: Arc<dyn FunctionCatalog>, definition: &str) -> Result<Self> {
        info!("Initializing function invoker for '{}'", definition);
        let function = resolve_function(catalog.as_ref(), definition)?;
        let function_name = function.function_definition().to_owned();
        info!("Located function: '{}'", function_name);
        Ok(FunctionInvoker {
            function_name,
            catalog,
            function,
        })
    }

    /// Builds the registry with the JSON mapper selected by `config` and
    /// resolves the configured definition.
    pub fn from_registry(registry: RegistryBuilder, config: &FunctionConfig) -> Result<Self> {
        let registry = registry.json_mapper(config.mapper()?).build();
        Self::new(registry, &config.definition)
    }

    /// Same as [`FunctionInvoker::from_registry`] with the configuration read
    /// from the process environment.
    pub fn from_env(registry: RegistryBuilder) -> Result<Self> {
        Self::from_registry(registry, &FunctionConfig::from_env())
    }

    /// The definition of the resolved function. After a fallback this is the
    /// routing function's name, not the requested one.
    pub fn function_name(&self) -> &str {
        &self.function_name
    }

    /// The resolved function.
    pub fn function(&self) -> &FunctionInvocationWrapper {
        &self.function
    }

    /// The catalog the function was resolved from.
    pub fn catalog(&self) -> &Arc<dyn FunctionCatalog> {
        &self.catalog
    }

    /// Writes `result` to `response`.
    fn write_response(
        &self,
        request: &dyn HttpRequest,
        response: &mut dyn HttpResponse,
        result: Message,
    ) -> Result<()> {
        let (headers, payload) = result.into_parts();
        response.writer().write_all(&payload)?;

        for (key, value) in headers.iter().filter(|(k, _)| k.as_str() != HTTP_STATUS_CODE) {
            response.append_header(key, &value.to_string());
        }

        if let Some(content_type) = request.content_type() {
            response.set_content_type(&content_type);
        }

        if let Some(status) = headers.get(HTTP_STATUS_CODE) {
            match status.as_integer() {
                Some(code) => match status_code(code) {
                    Some(code) => response.set_status_code(code),
                    None => warn!(
                        "The {} {} is out of range, expected 100 to 999",
                        HTTP_STATUS_CODE, code
                    ),
                },
                None => warn!(
                    "The {} should be an Integer value, ignoring {:?}",
                    HTTP_STATUS_CODE, status
                ),
            }
        }
        Ok(())
    }
}

fn status_code(code: i64) -> Option<u16> {
    u16::try_from(code)
        .ok()
        .filter(|c| (100..=999).contains(c))
}

impl HttpFunction for FunctionInvoker {
    fn service(
        &self,
        request: &mut dyn HttpRequest,
        response: &mut dyn HttpResponse,
    ) -> Result<()> {
        let message = if self.function.is_input_type_void() {
            None
        } else {
            let mut body = Vec::new();
            request.reader().read_to_end(&mut body)?;
            Some(
                MessageBuilder::with_payload(body)
                    .copy_headers(request.headers().clone())
                    .build(),
            )
        };

        match self.function.apply(message)? {
            Some(result) => self.write_response(request, response, result),
            None => Ok(()),
        }
    }
}

impl RawBackgroundFunction for FunctionInvoker {
    fn accept(&self, json: &str, context: &Context) -> Result<()> {
        let message = if self.function.is_input_type_void() {
            None
        } else {
            Some(
                MessageBuilder::with_payload(json.to_owned())
                    .set_header(GCF_CONTEXT, serde_json::to_value(context)?)
                    .build(),
            )
        };

        if let Some(result) = self.function.apply(message)? {
            info!(
                "Dropping background function result: {}",
                result.payload_lossy()
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn invoker_is_shareable() {
        assert_send_sync::<FunctionInvoker>();
    }

    #[test]
    fn status_codes_must_be_in_range() {
        assert_eq!(Some(200), status_code(200));
        assert_eq!(Some(999), status_code(999));
        assert_eq!(None, status_code(99));
        assert_eq!(None, status_code(1000));
        assert_eq!(None, status_code(-1));
        assert_eq!(None, status_code(i64::MAX));
    }

    #[test]
    fn missing_function_without_router_fails() {
        let registry = SimpleFunctionRegistry::builder()
            .function("echo", |m: Message| Ok(m))
            .build();
        let err = FunctionInvoker::new(registry, "uppercase").err().unwrap();
        assert!(matches!(
            err,
            CloudFunctionError::FunctionNotFound(ref name) if name == "uppercase"
        ));
    }

    #[test]
    fn publishers_skip_output_conversion() -> Result<()> {
        use futures::stream::{self, StreamExt};

        let registry = SimpleFunctionRegistry::builder()
            .publisher("words", |_| {
                Ok(stream::iter(vec![
                    MessageBuilder::with_payload("a").build(),
                    MessageBuilder::with_payload("b").build(),
                ])
                .boxed())
            })
            .function("echo", |m: Message| Ok(m))
            .build();

        let words = resolve_function(registry.as_ref(), "words")?;
        assert!(words.skip_output_conversion());
        let echo = resolve_function(registry.as_ref(), "echo")?;
        assert!(!echo.skip_output_conversion());
        Ok(())
    }
}
