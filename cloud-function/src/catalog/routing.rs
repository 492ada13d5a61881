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

//! The routing function dispatches every message to another registered
//! function. It is registered under [`ROUTING_FUNCTION_NAME`] and is the
//! fallback adapters use when no function definition is configured.

use super::registry::{normalize_definition, FunctionTable};
use super::wrapper::FunctionInvocationWrapper;
use crate::configs::{ROUTING_DEFINITION_HEADER, ROUTING_FUNCTION_NAME};
use crate::error::{CloudFunctionError, Result};
use crate::json::JsonMapper;
use crate::message::Message;
use log::debug;
use std::fmt;
use std::sync::Arc;

/// Picks the definition a message is routed to.
pub type RoutingCallback = Arc<dyn Fn(&Message) -> Option<String> + Send + Sync>;

/// How the routing function selects its target.
#[derive(Clone, Default)]
pub struct RoutingConfig {
    /// Consulted when the message does not carry a definition header.
    pub callback: Option<RoutingCallback>,
    /// Used when neither the header nor the callback selects a definition.
    pub default_route: Option<String>,
}

impl fmt::Debug for RoutingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutingConfig")
            .field("callback", &self.callback.is_some())
            .field("default_route", &self.default_route)
            .finish()
    }
}

impl RoutingConfig {
    /// Routes with `callback` first.
    pub fn with_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Message) -> Option<String> + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(callback));
        self
    }

    /// Falls back to `definition`.
    pub fn with_default_route(mut self, definition: impl Into<String>) -> Self {
        self.default_route = Some(definition.into());
        self
    }
}

/// The routing function.
#[derive(Clone)]
pub struct RoutingFunction {
    table: Arc<FunctionTable>,
    config: RoutingConfig,
    mapper: Arc<dyn JsonMapper>,
}

impl RoutingFunction {
    pub(crate) fn new(
        table: Arc<FunctionTable>,
        config: RoutingConfig,
        mapper: Arc<dyn JsonMapper>,
    ) -> Self {
        RoutingFunction {
            table,
            config,
            mapper,
        }
    }

    /// Returns the definition `input` is routed to.
    ///
    /// The definition header wins over the callback, which wins over the
    /// default route.
    pub fn route_definition(&self, input: Option<&Message>) -> Result<String> {
        let from_header = input.and_then(|m| {
            m.headers()
                .get(&ROUTING_DEFINITION_HEADER)
                .and_then(|v| v.first_text())
                .map(|s| s.to_owned())
        });
        let from_callback = || {
            input.and_then(|m| self.config.callback.as_ref().and_then(|callback| callback(m)))
        };

        from_header
            .or_else(from_callback)
            .or_else(|| self.config.default_route.clone())
            .map(|d| normalize_definition(&d))
            .filter(|d| !d.is_empty())
            .ok_or_else(|| {
                CloudFunctionError::Routing(format!(
                    "unable to determine the function to route to: set the '{}' header, a \
                     routing callback or a default route",
                    *ROUTING_DEFINITION_HEADER
                ))
            })
    }

    /// Dispatches `input` to the function it is routed to and converts its
    /// output to `content_type`.
    pub fn route(&self, input: Option<Message>, content_type: &str) -> Result<Option<Message>> {
        let definition = self.route_definition(input.as_ref())?;
        if definition
            .split('|')
            .any(|stage| stage == ROUTING_FUNCTION_NAME.as_str())
        {
            return Err(CloudFunctionError::Routing(format!(
                "'{}' cannot route to itself",
                *ROUTING_FUNCTION_NAME
            )));
        }

        let target = self.table.resolve(&definition).ok_or_else(|| {
            CloudFunctionError::Routing(format!("no function registered as '{}'", definition))
        })?;
        debug!("Routing message to '{}'", definition);

        FunctionInvocationWrapper::new(definition, target, content_type, self.mapper.clone())
            .apply(input)
    }
}
