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

//! The in-memory function registry.
//!
//! Functions are registered once through a [`RegistryBuilder`]; the built
//! [`SimpleFunctionRegistry`] is immutable for the rest of the process.

use super::routing::{RoutingConfig, RoutingFunction};
use super::wrapper::{FunctionInvocationWrapper, FunctionTarget, InputType, OutputType};
use super::FunctionCatalog;
use crate::configs::ROUTING_FUNCTION_NAME;
use crate::error::{CloudFunctionError, Result};
use crate::json::{JsonMapper, SerdeJsonMapper};
use crate::message::Message;
use futures::stream::BoxStream;
use log::debug;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// The shape of a registered function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionKind {
    /// Consumes an input and produces an output.
    Function,
    /// Consumes an input and produces nothing.
    Consumer,
    /// Produces an output from no input.
    Supplier,
}

impl FunctionKind {
    /// The tag used to filter [`FunctionCatalog::names`].
    pub fn tag(&self) -> &'static str {
        match self {
            FunctionKind::Function => "function",
            FunctionKind::Consumer => "consumer",
            FunctionKind::Supplier => "supplier",
        }
    }
}

type MessageFn = dyn Fn(Option<Message>) -> Result<Option<Message>> + Send + Sync;
type JsonFn = dyn Fn(Value) -> Result<Value> + Send + Sync;
type PublisherFn = dyn Fn(Option<Message>) -> Result<BoxStream<'static, Message>> + Send + Sync;

/// The callable body of a registered function.
#[derive(Clone)]
pub(crate) enum Invocable {
    Message(Arc<MessageFn>),
    Json(Arc<JsonFn>),
    Publisher(Arc<PublisherFn>),
}

/// A function registered in the catalog along with its declared types.
#[derive(Clone)]
pub struct FunctionRegistration {
    name: String,
    kind: FunctionKind,
    input_type: InputType,
    output_type: OutputType,
    pub(crate) invocable: Invocable,
}

impl fmt::Debug for FunctionRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistration")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("input_type", &self.input_type)
            .field("output_type", &self.output_type)
            .finish()
    }
}

impl FunctionRegistration {
    /// Registers a message-to-message function.
    pub fn function<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Message) -> Result<Message> + Send + Sync + 'static,
    {
        let name = name.into();
        let fname = name.clone();
        FunctionRegistration {
            kind: FunctionKind::Function,
            input_type: InputType::Raw,
            output_type: OutputType::Single,
            invocable: Invocable::Message(Arc::new(
                move |input: Option<Message>| -> Result<Option<Message>> {
                    f(require_input(&fname, input)?).map(Some)
                },
            )),
            name,
        }
    }

    /// Registers a function over JSON documents. The payload is parsed and
    /// the result serialized with the registry's JSON mapper.
    pub fn json_function<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Value) -> Result<Value> + Send + Sync + 'static,
    {
        FunctionRegistration {
            name: name.into(),
            kind: FunctionKind::Function,
            input_type: InputType::Json,
            output_type: OutputType::Single,
            invocable: Invocable::Json(Arc::new(f)),
        }
    }

    /// Registers a consumer. Consumers never produce a message.
    pub fn consumer<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Message) -> Result<()> + Send + Sync + 'static,
    {
        let name = name.into();
        let fname = name.clone();
        FunctionRegistration {
            kind: FunctionKind::Consumer,
            input_type: InputType::Raw,
            output_type: OutputType::Void,
            invocable: Invocable::Message(Arc::new(
                move |input: Option<Message>| -> Result<Option<Message>> {
                    f(require_input(&fname, input)?).map(|_| None)
                },
            )),
            name,
        }
    }

    /// Registers a supplier. Suppliers are always invoked without input.
    pub fn supplier<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn() -> Result<Message> + Send + Sync + 'static,
    {
        FunctionRegistration {
            name: name.into(),
            kind: FunctionKind::Supplier,
            input_type: InputType::Void,
            output_type: OutputType::Single,
            invocable: Invocable::Message(Arc::new(move |_: Option<Message>| f().map(Some))),
        }
    }

    /// Registers a function whose output is a stream of messages.
    pub fn publisher<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Option<Message>) -> Result<BoxStream<'static, Message>> + Send + Sync + 'static,
    {
        FunctionRegistration {
            name: name.into(),
            kind: FunctionKind::Function,
            input_type: InputType::Raw,
            output_type: OutputType::Publisher,
            invocable: Invocable::Publisher(Arc::new(f)),
        }
    }

    /// The registered name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The shape of the function.
    pub fn kind(&self) -> FunctionKind {
        self.kind
    }

    /// The declared input type.
    pub fn input_type(&self) -> InputType {
        self.input_type
    }

    /// The declared output type.
    pub fn output_type(&self) -> OutputType {
        self.output_type
    }
}

fn require_input(name: &str, input: Option<Message>) -> Result<Message> {
    input.ok_or_else(|| {
        CloudFunctionError::Conversion(format!("function '{}' requires an input message", name))
    })
}

/// Replaces `,` with `|` and strips whitespace around each stage.
pub(crate) fn normalize_definition(definition: &str) -> String {
    definition
        .split(|c| c == ',' || c == '|')
        .map(|s| s.trim())
        .collect::<Vec<_>>()
        .join("|")
}

/// The registered functions, shared by the registry and its router.
#[derive(Debug, Default)]
pub(crate) struct FunctionTable {
    functions: HashMap<String, Arc<FunctionRegistration>>,
}

impl FunctionTable {
    /// Resolves a normalized definition into a call target. A definition
    /// with several stages composes them left to right.
    pub(crate) fn resolve(&self, definition: &str) -> Option<FunctionTarget> {
        let stages = definition
            .split('|')
            .map(|name| self.functions.get(name).cloned())
            .collect::<Option<Vec<_>>>()?;
        match stages.len() {
            0 => None,
            1 => stages.into_iter().next().map(FunctionTarget::Direct),
            _ => Some(FunctionTarget::Composed(stages)),
        }
    }
}

/// Registers functions before the registry is frozen.
pub struct RegistryBuilder {
    table: FunctionTable,
    routing: Option<RoutingConfig>,
    mapper: Arc<dyn JsonMapper>,
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        RegistryBuilder {
            table: FunctionTable::default(),
            routing: None,
            mapper: Arc::new(SerdeJsonMapper),
        }
    }
}

impl RegistryBuilder {
    /// Creates an empty builder without routing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a registration. A later registration replaces an earlier one with
    /// the same name.
    pub fn register(mut self, registration: FunctionRegistration) -> Self {
        self.table
            .functions
            .insert(registration.name.clone(), Arc::new(registration));
        self
    }

    /// Shorthand for [`FunctionRegistration::function`].
    pub fn function<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Message) -> Result<Message> + Send + Sync + 'static,
    {
        self.register(FunctionRegistration::function(name, f))
    }

    /// Shorthand for [`FunctionRegistration::json_function`].
    pub fn json_function<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Value) -> Result<Value> + Send + Sync + 'static,
    {
        self.register(FunctionRegistration::json_function(name, f))
    }

    /// Shorthand for [`FunctionRegistration::consumer`].
    pub fn consumer<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Message) -> Result<()> + Send + Sync + 'static,
    {
        self.register(FunctionRegistration::consumer(name, f))
    }

    /// Shorthand for [`FunctionRegistration::supplier`].
    pub fn supplier<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn() -> Result<Message> + Send + Sync + 'static,
    {
        self.register(FunctionRegistration::supplier(name, f))
    }

    /// Shorthand for [`FunctionRegistration::publisher`].
    pub fn publisher<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Option<Message>) -> Result<BoxStream<'static, Message>> + Send + Sync + 'static,
    {
        self.register(FunctionRegistration::publisher(name, f))
    }

    /// Enables the routing function.
    pub fn routing(mut self, config: RoutingConfig) -> Self {
        self.routing = Some(config);
        self
    }

    /// Sets the JSON mapper used for payload conversion.
    pub fn json_mapper(mut self, mapper: Arc<dyn JsonMapper>) -> Self {
        self.mapper = mapper;
        self
    }

    /// Freezes the registry.
    pub fn build(self) -> Arc<SimpleFunctionRegistry> {
        let table = Arc::new(self.table);
        let router = self
            .routing
            .map(|config| RoutingFunction::new(table.clone(), config, self.mapper.clone()));
        Arc::new(SimpleFunctionRegistry {
            table,
            router,
            mapper: self.mapper,
        })
    }
}

/// An immutable, in-memory [`FunctionCatalog`].
pub struct SimpleFunctionRegistry {
    table: Arc<FunctionTable>,
    router: Option<RoutingFunction>,
    mapper: Arc<dyn JsonMapper>,
}

impl SimpleFunctionRegistry {
    /// Returns a builder for a new registry.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Returns true if the routing function is registered.
    pub fn has_router(&self) -> bool {
        self.router.is_some()
    }
}

impl FunctionCatalog for SimpleFunctionRegistry {
    fn lookup(&self, definition: &str, content_type: &str) -> Option<FunctionInvocationWrapper> {
        let definition = normalize_definition(definition);
        if definition.is_empty() {
            debug!("No function definition provided");
            return None;
        }

        let target = if definition == *ROUTING_FUNCTION_NAME {
            FunctionTarget::Router(self.router.clone()?)
        } else {
            self.table.resolve(&definition)?
        };

        Some(FunctionInvocationWrapper::new(
            definition,
            target,
            content_type,
            self.mapper.clone(),
        ))
    }

    fn names(&self, tag: Option<&str>) -> HashSet<String> {
        let mut names = self
            .table
            .functions
            .values()
            .filter(|r| tag.map_or(true, |t| r.kind.tag() == t))
            .map(|r| r.name.clone())
            .collect::<HashSet<_>>();
        if self.router.is_some() && tag.map_or(true, |t| t == FunctionKind::Function.tag()) {
            names.insert(ROUTING_FUNCTION_NAME.clone());
        }
        names
    }
}
