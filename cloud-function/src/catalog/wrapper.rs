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

//! This module contains the [`FunctionInvocationWrapper`] type, the handle a
//! catalog lookup returns. The wrapper applies the function to a message and
//! converts the function output into a single message.

use super::registry::{FunctionRegistration, Invocable};
use super::routing::RoutingFunction;
use crate::error::{CloudFunctionError, Result};
use crate::json::JsonMapper;
use crate::message::{Message, MessageBuilder, MessageHeaders, CONTENT_TYPE};
use bytes::{Bytes, BytesMut};
use futures::executor::block_on;
use futures::StreamExt;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// The declared input of a function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputType {
    /// The function takes no input and is always invoked without a message.
    Void,
    /// The function takes the message as is.
    Raw,
    /// The function takes the payload parsed as a JSON document.
    Json,
}

/// The declared output cardinality of a function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputType {
    /// The function produces nothing.
    Void,
    /// The function produces at most one message.
    Single,
    /// The function produces a stream of messages.
    Publisher,
}

/// What a handle invokes.
#[derive(Clone)]
pub enum FunctionTarget {
    /// A single registered function.
    Direct(Arc<FunctionRegistration>),
    /// Registered functions applied left to right.
    Composed(Vec<Arc<FunctionRegistration>>),
    /// The routing function, which picks a target per message.
    Router(RoutingFunction),
}

impl fmt::Debug for FunctionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionTarget::Direct(r) => write!(f, "Direct({})", r.name()),
            FunctionTarget::Composed(stages) => write!(
                f,
                "Composed({})",
                stages.iter().map(|s| s.name()).collect::<Vec<_>>().join("|")
            ),
            FunctionTarget::Router(_) => write!(f, "Router"),
        }
    }
}

/// Output of one invocation before conversion.
enum RawOutput {
    Single(Message),
    Stream(Vec<Message>),
}

/// A resolved, invocable function handle.
#[derive(Clone)]
pub struct FunctionInvocationWrapper {
    definition: String,
    target: FunctionTarget,
    accepted_output_types: Vec<String>,
    skip_output_conversion: bool,
    mapper: Arc<dyn JsonMapper>,
}

impl fmt::Debug for FunctionInvocationWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionInvocationWrapper")
            .field("definition", &self.definition)
            .field("target", &self.target)
            .field("accepted_output_types", &self.accepted_output_types)
            .field("skip_output_conversion", &self.skip_output_conversion)
            .field("mapper", &self.mapper.name())
            .finish()
    }
}

impl FunctionInvocationWrapper {
    /// Creates a handle. `content_type` is a comma separated list of the
    /// content types the output may be produced as.
    pub fn new(
        definition: impl Into<String>,
        target: FunctionTarget,
        content_type: &str,
        mapper: Arc<dyn JsonMapper>,
    ) -> Self {
        FunctionInvocationWrapper {
            definition: definition.into(),
            target,
            accepted_output_types: content_type
                .split(',')
                .map(|s| s.trim().to_owned())
                .filter(|s| !s.is_empty())
                .collect(),
            skip_output_conversion: false,
            mapper,
        }
    }

    /// The canonical definition of the function, e.g. `uppercase|reverse`.
    pub fn function_definition(&self) -> &str {
        &self.definition
    }

    /// What this handle invokes.
    pub fn target(&self) -> &FunctionTarget {
        &self.target
    }

    /// The declared input type. A composition takes the input of its first
    /// stage; the router accepts any message.
    pub fn input_type(&self) -> InputType {
        match &self.target {
            FunctionTarget::Direct(r) => r.input_type(),
            FunctionTarget::Composed(stages) => stages
                .first()
                .map_or(InputType::Void, |s| s.input_type()),
            FunctionTarget::Router(_) => InputType::Raw,
        }
    }

    /// The declared output type. A composition produces the output of its
    /// last stage.
    pub fn output_type(&self) -> OutputType {
        match &self.target {
            FunctionTarget::Direct(r) => r.output_type(),
            FunctionTarget::Composed(stages) => stages
                .last()
                .map_or(OutputType::Void, |s| s.output_type()),
            FunctionTarget::Router(_) => OutputType::Single,
        }
    }

    /// Returns true if the output is a stream of messages.
    pub fn is_output_type_publisher(&self) -> bool {
        self.output_type() == OutputType::Publisher
    }

    /// Returns true if the function takes no input.
    pub fn is_input_type_void(&self) -> bool {
        self.input_type() == InputType::Void
    }

    /// When set, outputs are returned without any content type or JSON
    /// conversion; streamed payloads are concatenated as they are.
    pub fn set_skip_output_conversion(&mut self, skip: bool) {
        self.skip_output_conversion = skip;
    }

    /// Returns true if output conversion is skipped.
    pub fn skip_output_conversion(&self) -> bool {
        self.skip_output_conversion
    }

    /// The content types the output may be produced as.
    pub fn accepted_output_types(&self) -> &[String] {
        &self.accepted_output_types
    }

    /// Applies the function to `input`.
    ///
    /// # Returns
    /// `None` if the function produced no message.
    pub fn apply(&self, input: Option<Message>) -> Result<Option<Message>> {
        let output = match &self.target {
            FunctionTarget::Direct(registration) => {
                self.invoke(registration, input)?
            }
            FunctionTarget::Composed(stages) => {
                let (last, init) = stages
                    .split_last()
                    .ok_or(CloudFunctionError::Internal("empty composition".to_owned()))?;
                let mut current = input;
                for stage in init {
                    current = match self.invoke(stage, current)? {
                        Some(output) => Some(self.collapse(output, false)?),
                        None => return Ok(None),
                    };
                }
                self.invoke(last, current)?
            }
            FunctionTarget::Router(router) => {
                return router.route(input, self.accepted_output_types.join(",").as_str());
            }
        };

        match output {
            Some(output) => self.convert_output(output).map(Some),
            None => Ok(None),
        }
    }

    fn invoke(
        &self,
        registration: &FunctionRegistration,
        input: Option<Message>,
    ) -> Result<Option<RawOutput>> {
        let input = match registration.input_type() {
            InputType::Void => None,
            _ => input,
        };
        match &registration.invocable {
            Invocable::Message(f) => Ok(f(input)?.map(RawOutput::Single)),
            Invocable::Json(f) => {
                let message = input.ok_or_else(|| {
                    CloudFunctionError::Conversion(format!(
                        "function '{}' requires a JSON payload",
                        registration.name()
                    ))
                })?;
                let (headers, payload) = message.into_parts();
                let value = f(self.mapper.from_bytes(&payload)?)?;
                let payload = self.mapper.to_bytes(&value)?;
                Ok(Some(RawOutput::Single(Message::new(headers, payload))))
            }
            Invocable::Publisher(f) => {
                let stream = f(input)?;
                Ok(Some(RawOutput::Stream(block_on(stream.collect::<Vec<_>>()))))
            }
        }
    }

    /// Turns an output into a single message.
    fn collapse(&self, output: RawOutput, raw: bool) -> Result<Message> {
        match output {
            RawOutput::Single(message) => Ok(message),
            RawOutput::Stream(items) if raw => {
                let mut headers = None;
                let mut payload = BytesMut::new();
                for item in items {
                    let (h, p) = item.into_parts();
                    headers.get_or_insert(h);
                    payload.extend_from_slice(&p);
                }
                Ok(Message::new(headers.unwrap_or_default(), payload.freeze()))
            }
            RawOutput::Stream(items) => {
                let headers = items
                    .first()
                    .map(|m| m.headers().clone())
                    .unwrap_or_else(MessageHeaders::default);
                let values = items
                    .iter()
                    .map(|m| {
                        self.mapper
                            .from_bytes(m.payload())
                            .unwrap_or_else(|_| Value::String(m.payload_lossy()))
                    })
                    .collect::<Vec<_>>();
                let payload: Bytes = self.mapper.to_bytes(&Value::Array(values))?;
                Ok(Message::new(headers, payload))
            }
        }
    }

    fn convert_output(&self, output: RawOutput) -> Result<Message> {
        if self.skip_output_conversion {
            return self.collapse(output, true);
        }
        let message = self.collapse(output, false)?;
        match self.accepted_output_types.first() {
            Some(content_type) => Ok(MessageBuilder::from_message(message)
                .set_header_if_absent(CONTENT_TYPE, content_type.as_str())
                .build()),
            None => Ok(message),
        }
    }
}
