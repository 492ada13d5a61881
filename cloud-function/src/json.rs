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

//! JSON mappers convert between message payloads and [`serde_json::Value`]s.
//! The mapper in use is selected by name at cold start.

use crate::error::{CloudFunctionError, Result};
use bytes::Bytes;
use serde_json::Value;
use std::sync::Arc;

/// Converts payload bytes to and from JSON values.
pub trait JsonMapper: Send + Sync {
    /// The name the mapper is selected by.
    fn name(&self) -> &'static str;

    /// Serializes a JSON value into payload bytes.
    fn to_bytes(&self, value: &Value) -> Result<Bytes>;

    /// Parses payload bytes into a JSON value.
    fn from_bytes(&self, bytes: &[u8]) -> Result<Value> {
        serde_json::from_slice(bytes).map_err(|e| CloudFunctionError::Conversion(e.to_string()))
    }
}

/// Compact serde_json output. This is the default mapper.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerdeJsonMapper;

impl JsonMapper for SerdeJsonMapper {
    fn name(&self) -> &'static str {
        "serde_json"
    }

    fn to_bytes(&self, value: &Value) -> Result<Bytes> {
        Ok(Bytes::from(serde_json::to_vec(value)?))
    }
}

/// Human readable, indented serde_json output.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrettyJsonMapper;

impl JsonMapper for PrettyJsonMapper {
    fn name(&self) -> &'static str {
        "pretty"
    }

    fn to_bytes(&self, value: &Value) -> Result<Bytes> {
        Ok(Bytes::from(serde_json::to_vec_pretty(value)?))
    }
}

/// Returns the mapper registered under `name`.
pub fn json_mapper(name: &str) -> Result<Arc<dyn JsonMapper>> {
    match name.trim() {
        "serde_json" => Ok(Arc::new(SerdeJsonMapper)),
        "pretty" => Ok(Arc::new(PrettyJsonMapper)),
        other => Err(CloudFunctionError::Configuration(format!(
            "unknown JSON mapper '{}', expected one of: serde_json, pretty",
            other
        ))),
    }
}
