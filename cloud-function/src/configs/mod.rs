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

//! Configuration settings shared by the function catalog and the cloud
//! adapters. Defaults live in the embedded `config.toml`; the process
//! environment overrides them at cold start.

use crate::error::Result;
use crate::json::{json_mapper, JsonMapper};
use ini::Ini;
use lazy_static::lazy_static;
use std::sync::Arc;

lazy_static! {
    /// Global settings.
    pub static ref FUNCTION_CONF: Ini = Ini::load_from_str(include_str!("./config.toml")).unwrap();

    /// Environment variable naming the function definition to serve.
    pub static ref FUNCTION_DEFINITION_ENV: String = FUNCTION_CONF["function"]["definition_env"].to_string();
    /// Environment variable selecting the JSON mapper.
    pub static ref FUNCTION_JSON_MAPPER_ENV: String = FUNCTION_CONF["function"]["json_mapper_env"].to_string();
    /// JSON mapper used when the environment does not select one.
    pub static ref DEFAULT_JSON_MAPPER: String = FUNCTION_CONF["function"]["json_mapper"].to_string();
    /// Content type the adapters request when looking up a function.
    pub static ref DEFAULT_CONTENT_TYPE: String = FUNCTION_CONF["function"]["content_type"].to_string();

    /// Well-known name of the routing function.
    pub static ref ROUTING_FUNCTION_NAME: String = FUNCTION_CONF["routing"]["function_name"].to_string();
    /// Message header carrying the definition the routing function dispatches to.
    pub static ref ROUTING_DEFINITION_HEADER: String = FUNCTION_CONF["routing"]["definition_header"].to_string();
}

/// The settings an adapter reads once at cold start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionConfig {
    /// The function definition to serve. Empty selects the routing function.
    pub definition: String,
    /// The name of the JSON mapper used for payload conversion.
    pub json_mapper: String,
}

impl Default for FunctionConfig {
    fn default() -> Self {
        FunctionConfig {
            definition: String::new(),
            json_mapper: DEFAULT_JSON_MAPPER.clone(),
        }
    }
}

impl FunctionConfig {
    /// Creates a configuration with an explicit definition and JSON mapper.
    pub fn new(definition: impl Into<String>, json_mapper: impl Into<String>) -> Self {
        FunctionConfig {
            definition: definition.into(),
            json_mapper: json_mapper.into(),
        }
    }

    /// Reads the configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, applying the defaults of
    /// [`FUNCTION_CONF`] for missing variables.
    pub fn from_vars<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let definition = lookup(FUNCTION_DEFINITION_ENV.as_str())
            .map(|d| d.trim().to_owned())
            .unwrap_or_default();
        let json_mapper = lookup(FUNCTION_JSON_MAPPER_ENV.as_str())
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_JSON_MAPPER.clone());
        FunctionConfig {
            definition,
            json_mapper,
        }
    }

    /// Returns the JSON mapper selected by this configuration.
    pub fn mapper(&self) -> Result<Arc<dyn JsonMapper>> {
        json_mapper(&self.json_mapper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CloudFunctionError;
    use std::collections::HashMap;

    #[test]
    fn setting_shows() -> Result<()> {
        let conf = Ini::load_from_str(include_str!("./config.toml")).unwrap();

        for (sec, prop) in &conf {
            println!("Section: {:?}", sec);
            for (key, value) in prop.iter() {
                println!("{:?}:{:?}", key, value);
            }
        }

        assert_eq!("functionRouter", &conf["routing"]["function_name"]);
        assert_eq!("application/json", &conf["function"]["content_type"]);
        assert_eq!("serde_json", &conf["function"]["json_mapper"]);

        Ok(())
    }

    #[test]
    fn missing_variables_use_defaults() -> Result<()> {
        let conf = FunctionConfig::from_vars(|_| None);
        assert_eq!(FunctionConfig::default(), conf);
        assert_eq!("", conf.definition);
        assert_eq!("serde_json", conf.mapper()?.name());
        Ok(())
    }

    #[test]
    fn environment_overrides_defaults() -> Result<()> {
        let vars: HashMap<&str, &str> = vec![
            ("FUNCTION_DEFINITION", " uppercase|reverse "),
            ("FUNCTION_JSON_MAPPER", "pretty"),
        ]
        .into_iter()
        .collect();
        let conf = FunctionConfig::from_vars(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!("uppercase|reverse", conf.definition);
        assert_eq!("pretty", conf.mapper()?.name());
        Ok(())
    }

    #[test]
    fn unknown_mapper_is_rejected() {
        let conf = FunctionConfig::new("echo", "gson");
        assert!(matches!(
            conf.mapper(),
            Err(CloudFunctionError::Configuration(_))
        ));
    }
}
