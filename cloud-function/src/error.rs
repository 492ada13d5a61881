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

//! Cloud function error types

use std::error;
use std::fmt::{Display, Formatter};
use std::io;
use std::result;

/// Result type for operations that could result in an [CloudFunctionError]
pub type Result<T> = result::Result<T, CloudFunctionError>;

/// Cloud function error
#[derive(Debug)]
pub enum CloudFunctionError {
    /// Error returned when neither the requested function nor the routing
    /// function can be located in the catalog. The process cannot serve any
    /// request in this state.
    FunctionNotFound(String),
    /// Error returned when the routing function cannot determine (or locate)
    /// the function a message should be dispatched to.
    Routing(String),
    /// Error returned when a payload cannot be converted to or from the type
    /// a function declares.
    Conversion(String),
    /// Error raised by a user function during its invocation.
    Invocation(Box<dyn std::error::Error + Send + Sync>),
    /// Error returned when the configuration is invalid, e.g. an unknown
    /// JSON mapper is selected.
    Configuration(String),
    /// Error associated to I/O operations and associated traits.
    IoError(io::Error),
    /// Error returned when serde_json failed to serialize or deserialize data.
    SerdeJson(serde_json::Error),
    /// Error returned as a consequence of an internal invariant that is not
    /// verified during execution. This error should not happen in normal
    /// usage.
    Internal(String),
}

impl From<io::Error> for CloudFunctionError {
    fn from(e: io::Error) -> Self {
        CloudFunctionError::IoError(e)
    }
}

impl From<serde_json::Error> for CloudFunctionError {
    fn from(e: serde_json::Error) -> Self {
        CloudFunctionError::SerdeJson(e)
    }
}

impl From<Box<dyn std::error::Error + Send + Sync>> for CloudFunctionError {
    fn from(e: Box<dyn std::error::Error + Send + Sync>) -> Self {
        CloudFunctionError::Invocation(e)
    }
}

impl From<&str> for CloudFunctionError {
    fn from(e: &str) -> Self {
        CloudFunctionError::Internal(e.to_string())
    }
}

impl Display for CloudFunctionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match *self {
            CloudFunctionError::FunctionNotFound(ref desc) => {
                write!(f, "Failed to lookup function: {}", desc)
            }
            CloudFunctionError::Routing(ref desc) => write!(f, "Routing error: {}", desc),
            CloudFunctionError::Conversion(ref desc) => write!(f, "Conversion error: {}", desc),
            CloudFunctionError::Invocation(ref desc) => write!(f, "Invocation error: {}", desc),
            CloudFunctionError::Configuration(ref desc) => {
                write!(f, "Configuration error: {}", desc)
            }
            CloudFunctionError::IoError(ref desc) => write!(f, "IO error: {}", desc),
            CloudFunctionError::SerdeJson(ref desc) => write!(f, "serde_json error: {:?}", desc),
            CloudFunctionError::Internal(ref desc) => write!(
                f,
                "Internal error: {}. This was likely caused by a bug in the function catalog \
                    and we would welcome that you file an bug report in our issue tracker",
                desc
            ),
        }
    }
}

impl error::Error for CloudFunctionError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_errors_become_invocation_errors() {
        let boxed: Box<dyn std::error::Error + Send + Sync> = "boom".into();
        let err: CloudFunctionError = boxed.into();
        assert!(matches!(err, CloudFunctionError::Invocation(_)));
        assert_eq!("Invocation error: boom", err.to_string());
    }

    #[test]
    fn not_found_names_the_function() {
        let err = CloudFunctionError::FunctionNotFound("uppercase".to_owned());
        assert_eq!("Failed to lookup function: uppercase", err.to_string());
    }
}
