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

//! A "prelude" for users of the cloud-function crate.
//!
//! Like the standard library's prelude, this module simplifies importing of
//! common items. Unlike the standard prelude, the contents of this module must
//! be imported manually:
//!
//! ```
//! use cloud_function::prelude::*;
//! ```

pub use crate::catalog::{
    FunctionCatalog, FunctionInvocationWrapper, FunctionKind, FunctionRegistration,
    FunctionTarget, InputType, OutputType, RegistryBuilder, RoutingConfig, RoutingFunction,
    SimpleFunctionRegistry,
};
pub use crate::configs::*;
pub use crate::error::{CloudFunctionError, Result};
pub use crate::json::{json_mapper, JsonMapper, PrettyJsonMapper, SerdeJsonMapper};
pub use crate::message::{HeaderValue, Message, MessageBuilder, MessageHeaders, CONTENT_TYPE};
