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

//! The function catalog: where cloud adapters look up the functions they
//! serve.
//!
//! A lookup returns a [`FunctionInvocationWrapper`], the handle that carries
//! the declared input/output types of the function and applies it to
//! [`Message`](crate::message::Message)s. [`SimpleFunctionRegistry`] is the
//! in-memory catalog; [`RoutingFunction`] is the well-known fallback that
//! dispatches each message to another registered function.

pub mod registry;
pub mod routing;
pub mod wrapper;

pub use registry::{FunctionKind, FunctionRegistration, RegistryBuilder, SimpleFunctionRegistry};
pub use routing::{RoutingCallback, RoutingConfig, RoutingFunction};
pub use wrapper::{FunctionInvocationWrapper, FunctionTarget, InputType, OutputType};

use std::collections::HashSet;

/// FunctionCatalog is a trait that defines the interface for looking up
/// functions by definition.
pub trait FunctionCatalog: Send + Sync {
    /// Looks up the function (or composition, e.g. `uppercase|reverse`) named
    /// by `definition` whose output is to be produced as `content_type`.
    ///
    /// # Returns
    /// `None` if no function matches; an empty definition never matches.
    fn lookup(&self, definition: &str, content_type: &str) -> Option<FunctionInvocationWrapper>;

    /// The names of the registered functions, optionally filtered by a kind
    /// tag (`function`, `consumer` or `supplier`).
    fn names(&self, tag: Option<&str>) -> HashSet<String>;
}
