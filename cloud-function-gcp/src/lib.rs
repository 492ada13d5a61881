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

#![warn(missing_docs, clippy::needless_borrow)]

//! `cloud-function-gcp` serves functions of a
//! [`cloud_function`] catalog on Google Cloud Functions, as HTTP functions
//! and as raw background functions.
//!
//! ```
//! use cloud_function::prelude::*;
//! use cloud_function_gcp::{BufferedHttpRequest, BufferedHttpResponse, FunctionInvoker, HttpFunction};
//!
//! let registry = SimpleFunctionRegistry::builder()
//!     .function("echo", |m: Message| Ok(m))
//!     .build();
//! let invoker = FunctionInvoker::new(registry, "echo").unwrap();
//!
//! let mut request = BufferedHttpRequest::new("{\"x\":1}").header("Foo", "bar");
//! let mut response = BufferedHttpResponse::new();
//! invoker.service(&mut request, &mut response).unwrap();
//! assert_eq!(b"{\"x\":1}", response.body());
//! assert_eq!(Some("bar".to_owned()), response.header("Foo"));
//! ```

pub mod buffered;
pub mod context;
pub mod host;
pub mod invoker;

pub use buffered::{BufferedHttpRequest, BufferedHttpResponse};
pub use context::Context;
pub use host::{HttpFunction, HttpRequest, HttpResponse, RawBackgroundFunction};
pub use invoker::{resolve_function, FunctionInvoker, GCF_CONTEXT, HTTP_STATUS_CODE};
