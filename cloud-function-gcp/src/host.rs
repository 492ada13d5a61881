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

//! The invocation contract of Google Cloud Functions: what the host hands to
//! a function and what it expects back.

use crate::context::Context;
use cloud_function::error::Result;
use std::collections::HashMap;
use std::io::{Read, Write};

/// An inbound HTTP request.
pub trait HttpRequest {
    /// The request body.
    fn reader(&mut self) -> &mut dyn Read;

    /// The request headers. A header may carry several values.
    fn headers(&self) -> &HashMap<String, Vec<String>>;

    /// The declared content type of the body, if any.
    fn content_type(&self) -> Option<String>;
}

/// An outbound HTTP response.
pub trait HttpResponse {
    /// The response body.
    fn writer(&mut self) -> &mut dyn Write;

    /// Adds a value to header `key`.
    fn append_header(&mut self, key: &str, value: &str);

    /// Sets the content type of the body.
    fn set_content_type(&mut self, content_type: &str);

    /// Sets the status code.
    fn set_status_code(&mut self, code: u16);
}

/// A function served over HTTP.
pub trait HttpFunction {
    /// Handles one request. Errors are reported to the host as an
    /// invocation failure.
    fn service(&self, request: &mut dyn HttpRequest, response: &mut dyn HttpResponse)
        -> Result<()>;
}

/// A function triggered by a background event. There is no channel to return
/// data to the event source.
pub trait RawBackgroundFunction {
    /// Handles one event whose payload is the raw JSON `json`.
    fn accept(&self, json: &str, context: &Context) -> Result<()>;
}
