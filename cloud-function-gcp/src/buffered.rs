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

//! In-memory implementations of [`HttpRequest`] and [`HttpResponse`] that
//! convert from and to the `http` crate types, so that any `http` based host
//! can drive a [`FunctionInvoker`](crate::FunctionInvoker).

use crate::host::{HttpRequest, HttpResponse};
use bytes::Bytes;
use cloud_function::error::{CloudFunctionError, Result};
use std::collections::HashMap;
use std::io::{Cursor, Read, Write};

const CONTENT_TYPE_HEADER: &str = "Content-Type";

/// A request whose body is fully buffered.
#[derive(Debug, Clone)]
pub struct BufferedHttpRequest {
    headers: HashMap<String, Vec<String>>,
    body: Cursor<Bytes>,
}

impl BufferedHttpRequest {
    /// Creates a request carrying `body` and no headers.
    pub fn new(body: impl Into<Bytes>) -> Self {
        BufferedHttpRequest {
            headers: HashMap::new(),
            body: Cursor::new(body.into()),
        }
    }

    /// Adds a value to header `key`.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .entry(key.into())
            .or_insert_with(Vec::new)
            .push(value.into());
        self
    }

    /// Sets the `Content-Type` header.
    pub fn with_content_type(self, content_type: impl Into<String>) -> Self {
        self.header(CONTENT_TYPE_HEADER, content_type)
    }
}

impl From<http::Request<Bytes>> for BufferedHttpRequest {
    fn from(request: http::Request<Bytes>) -> Self {
        let (parts, body) = request.into_parts();
        let mut headers: HashMap<String, Vec<String>> = HashMap::new();
        for (name, value) in parts.headers.iter() {
            headers
                .entry(name.as_str().to_owned())
                .or_insert_with(Vec::new)
                .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
        }
        BufferedHttpRequest {
            headers,
            body: Cursor::new(body),
        }
    }
}

impl HttpRequest for BufferedHttpRequest {
    fn reader(&mut self) -> &mut dyn Read {
        &mut self.body
    }

    fn headers(&self) -> &HashMap<String, Vec<String>> {
        &self.headers
    }

    fn content_type(&self) -> Option<String> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(CONTENT_TYPE_HEADER))
            .and_then(|(_, v)| v.first().cloned())
    }
}

/// A response that buffers its body and headers until it is converted with
/// [`BufferedHttpResponse::into_http`].
#[derive(Debug, Clone)]
pub struct BufferedHttpResponse {
    status: u16,
    headers: HashMap<String, Vec<String>>,
    content_type: Option<String>,
    body: Vec<u8>,
}

impl Default for BufferedHttpResponse {
    fn default() -> Self {
        BufferedHttpResponse {
            status: 200,
            headers: HashMap::new(),
            content_type: None,
            body: Vec::new(),
        }
    }
}

impl BufferedHttpResponse {
    /// Creates an empty `200 OK` response.
    pub fn new() -> Self {
        Self::default()
    }

    /// The status code.
    pub fn status_code(&self) -> u16 {
        self.status
    }

    /// All header values.
    pub fn headers(&self) -> &HashMap<String, Vec<String>> {
        &self.headers
    }

    /// The values of header `key` joined with `,`.
    pub fn header(&self, key: &str) -> Option<String> {
        self.headers.get(key).map(|v| v.join(","))
    }

    /// The content type set on the response.
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// The body written so far.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Converts the response into an `http` response. A content type set on
    /// the response replaces any `Content-Type` header appended to it.
    pub fn into_http(self) -> Result<http::Response<Bytes>> {
        let mut builder = http::Response::builder().status(self.status);
        let has_content_type = self.content_type.is_some();
        for (key, values) in &self.headers {
            if has_content_type && key.eq_ignore_ascii_case(CONTENT_TYPE_HEADER) {
                continue;
            }
            for value in values {
                builder = builder.header(key.as_str(), value.as_str());
            }
        }
        if let Some(content_type) = &self.content_type {
            builder = builder.header(http::header::CONTENT_TYPE, content_type.as_str());
        }
        builder
            .body(Bytes::from(self.body))
            .map_err(|e| CloudFunctionError::Conversion(e.to_string()))
    }
}

impl HttpResponse for BufferedHttpResponse {
    fn writer(&mut self) -> &mut dyn Write {
        &mut self.body
    }

    fn append_header(&mut self, key: &str, value: &str) {
        self.headers
            .entry(key.to_owned())
            .or_insert_with(Vec::new)
            .push(value.to_owned());
    }

    fn set_content_type(&mut self, content_type: &str) {
        self.content_type = Some(content_type.to_owned());
    }

    fn set_status_code(&mut self, code: u16) {
        self.status = code;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_from_http() -> Result<()> {
        let request = http::Request::builder()
            .method("POST")
            .header("Foo", "bar")
            .header("Accept", "text/plain")
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .body(Bytes::from_static(b"{\"x\":1}"))
            .map_err(|e| CloudFunctionError::Conversion(e.to_string()))?;
        let mut request = BufferedHttpRequest::from(request);

        assert_eq!(Some(&vec!["bar".to_owned()]), request.headers().get("foo"));
        assert_eq!(
            Some(&vec!["text/plain".to_owned(), "application/json".to_owned()]),
            request.headers().get("accept")
        );
        assert_eq!(Some("application/json".to_owned()), request.content_type());

        let built = BufferedHttpRequest::new("").with_content_type("text/plain");
        assert_eq!(Some("text/plain".to_owned()), built.content_type());

        let mut body = String::new();
        request.reader().read_to_string(&mut body)?;
        assert_eq!("{\"x\":1}", body);
        Ok(())
    }

    #[test]
    fn response_into_http() -> Result<()> {
        let mut response = BufferedHttpResponse::new();
        response.writer().write_all(b"created")?;
        response.append_header("Foo", "bar");
        response.append_header("Foo", "baz");
        response.set_content_type("text/plain");
        response.set_status_code(201);
        assert_eq!(Some("bar,baz".to_owned()), response.header("Foo"));

        let response = response.into_http()?;
        assert_eq!(201, response.status().as_u16());
        assert_eq!(2, response.headers().get_all("foo").iter().count());
        assert_eq!("text/plain", response.headers()[http::header::CONTENT_TYPE]);
        assert_eq!(&Bytes::from_static(b"created"), response.body());
        Ok(())
    }

    #[test]
    fn content_type_is_emitted_once() -> Result<()> {
        let mut response = BufferedHttpResponse::new();
        response.append_header("content-type", "text/plain");
        response.append_header("Content-Type", "text/plain");
        response.set_content_type("application/json");

        let response = response.into_http()?;
        let values = response
            .headers()
            .get_all(http::header::CONTENT_TYPE)
            .iter()
            .collect::<Vec<_>>();
        assert_eq!(vec!["application/json"], values);
        Ok(())
    }

    #[test]
    fn appended_content_type_is_kept_without_override() -> Result<()> {
        let mut response = BufferedHttpResponse::new();
        response.append_header("Content-Type", "text/plain");

        let response = response.into_http()?;
        assert_eq!(1, response.headers().get_all(http::header::CONTENT_TYPE).iter().count());
        assert_eq!("text/plain", response.headers()[http::header::CONTENT_TYPE]);
        Ok(())
    }

    #[test]
    fn invalid_status_fails_conversion() {
        let mut response = BufferedHttpResponse::new();
        response.set_status_code(42);
        assert!(matches!(
            response.into_http(),
            Err(CloudFunctionError::Conversion(_))
        ));
    }
}
