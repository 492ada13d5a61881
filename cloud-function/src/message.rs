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

//! This module contains the [`Message`] type, the envelope every catalog
//! function consumes and produces. A message is a pair of [`MessageHeaders`]
//! and an opaque byte payload.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::hash_map::{Iter, Keys};
use std::collections::HashMap;
use std::fmt;

/// Header carrying the content type of the payload.
pub const CONTENT_TYPE: &str = "contentType";

/// The value of a message header.
///
/// Hosts translate `List` values into a single comma separated header and
/// stringify every other variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeaderValue {
    /// A single textual value.
    Text(String),
    /// A single integer value, e.g. a status code.
    Integer(i64),
    /// An ordered multi-valued header.
    List(Vec<String>),
    /// A structured value such as an event context.
    Object(Value),
}

impl HeaderValue {
    /// Returns the integer if this is an [`HeaderValue::Integer`].
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            HeaderValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the first textual value of a `Text` or `List` header.
    pub fn first_text(&self) -> Option<&str> {
        match self {
            HeaderValue::Text(s) => Some(s.as_str()),
            HeaderValue::List(values) => values.first().map(|s| s.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderValue::Text(s) => write!(f, "{}", s),
            HeaderValue::Integer(i) => write!(f, "{}", i),
            HeaderValue::List(values) => write!(f, "{}", values.join(",")),
            HeaderValue::Object(v) => write!(f, "{}", v),
        }
    }
}

impl From<&str> for HeaderValue {
    fn from(s: &str) -> Self {
        HeaderValue::Text(s.to_owned())
    }
}

impl From<String> for HeaderValue {
    fn from(s: String) -> Self {
        HeaderValue::Text(s)
    }
}

impl From<i64> for HeaderValue {
    fn from(i: i64) -> Self {
        HeaderValue::Integer(i)
    }
}

impl From<Vec<String>> for HeaderValue {
    fn from(values: Vec<String>) -> Self {
        HeaderValue::List(values)
    }
}

impl From<Value> for HeaderValue {
    fn from(v: Value) -> Self {
        HeaderValue::Object(v)
    }
}

/// The headers of a [`Message`]. Keys are unique.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageHeaders(HashMap<String, HeaderValue>);

impl MessageHeaders {
    /// Returns the value of header `key`.
    pub fn get(&self, key: &str) -> Option<&HeaderValue> {
        self.0.get(key)
    }

    /// Returns true if header `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Sets header `key`, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<HeaderValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// Removes header `key` and returns its value.
    pub fn remove(&mut self, key: &str) -> Option<HeaderValue> {
        self.0.remove(key)
    }

    /// The header names.
    pub fn keys(&self) -> Keys<'_, String, HeaderValue> {
        self.0.keys()
    }

    /// Iterates over all headers in no particular order.
    pub fn iter(&self) -> Iter<'_, String, HeaderValue> {
        self.0.iter()
    }

    /// The number of headers.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no headers.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a MessageHeaders {
    type Item = (&'a String, &'a HeaderValue);
    type IntoIter = Iter<'a, String, HeaderValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl From<HashMap<String, HeaderValue>> for MessageHeaders {
    fn from(map: HashMap<String, HeaderValue>) -> Self {
        MessageHeaders(map)
    }
}

/// A generic message: headers plus an opaque payload.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Message {
    headers: MessageHeaders,
    payload: Bytes,
}

impl Message {
    /// Creates a message from its parts.
    pub fn new(headers: MessageHeaders, payload: Bytes) -> Self {
        Message { headers, payload }
    }

    /// The message headers.
    pub fn headers(&self) -> &MessageHeaders {
        &self.headers
    }

    /// Mutable access to the message headers.
    pub fn headers_mut(&mut self) -> &mut MessageHeaders {
        &mut self.headers
    }

    /// The message payload.
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// The payload decoded as UTF-8, replacing invalid sequences.
    pub fn payload_lossy(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }

    /// Splits the message into its headers and payload.
    pub fn into_parts(self) -> (MessageHeaders, Bytes) {
        (self.headers, self.payload)
    }
}

/// Builds [`Message`]s.
///
/// ```
/// use cloud_function::message::{HeaderValue, MessageBuilder};
///
/// let message = MessageBuilder::with_payload("hello")
///     .set_header("Foo", "bar")
///     .build();
/// assert_eq!(Some(&HeaderValue::from("bar")), message.headers().get("Foo"));
/// ```
#[derive(Debug, Default)]
pub struct MessageBuilder {
    headers: MessageHeaders,
    payload: Bytes,
}

impl MessageBuilder {
    /// Starts a message carrying `payload`.
    pub fn with_payload(payload: impl Into<Bytes>) -> Self {
        MessageBuilder {
            headers: MessageHeaders::default(),
            payload: payload.into(),
        }
    }

    /// Starts a message that copies the headers and payload of `message`.
    pub fn from_message(message: Message) -> Self {
        let (headers, payload) = message.into_parts();
        MessageBuilder { headers, payload }
    }

    /// Copies every `(key, value)` pair into the headers, verbatim.
    pub fn copy_headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<HeaderValue>,
    {
        for (k, v) in headers {
            self.headers.insert(k, v);
        }
        self
    }

    /// Sets a single header.
    pub fn set_header(mut self, key: impl Into<String>, value: impl Into<HeaderValue>) -> Self {
        self.headers.insert(key, value);
        self
    }

    /// Sets a header only if it is not already present.
    pub fn set_header_if_absent(
        mut self,
        key: impl Into<String>,
        value: impl Into<HeaderValue>,
    ) -> Self {
        let key = key.into();
        if !self.headers.contains_key(&key) {
            self.headers.insert(key, value);
        }
        self
    }

    /// Finishes the message.
    pub fn build(self) -> Message {
        Message {
            headers: self.headers,
            payload: self.payload,
        }
    }
}
