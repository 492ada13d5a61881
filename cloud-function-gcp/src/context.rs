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

//! The metadata Google Cloud Functions passes along with a background event.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Event context of a background function invocation.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Context {
    /// A unique ID for the event.
    pub event_id: String,
    /// RFC 3339 timestamp of the event.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub timestamp: String,
    /// The type of the event, e.g. `google.pubsub.topic.publish`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub event_type: String,
    /// The resource that emitted the event.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub resource: String,
    /// Extra attributes of the event.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub attributes: HashMap<String, String>,
}

impl Context {
    /// Creates a context with a fresh event id, stamped with the current time.
    pub fn new(event_type: impl Into<String>, resource: impl Into<String>) -> Self {
        Context {
            event_id: Uuid::new_v4().to_string(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            event_type: event_type.into(),
            resource: resource.into(),
            attributes: HashMap::new(),
        }
    }

    /// Creates a context carrying only an event id.
    pub fn with_event_id(event_id: impl Into<String>) -> Self {
        Context {
            event_id: event_id.into(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_in_camel_case() -> serde_json::Result<()> {
        let context = Context::with_event_id("123");
        assert_eq!(json!({"eventId": "123"}), serde_json::to_value(&context)?);

        let mut context = Context::new("google.pubsub.topic.publish", "projects/p/topics/t");
        context.attributes.insert("k".to_owned(), "v".to_owned());
        let value = serde_json::to_value(&context)?;
        assert_eq!("google.pubsub.topic.publish", value["eventType"]);
        assert_eq!("v", value["attributes"]["k"]);
        assert_eq!(context, serde_json::from_value(value)?);
        Ok(())
    }
}
