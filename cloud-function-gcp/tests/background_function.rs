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

use cloud_function::prelude::*;
use cloud_function_gcp::*;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn consumer_receives_payload_and_context() -> Result<()> {
    init();
    let seen: Arc<Mutex<Vec<Message>>> = Arc::new(Mutex::new(vec![]));
    let sink = seen.clone();
    let registry = SimpleFunctionRegistry::builder()
        .consumer("log", move |m| {
            sink.lock().unwrap().push(m);
            Ok(())
        })
        .build();
    let invoker = FunctionInvoker::new(registry, "log")?;

    invoker.accept("hello", &Context::with_event_id("123"))?;

    let seen = seen.lock().unwrap();
    assert_eq!(1, seen.len());
    let message = &seen[0];
    assert_eq!("hello", message.payload_lossy());
    assert_eq!(1, message.headers().len());
    assert_eq!(
        Some(&HeaderValue::Object(json!({"eventId": "123"}))),
        message.headers().get(GCF_CONTEXT)
    );
    Ok(())
}

#[test]
fn context_round_trips_through_the_header() -> Result<()> {
    init();
    let seen: Arc<Mutex<Option<Context>>> = Arc::new(Mutex::new(None));
    let sink = seen.clone();
    let registry = SimpleFunctionRegistry::builder()
        .consumer("inspect", move |m| {
            if let Some(HeaderValue::Object(v)) = m.headers().get(GCF_CONTEXT) {
                *sink.lock().unwrap() = Some(serde_json::from_value(v.clone())?);
            }
            Ok(())
        })
        .build();
    let invoker = FunctionInvoker::new(registry, "inspect")?;

    let context = Context::new("google.pubsub.topic.publish", "projects/sample/topics/events");
    invoker.accept("{}", &context)?;
    assert_eq!(Some(context), *seen.lock().unwrap());
    Ok(())
}

#[test]
fn results_are_dropped() -> Result<()> {
    init();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let registry = SimpleFunctionRegistry::builder()
        .function("shout", move |m: Message| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(MessageBuilder::with_payload(m.payload_lossy().to_uppercase()).build())
        })
        .build();
    let invoker = FunctionInvoker::new(registry, "shout")?;

    invoker.accept("hello", &Context::with_event_id("123"))?;
    assert_eq!(1, calls.load(Ordering::SeqCst));
    Ok(())
}

#[test]
fn void_input_gets_no_message() -> Result<()> {
    init();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let registry = SimpleFunctionRegistry::builder()
        .supplier("tick", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(MessageBuilder::with_payload("tock").build())
        })
        .build();
    let invoker = FunctionInvoker::new(registry, "tick")?;

    invoker.accept("ignored", &Context::with_event_id("1"))?;
    assert_eq!(1, calls.load(Ordering::SeqCst));
    Ok(())
}

#[test]
fn errors_propagate() -> Result<()> {
    init();
    let registry = SimpleFunctionRegistry::builder()
        .consumer("reject", |_| Err(CloudFunctionError::Invocation("rejected".into())))
        .build();
    let invoker = FunctionInvoker::new(registry, "reject")?;

    let err = invoker
        .accept("hello", &Context::with_event_id("123"))
        .unwrap_err();
    assert!(matches!(err, CloudFunctionError::Invocation(_)));
    Ok(())
}
