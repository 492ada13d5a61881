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

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn registry(routing: bool) -> RegistryBuilder {
    let builder = SimpleFunctionRegistry::builder()
        .function("uppercase", |m: Message| {
            Ok(MessageBuilder::with_payload(m.payload_lossy().to_uppercase()).build())
        })
        .function("reverse", |m: Message| {
            Ok(MessageBuilder::with_payload(m.payload_lossy().chars().rev().collect::<String>())
                .build())
        });
    if routing {
        builder.routing(RoutingConfig::default().with_default_route("reverse"))
    } else {
        builder
    }
}

fn serve(invoker: &FunctionInvoker, request: BufferedHttpRequest) -> Result<String> {
    let mut request = request;
    let mut response = BufferedHttpResponse::new();
    invoker.service(&mut request, &mut response)?;
    Ok(String::from_utf8_lossy(response.body()).into_owned())
}

#[test]
fn unknown_function_falls_back_to_the_router() -> Result<()> {
    init();
    let invoker = FunctionInvoker::new(registry(true).build(), "missing")?;
    assert_eq!("functionRouter", invoker.function_name());

    assert_eq!("olleh", serve(&invoker, BufferedHttpRequest::new("hello"))?);
    let routed = BufferedHttpRequest::new("hello").header("function.definition", "uppercase");
    assert_eq!("HELLO", serve(&invoker, routed)?);
    Ok(())
}

#[test]
fn empty_definition_uses_the_router() -> Result<()> {
    init();
    let config = FunctionConfig::from_vars(|_| None);
    let invoker = FunctionInvoker::from_registry(registry(true), &config)?;
    assert_eq!("functionRouter", invoker.function_name());
    Ok(())
}

#[test]
fn direct_match_wins_over_the_router() -> Result<()> {
    init();
    let invoker = FunctionInvoker::new(registry(true).build(), "uppercase")?;
    assert_eq!("uppercase", invoker.function_name());
    assert!(matches!(invoker.function().target(), FunctionTarget::Direct(_)));
    Ok(())
}

#[test]
fn composition_is_resolved_once() -> Result<()> {
    init();
    let config = FunctionConfig::new("uppercase,reverse", "serde_json");
    let invoker = FunctionInvoker::from_registry(registry(false), &config)?;
    assert_eq!("uppercase|reverse", invoker.function_name());
    assert_eq!("OLLEH", serve(&invoker, BufferedHttpRequest::new("hello"))?);
    assert_eq!("DLROW", serve(&invoker, BufferedHttpRequest::new("world"))?);
    Ok(())
}

#[test]
fn nothing_to_resolve_is_fatal() {
    init();
    let err = FunctionInvoker::new(registry(false).build(), "missing")
        .err()
        .unwrap();
    assert!(matches!(err, CloudFunctionError::FunctionNotFound(_)));

    let err = FunctionInvoker::new(registry(false).build(), "").err().unwrap();
    assert!(matches!(err, CloudFunctionError::FunctionNotFound(_)));
}

#[test]
fn unknown_mapper_is_fatal() {
    init();
    let config = FunctionConfig::new("uppercase", "gson");
    let err = FunctionInvoker::from_registry(registry(false), &config)
        .err()
        .unwrap();
    assert!(matches!(err, CloudFunctionError::Configuration(_)));
}

#[test]
fn catalog_is_kept() -> Result<()> {
    init();
    let invoker = FunctionInvoker::new(registry(true).build(), "uppercase")?;
    let names = invoker.catalog().names(None);
    assert!(names.contains("uppercase"));
    assert!(names.contains("reverse"));
    assert!(names.contains("functionRouter"));
    Ok(())
}
