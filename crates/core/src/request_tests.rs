// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use yare::parameterized;

#[parameterized(
    get = { "GET", Method::Get },
    lower_post = { "post", Method::Post },
    mixed_patch = { "PaTcH", Method::Patch },
    padded_delete = { "  delete ", Method::Delete },
    custom = { "purge", Method::Other("PURGE".into()) },
)]
fn method_parse(raw: &str, expected: Method) {
    assert_eq!(Method::parse(raw).unwrap(), expected);
}

#[parameterized(
    empty = { "", ValidationError::MissingMethod },
    blank = { "   ", ValidationError::MissingMethod },
    space_inside = { "GE T", ValidationError::InvalidMethod("GE T".into()) },
    slash = { "GET/", ValidationError::InvalidMethod("GET/".into()) },
)]
fn method_parse_rejects(raw: &str, expected: ValidationError) {
    assert_eq!(Method::parse(raw).unwrap_err(), expected);
}

#[parameterized(
    get = { Method::Get, true },
    head = { Method::Head, true },
    options = { Method::Options, true },
    post = { Method::Post, false },
    put = { Method::Put, false },
    delete = { Method::Delete, false },
    custom = { Method::Other("PURGE".into()), false },
)]
fn method_is_read(method: Method, expected: bool) {
    assert_eq!(method.is_read(), expected);
}

#[test]
fn descriptor_validate() {
    assert!(RequestDescriptor::post("/orders").validate().is_ok());
    assert_eq!(
        RequestDescriptor::post("  ").validate().unwrap_err(),
        ValidationError::MissingUrl
    );
    assert_eq!(
        RequestDescriptor::new(Method::Other(String::new()), "/x")
            .validate()
            .unwrap_err(),
        ValidationError::MissingMethod
    );
}

#[test]
fn descriptor_serializes_body_as_base64() {
    let req = RequestDescriptor::post("/orders").with_body(vec![0u8, 159, 146, 150]);
    let json = serde_json::to_value(&req).unwrap();
    assert_eq!(json["method"], "POST");
    assert_eq!(json["body"], "AJ+Slg==");

    let back: RequestDescriptor = serde_json::from_value(json).unwrap();
    assert_eq!(back, req);
}

#[test]
fn descriptor_without_body_or_headers_deserializes() {
    let req: RequestDescriptor =
        serde_json::from_str(r#"{"method":"delete","url":"/orders/1"}"#).unwrap();
    assert_eq!(req.method, Method::Delete);
    assert!(req.headers.is_empty());
    assert!(req.body.is_none());
}

#[test]
fn descriptor_rejects_bad_method_on_deserialize() {
    let result: Result<RequestDescriptor, _> =
        serde_json::from_str(r#"{"method":"","url":"/orders"}"#);
    assert!(result.is_err());
}

#[test]
fn with_json_sets_content_type() {
    let req = RequestDescriptor::post("/orders").with_json(&serde_json::json!({"item": "x"}));
    assert_eq!(
        req.headers,
        vec![("Content-Type".to_string(), "application/json".to_string())]
    );
    assert_eq!(req.body.as_deref(), Some(br#"{"item":"x"}"#.as_slice()));
}

#[test]
fn placeholder_is_accepted_json() {
    let resp = Response::placeholder("Request queued", true);
    assert!(resp.is_success());
    assert_eq!(resp.status, PLACEHOLDER_STATUS);
    assert_eq!(resp.header("content-type"), Some("application/json"));

    let body = resp.json().unwrap();
    assert_eq!(body["message"], "Request queued");
    assert_eq!(body["queued"], true);
}

#[test]
fn response_helpers() {
    let resp = Response::new(404, vec![("X-Trace".into(), "abc".into())], "missing");
    assert!(!resp.is_success());
    assert_eq!(resp.header("x-trace"), Some("abc"));
    assert_eq!(resp.header("x-other"), None);
    assert_eq!(resp.text(), "missing");
}
