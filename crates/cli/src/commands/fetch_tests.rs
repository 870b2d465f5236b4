// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::commands::testing::TestContext;
use outpost_core::Fingerprint;
use std::io::Write;
use yare::parameterized;

fn args<'a>(method: &'a str, url: &'a str) -> FetchArgs<'a> {
    FetchArgs {
        method,
        url,
        headers: &[],
        data: None,
        offline: false,
        output: OutputFormat::Text,
    }
}

#[parameterized(
    plain = { "Accept: text/plain", "Accept", "text/plain" },
    padded = { "  X-Trace :  42  ", "X-Trace", "42" },
    colon_in_value = { "Link: <https://a.example/x>", "Link", "<https://a.example/x>" },
    empty_value = { "X-Empty:", "X-Empty", "" },
)]
fn parse_header_accepts(raw: &str, name: &str, value: &str) {
    let (n, v) = parse_header(raw).unwrap();
    assert_eq!(n, name);
    assert_eq!(v, value);
}

#[parameterized(
    no_colon = { "Accept text/plain" },
    empty_name = { ": value" },
    spaced_name = { "X Trace: 1" },
)]
fn parse_header_rejects(raw: &str) {
    assert!(matches!(parse_header(raw), Err(Error::InvalidHeader(_))));
}

#[test]
fn read_body_literal() {
    let body = read_body(r#"{"a":1}"#, std::io::empty()).unwrap();
    assert_eq!(body, br#"{"a":1}"#);
}

#[test]
fn read_body_from_stdin() {
    let body = read_body("@-", &b"piped"[..]).unwrap();
    assert_eq!(body, b"piped");
}

#[test]
fn read_body_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"from file").unwrap();
    let data = format!("@{}", file.path().display());

    assert_eq!(read_body(&data, std::io::empty()).unwrap(), b"from file");
}

#[test]
fn read_body_missing_file_is_io_error() {
    let result = read_body("@/definitely/not/here", std::io::empty());
    assert!(matches!(result, Err(Error::Io(_))));
}

#[test]
fn build_request_rejects_bad_method() {
    let result = build_request("FETCH ME", "/x", &[], None);
    assert!(matches!(result, Err(Error::Validation(_))));
}

#[test]
fn build_request_rejects_blank_url() {
    let result = build_request("GET", "  ", &[], None);
    assert!(matches!(result, Err(Error::Validation(_))));
}

#[test]
fn build_request_keeps_header_order() {
    let headers = vec!["B: 2".to_string(), "A: 1".to_string()];
    let request = build_request("put", "/items/1", &headers, Some(b"x".to_vec())).unwrap();

    assert_eq!(request.method, Method::Put);
    assert_eq!(
        request.headers,
        vec![
            ("B".to_string(), "2".to_string()),
            ("A".to_string(), "1".to_string())
        ]
    );
    assert_eq!(request.body.as_deref(), Some(&b"x"[..]));
}

#[tokio::test]
async fn online_get_returns_live_response_and_caches_it() {
    let t = TestContext::new().await;
    t.transport
        .respond_with(Response::new(200, Vec::new(), r#"{"id":1}"#));

    let out = run_impl(&t.ctx, args("GET", "/items/1"), std::io::empty())
        .await
        .unwrap();

    assert_eq!(out, "HTTP 200\n\n{\"id\":1}");
    let keys = t.ctx.cache.list_keys().await.unwrap();
    assert_eq!(keys, vec![Fingerprint::of(&RequestDescriptor::get("/items/1"))]);
}

#[tokio::test]
async fn offline_flag_serves_from_cache_without_network() {
    let t = TestContext::new().await;
    t.transport.respond_with(Response::new(200, Vec::new(), "cached"));
    run_impl(&t.ctx, args("GET", "/items/1"), std::io::empty())
        .await
        .unwrap();
    let sent_before = t.transport.sent().len();

    let mut offline = args("GET", "/items/1");
    offline.offline = true;
    let out = run_impl(&t.ctx, offline, std::io::empty()).await.unwrap();

    assert_eq!(out, "HTTP 200\n\ncached");
    assert_eq!(t.transport.sent().len(), sent_before);
}

#[tokio::test]
async fn offline_write_is_queued() {
    let t = TestContext::new().await;
    t.transport.set_online(false);

    let mut post = args("POST", "/orders");
    post.data = Some(r#"{"item":"x"}"#);
    post.output = OutputFormat::Json;
    let out = run_impl(&t.ctx, post, std::io::empty()).await.unwrap();

    let value: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(value["status"], 202);
    assert_eq!(value["body"]["queued"], true);
    assert_eq!(value["body"]["message"], "Offline. Request queued.");

    let queued = t.ctx.queue.snapshot().await;
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].request.body.as_deref(), Some(&br#"{"item":"x"}"#[..]));
}

#[tokio::test]
async fn offline_read_without_cache_gets_placeholder() {
    let t = TestContext::new().await;
    let mut get = args("GET", "/nothing");
    get.offline = true;

    let out = run_impl(&t.ctx, get, std::io::empty()).await.unwrap();

    assert!(out.starts_with("HTTP 202"));
    assert!(out.contains("Offline mode, no cached data"));
}

#[tokio::test]
async fn json_output_keeps_non_json_body_as_string() {
    let t = TestContext::new().await;
    t.transport.respond_with(Response::new(
        404,
        vec![("Content-Type".into(), "text/plain".into())],
        "missing",
    ));

    let mut get = args("GET", "/gone");
    get.output = OutputFormat::Json;
    let out = run_impl(&t.ctx, get, std::io::empty()).await.unwrap();

    let value: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(value["status"], 404);
    assert_eq!(value["body"], "missing");
    assert!(t.ctx.cache.list_keys().await.unwrap().is_empty());
}
