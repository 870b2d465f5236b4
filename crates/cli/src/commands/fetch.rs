// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::io::Read;

use outpost_core::{Method, RequestDescriptor, Response};
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::error::{Error, Result};
use crate::transport::Transport;

use super::Context;

/// Arguments of `outpost fetch`, as given on the command line.
pub struct FetchArgs<'a> {
    pub method: &'a str,
    pub url: &'a str,
    pub headers: &'a [String],
    pub data: Option<&'a str>,
    pub offline: bool,
    pub output: OutputFormat,
}

#[derive(Serialize)]
struct FetchOutput {
    status: u16,
    headers: Vec<(String, String)>,
    body: serde_json::Value,
}

pub async fn run(ctx: &Context, args: FetchArgs<'_>) -> Result<()> {
    let rendered = run_impl(ctx, args, std::io::stdin()).await?;
    println!("{rendered}");
    Ok(())
}

/// Internal implementation that takes stdin explicitly for testing.
pub(crate) async fn run_impl(
    ctx: &Context,
    args: FetchArgs<'_>,
    stdin: impl Read,
) -> Result<String> {
    let body = args.data.map(|data| read_body(data, stdin)).transpose()?;
    let request = build_request(args.method, args.url, args.headers, body)?;

    if args.offline {
        ctx.monitor.notify_offline();
    } else {
        ctx.monitor.start().await;
    }

    let interceptor = ctx.interceptor();
    let response = interceptor.send(request).await;
    // Background cache writes must land before the process exits.
    interceptor.settle().await;
    ctx.monitor.stop();

    render(&response?, args.output)
}

/// Build a validated request from command-line pieces.
pub(crate) fn build_request(
    method: &str,
    url: &str,
    headers: &[String],
    body: Option<Vec<u8>>,
) -> Result<RequestDescriptor> {
    let mut request = RequestDescriptor::new(Method::parse(method)?, url);
    for raw in headers {
        let (name, value) = parse_header(raw)?;
        request = request.with_header(name, value);
    }
    if let Some(body) = body {
        request = request.with_body(body);
    }
    request.validate()?;
    Ok(request)
}

/// Split `Name: value`. The value may be empty, the name may not.
pub(crate) fn parse_header(raw: &str) -> Result<(String, String)> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| Error::InvalidHeader(raw.to_string()))?;
    let name = name.trim();
    if name.is_empty() || name.contains(char::is_whitespace) {
        return Err(Error::InvalidHeader(raw.to_string()));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

/// `@-` reads stdin, `@path` reads a file, anything else is the body itself.
pub(crate) fn read_body(data: &str, mut stdin: impl Read) -> Result<Vec<u8>> {
    match data.strip_prefix('@') {
        Some("-") => {
            let mut buf = Vec::new();
            stdin.read_to_end(&mut buf)?;
            Ok(buf)
        }
        Some(path) => Ok(std::fs::read(path)?),
        None => Ok(data.as_bytes().to_vec()),
    }
}

fn render(response: &Response, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => {
            let mut out = format!("HTTP {}", response.status);
            let body = response.text();
            if !body.is_empty() {
                out.push_str("\n\n");
                out.push_str(&body);
            }
            Ok(out)
        }
        OutputFormat::Json => {
            // JSON bodies are embedded as values, anything else as a string.
            let body = response
                .json()
                .unwrap_or_else(|_| serde_json::Value::String(response.text()));
            let output = FetchOutput {
                status: response.status,
                headers: response.headers.clone(),
                body,
            };
            Ok(serde_json::to_string(&output)?)
        }
    }
}

#[cfg(test)]
#[path = "fetch_tests.rs"]
mod tests;
