//! Stdio JSON-RPC 2.0 server exposing the tools.
//!
//! One request per line on the reader, one response per line on the writer.
//! Implements the subset of the Model Context Protocol a tool host needs:
//!
//! | Method | Result |
//! |---|---|
//! | `initialize` | protocol version, `serverInfo`, `capabilities.tools` |
//! | `ping` | `{}` |
//! | `tools/list` | `{tools: [{name, description, inputSchema}]}` |
//! | `tools/call` | `{content: [{type: "text", text}], isError}` |
//!
//! Requests without an `id` are notifications and get no response. A tool
//! that fails still produces a normal result, with `isError: true` and a text
//! body of `{"error": "<message>"}`.

use crate::compress::PngCompressor;
use crate::imaging::ImageBackend;
use crate::tools::{ToolError, ToolService};
use serde_json::{Map, Value, json};
use std::io::{self, BufRead, Write};

/// MCP protocol revision this server speaks.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;

/// A JSON-RPC error object.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

impl RpcError {
    fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

fn success(id: Value, result: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

fn failure(id: Value, error: RpcError) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": error.code, "message": error.message }
    })
}

pub struct Server<B, C> {
    service: ToolService<B, C>,
}

impl<B: ImageBackend, C: PngCompressor> Server<B, C> {
    pub fn new(service: ToolService<B, C>) -> Self {
        Self { service }
    }

    /// Serve until the reader is exhausted.
    pub fn run<R: BufRead, W: Write>(&self, reader: R, mut writer: W) -> io::Result<()> {
        tracing::info!(
            compressor = self.service.compressor_available(),
            "serving tools on stdio"
        );
        for line in reader.lines() {
            let line = line?;
            if let Some(response) = self.handle_line(&line) {
                writeln!(writer, "{response}")?;
                writer.flush()?;
            }
        }
        tracing::info!("input closed, shutting down");
        Ok(())
    }

    /// Handle one line of input. Blank lines and notifications yield `None`.
    pub fn handle_line(&self, line: &str) -> Option<String> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let response = match serde_json::from_str::<Value>(line) {
            Ok(message) => self.handle_message(message)?,
            Err(e) => failure(
                Value::Null,
                RpcError::new(PARSE_ERROR, format!("Parse error: {e}")),
            ),
        };
        Some(response.to_string())
    }

    /// Handle a decoded message, returning the response if one is due.
    pub fn handle_message(&self, message: Value) -> Option<Value> {
        let Value::Object(mut request) = message else {
            return Some(failure(
                Value::Null,
                RpcError::new(INVALID_REQUEST, "Invalid request: expected an object"),
            ));
        };

        let id = request.remove("id");
        let method = match request.remove("method") {
            Some(Value::String(method)) => method,
            _ => {
                return Some(failure(
                    id.unwrap_or(Value::Null),
                    RpcError::new(INVALID_REQUEST, "Invalid request: missing method"),
                ));
            }
        };
        if request.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
            return Some(failure(
                id.unwrap_or(Value::Null),
                RpcError::new(INVALID_REQUEST, "Invalid request: jsonrpc must be \"2.0\""),
            ));
        }
        let params = request.remove("params").unwrap_or(Value::Null);

        let Some(id) = id else {
            tracing::debug!(%method, "notification");
            return None;
        };

        tracing::debug!(%method, %id, "request");
        Some(match self.dispatch(&method, params) {
            Ok(result) => success(id, result),
            Err(error) => failure(id, error),
        })
    }

    fn dispatch(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        match method {
            "initialize" => Ok(json!({
                "protocolVersion": PROTOCOL_VERSION,
                "serverInfo": {
                    "name": env!("CARGO_PKG_NAME"),
                    "version": env!("CARGO_PKG_VERSION"),
                },
                "capabilities": { "tools": {} },
            })),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": self.service.list() })),
            "tools/call" => self.call_tool(params),
            other => Err(RpcError::new(
                METHOD_NOT_FOUND,
                format!("Method not found: {other}"),
            )),
        }
    }

    fn call_tool(&self, params: Value) -> Result<Value, RpcError> {
        let mut params = match params {
            Value::Object(map) => map,
            _ => return Err(RpcError::new(INVALID_PARAMS, "params must be an object")),
        };
        let name = match params.remove("name") {
            Some(Value::String(name)) => name,
            _ => return Err(RpcError::new(INVALID_PARAMS, "params.name must be a string")),
        };
        let arguments = match params.remove("arguments") {
            None | Some(Value::Null) => Value::Object(Map::new()),
            Some(args @ Value::Object(_)) => args,
            Some(_) => {
                return Err(RpcError::new(
                    INVALID_PARAMS,
                    "params.arguments must be an object",
                ));
            }
        };

        let (body, is_error) = match self.service.call(&name, arguments) {
            Ok(result) => (result, false),
            Err(ToolError::UnknownTool(name)) => {
                return Err(RpcError::new(
                    INVALID_PARAMS,
                    format!("Unknown tool: {name}"),
                ));
            }
            Err(e) => {
                tracing::warn!(tool = %name, error = %e, "tool call failed");
                (json!({ "error": e.to_string() }), true)
            }
        };
        let text = serde_json::to_string_pretty(&body)
            .map_err(|e| RpcError::new(INVALID_PARAMS, e.to_string()))?;

        Ok(json!({
            "content": [{ "type": "text", "text": text }],
            "isError": is_error,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compress::Pngquant;
    use crate::config::ToolsConfig;
    use crate::imaging::Dimensions;
    use crate::imaging::backend::tests::MockBackend;

    fn server(backend: MockBackend) -> Server<MockBackend, Pngquant> {
        Server::new(ToolService::with_parts(
            backend,
            Pngquant::with_binary("pngquant", None),
            ToolsConfig::default(),
        ))
    }

    fn respond(server: &Server<MockBackend, Pngquant>, line: &str) -> Value {
        let out = server.handle_line(line).expect("expected a response");
        serde_json::from_str(&out).unwrap()
    }

    // =========================================================================
    // Protocol
    // =========================================================================

    #[test]
    fn initialize_reports_server_info() {
        let s = server(MockBackend::new());
        let resp = respond(&s, r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#);

        assert_eq!(resp["id"], 1);
        assert_eq!(resp["result"]["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(resp["result"]["serverInfo"]["name"], "chromakit");
        assert!(resp["result"]["capabilities"]["tools"].is_object());
    }

    #[test]
    fn ping_returns_empty_object() {
        let s = server(MockBackend::new());
        let resp = respond(&s, r#"{"jsonrpc":"2.0","id":"a","method":"ping"}"#);
        assert_eq!(resp["id"], "a");
        assert_eq!(resp["result"], json!({}));
    }

    #[test]
    fn notifications_get_no_response() {
        let s = server(MockBackend::new());
        assert!(
            s.handle_line(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
                .is_none()
        );
    }

    #[test]
    fn blank_lines_are_ignored() {
        let s = server(MockBackend::new());
        assert!(s.handle_line("   ").is_none());
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let s = server(MockBackend::new());
        let resp = respond(&s, "{not json");
        assert_eq!(resp["error"]["code"], PARSE_ERROR);
        assert_eq!(resp["id"], Value::Null);
    }

    #[test]
    fn non_object_is_invalid_request() {
        let s = server(MockBackend::new());
        let resp = respond(&s, "[1,2,3]");
        assert_eq!(resp["error"]["code"], INVALID_REQUEST);
    }

    #[test]
    fn wrong_version_is_invalid_request() {
        let s = server(MockBackend::new());
        let resp = respond(&s, r#"{"jsonrpc":"1.0","id":3,"method":"ping"}"#);
        assert_eq!(resp["error"]["code"], INVALID_REQUEST);
        assert_eq!(resp["id"], 3);
    }

    #[test]
    fn unknown_method_is_method_not_found() {
        let s = server(MockBackend::new());
        let resp = respond(&s, r#"{"jsonrpc":"2.0","id":2,"method":"resources/list"}"#);
        assert_eq!(resp["error"]["code"], METHOD_NOT_FOUND);
    }

    // =========================================================================
    // Tools
    // =========================================================================

    #[test]
    fn tools_list_names_every_tool() {
        let s = server(MockBackend::new());
        let resp = respond(&s, r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#);
        let names: Vec<&str> = resp["result"]["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(
            names,
            [
                "chromakey_to_transparent",
                "compress_png",
                "get_image_metadata",
                "resize_image",
                "convert_format"
            ]
        );
    }

    #[test]
    fn tools_call_without_name_is_invalid_params() {
        let s = server(MockBackend::new());
        let resp = respond(
            &s,
            r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"arguments":{}}}"#,
        );
        assert_eq!(resp["error"]["code"], INVALID_PARAMS);
    }

    #[test]
    fn tools_call_unknown_tool_is_invalid_params() {
        let s = server(MockBackend::new());
        let resp = respond(
            &s,
            r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"blur"}}"#,
        );
        assert_eq!(resp["error"]["code"], INVALID_PARAMS);
        assert_eq!(resp["error"]["message"], "Unknown tool: blur");
    }

    #[test]
    fn tool_failure_is_error_result() {
        let s = server(MockBackend::new());
        let resp = respond(
            &s,
            r#"{"jsonrpc":"2.0","id":9,"method":"tools/call","params":{"name":"get_image_metadata","arguments":{"image_path":"/nonexistent/x.png"}}}"#,
        );

        let result = &resp["result"];
        assert_eq!(result["isError"], true);
        let body: Value =
            serde_json::from_str(result["content"][0]["text"].as_str().unwrap()).unwrap();
        assert_eq!(body["error"], "Input file not found: /nonexistent/x.png");
    }

    #[test]
    fn tool_success_wraps_json_text() {
        let tmp = tempfile::TempDir::new().unwrap();
        let input = tmp.path().join("in.png");
        std::fs::write(&input, b"x").unwrap();
        let s = server(MockBackend::with_dimensions(vec![Dimensions {
            width: 100,
            height: 100,
        }]));

        let request = json!({
            "jsonrpc": "2.0",
            "id": 4,
            "method": "tools/call",
            "params": {
                "name": "resize_image",
                "arguments": {
                    "input_path": input,
                    "output_path": tmp.path().join("out.png"),
                    "scale": 0.5
                }
            }
        });
        let resp = respond(&s, &request.to_string());

        let result = &resp["result"];
        assert_eq!(result["isError"], false);
        assert_eq!(result["content"][0]["type"], "text");
        let body: Value =
            serde_json::from_str(result["content"][0]["text"].as_str().unwrap()).unwrap();
        assert_eq!(body["new_dimensions"], json!({"width": 50, "height": 50}));
    }

    #[test]
    fn run_answers_each_request_line() {
        let s = server(MockBackend::new());
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#,
            "\n"
        );
        let mut out = Vec::new();
        s.run(input.as_bytes(), &mut out).unwrap();

        let lines: Vec<Value> = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["id"], 1);
        assert_eq!(lines[1]["id"], 2);
    }
}
