use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinSet;

use super::protocol::{self, RpcError, RpcRequest};
use super::tools::Tools;

#[derive(Debug, Deserialize)]
struct CallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

/// Serves MCP over the process's stdin/stdout. stdout carries protocol
/// messages only.
pub async fn serve_stdio(tools: Arc<Tools>) -> anyhow::Result<()> {
    serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout(), tools).await
}

/// One request per line in, one response per line out. `tools/call` runs on
/// its own task so long agent runs do not block `ping` and friends.
pub async fn serve<R, W>(mut reader: R, writer: W, tools: Arc<Tools>) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let writer = Arc::new(AsyncMutex::new(writer));
    let mut inflight = JoinSet::new();
    tracing::info!("mcp server listening on stdio");

    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        // Lossy: a line with invalid UTF-8 gets a parse error like any bad JSON.
        let line = String::from_utf8_lossy(&buf);
        if line.trim().is_empty() {
            continue;
        }
        let req = match protocol::parse_request(&line) {
            Ok(req) => req,
            Err((id, err)) => {
                tracing::warn!(code = err.code, error = %err.message, "rejecting malformed message");
                send_json_line(&writer, protocol::error_response(id, &err)).await;
                continue;
            }
        };

        if req.method == "tools/call" && !req.is_notification() {
            let tools = tools.clone();
            let writer = writer.clone();
            inflight.spawn(async move {
                let id = req.id.clone().unwrap_or(Value::Null);
                let reply = match call_tool(&tools, req.params).await {
                    Ok(result) => protocol::response(id, result),
                    Err(err) => protocol::error_response(id, &err),
                };
                send_json_line(&writer, reply).await;
            });
            continue;
        }

        if let Some(reply) = handle(req) {
            send_json_line(&writer, reply).await;
        }

        // Reap finished calls so the set does not grow for the server's lifetime.
        while let Some(done) = inflight.try_join_next() {
            if let Err(e) = done {
                tracing::error!(error = %e, "tool call task failed");
            }
        }
    }

    tracing::info!(pending = inflight.len(), "stdin closed, finishing in-flight tool calls");
    while let Some(done) = inflight.join_next().await {
        if let Err(e) = done {
            tracing::error!(error = %e, "tool call task failed");
        }
    }
    Ok(())
}

fn handle(req: RpcRequest) -> Option<Value> {
    if req.is_notification() {
        tracing::debug!(method = %req.method, "notification");
        return None;
    }
    let id = req.id.unwrap_or(Value::Null);
    let result = match req.method.as_str() {
        "initialize" => Ok(protocol::initialize_result()),
        "ping" => Ok(json!({})),
        "tools/list" => Ok(json!({ "tools": Tools::specs() })),
        other => Err(RpcError::method_not_found(other)),
    };
    Some(match result {
        Ok(result) => protocol::response(id, result),
        Err(err) => protocol::error_response(id, &err),
    })
}

async fn call_tool(tools: &Tools, params: Value) -> Result<Value, RpcError> {
    let params: CallParams =
        serde_json::from_value(params).map_err(|e| RpcError::invalid_params(e.to_string()))?;
    let out = tools.call(&params.name, params.arguments).await?;
    Ok(out.into_result())
}

async fn send_json_line<W>(writer: &Arc<AsyncMutex<W>>, payload: Value)
where
    W: AsyncWrite + Unpin + Send,
{
    let mut buf = match serde_json::to_vec(&payload) {
        Ok(buf) => buf,
        Err(e) => {
            tracing::error!(error = %e, "failed to encode response");
            return;
        }
    };
    buf.push(b'\n');
    let mut guard = writer.lock().await;
    if let Err(e) = async {
        guard.write_all(&buf).await?;
        guard.flush().await
    }
    .await
    {
        tracing::warn!(error = %e, "failed to write response");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::tools::tests::fixture;
    use tokio::io::{DuplexStream, Lines};

    struct Client {
        tx: DuplexStream,
        rx: Lines<BufReader<DuplexStream>>,
    }

    impl Client {
        async fn send(&mut self, line: &str) {
            self.tx.write_all(line.as_bytes()).await.unwrap();
            self.tx.write_all(b"\n").await.unwrap();
        }

        async fn recv(&mut self) -> Value {
            let line = self.rx.next_line().await.unwrap().expect("server closed");
            serde_json::from_str(&line).unwrap()
        }
    }

    fn start(tools: Tools) -> (Client, tokio::task::JoinHandle<anyhow::Result<()>>) {
        let (client_tx, server_rx) = tokio::io::duplex(64 * 1024);
        let (server_tx, client_rx) = tokio::io::duplex(64 * 1024);
        let task = tokio::spawn(serve(BufReader::new(server_rx), server_tx, Arc::new(tools)));
        let client = Client {
            tx: client_tx,
            rx: BufReader::new(client_rx).lines(),
        };
        (client, task)
    }

    #[tokio::test]
    async fn handshake_and_listing() {
        let f = fixture(None);
        let (mut c, task) = start(f.tools);

        c.send(r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#)
            .await;
        let init = c.recv().await;
        assert_eq!(init["id"], json!(1));
        assert_eq!(init["result"]["serverInfo"]["name"], json!("cursor-subagent"));
        assert!(init["result"]["capabilities"]["tools"].is_object());

        // Notifications get no reply; the next line answers the ping.
        c.send(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await;
        c.send(r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#).await;
        assert_eq!(c.recv().await, json!({"jsonrpc":"2.0","id":2,"result":{}}));

        c.send(r#"{"jsonrpc":"2.0","id":3,"method":"tools/list"}"#).await;
        let list = c.recv().await;
        let names: Vec<&str> = list["result"]["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(
            names,
            vec![
                "get_orchestration_guide",
                "list_agents",
                "get_agent_prompt",
                "invoke_subagent",
                "setup_cursor_cli",
                "check_status",
                "create_agent",
            ]
        );

        drop(c);
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn protocol_errors() {
        let f = fixture(None);
        let (mut c, _task) = start(f.tools);

        c.send("{oops").await;
        let err = c.recv().await;
        assert_eq!(err["id"], Value::Null);
        assert_eq!(err["error"]["code"], json!(protocol::PARSE_ERROR));

        c.send(r#"{"jsonrpc":"2.0","id":"x","method":"resources/list"}"#)
            .await;
        let err = c.recv().await;
        assert_eq!(err["id"], json!("x"));
        assert_eq!(err["error"]["code"], json!(protocol::METHOD_NOT_FOUND));

        c.send(r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"arguments":{}}}"#)
            .await;
        let err = c.recv().await;
        assert_eq!(err["error"]["code"], json!(protocol::INVALID_PARAMS));
    }

    #[tokio::test]
    async fn invalid_utf8_line_does_not_end_the_session() {
        let f = fixture(None);
        let (mut c, _task) = start(f.tools);

        c.tx.write_all(b"\xff\xfe{\"jsonrpc\"\n").await.unwrap();
        let err = c.recv().await;
        assert_eq!(err["error"]["code"], json!(protocol::PARSE_ERROR));

        c.send(r#"{"jsonrpc":"2.0","id":5,"method":"ping"}"#).await;
        assert_eq!(c.recv().await, json!({"jsonrpc":"2.0","id":5,"result":{}}));
    }

    #[tokio::test]
    async fn tool_call_wraps_structured_content() {
        let f = fixture(None);
        let (mut c, _task) = start(f.tools);

        c.send(r#"{"jsonrpc":"2.0","id":9,"method":"tools/call","params":{"name":"list_agents"}}"#)
            .await;
        let resp = c.recv().await;
        let result = &resp["result"];
        assert_eq!(result["isError"], json!(false));
        assert_eq!(
            result["structuredContent"]["analyst"]["name"],
            json!("Analyst")
        );
        let text = result["content"][0]["text"].as_str().unwrap();
        let reparsed: Value = serde_json::from_str(text).unwrap();
        assert_eq!(reparsed, result["structuredContent"]);
    }
}
