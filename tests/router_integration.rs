//! End-to-end tests over the framed transport: a real orchestrator server,
//! a real tool adapter process loop, and raw frames on the wire.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

use switchboard::adapter::{RunOutcome, ServingFlag, Tool, ToolService};
use switchboard::broker::TaskStore;
use switchboard::ipc::codec::{read_frame, write_frame, MSG_ERROR, MSG_REQUEST, MSG_RESPONSE};
use switchboard::ipc::dispatch::OrchestratorDispatch;
use switchboard::ipc::IpcServer;
use switchboard::registry::{
    HealthStatus, ParamSpec, RegisteredTool, ToolDescriptor, ToolRegistry,
};
use switchboard::router::ToolRouter;
use switchboard::types::IpcConfig;

/// Integer arithmetic tool used as the in-test workload.
struct CalculatorTool;

#[async_trait]
impl Tool for CalculatorTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "calculator".to_string(),
            description: "Integer arithmetic".to_string(),
            parameters: vec![
                ParamSpec {
                    name: "a".to_string(),
                    param_type: "number".to_string(),
                    description: "left operand".to_string(),
                    required: true,
                },
                ParamSpec {
                    name: "b".to_string(),
                    param_type: "number".to_string(),
                    description: "right operand".to_string(),
                    required: true,
                },
                ParamSpec {
                    name: "op".to_string(),
                    param_type: "string".to_string(),
                    description: "add, sub, mul or div".to_string(),
                    required: true,
                },
            ],
        }
    }

    async fn run(&self, arguments: Map<String, Value>) -> RunOutcome {
        let a = arguments.get("a").and_then(|v| v.as_i64());
        let b = arguments.get("b").and_then(|v| v.as_i64());
        let op = arguments.get("op").and_then(|v| v.as_str());

        let (a, b, op) = match (a, b, op) {
            (Some(a), Some(b), Some(op)) => (a, b, op),
            _ => return RunOutcome::Failure("expected 'a', 'b' and 'op'".to_string()),
        };

        match op {
            "add" => RunOutcome::Success(json!(a + b)),
            "sub" => RunOutcome::Success(json!(a - b)),
            "mul" => RunOutcome::Success(json!(a * b)),
            "div" if b != 0 => RunOutcome::Success(json!(a / b)),
            "div" => RunOutcome::Failure("division by zero".to_string()),
            other => RunOutcome::Failure(format!("unknown op '{}'", other)),
        }
    }
}

async fn free_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

async fn wait_listening(addr: SocketAddr) {
    for _ in 0..50 {
        if TcpStream::connect(addr).await.is_ok() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("server at {} never came up", addr);
}

/// Start a calculator adapter and an orchestrator that already knows it.
/// Returns the orchestrator address and a token stopping both servers.
async fn start_stack() -> (SocketAddr, CancellationToken) {
    let cancel = CancellationToken::new();

    let tool_addr = free_addr().await;
    let tool_server = Arc::new(
        ToolService::new(Arc::new(CalculatorTool), ServingFlag::serving())
            .into_server(tool_addr, IpcConfig::default()),
    );
    {
        let tool_cancel = tool_server.cancel_token();
        let parent = cancel.clone();
        tokio::spawn(async move {
            parent.cancelled().await;
            tool_cancel.cancel();
        });
    }
    tokio::spawn({
        let tool_server = tool_server.clone();
        async move {
            let _ = tool_server.serve().await;
        }
    });
    wait_listening(tool_addr).await;

    let registry = Arc::new(ToolRegistry::new());
    registry
        .insert(RegisteredTool {
            descriptor: CalculatorTool.descriptor(),
            addr: tool_addr,
            status: HealthStatus::Serving,
        })
        .await;
    let router = Arc::new(ToolRouter::new(registry, Arc::new(TaskStore::new())));

    let rpc_addr = free_addr().await;
    let rpc_server = Arc::new(IpcServer::new(
        Arc::new(OrchestratorDispatch::new(router)),
        rpc_addr,
        IpcConfig::default(),
    ));
    {
        let rpc_cancel = rpc_server.cancel_token();
        let parent = cancel.clone();
        tokio::spawn(async move {
            parent.cancelled().await;
            rpc_cancel.cancel();
        });
    }
    tokio::spawn({
        let rpc_server = rpc_server.clone();
        async move {
            let _ = rpc_server.serve().await;
        }
    });
    wait_listening(rpc_addr).await;

    (rpc_addr, cancel)
}

/// Send one raw request frame and read the single reply frame.
async fn round_trip(addr: SocketAddr, service: &str, method: &str, body: Value) -> (u8, Value) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = json!({
        "id": uuid::Uuid::new_v4().to_string(),
        "service": service,
        "method": method,
        "body": body,
    });
    let payload = rmp_serde::to_vec_named(&request).unwrap();
    write_frame(&mut stream, MSG_REQUEST, &payload).await.unwrap();

    let (msg_type, reply_bytes) = read_frame(&mut stream, 5 * 1024 * 1024)
        .await
        .unwrap()
        .expect("reply frame");
    (msg_type, rmp_serde::from_slice(&reply_bytes).unwrap())
}

#[tokio::test]
async fn execute_tool_forwards_and_wraps_result() {
    let (addr, cancel) = start_stack().await;

    let (msg_type, reply) = round_trip(
        addr,
        "orchestrator",
        "ExecuteTool",
        json!({
            "tool_name": "calculator",
            "task_id": "task-add",
            "arguments": {"a": 2, "b": 2, "op": "add"},
        }),
    )
    .await;

    assert_eq!(msg_type, MSG_RESPONSE);
    assert_eq!(reply["ok"], true);
    assert_eq!(reply["body"]["task_id"], "task-add");
    // Scalar results are wrapped in an object under "result".
    assert_eq!(reply["body"]["result"]["result"], 4);

    cancel.cancel();
}

#[tokio::test]
async fn list_tools_reports_serving_tools() {
    let (addr, cancel) = start_stack().await;

    let (msg_type, reply) = round_trip(addr, "orchestrator", "ListTools", json!({})).await;

    assert_eq!(msg_type, MSG_RESPONSE);
    assert_eq!(reply["body"]["count"], 1);
    assert_eq!(reply["body"]["tools"][0]["name"], "calculator");
    assert_eq!(reply["body"]["tools"][0]["parameters"][2]["name"], "op");

    cancel.cancel();
}

#[tokio::test]
async fn unknown_tool_is_not_found() {
    let (addr, cancel) = start_stack().await;

    let (msg_type, reply) = round_trip(
        addr,
        "orchestrator",
        "ExecuteTool",
        json!({"tool_name": "nonexistent_tool", "task_id": "t", "arguments": {}}),
    )
    .await;

    assert_eq!(msg_type, MSG_ERROR);
    assert_eq!(reply["ok"], false);
    assert_eq!(reply["error"]["code"], "NOT_FOUND");

    cancel.cancel();
}

#[tokio::test]
async fn tool_level_failure_surfaces_as_aborted() {
    let (addr, cancel) = start_stack().await;

    let (msg_type, reply) = round_trip(
        addr,
        "orchestrator",
        "ExecuteTool",
        json!({
            "tool_name": "calculator",
            "task_id": "t",
            "arguments": {"a": 1, "b": 0, "op": "div"},
        }),
    )
    .await;

    assert_eq!(msg_type, MSG_ERROR);
    assert_eq!(reply["error"]["code"], "ABORTED");
    assert!(reply["error"]["message"]
        .as_str()
        .unwrap()
        .contains("division by zero"));

    cancel.cancel();
}

#[tokio::test]
async fn missing_tool_name_is_invalid_argument() {
    let (addr, cancel) = start_stack().await;

    let (msg_type, reply) = round_trip(
        addr,
        "orchestrator",
        "ExecuteTool",
        json!({"task_id": "t", "arguments": {}}),
    )
    .await;

    assert_eq!(msg_type, MSG_ERROR);
    assert_eq!(reply["error"]["code"], "INVALID_ARGUMENT");

    cancel.cancel();
}

#[tokio::test]
async fn unknown_service_and_method_are_not_found() {
    let (addr, cancel) = start_stack().await;

    let (msg_type, reply) = round_trip(addr, "no_such_service", "ListTools", json!({})).await;
    assert_eq!(msg_type, MSG_ERROR);
    assert_eq!(reply["error"]["code"], "NOT_FOUND");

    let (msg_type, reply) = round_trip(addr, "orchestrator", "NoSuchMethod", json!({})).await;
    assert_eq!(msg_type, MSG_ERROR);
    assert_eq!(reply["error"]["code"], "NOT_FOUND");

    cancel.cancel();
}

#[tokio::test]
async fn garbage_frame_type_is_rejected_without_closing() {
    let (addr, cancel) = start_stack().await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    write_frame(&mut stream, 0x7E, b"junk").await.unwrap();
    let (msg_type, reply) = {
        let (t, bytes) = read_frame(&mut stream, 5 * 1024 * 1024)
            .await
            .unwrap()
            .expect("reply frame");
        (t, rmp_serde::from_slice::<Value>(&bytes).unwrap())
    };
    assert_eq!(msg_type, MSG_ERROR);
    assert_eq!(reply["error"]["code"], "INVALID_ARGUMENT");

    // The connection survives and serves a well-formed request afterwards.
    let request = json!({
        "id": "after-junk",
        "service": "orchestrator",
        "method": "ListTools",
        "body": {},
    });
    let payload = rmp_serde::to_vec_named(&request).unwrap();
    write_frame(&mut stream, MSG_REQUEST, &payload).await.unwrap();
    let (msg_type, _) = read_frame(&mut stream, 5 * 1024 * 1024)
        .await
        .unwrap()
        .expect("reply frame");
    assert_eq!(msg_type, MSG_RESPONSE);

    cancel.cancel();
}
