//! Full human-in-the-loop flow: hub, human-input tool adapter, and router
//! wired together the way the deployed processes are.

use futures::StreamExt;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::{Framed, LinesCodec};
use tokio_util::sync::CancellationToken;

use switchboard::adapter::human_input::{HumanInputTool, HUMAN_INPUT_TOOL_NAME};
use switchboard::adapter::{ServingFlag, Tool, ToolService};
use switchboard::broker::{TaskState, TaskStore};
use switchboard::hub::{BroadcastHub, HubMessage, HubPublisher};
use switchboard::registry::{HealthStatus, RegisteredTool, ToolRegistry};
use switchboard::router::ToolRouter;
use switchboard::types::{Error, IpcConfig};

async fn wait_listening(addr: SocketAddr) {
    for _ in 0..50 {
        if TcpStream::connect(addr).await.is_ok() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("server at {} never came up", addr);
}

struct Stack {
    router: Arc<ToolRouter>,
    hub_addr: SocketAddr,
    cancel: CancellationToken,
}

async fn start_stack() -> Stack {
    let cancel = CancellationToken::new();

    let hub_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let hub_addr = hub_listener.local_addr().unwrap();
    tokio::spawn(switchboard::hub::serve(
        Arc::new(BroadcastHub::new()),
        hub_listener,
        cancel.clone(),
    ));

    let tool = Arc::new(HumanInputTool::new(HubPublisher::new(hub_addr.to_string())));
    let descriptor = tool.descriptor();
    let tool_addr = TcpListener::bind("127.0.0.1:0")
        .await
        .unwrap()
        .local_addr()
        .unwrap();
    let tool_server = Arc::new(
        ToolService::new(tool, ServingFlag::serving()).into_server(tool_addr, IpcConfig::default()),
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
            descriptor,
            addr: tool_addr,
            status: HealthStatus::Serving,
        })
        .await;
    let router = Arc::new(ToolRouter::new(registry, Arc::new(TaskStore::new())));

    Stack {
        router,
        hub_addr,
        cancel,
    }
}

async fn next_line(frontend: &mut Framed<TcpStream, LinesCodec>) -> String {
    tokio::time::timeout(Duration::from_secs(2), frontend.next())
        .await
        .expect("timed out waiting for hub line")
        .expect("hub closed the connection")
        .expect("line decode failed")
}

#[tokio::test]
async fn ask_wait_answer_poll() {
    let stack = start_stack().await;

    // A human-facing frontend subscribed to the hub over plain TCP.
    let mut frontend = Framed::new(
        TcpStream::connect(stack.hub_addr).await.unwrap(),
        LinesCodec::new(),
    );
    // Give the hub a beat to register the subscriber before publishing.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let outcome = stack
        .router
        .execute_tool(
            HUMAN_INPUT_TOOL_NAME,
            "caller-task",
            json!({"prompt": "Shall I proceed?"}),
        )
        .await
        .unwrap();

    assert_eq!(outcome.result["status"], "waiting_for_human");
    let task_id = outcome.result["task_id"].as_str().unwrap().to_string();
    assert!(!task_id.is_empty());

    // The prompt reached the frontend exactly once, with the same task id.
    let message: HubMessage = serde_json::from_str(&next_line(&mut frontend).await).unwrap();
    assert_eq!(message.task_id, task_id);
    assert_eq!(message.prompt, "Shall I proceed?");

    // Not answered yet.
    let answer = stack.router.get_human_input(&task_id).await.unwrap();
    assert_eq!(answer.status, TaskState::Pending);
    assert!(answer.response.is_none());

    // The human answers; a later poll sees it.
    let ack = stack
        .router
        .provide_human_input(&task_id, json!("yes, proceed"))
        .await
        .unwrap();
    assert_eq!(ack.status, "received");

    let answer = stack.router.get_human_input(&task_id).await.unwrap();
    assert_eq!(answer.status, TaskState::Completed);
    assert_eq!(answer.response, Some(Value::String("yes, proceed".to_string())));

    stack.cancel.cancel();
}

#[tokio::test]
async fn repeated_answers_last_write_wins() {
    let stack = start_stack().await;

    stack
        .router
        .provide_human_input("task-1", json!("first"))
        .await
        .unwrap();
    stack
        .router
        .provide_human_input("task-1", json!("second"))
        .await
        .unwrap();

    let answer = stack.router.get_human_input("task-1").await.unwrap();
    assert_eq!(answer.status, TaskState::Completed);
    assert_eq!(answer.response, Some(Value::String("second".to_string())));

    stack.cancel.cancel();
}

#[tokio::test]
async fn empty_task_id_is_rejected_both_ways() {
    let stack = start_stack().await;

    let err = stack
        .router
        .provide_human_input("", json!("answer"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));

    let err = stack.router.get_human_input("").await.unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));

    stack.cancel.cancel();
}

#[tokio::test]
async fn missing_prompt_aborts_without_creating_a_task() {
    let stack = start_stack().await;

    let err = stack
        .router
        .execute_tool(HUMAN_INPUT_TOOL_NAME, "t", json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Aborted(_)));
    assert_eq!(stack.router.tasks().len().await, 0);

    stack.cancel.cancel();
}

#[tokio::test]
async fn poll_for_never_asked_task_is_pending() {
    let stack = start_stack().await;

    let answer = stack
        .router
        .get_human_input("never-created")
        .await
        .unwrap();
    assert_eq!(answer.status, TaskState::Pending);

    stack.cancel.cancel();
}
