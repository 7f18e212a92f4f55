//! Socket server round trips with mock backends

mod common;

use common::{doc, MockChat, MockStore};
use ragfuse::config::{Config, ServerConfig};
use ragfuse::pipeline::{RagPipeline, RagServices};
use ragfuse::retrieval::ConversationTurn;
use ragfuse::server::{IpcClient, IpcMessage, Server};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

struct Running {
    socket_path: PathBuf,
    stop: oneshot::Sender<()>,
    handle: JoinHandle<ragfuse::Result<()>>,
    _temp: TempDir,
}

async fn start(store: MockStore, chat: MockChat) -> Running {
    start_with_limit(store, chat, 4).await
}

async fn start_with_limit(store: MockStore, chat: MockChat, max_connections: usize) -> Running {
    let temp = TempDir::new().unwrap();
    let server_config = ServerConfig {
        socket_path: temp.path().join("run").join("ragfuse.sock"),
        max_connections,
    };

    let mut config = Config::default();
    config.retrieval.enable_query_fusion = false;
    config.retrieval.final_k = 2;

    let services = RagServices::new(Arc::new(store), Arc::new(chat), None);
    let pipeline = Arc::new(RagPipeline::new(services, &config));

    let server = Server::bind(pipeline, &server_config).await.unwrap();
    let socket_path = server.socket_path().to_path_buf();

    let (stop, stopped) = oneshot::channel::<()>();
    let handle = tokio::spawn(server.serve_until(async move {
        let _ = stopped.await;
    }));

    Running {
        socket_path,
        stop,
        handle,
        _temp: temp,
    }
}

#[tokio::test]
async fn test_ask_round_trip() {
    let store = MockStore::default().answering(
        "What is X?",
        vec![doc("X is Y.", "x.md"), doc("X was named in 1999.", "history.md")],
    );
    let chat = MockChat::default()
        .on("standalone", "<result>What is X?</result>")
        .on("<contexts>", "X is Y.");
    let running = start(store, chat).await;
    let client = IpcClient::new(running.socket_path.clone());

    let status = client.send(&IpcMessage::Status).await.unwrap();
    assert!(status.success);

    let history = vec![ConversationTurn::user("Tell me about X")];
    let result = client.ask("what is it?", Some(history)).await.unwrap();

    assert_eq!(result.original_question, "what is it?");
    assert_eq!(result.rewritten_question, "What is X?");
    assert_eq!(result.answer_text, "X is Y.");
    assert_eq!(result.contexts.len(), 2);
    assert_eq!(result.contexts.documents()[0].source().as_deref(), Some("x.md"));

    running.stop.send(()).unwrap();
    running.handle.await.unwrap().unwrap();
    assert!(!running.socket_path.exists());
}

#[tokio::test]
async fn test_error_codes_reach_the_client() {
    let running = start(MockStore::down(), MockChat::default()).await;
    let client = IpcClient::new(running.socket_path.clone());

    let blank = client
        .send(&IpcMessage::Ask {
            question: "   ".to_string(),
            history: None,
        })
        .await
        .unwrap();
    assert!(!blank.success);
    assert_eq!(blank.code.as_deref(), Some("invalid_request"));

    let outage = client
        .send(&IpcMessage::Ask {
            question: "What is X?".to_string(),
            history: None,
        })
        .await
        .unwrap();
    assert!(!outage.success);
    assert_eq!(outage.code.as_deref(), Some("retrieval_unavailable"));

    let err = client.ask("What is X?", None).await.unwrap_err();
    assert!(err.to_string().contains("retrieval_unavailable"));

    running.stop.send(()).unwrap();
    running.handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_malformed_request_is_rejected() {
    let running = start(MockStore::default(), MockChat::default()).await;

    let mut stream = UnixStream::connect(&running.socket_path).await.unwrap();
    let payload = br#"{"type": "shutdown"}"#;
    stream.write_u32(payload.len() as u32).await.unwrap();
    stream.write_all(payload).await.unwrap();

    let length = stream.read_u32().await.unwrap();
    let mut buffer = vec![0u8; length as usize];
    stream.read_exact(&mut buffer).await.unwrap();
    let response: serde_json::Value = serde_json::from_slice(&buffer).unwrap();

    assert_eq!(response["success"], false);
    assert_eq!(response["code"], "invalid_request");

    running.stop.send(()).unwrap();
    running.handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_shutdown_while_all_slots_busy() {
    let running = start_with_limit(MockStore::default(), MockChat::default(), 1).await;

    // Idle clients hold the only slot and queue behind it
    let _first = UnixStream::connect(&running.socket_path).await.unwrap();
    let _second = UnixStream::connect(&running.socket_path).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    running.stop.send(()).unwrap();
    let finished = tokio::time::timeout(Duration::from_secs(5), running.handle)
        .await
        .expect("server did not stop while saturated");

    finished.unwrap().unwrap();
    assert!(!running.socket_path.exists());
}
