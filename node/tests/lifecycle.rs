//! Node start-up and shutdown over real sockets.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use bridge_node::{BridgeConfig, BridgeNode};
use bridge_types::{Identity, Timestamp};

fn test_config(dir: &tempfile::TempDir) -> BridgeConfig {
    BridgeConfig {
        listen_addr: [127, 0, 0, 1].into(),
        port: 0,
        // Nothing listens here; chain-backed routes are not exercised.
        node_address: "http://127.0.0.1:9".into(),
        data_dir: dir.path().join("lmdb"),
        did_dir: dir.path().join("did"),
        artifacts_dir: dir.path().join("artifacts"),
        keepalive_interval_secs: 60,
        ..Default::default()
    }
}

async fn start(node: &Arc<BridgeNode>) -> (SocketAddr, tokio::task::JoinHandle<()>) {
    let listener = node.bind().await.unwrap();
    let addr = listener.local_addr().unwrap();
    let serving = Arc::clone(node);
    let handle = tokio::spawn(async move {
        serving.serve(listener).await.unwrap();
    });
    (addr, handle)
}

async fn get_json(url: String) -> Value {
    reqwest::get(url).await.unwrap().json().await.unwrap()
}

#[tokio::test]
async fn serves_api_and_participants_until_stopped() {
    let dir = tempfile::tempdir().unwrap();
    let node = Arc::new(BridgeNode::new(test_config(&dir)).unwrap());
    let (addr, serving) = start(&node).await;

    let (mut client, _) = connect_async(format!("ws://{addr}/ws?clientID=did-node"))
        .await
        .unwrap();
    client
        .send(Message::Text(r#"{"type":"OPEN"}"#.into()))
        .await
        .unwrap();

    let mut listed = Value::Null;
    for _ in 0..100 {
        listed = get_json(format!("http://{addr}/connected-clients")).await;
        if listed["clients"].as_array().is_some_and(|c| !c.is_empty()) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(listed["clients"], serde_json::json!(["did-node"]));

    node.stop().await.unwrap();

    // The participant sees its connection closed.
    let closed = tokio::time::timeout(Duration::from_secs(2), async {
        while let Some(frame) = client.next().await {
            match frame {
                Ok(Message::Close(_)) | Err(_) => return,
                Ok(_) => continue,
            }
        }
    })
    .await;
    assert!(closed.is_ok(), "participant connection was not closed");

    tokio::time::timeout(Duration::from_secs(5), serving)
        .await
        .expect("server should stop after shutdown")
        .unwrap();
    assert!(node.registry().read().await.is_empty());
}

#[tokio::test]
async fn credit_balance_reads_from_lmdb() {
    let dir = tempfile::tempdir().unwrap();
    let node = Arc::new(BridgeNode::new(test_config(&dir)).unwrap());
    node.state()
        .ledger
        .add(&Identity::new("did-credit"), 12, Timestamp::now())
        .unwrap();
    let (addr, serving) = start(&node).await;

    let body = get_json(format!("http://{addr}/api/credit_balance/did-credit")).await;
    assert_eq!(body["credit"], 12);
    assert_eq!(body["did"], "did-credit");

    node.stop().await.unwrap();
    tokio::time::timeout(Duration::from_secs(5), serving)
        .await
        .unwrap()
        .unwrap();
}

// Takes the purchase request and never touches the host.
const IDLE_PURCHASE: &str = r#"
    (module
      (memory (export "memory") 1)
      (global $next (mut i32) (i32.const 1024))
      (func (export "alloc") (param $len i32) (result i32)
        (local $ptr i32)
        (local.set $ptr (global.get $next))
        (global.set $next (i32.add (global.get $next) (local.get $len)))
        (local.get $ptr))
      (func (export "purchase") (param i32 i32 i32 i32) (result i32)
        (i32.const 0)))
"#;

#[tokio::test]
async fn request_payload_cannot_call_host_functions_directly() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);
    std::fs::create_dir_all(&config.artifacts_dir).unwrap();
    std::fs::write(
        config
            .artifacts_dir
            .join("inference_credit_purchase_contract.wasm"),
        wat::parse_str(IDLE_PURCHASE).unwrap(),
    )
    .unwrap();
    let node = Arc::new(BridgeNode::new(config).unwrap());
    let (addr, serving) = start(&node).await;

    let (mut client, _) = connect_async(format!("ws://{addr}/ws?clientID=did-buyer"))
        .await
        .unwrap();
    client
        .send(Message::Text(r#"{"type":"OPEN"}"#.into()))
        .await
        .unwrap();
    for _ in 0..100 {
        if !node.registry().read().await.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let http = reqwest::Client::new();
    let purchase = |data: Value| {
        http.post(format!("http://{addr}/api/add_credits"))
            .json(&serde_json::json!({
                "port": "20007",
                "smart_contract_hash": "QmPurchase",
                "smart_contract_data": data.to_string(),
                "initiator_did": "did-buyer",
            }))
            .send()
    };

    let calls = serde_json::json!({"calls": [
        {"function": "do_add_credit", "input": {"user_did": "did-buyer", "credit": 500}}
    ]});
    let response = purchase(calls).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

    let response = purchase(serde_json::json!({"purchase": {"user_did": "did-buyer"}}))
        .await
        .unwrap();
    assert!(response.status().is_success());

    let body = get_json(format!("http://{addr}/api/credit_balance/did-buyer")).await;
    assert_eq!(body["credit"], 0);

    node.stop().await.unwrap();
    tokio::time::timeout(Duration::from_secs(5), serving)
        .await
        .unwrap()
        .unwrap();
}

#[test]
fn invalid_config_is_rejected_before_storage_opens() {
    let dir = tempfile::tempdir().unwrap();
    let config = BridgeConfig {
        rpc_timeout_secs: 0,
        ..test_config(&dir)
    };
    assert!(BridgeNode::new(config).is_err());
    assert!(!dir.path().join("lmdb").exists());
}
