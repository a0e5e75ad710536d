//! End-to-end tests for the to-do REST service.
//!
//! Each test starts `run_server` on a free port with its own SQLite file
//! and talks to it over HTTP.

use serde_json::{json, Value};
use tempfile::TempDir;

use news_pipeline::config::Config;
use news_pipeline::server;

fn find_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

async fn wait_for_server(port: u16) {
    let client = reqwest::Client::new();
    let url = format!("http://127.0.0.1:{}/health", port);
    for _ in 0..50 {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        if let Ok(resp) = client.get(&url).send().await {
            if resp.status().is_success() {
                return;
            }
        }
    }
    panic!("Server did not become ready within 5 seconds");
}

/// Start a server and return its base URL. Keep the `TempDir` alive for the
/// duration of the test.
async fn start_server() -> (TempDir, String) {
    let tmp = TempDir::new().unwrap();
    let port = find_free_port();

    let mut cfg = Config::default();
    cfg.server.bind = format!("127.0.0.1:{}", port);
    cfg.todos.db_path = tmp.path().join("data/todos.sqlite");

    tokio::spawn(async move {
        if let Err(e) = server::run_server(&cfg).await {
            eprintln!("server exited: {:#}", e);
        }
    });
    wait_for_server(port).await;

    (tmp, format!("http://127.0.0.1:{}", port))
}

// ─── Tests ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_todo_crud() {
    let (_tmp, base) = start_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/todos", base))
        .json(&json!({ "content": "复盘本周新能源板块" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let created: Value = resp.json().await.unwrap();
    assert_eq!(created["content"], "复盘本周新能源板块");
    assert_eq!(created["completed"], false);
    let id = created["id"].as_i64().unwrap();

    let resp = client
        .put(format!("{}/api/todos/{}", base, id))
        .json(&json!({ "completed": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let updated: Value = resp.json().await.unwrap();
    assert_eq!(updated["completed"], true);
    assert_eq!(updated["content"], "复盘本周新能源板块");

    let resp = client
        .delete(format!("{}/api/todos/{}", base, id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["result"], "success");

    let list: Value = client
        .get(format!("{}/api/todos", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(list.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_list_is_newest_first() {
    let (_tmp, base) = start_server().await;
    let client = reqwest::Client::new();

    for content in ["first", "second", "third"] {
        let resp = client
            .post(format!("{}/api/todos", base))
            .json(&json!({ "content": content }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 201);
    }

    let list: Value = client
        .get(format!("{}/api/todos", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let contents: Vec<&str> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["content"].as_str().unwrap())
        .collect();
    assert_eq!(contents, vec!["third", "second", "first"]);
}

#[tokio::test]
async fn test_create_rejects_bad_content() {
    let (_tmp, base) = start_server().await;
    let client = reqwest::Client::new();

    for body in [json!({}), json!({ "content": "   " }), json!({ "content": "x".repeat(201) })] {
        let resp = client
            .post(format!("{}/api/todos", base))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400, "body {}", body);
        let err: Value = resp.json().await.unwrap();
        assert_eq!(err["error"]["code"], "bad_request");
    }

    let resp = client
        .post(format!("{}/api/todos", base))
        .header("content-type", "application/json")
        .body("not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_missing_todo_is_404() {
    let (_tmp, base) = start_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .put(format!("{}/api/todos/999", base))
        .json(&json!({ "completed": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let err: Value = resp.json().await.unwrap();
    assert_eq!(err["error"]["code"], "not_found");

    let resp = client
        .delete(format!("{}/api/todos/999", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}
