//! The `/api/ai/*` router served on a local port and called over HTTP.

#![cfg(feature = "server")]

mod common;

use std::sync::Arc;

use serde_json::{Value, json};

use common::MockExecutor;
use emailpilot_ai::server::router;
use emailpilot_ai::{Orchestrator, Provider};

/// Serve `orchestrator` on an ephemeral port and return its base URL.
async fn serve(orchestrator: Orchestrator) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(Arc::new(orchestrator));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn openai_only() -> (Arc<MockExecutor>, Orchestrator) {
    let openai = Arc::new(MockExecutor::replying(Provider::OpenAi, "Hello from the mock"));
    let orchestrator = Orchestrator::builder()
        .executor(openai.clone())
        .build()
        .unwrap();
    (openai, orchestrator)
}

async fn post_json(url: &str, body: Value) -> Value {
    reqwest::Client::new()
        .post(url)
        .json(&body)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

async fn get_json(url: &str) -> Value {
    reqwest::get(url).await.unwrap().json().await.unwrap()
}

#[tokio::test]
async fn complete_endpoint_returns_the_response() {
    let (openai, orchestrator) = openai_only();
    let base = serve(orchestrator).await;

    let body = post_json(
        &format!("{base}/api/ai/complete"),
        json!({
            "messages": [{"role": "user", "content": "Say hello"}],
            "provider": "OpenAI",
            "temperature": 0.3
        }),
    )
    .await;

    assert_eq!(body["success"], true);
    assert_eq!(body["content"], "Hello from the mock");
    assert_eq!(body["provider"], "openai");
    assert_eq!(body["model"], "gpt-4o");
    assert_eq!(body["cached"], false);
    assert_eq!(openai.calls(), 1);
}

#[tokio::test]
async fn malformed_requests_are_reported_with_status_200() {
    let (openai, orchestrator) = openai_only();
    let base = serve(orchestrator).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/api/ai/complete"))
        .json(&json!({"messages": [], "provider": "openai"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();

    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("messages"));
    assert_eq!(openai.calls(), 0);
}

#[tokio::test]
async fn unparseable_bodies_and_queries_still_answer_200() {
    let (openai, orchestrator) = openai_only();
    let base = serve(orchestrator).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base}/api/ai/complete"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert!(!body["error"].as_str().unwrap().is_empty());

    let response = client
        .post(format!("{base}/api/ai/stream"))
        .body("plain text")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let text = response.text().await.unwrap();
    assert!(text.contains("event: done"));
    assert!(!text.contains("event: content"));
    assert!(text.contains(r#""success":false"#));

    for url in [
        format!("{base}/api/ai/models?refresh=maybe"),
        format!("{base}/api/ai/health?force=sometimes"),
    ] {
        let response = reqwest::get(&url).await.unwrap();
        assert_eq!(response.status(), 200, "{url}");
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["success"], false, "{url}");
        assert!(body["error"].is_string(), "{url}");
    }

    assert_eq!(openai.calls(), 0);
}

#[tokio::test]
async fn unconfigured_provider_is_a_failure_body() {
    let (_, orchestrator) = openai_only();
    let base = serve(orchestrator).await;

    let body = post_json(
        &format!("{base}/api/ai/complete"),
        json!({
            "messages": [{"role": "user", "content": "hi"}],
            "provider": "anthropic"
        }),
    )
    .await;

    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("not configured"));
}

#[tokio::test]
async fn stream_endpoint_sends_content_and_done_events() {
    let (_, orchestrator) = openai_only();
    let base = serve(orchestrator).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/api/ai/stream"))
        .json(&json!({"messages": [{"role": "user", "content": "Say hello"}]}))
        .send()
        .await
        .unwrap();
    assert!(
        response.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/event-stream")
    );
    let text = response.text().await.unwrap();

    let content_at = text.find("event: content").unwrap();
    let done_at = text.find("event: done").unwrap();
    assert!(content_at < done_at);
    assert!(text.contains(r#""content":"Hello from the mock""#));
    assert!(text.contains(r#""success":true"#));
}

#[tokio::test]
async fn models_stats_cache_and_health_endpoints() {
    let (_, orchestrator) = openai_only();
    let base = serve(orchestrator).await;

    let models = get_json(&format!("{base}/api/ai/models?provider=openai")).await;
    assert_eq!(models["success"], true);
    assert_eq!(models["models"]["openai"][0]["id"], "gpt-4o");
    assert!(models["models"].get("claude").is_none());

    let all = reqwest::Client::new()
        .post(format!("{base}/api/ai/models/refresh"))
        .send()
        .await
        .unwrap()
        .json::<Value>()
        .await
        .unwrap();
    assert_eq!(all["models"].as_object().unwrap().len(), 3);

    let bad = get_json(&format!("{base}/api/ai/models?provider=mistral")).await;
    assert_eq!(bad["success"], false);

    post_json(
        &format!("{base}/api/ai/complete"),
        json!({"messages": [{"role": "user", "content": "hi"}]}),
    )
    .await;
    let stats = get_json(&format!("{base}/api/ai/stats")).await;
    assert_eq!(stats["success"], true);
    assert_eq!(stats["requests"], 1);
    assert_eq!(stats["cache_entries"], 1);
    assert_eq!(stats["configured_providers"], json!(["openai"]));

    let cleared = post_json(&format!("{base}/api/ai/cache/clear"), json!({})).await;
    assert_eq!(cleared["success"], true);
    let stats = get_json(&format!("{base}/api/ai/stats")).await;
    assert_eq!(stats["cache_entries"], 0);

    let health = get_json(&format!("{base}/api/ai/health?force=true")).await;
    assert_eq!(health["success"], true);
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["providers"].as_array().unwrap().len(), 3);
}
