//! Vendor executors against wiremock: request shapes, parameter clamping,
//! error classification, Claude deprecation probing and Gemini safety
//! handling.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, header, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use emailpilot_ai::providers::{
    ClaudeClient, GeminiApi, GeminiClient, OpenAiClient, TieredExecutor,
};
use emailpilot_ai::{
    CompletionRequest, ExecutionOptions, Message, ModelCatalog, ModelDiscovery, Orchestrator,
    OrchestratorError, Provider, ProviderExecutor,
};

fn chat_reply(text: &str) -> Value {
    json!({
        "id": "chatcmpl-1",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": text},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 12, "completion_tokens": 4, "total_tokens": 16}
    })
}

fn claude_reply(text: &str) -> Value {
    json!({
        "id": "msg_1",
        "type": "message",
        "content": [{"type": "text", "text": text}],
        "stop_reason": "end_turn",
        "usage": {"input_tokens": 9, "output_tokens": 3}
    })
}

fn gemini_reply(text: &str) -> Value {
    json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]},
            "finishReason": "STOP"
        }],
        "usageMetadata": {"promptTokenCount": 11, "candidatesTokenCount": 2}
    })
}

fn gemini_blocked() -> Value {
    json!({"promptFeedback": {"blockReason": "SAFETY"}})
}

async fn request_bodies(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|r| serde_json::from_slice(&r.body).unwrap_or(Value::Null))
        .collect()
}

// ============================================================================
// OpenAI
// ============================================================================

#[tokio::test]
async fn openai_clamps_temperature_and_max_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "gpt-4o",
            "temperature": 1.0,
            "max_tokens": 16384
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply("clamped")))
        .expect(1)
        .mount(&server)
        .await;

    let client = OpenAiClient::with_base_url("sk-test", server.uri()).unwrap();
    let completion = client
        .complete(
            &[Message::user("hello")],
            "gpt-4o",
            &ExecutionOptions::new(1.7, 50_000),
        )
        .await
        .unwrap();

    assert_eq!(completion.text, "clamped");
    assert_eq!(completion.model, "gpt-4o");
    assert_eq!(completion.usage.input_tokens, 12);
    assert_eq!(completion.usage.output_tokens, 4);
    assert!(!completion.usage.estimated);
    assert_eq!(completion.warnings.len(), 2);
    assert!(completion.warnings[0].contains("temperature 1.7 clamped to 1"));
    assert!(completion.warnings[1].contains("16384-token limit"));
}

#[tokio::test]
async fn openai_reasoning_models_use_max_completion_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply("thought")))
        .mount(&server)
        .await;

    let client = OpenAiClient::with_base_url("sk-test", server.uri()).unwrap();
    let completion = client
        .complete(
            &[Message::user("hello")],
            "o1-mini",
            &ExecutionOptions::new(0.7, 2000).parameter("top_k", json!(40)),
        )
        .await
        .unwrap();

    let body = &request_bodies(&server).await[0];
    assert_eq!(body["max_completion_tokens"], json!(2000));
    assert!(body.get("max_tokens").is_none());
    assert!(body.get("temperature").is_none());
    assert!(body.get("top_k").is_none());
    assert!(
        completion
            .warnings
            .iter()
            .any(|w| w == "parameter 'top_k' is not supported by openai and was dropped")
    );
}

#[tokio::test]
async fn openai_missing_usage_is_estimated() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "one two three"}}]
        })))
        .mount(&server)
        .await;

    let client = OpenAiClient::with_base_url("sk-test", server.uri()).unwrap();
    let completion = client
        .complete(
            &[Message::user("a b c d e f")],
            "gpt-4o-mini",
            &ExecutionOptions::new(0.2, 100),
        )
        .await
        .unwrap();

    assert!(completion.usage.estimated);
    assert_eq!(completion.usage.input_tokens, 8);
    assert_eq!(completion.usage.output_tokens, 4);
    assert_eq!(completion.usage.total_tokens, 12);
}

#[tokio::test]
async fn openai_errors_are_classified() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({"model": "gpt-4"})))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({"model": "gpt-4o"})))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "2")
                .set_body_json(json!({"error": {"message": "slow down"}})),
        )
        .mount(&server)
        .await;

    let client = OpenAiClient::with_base_url("sk-test", server.uri()).unwrap();
    let options = ExecutionOptions::new(0.5, 100);

    let err = client
        .complete(&[Message::user("hi")], "gpt-4", &options)
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::AuthenticationFailed));

    let err = client
        .complete(&[Message::user("hi")], "gpt-4o", &options)
        .await
        .unwrap_err();
    assert_eq!(err.retry_after(), Some(Duration::from_secs(2)));
    assert!(err.is_transient());
}

#[tokio::test]
async fn openai_discovery_keeps_chat_models_only() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "data": [
                {"id": "gpt-4o"},
                {"id": "whisper-1"},
                {"id": "gpt-4o-mini"},
                {"id": "text-embedding-3-small"},
                {"id": "gpt-4o-realtime-preview"},
                {"id": "o1-mini"}
            ]
        })))
        .mount(&server)
        .await;

    let client = Arc::new(OpenAiClient::with_base_url("sk-test", server.uri()).unwrap());
    let catalog = ModelCatalog::default().with_source(client);
    let models = catalog.get_models(Provider::OpenAi, false).await;

    let ids: Vec<&str> = models.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["gpt-4o", "gpt-4o-mini", "o1-mini"]);
    assert_eq!(models[0].rank, 1);
    assert_eq!(models[1].rank, 2);
    assert_eq!(models[2].rank, 6);
}

// ============================================================================
// Claude
// ============================================================================

#[tokio::test]
async fn claude_lifts_system_messages_into_system_field() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "sk-ant"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(body_partial_json(json!({
            "model": "claude-3-5-haiku-20241022",
            "system": "Be brief.\n\nUse British spelling.",
            "messages": [{"role": "user", "content": "Describe colour."}],
            "stop_sequences": ["END"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(claude_reply("Colour is light.")))
        .expect(1)
        .mount(&server)
        .await;

    let client = ClaudeClient::with_base_url("sk-ant", server.uri()).unwrap();
    let completion = client
        .complete(
            &[
                Message::system("Be brief."),
                Message::system("Use British spelling."),
                Message::user("Describe colour."),
            ],
            "claude-3-5-haiku-20241022",
            &ExecutionOptions::new(0.3, 500).parameter("stop", json!("END")),
        )
        .await
        .unwrap();

    assert_eq!(completion.text, "Colour is light.");
    assert_eq!(completion.usage.total_tokens, 12);
    assert_eq!(completion.finish_reason.as_deref(), Some("end_turn"));
}

#[tokio::test]
async fn claude_discovery_marks_missing_models_deprecated() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(body_partial_json(json!({"model": "claude-3-opus-20240229"})))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "type": "error",
            "error": {"type": "not_found_error", "message": "model: claude-3-opus-20240229"}
        })))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(claude_reply("p")))
        .mount(&server)
        .await;

    let client = Arc::new(ClaudeClient::with_base_url("sk-ant", server.uri()).unwrap());
    let catalog = ModelCatalog::default().with_source(client);
    let models = catalog.get_models(Provider::Claude, false).await;

    assert_eq!(models.len(), 5);
    let opus = models
        .iter()
        .find(|m| m.id == "claude-3-opus-20240229")
        .unwrap();
    assert!(opus.deprecated);
    assert!(opus.label.ends_with(" (Unavailable)"));
    assert_eq!(models.iter().filter(|m| m.deprecated).count(), 1);

    let top = catalog.top_model(Provider::Claude).await.unwrap();
    assert_eq!(top.id, "claude-3-5-sonnet-20241022");
}

#[tokio::test]
async fn claude_discovery_failure_serves_static_list() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let client = Arc::new(ClaudeClient::with_base_url("sk-ant", server.uri()).unwrap());
    assert!(client.discover().await.is_err());

    let catalog = ModelCatalog::default().with_source(client);
    let models = catalog.get_models(Provider::Claude, false).await;
    assert_eq!(models.len(), 5);
    assert!(models.iter().all(|m| !m.deprecated));
}

// ============================================================================
// Gemini
// ============================================================================

#[tokio::test]
async fn gemini_primary_sends_system_instruction_and_safety_settings() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-pro:generateContent"))
        .and(header("x-goog-api-key", "g-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply("Hi there")))
        .expect(1)
        .mount(&server)
        .await;

    let client = GeminiClient::with_base_url("g-key", server.uri()).unwrap();
    let completion = client
        .complete(
            &[Message::system("Be brief."), Message::user("Say hi.")],
            "gemini-1.5-pro",
            &ExecutionOptions::new(0.4, 9000).parameter("top_p", json!(0.9)),
        )
        .await
        .unwrap();

    assert_eq!(completion.text, "Hi there");
    assert_eq!(completion.usage.input_tokens, 11);

    let body = &request_bodies(&server).await[0];
    assert_eq!(body["systemInstruction"]["parts"][0]["text"], "Be brief.");
    assert_eq!(body["safetySettings"].as_array().unwrap().len(), 4);
    assert_eq!(body["generationConfig"]["maxOutputTokens"], json!(8192));
    assert_eq!(body["generationConfig"]["topP"], json!(0.9));
    assert_eq!(body["contents"][0]["role"], "user");
}

#[tokio::test]
async fn gemini_safety_block_moves_to_next_marketing_model() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_blocked()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.0-flash:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply("Save 20% today")))
        .expect(1)
        .mount(&server)
        .await;

    let client = GeminiClient::with_base_url("g-key", server.uri()).unwrap();
    let completion = client
        .complete(
            &[Message::user("Write a promo email for our spring sale")],
            "gemini-1.5-flash",
            &ExecutionOptions::new(0.7, 500),
        )
        .await
        .unwrap();

    assert_eq!(completion.text, "Save 20% today");
    assert_eq!(completion.model, "gemini-2.0-flash");
    assert!(
        completion
            .warnings
            .iter()
            .any(|w| w == "gemini safety filter blocked gemini-1.5-flash (SAFETY)")
    );
}

#[tokio::test]
async fn gemini_retired_marketing_model_moves_to_next_candidate() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {
                "code": 404,
                "message": "models/gemini-1.5-flash is not found",
                "status": "NOT_FOUND"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.0-flash:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply("Save 20% today")))
        .expect(1)
        .mount(&server)
        .await;

    let client = GeminiClient::with_base_url("g-key", server.uri()).unwrap();
    let completion = client
        .complete(
            &[Message::user("Write a promo email for our spring sale")],
            "gemini-1.5-flash",
            &ExecutionOptions::new(0.7, 500),
        )
        .await
        .unwrap();

    assert_eq!(completion.text, "Save 20% today");
    assert_eq!(completion.model, "gemini-2.0-flash");
    assert!(
        completion
            .warnings
            .iter()
            .any(|w| w.starts_with("gemini gemini-1.5-flash unusable"))
    );
}

#[tokio::test]
async fn gemini_empty_marketing_reply_moves_to_next_candidate() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"finishReason": "OTHER"}]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.0-flash:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply("Save 20% today")))
        .expect(1)
        .mount(&server)
        .await;

    let client = GeminiClient::with_base_url("g-key", server.uri()).unwrap();
    let completion = client
        .complete(
            &[Message::user("Write a promo email for our spring sale")],
            "gemini-1.5-flash",
            &ExecutionOptions::new(0.7, 500),
        )
        .await
        .unwrap();

    assert_eq!(completion.model, "gemini-2.0-flash");
    assert!(
        completion
            .warnings
            .iter()
            .any(|w| w == "gemini gemini-1.5-flash unusable: empty response from model")
    );
}

#[tokio::test]
async fn gemini_blocked_everywhere_is_content_filtered() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/v1beta/models/.+:generateContent$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"finishReason": "SAFETY"}]
        })))
        .expect(3)
        .mount(&server)
        .await;

    let client = GeminiClient::with_base_url("g-key", server.uri()).unwrap();
    let err = client
        .complete(
            &[Message::user("Newsletter subject line ideas")],
            "gemini-1.5-pro",
            &ExecutionOptions::new(0.7, 500),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, OrchestratorError::ContentFiltered { .. }));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn gemini_primary_failure_falls_back_to_legacy_api() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
        .respond_with(ResponseTemplate::new(500).set_body_string("backend error"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/models/gemini-1.5-flash:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply("legacy says hi")))
        .expect(1)
        .mount(&server)
        .await;

    let primary = GeminiClient::with_base_url("g-key", server.uri()).unwrap();
    let legacy = primary.clone().with_api(GeminiApi::Legacy);
    let tiered = TieredExecutor::new(Arc::new(primary), Arc::new(legacy));

    let completion = tiered
        .complete(
            &[Message::system("Be brief."), Message::user("Say hi.")],
            "gemini-1.5-flash",
            &ExecutionOptions::new(0.4, 100),
        )
        .await
        .unwrap();

    assert_eq!(completion.text, "legacy says hi");
    assert!(
        completion
            .warnings
            .iter()
            .any(|w| w.starts_with("gemini primary API failed"))
    );

    let legacy_body = request_bodies(&server)
        .await
        .into_iter()
        .find(|b| b.get("safetySettings").is_none())
        .unwrap();
    assert!(legacy_body.get("systemInstruction").is_none());
    assert_eq!(
        legacy_body["contents"][0]["parts"][0]["text"],
        "Be brief.\n\nSay hi."
    );
}

#[tokio::test]
async fn gemini_discovery_requires_generate_content() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1beta/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [
                {"name": "models/gemini-1.5-flash", "supportedGenerationMethods": ["generateContent", "countTokens"]},
                {"name": "models/text-embedding-004", "supportedGenerationMethods": ["embedContent"]},
                {"name": "models/gemini-exp-1206", "supportedGenerationMethods": ["generateContent"]},
                {"name": "models/aqa", "supportedGenerationMethods": ["generateAnswer"]}
            ]
        })))
        .mount(&server)
        .await;

    let client = Arc::new(GeminiClient::with_base_url("g-key", server.uri()).unwrap());
    let models = ModelCatalog::default()
        .with_source(client)
        .get_models(Provider::Gemini, false)
        .await;

    let ids: Vec<&str> = models.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["gemini-1.5-flash", "gemini-exp-1206"]);
}

// ============================================================================
// End to end through the builder
// ============================================================================

#[tokio::test]
async fn orchestrator_falls_back_from_openai_to_claude_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({
            "error": {"message": "overloaded"}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(claude_reply("from claude")))
        .expect(1)
        .mount(&server)
        .await;

    let orchestrator = Orchestrator::builder()
        .openai("sk-test")
        .openai_base_url(server.uri())
        .anthropic("sk-ant")
        .anthropic_base_url(server.uri())
        .build()
        .unwrap();

    let response = orchestrator
        .complete(
            CompletionRequest::new(vec![Message::user("Explain recursion briefly.")])
                .provider(Provider::OpenAi)
                .model("gpt-4o"),
        )
        .await;

    assert!(response.success);
    assert_eq!(response.provider, "claude");
    assert_eq!(response.content, "from claude");
    assert!(response.warnings[0].contains("API error (503): overloaded"));
}

#[tokio::test]
async fn clamping_warnings_reach_the_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({"temperature": 1.0, "max_tokens": 4096})))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply("ok")))
        .expect(1)
        .mount(&server)
        .await;

    let orchestrator = Orchestrator::builder()
        .openai("sk-test")
        .openai_base_url(server.uri())
        .build()
        .unwrap();

    let response = orchestrator
        .complete(
            CompletionRequest::new(vec![Message::user("Explain recursion briefly.")])
                .model("gpt-4")
                .temperature(1.5)
                .max_tokens(10_000),
        )
        .await;

    assert!(response.success);
    assert!(response.warnings.iter().any(|w| w.contains("clamped to 1")));
    assert!(response.warnings.iter().any(|w| w.contains("4096-token limit")));
}
