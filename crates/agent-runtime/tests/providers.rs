use agent_core::provider::{GenerationOptions, LlmProvider};
use agent_core::toolkit::default_registry;
use agent_core::{AgentError, Message};
use agent_runtime::config::{OllamaConfig, OpenAiConfig};
use agent_runtime::{OllamaProvider, OpenAiProvider};
use mockito::Matcher;
use serde_json::json;

fn ollama(url: String) -> OllamaProvider {
    OllamaProvider::from_config(OllamaConfig {
        host: url,
        timeout_secs: 5,
        ..Default::default()
    })
    .unwrap()
}

fn options() -> GenerationOptions {
    GenerationOptions {
        model: "llama3.2:1b".into(),
        temperature: 0.0,
        ..Default::default()
    }
}

#[tokio::test]
async fn ollama_chat_surfaces_tool_calls() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/chat")
        .match_body(Matcher::AllOf(vec![
            Matcher::PartialJson(json!({"model": "llama3.2:1b"})),
            Matcher::Regex(r#""content":"what is 2\+3\?""#.into()),
            Matcher::Regex(r#""name":"calculator""#.into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "model": "llama3.2:1b",
                "created_at": "2024-06-01T10:00:00Z",
                "message": {
                    "role": "assistant",
                    "content": "",
                    "tool_calls": [{"function": {"name": "calculator", "arguments": {"expression": "2+3"}}}]
                },
                "done": true,
                "total_duration": 1_000_000,
                "load_duration": 10_000,
                "prompt_eval_count": 42,
                "prompt_eval_duration": 100_000,
                "eval_count": 8,
                "eval_duration": 200_000
            })
            .to_string(),
        )
        .create_async()
        .await;

    let provider = ollama(server.url());
    let tools = default_registry().unwrap().schemas();
    let completion = provider
        .complete(&[Message::human("what is 2+3?")], &tools, &options())
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(completion.tool_calls.len(), 1);
    assert_eq!(completion.tool_calls[0].name, "calculator");
    assert_eq!(completion.tool_calls[0].arguments["expression"], "2+3");
}

#[tokio::test]
async fn ollama_error_status_is_provider_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/api/chat")
        .with_status(404)
        .with_body(r#"{"error": "model 'nope' not found"}"#)
        .create_async()
        .await;

    let provider = ollama(server.url());
    let err = provider
        .complete(&[Message::human("hi")], &[], &options())
        .await
        .unwrap_err();

    assert!(matches!(err, AgentError::Provider(_)), "{err:?}");
}

#[tokio::test]
async fn ollama_lists_models_sorted() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/tags")
        .with_status(200)
        .with_body(
            json!({"models": [
                {
                    "name": "mistral:latest",
                    "model": "mistral:latest",
                    "modified_at": "2024-06-01T10:00:00Z",
                    "size": 4_100_000_000_u64,
                    "digest": "f974a74358d6",
                    "details": {"format": "gguf", "family": "llama", "parameter_size": "7B"}
                },
                {
                    "name": "llama3.2:1b",
                    "model": "llama3.2:1b",
                    "modified_at": "2024-09-25T08:30:00Z",
                    "size": 1_300_000_000_u64,
                    "digest": "baf6a787fdff",
                    "details": {"format": "gguf", "family": "llama", "parameter_size": "1.2B"}
                }
            ]})
            .to_string(),
        )
        .create_async()
        .await;

    let provider = ollama(server.url());
    let models = provider.list_models().await.unwrap();
    assert_eq!(models.len(), 2);
    assert_eq!(models[0].name, "llama3.2:1b");
    assert_eq!(models[1].size_bytes, Some(4_100_000_000));
    assert_eq!(models[1].modified_at.as_deref(), Some("2024-06-01T10:00:00Z"));
    assert!(provider.health_check().await.unwrap());
}

#[tokio::test]
async fn unreachable_endpoint_is_provider_unavailable() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let provider = OllamaProvider::new("http://127.0.0.1", port).unwrap();

    let err = provider
        .complete(&[Message::human("hi")], &[], &options())
        .await
        .unwrap_err();
    assert!(matches!(err, AgentError::ProviderUnavailable(_)), "{err:?}");
    assert!(!provider.health_check().await.unwrap());
}

#[tokio::test]
async fn openai_chat_sends_bearer_and_tools() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/chat/completions")
        .match_header("authorization", "Bearer sk-test")
        .match_body(Matcher::AllOf(vec![
            Matcher::PartialJson(json!({"model": "gpt-4o"})),
            Matcher::Regex(r#""name":"calculator""#.into()),
        ]))
        .with_status(200)
        .with_body(
            json!({
                "model": "gpt-4o",
                "choices": [{
                    "message": {"role": "assistant", "content": "Hello!"},
                    "finish_reason": "stop"
                }]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let provider = OpenAiProvider::from_config(OpenAiConfig {
        api_key: "sk-test".into(),
        base_url: format!("{}/v1/", server.url()),
        ca_cert_path: None,
        accept_invalid_certs: false,
        timeout_secs: 5,
    })
    .unwrap();

    let mut registry = agent_core::ToolRegistry::new();
    registry.register(agent_core::toolkit::CalculatorTool).unwrap();
    let options = GenerationOptions {
        model: "gpt-4o".into(),
        ..Default::default()
    };
    let completion = provider
        .complete(&[Message::human("hi")], &registry.schemas(), &options)
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(completion.content, "Hello!");
    assert!(completion.tool_calls.is_empty());
}
