//! Search providers against a mocked OpenAI-compatible gateway.

use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use replyguy::llm::LlmClient;
use replyguy::providers::{
    CandidateProvider, FunctionCallProvider, StructuredSearchProvider, ToolAugmentedProvider,
    ToolhouseClient,
};
use replyguy::{
    FilterCriteria, ProviderChain, ProviderError, ReplyGenerator, ReplyKind, ReplyRequest,
    SearchMethod, SourceKind,
};

fn llm(server: &MockServer) -> LlmClient {
    LlmClient::new(server.uri(), "test-key", Duration::from_secs(5)).unwrap()
}

fn tweets_payload() -> serde_json::Value {
    json!({
        "tweets": [
            {
                "author_name": "Grace Hopper",
                "author_handle": "grace",
                "author_verified": true,
                "content": "It's easier to ask forgiveness than permission.",
                "posted_at": "2 hours ago",
                "metrics": { "likes": 900, "replies": 50, "retweets": 100, "views": 20000, "trending": true }
            },
            {
                "author_name": "Linus",
                "author_handle": "@linus",
                "author_verified": false,
                "content": "Talk is cheap.",
                "posted_at": "",
                "metrics": { "likes": 10, "replies": 0, "retweets": 0, "views": 0, "trending": false }
            }
        ]
    })
}

#[tokio::test]
async fn structured_provider_reads_output_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/responses"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "output_text": tweets_payload().to_string()
        })))
        .mount(&server)
        .await;

    let provider = StructuredSearchProvider::new(Some(llm(&server)), "gpt-4o");
    let posts = provider.fetch(&FilterCriteria::default()).await.unwrap();

    assert_eq!(posts.len(), 2);
    assert!(posts[0].id.starts_with("web-0-"));
    assert_eq!(posts[0].posted_at, "2 hours ago");
    // (100 + 300 + 900) / 20000 * 50 = 3.25, plus 30 for views and 10 for trending.
    assert_eq!(posts[0].viral_potential, 43);
    assert!(posts[0].is_verified);
    assert_eq!(posts[1].author.handle, "linus");
    assert_eq!(posts[1].posted_at, "just now");
    assert_eq!(posts[1].viral_potential, 50);
}

#[tokio::test]
async fn structured_provider_falls_back_to_message_parts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/responses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "output": [
                { "type": "web_search_call", "status": "completed" },
                {
                    "type": "message",
                    "content": [{ "type": "output_text", "text": tweets_payload().to_string() }]
                }
            ]
        })))
        .mount(&server)
        .await;

    let provider = StructuredSearchProvider::new(Some(llm(&server)), "gpt-4o");
    let posts = provider.fetch(&FilterCriteria::default()).await.unwrap();
    assert_eq!(posts.len(), 2);
}

#[tokio::test]
async fn function_call_provider_reads_arguments() {
    let server = MockServer::start().await;
    let arguments = json!({
        "tweets": [{
            "author_name": "Ada",
            "author_handle": "ada",
            "author_verified": false,
            "content": "Notes on the engine.",
            "posted_at": "yesterday",
            "likes": 40, "replies": 5, "retweets": 5, "views": 500,
            "is_trending": false
        }]
    });
    Mock::given(method("POST"))
        .and(path("/responses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "output": [{
                "type": "function_call",
                "name": "get_trending_tweets",
                "arguments": arguments.to_string()
            }]
        })))
        .mount(&server)
        .await;

    let provider = FunctionCallProvider::new(Some(llm(&server)), "gpt-4o");
    let posts = provider.fetch(&FilterCriteria::default()).await.unwrap();

    assert_eq!(posts.len(), 1);
    assert!(posts[0].id.starts_with("fn-0-"));
    // (10 + 15 + 40) / 500 * 50 = 6.5, rounds to 17 with the 10 point view bonus.
    assert_eq!(posts[0].viral_potential, 17);
    assert_eq!(posts[0].posted_at, "yesterday");
}

#[tokio::test]
async fn missing_function_call_is_a_structural_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/responses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "output": [] })))
        .mount(&server)
        .await;

    let provider = FunctionCallProvider::new(Some(llm(&server)), "gpt-4o");
    let error = provider.fetch(&FilterCriteria::default()).await.unwrap_err();
    assert!(matches!(error, ProviderError::MissingField(_)));
}

#[tokio::test]
async fn upstream_errors_carry_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/responses"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&server)
        .await;

    let provider = StructuredSearchProvider::new(Some(llm(&server)), "gpt-4o");
    match provider.fetch(&FilterCriteria::default()).await {
        Err(ProviderError::Status { status, detail }) => {
            assert_eq!(status, 429);
            assert_eq!(detail, "rate limited");
        }
        other => panic!("expected status error, got {:?}", other.map(|posts| posts.len())),
    }
}

#[tokio::test]
async fn tool_augmented_provider_runs_tools_between_rounds() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/get_tools"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "type": "function",
            "function": { "name": "web_search", "parameters": { "type": "object" } }
        }])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/run_tools"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": { "role": "tool", "tool_call_id": "call_1", "content": "search results" }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": { "name": "web_search", "arguments": "{\"query\":\"trending\"}" }
                    }]
                }
            }]
        })))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": "Here is what I found:\n[{\"authorName\":\"Grace\",\"authorHandle\":\"grace\",\"text\":\"Compilers are fun\",\"likes\":10}]\nEnjoy!"
                }
            }]
        })))
        .with_priority(2)
        .mount(&server)
        .await;

    let tools =
        ToolhouseClient::new(server.uri(), "tool-key", "default", Duration::from_secs(5)).unwrap();
    let provider = ToolAugmentedProvider::new(Some(llm(&server)), Some(tools), "gpt-4o");
    let posts = provider.fetch(&FilterCriteria::default()).await.unwrap();

    assert_eq!(posts.len(), 1);
    assert!(posts[0].id.starts_with("toolhouse-0-"));
    assert_eq!(posts[0].author.handle, "grace");
    assert_eq!(posts[0].content, "Compilers are fun");

    let requests = server.received_requests().await.unwrap();
    let chats: Vec<serde_json::Value> = requests
        .iter()
        .filter(|request| request.url.path() == "/chat/completions")
        .map(|request| serde_json::from_slice(&request.body).unwrap())
        .collect();
    assert_eq!(chats.len(), 2);
    let second = chats[1]["messages"].as_array().unwrap();
    assert_eq!(second.len(), 3);
    assert_eq!(second[2]["role"], "tool");
    assert_eq!(second[2]["tool_call_id"], "call_1");
}

#[tokio::test]
async fn malformed_primary_payload_falls_through_to_static_dataset() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/responses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "output_text": "Sorry, I could not find any tweets."
        })))
        .mount(&server)
        .await;

    let chain =
        ProviderChain::for_method(SearchMethod::Structured, Some(llm(&server)), None, "gpt-4o");
    let batch = chain.resolve(&FilterCriteria::default()).await;

    assert_eq!(batch.source, SourceKind::Mock);
    assert_eq!(batch.failures.len(), 2);
    assert_eq!(batch.failures[0].0, SourceKind::Structured);
    assert!(batch.failures[0].1.starts_with("malformed payload"));
    assert_eq!(batch.failures[1].0, SourceKind::ToolAugmented);
}

#[tokio::test]
async fn empty_tweet_array_falls_through() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/responses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "output_text": "{\"tweets\": []}"
        })))
        .mount(&server)
        .await;

    let provider = StructuredSearchProvider::new(Some(llm(&server)), "gpt-4o");
    let error = provider.fetch(&FilterCriteria::default()).await.unwrap_err();
    assert!(matches!(error, ProviderError::EmptyResult));
}

#[tokio::test]
async fn reply_generator_drafts_three_options() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": "Hot take.\n\nPlot twist: it was DNS.\n\nLatency budgets matter."
                }
            }]
        })))
        .mount(&server)
        .await;

    assert!(!ReplyGenerator::new(None, "gpt-4o").is_configured());
    let generator = ReplyGenerator::new(Some(llm(&server)), "gpt-4o");
    assert!(generator.is_configured());

    let request = ReplyRequest::new("Shipping on Friday", "sama");
    let replies = generator.generate(&request).await.unwrap();
    let kinds: Vec<ReplyKind> = replies.iter().map(|reply| reply.kind).collect();
    assert_eq!(
        kinds,
        vec![ReplyKind::Controversial, ReplyKind::Humorous, ReplyKind::Insightful]
    );
    assert_eq!(replies[1].content, "Plot twist: it was DNS.");

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["temperature"], 0.9);
    assert_eq!(body["max_tokens"], 300);
    assert_eq!(body["messages"][0]["role"], "system");
}
