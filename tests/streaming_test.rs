//! Integration tests for streaming execution: chunk decode, terminal
//! markers, malformed-line tolerance, and stream setup failures.

use modelrelay::{
    providers, ChatRequest, Client, Error, Message, Model, Provider, ProviderConfig,
    StreamingChunk,
};
use serde_json::json;
use std::sync::Arc;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn ollama_provider(base_url: &str) -> Arc<dyn Provider> {
    providers::create(&ProviderConfig {
        name: "ollama".to_string(),
        base_url: base_url.to_string(),
        ..ProviderConfig::default()
    })
    .unwrap()
}

fn chunk_line(content: &str) -> String {
    format!(
        "data: {}\n",
        json!({
            "id": "chatcmpl-1",
            "object": "chat.completion.chunk",
            "model": "llama3.1:8b",
            "choices": [{"index": 0, "delta": {"content": content}, "finish_reason": null}]
        })
    )
}

fn stream_request(base_url: &str) -> ChatRequest {
    ChatRequest::new(
        ollama_provider(base_url),
        Arc::new(Model::new("llama3.1:8b")),
        vec![Message::user("Tell me a story")],
    )
    .with_option("stream", json!(true))
}

async fn collect(
    client: &Client,
    request: &ChatRequest,
) -> Result<Vec<StreamingChunk>, Error> {
    let mut stream = client
        .execute_stream(request, &CancellationToken::new())
        .await?;
    let mut chunks = Vec::new();
    while let Some(chunk) = stream.next().await {
        chunks.push(chunk);
    }
    Ok(chunks)
}

#[tokio::test]
async fn stream_delivers_chunks_until_done_marker() {
    let server = MockServer::start().await;
    let body = format!(
        "{}\n{}\n{}",
        chunk_line("Once"),
        chunk_line(" upon"),
        "data: [DONE]\n"
    );
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("Accept", "text/event-stream"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .expect(1)
        .mount(&server)
        .await;

    let client = Client::with_defaults().unwrap();
    let chunks = collect(&client, &stream_request(&server.uri()))
        .await
        .unwrap();

    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].content(), "Once");
    assert_eq!(chunks[1].content(), " upon");
    assert!(chunks.iter().all(|c| c.error.is_none()));
    assert!(client.is_healthy());
}

#[tokio::test]
async fn malformed_chunk_line_is_skipped() {
    let server = MockServer::start().await;
    let body = format!(
        "{}data: {{not json\n{}data: [DONE]\n",
        chunk_line("first"),
        chunk_line("second")
    );
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let client = Client::with_defaults().unwrap();
    let chunks = collect(&client, &stream_request(&server.uri()))
        .await
        .unwrap();

    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].content(), "first");
    assert_eq!(chunks[1].content(), "second");
}

#[tokio::test]
async fn chunks_after_done_marker_are_ignored() {
    let server = MockServer::start().await;
    let body = format!("{}data: [DONE]\n{}", chunk_line("only"), chunk_line("late"));
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let client = Client::with_defaults().unwrap();
    let chunks = collect(&client, &stream_request(&server.uri()))
        .await
        .unwrap();

    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].content(), "only");
}

#[tokio::test]
async fn bare_ndjson_lines_are_accepted() {
    let server = MockServer::start().await;
    // Some local servers emit newline-delimited JSON without SSE framing.
    let body = format!(
        "{}\n{}",
        json!({"model": "m", "choices": [{"index": 0, "delta": {"content": "hi"}}]}),
        "data: [DONE]\n"
    );
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/x-ndjson"))
        .mount(&server)
        .await;

    let client = Client::with_defaults().unwrap();
    let chunks = collect(&client, &stream_request(&server.uri()))
        .await
        .unwrap();

    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].content(), "hi");
}

/// Serves one streaming response whose Content-Length promises more bytes
/// than are ever written, then closes the socket. The client sees the
/// written lines followed by a hard read error.
async fn truncated_stream_server(body: String) -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = [0u8; 8192];
        let _ = socket.read(&mut request).await;

        let header = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nContent-Length: {}\r\n\r\n",
            body.len() + 64
        );
        socket.write_all(header.as_bytes()).await.unwrap();
        socket.write_all(body.as_bytes()).await.unwrap();
        socket.flush().await.unwrap();
        // Dropping the socket here cuts the body short of the promised
        // length.
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn read_failure_delivers_one_final_error_chunk() {
    let base = truncated_stream_server(chunk_line("partial")).await;

    let client = Client::with_defaults().unwrap();
    let chunks = collect(&client, &stream_request(&base)).await.unwrap();

    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].content(), "partial");
    assert!(chunks[0].error.is_none());
    let err = chunks[1].error.as_ref().expect("last chunk carries the read error");
    assert!(matches!(err, Error::Stream(_)));
}

#[tokio::test]
async fn azure_stream_decodes_sse_events() {
    let server = MockServer::start().await;
    let body = format!(
        "event: message\n{}\nevent: message\n{}\ndata: [DONE]\n\n",
        chunk_line("Hel"),
        chunk_line("lo")
    );
    Mock::given(method("POST"))
        .and(path("/openai/deployments/gpt-4o-prod/chat/completions"))
        .and(query_param("api-version", "2024-06-01"))
        .and(header("api-key", "azure-key"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .expect(1)
        .mount(&server)
        .await;

    let provider = providers::create(
        &serde_json::from_value(json!({
            "name": "azure",
            "base_url": format!("{}/openai", server.uri()),
            "options": {
                "deployment": "gpt-4o-prod",
                "auth_type": "api_key",
                "token": "azure-key",
                "api_version": "2024-06-01",
            }
        }))
        .unwrap(),
    )
    .unwrap();

    let client = Client::with_defaults().unwrap();
    let request = ChatRequest::new(
        provider,
        Arc::new(Model::new("gpt-4o")),
        vec![Message::user("hello")],
    )
    .with_option("stream", json!(true));

    let chunks = collect(&client, &request).await.unwrap();
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].content(), "Hel");
    assert_eq!(chunks[1].content(), "lo");
}

#[tokio::test]
async fn embeddings_cannot_stream() {
    let client = Client::with_defaults().unwrap();
    let request = modelrelay::EmbeddingsRequest::new(
        ollama_provider("http://localhost:11434"),
        Arc::new(Model::new("nomic-embed-text")),
        "text",
    );

    let err = client
        .execute_stream(&request, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::StreamingUnsupported(_)));
}

#[tokio::test]
async fn stream_setup_failure_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .expect(1)
        .mount(&server)
        .await;

    let client = Client::with_defaults().unwrap();
    let err = client
        .execute_stream(&stream_request(&server.uri()), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Status { code: 503, .. }));
    assert!(!client.is_healthy());
}

#[tokio::test]
async fn pre_cancelled_token_fails_stream_setup() {
    let client = Client::with_defaults().unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = client
        .execute_stream(&stream_request("http://localhost:11434"), &cancel)
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
}
