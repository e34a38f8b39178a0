use std::net::SocketAddr;
use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use sarathi_core::fallback::{DHARMA_RESPONSE, QUOTATIONS};
use sarathi_core::markdown::LineKind;
use sarathi_core::{
    Conversation, Endpoint, Entry, GuideClient, Origin, Responder, ResponderError, Source, VerseBook,
};

async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn client_for(addr: SocketAddr, timeout: Duration) -> GuideClient {
    let endpoint = Endpoint::parse(&format!("http://{}/api/chat", addr)).unwrap();
    GuideClient::new(endpoint, timeout).unwrap()
}

/// Echoes the query back so tests can see what was sent.
async fn echo(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    match body.get("query").and_then(Value::as_str) {
        Some(query) if !query.is_empty() => (StatusCode::OK, Json(json!({ "response": format!("You asked: {}", query) }))),
        _ => (StatusCode::BAD_REQUEST, Json(json!({ "error": "No query provided" }))),
    }
}

#[tokio::test]
async fn successful_reply_is_returned() {
    let addr = serve(Router::new().route("/api/chat", post(echo))).await;
    let client = client_for(addr, Duration::from_secs(5));

    let reply = client.request_response("What is the self?").await.unwrap();
    assert_eq!(reply, "You asked: What is the self?");
}

#[tokio::test]
async fn error_status_is_a_failure() {
    let app = Router::new().route(
        "/api/chat",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": "Knowledge base not found" }))) }),
    );
    let addr = serve(app).await;

    let err = client_for(addr, Duration::from_secs(5)).request_response("hi").await.unwrap_err();
    match err {
        ResponderError::Status { status, message } => {
            assert_eq!(status.as_u16(), 500);
            assert_eq!(message, "Knowledge base not found");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn missing_response_field_is_malformed() {
    let app = Router::new().route("/api/chat", post(|| async { Json(json!({ "answer": "wrong field" })) }));
    let addr = serve(app).await;

    let err = client_for(addr, Duration::from_secs(5)).request_response("hi").await.unwrap_err();
    assert!(matches!(err, ResponderError::Malformed(_)), "{:?}", err);
}

#[tokio::test]
async fn non_json_body_is_malformed() {
    let app = Router::new().route("/api/chat", post(|| async { "<html>oops</html>" }));
    let addr = serve(app).await;

    let err = client_for(addr, Duration::from_secs(5)).request_response("hi").await.unwrap_err();
    assert!(matches!(err, ResponderError::Malformed(_)), "{:?}", err);
}

#[tokio::test]
async fn slow_server_times_out() {
    let app = Router::new().route(
        "/api/chat",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!({ "response": "too late" }))
        }),
    );
    let addr = serve(app).await;

    let err = client_for(addr, Duration::from_millis(200)).request_response("hi").await.unwrap_err();
    assert!(matches!(err, ResponderError::Timeout), "{:?}", err);
}

#[tokio::test]
async fn unreachable_server_is_a_transport_failure() {
    // Bind then drop to get a port nobody listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client_for(addr, Duration::from_secs(2)).request_response("hi").await.unwrap_err();
    assert!(matches!(err, ResponderError::Transport(_)), "{:?}", err);
}

#[tokio::test]
async fn health_probe() {
    let app = Router::new().route("/api/health", get(|| async { Json(json!({ "status": "ok" })) }));
    let addr = serve(app).await;
    assert!(client_for(addr, Duration::from_secs(5)).health().await.is_ok());

    let down = serve(Router::new()).await;
    assert!(client_for(down, Duration::from_secs(5)).health().await.is_err());
}

#[tokio::test]
async fn hello_renders_bold_peace() {
    let app = Router::new().route("/api/chat", post(|| async { Json(json!({ "response": "**Peace** be with you" })) }));
    let addr = serve(app).await;
    let client = client_for(addr, Duration::from_secs(5));

    let mut conversation = Conversation::default();
    let reply = conversation.exchange(&client, "hello").await.unwrap();
    assert!(!reply.fallback);

    match conversation.transcript().entries().last().unwrap() {
        Entry::Message { message, lines, .. } => {
            assert_eq!(message.origin, Origin::Guide);
            assert_eq!(lines.len(), 1);
            assert_eq!(lines[0].kind, LineKind::Paragraph);
            assert!(lines[0].segments.iter().any(|s| s.text == "Peace" && s.style.bold));
            assert!(!lines[0].text().contains('*'));
        }
        other => panic!("unexpected entry: {:?}", other),
    }
}

#[tokio::test]
async fn dharma_question_falls_back_when_server_fails() {
    let app = Router::new().route("/api/chat", post(|| async { StatusCode::SERVICE_UNAVAILABLE }));
    let addr = serve(app).await;
    let client = client_for(addr, Duration::from_secs(5));

    let mut conversation = Conversation::default();
    let reply = conversation.exchange(&client, "What is dharma?").await.unwrap();
    assert!(reply.fallback);

    let last = conversation.transcript().messages().last().unwrap();
    assert_eq!(last.text, DHARMA_RESPONSE);
}

#[tokio::test]
async fn unrelated_question_falls_back_to_a_quotation() {
    let app = Router::new().route("/api/chat", post(|| async { StatusCode::NOT_FOUND }));
    let addr = serve(app).await;
    let client = client_for(addr, Duration::from_secs(5));

    let mut conversation = Conversation::default();
    let reply = conversation.exchange(&client, "hello there").await.unwrap();
    assert!(QUOTATIONS.contains(&reply.text.as_str()));
}

#[tokio::test]
async fn endpoint_and_verses_load_over_http() {
    let addr = serve(
        Router::new()
            .route("/env.json", get(|| async { Json(json!({ "API_URL": "http://guide.example.org/api/chat" })) }))
            .route(
                "/verses.json",
                get(|| async {
                    Json(json!([
                        { "sanskrit": "a", "translation": "first", "reference": "BG 1.1" },
                        { "sanskrit": "b", "translation": "second", "reference": "BG 2.47" }
                    ]))
                }),
            ),
    )
    .await;
    let http = reqwest::Client::new();

    let endpoint = Endpoint::resolve(&http, &Source::parse(&format!("http://{}/env.json", addr))).await;
    assert_eq!(endpoint.url().as_str(), "http://guide.example.org/api/chat");

    let verses = VerseBook::load(&http, &Source::parse(&format!("http://{}/verses.json", addr))).await.unwrap();
    assert_eq!(verses.len(), 2);

    let missing = Endpoint::resolve(&http, &Source::parse(&format!("http://{}/missing.json", addr))).await;
    assert_eq!(missing, Endpoint::default());
}
