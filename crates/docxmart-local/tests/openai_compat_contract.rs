use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use docxmart_core::{ChatBackend, Error};
use docxmart_local::openai_compat::OpenAiCompatClient;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

type Seen = Arc<Mutex<Vec<(Option<String>, serde_json::Value)>>>;

async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn recording_app(seen: Seen, reply: serde_json::Value) -> Router {
    Router::new()
        .route(
            "/v1/chat/completions",
            post(
                |State((seen, reply)): State<(Seen, serde_json::Value)>,
                 headers: axum::http::HeaderMap,
                 Json(body): Json<serde_json::Value>| async move {
                    let auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    seen.lock().unwrap().push((auth, body));
                    Json(reply)
                },
            ),
        )
        .with_state((seen, reply))
}

#[tokio::test]
async fn complete_sends_model_and_single_user_message() {
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let app = recording_app(
        seen.clone(),
        serde_json::json!({"choices":[{"message":{"role":"assistant","content":"A summary."}}]}),
    );
    let addr = serve(app).await;

    let client = OpenAiCompatClient::new(
        reqwest::Client::new(),
        format!("http://{addr}"),
        Some("k-test".to_string()),
        "tiiuae/falcon-180b-chat",
        5_000,
    );
    let out = client.complete("DOC TEXT", "Summarize this").await.unwrap();
    assert_eq!(out, "A summary.");

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    let (auth, body) = &seen[0];
    assert_eq!(auth.as_deref(), Some("Bearer k-test"));
    assert_eq!(body["model"].as_str(), Some("tiiuae/falcon-180b-chat"));
    let messages = body["messages"].as_array().expect("messages array");
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["role"].as_str(), Some("user"));
    assert_eq!(
        messages[0]["content"].as_str(),
        Some("Here's a document: DOC TEXT \n\n---\n\n Summarize this")
    );
}

#[tokio::test]
async fn empty_choices_are_an_empty_reply() {
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let addr = serve(recording_app(seen, serde_json::json!({"choices": []}))).await;
    let client = OpenAiCompatClient::new(
        reqwest::Client::new(),
        format!("http://{addr}/v1"),
        None,
        "m",
        5_000,
    );
    assert_eq!(client.complete("d", "p").await.unwrap(), "");
}

#[tokio::test]
async fn http_errors_become_chat_errors() {
    let app = Router::new().route(
        "/v1/chat/completions",
        post(|| async { (StatusCode::UNAUTHORIZED, "nope") }),
    );
    let addr = serve(app).await;
    let client = OpenAiCompatClient::new(
        reqwest::Client::new(),
        format!("http://{addr}"),
        None,
        "m",
        5_000,
    );
    let err = client.complete("d", "p").await.unwrap_err();
    assert!(matches!(err, Error::Chat(_)));
    assert!(err.to_string().contains("401"), "err={err}");
}

#[tokio::test]
async fn slow_endpoint_times_out() {
    let app = Router::new().route(
        "/v1/chat/completions",
        post(|| async {
            tokio::time::sleep(std::time::Duration::from_secs(5)).await;
            "late"
        }),
    );
    let addr = serve(app).await;
    let client = OpenAiCompatClient::new(
        reqwest::Client::new(),
        format!("http://{addr}"),
        None,
        "m",
        100,
    );
    let err = client.complete("d", "p").await.unwrap_err();
    assert!(matches!(err, Error::Chat(_)));
}
