use cloudshell_api::ConsoleClient;
use cloudshell_relay::{connect_terminal, RelayOutcome};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> ConsoleClient {
    ConsoleClient::new("test-token".to_string(), server.uri())
}

async fn mock_initialize(server: &MockServer, socket_uri: &str) {
    Mock::given(method("POST"))
        .and(path("/terminals"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "term-1",
            "socketUri": socket_uri
        })))
        .mount(server)
        .await;
}

async fn local_ws_listener() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let uri = format!("ws://{}", listener.local_addr().unwrap());
    (listener, uri)
}

#[tokio::test]
async fn clean_close_relays_output_and_writes_the_marker_once() {
    let (listener, socket_uri) = local_ws_listener().await;
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        ws.send(Message::Text("hello from shell".to_string()))
            .await
            .unwrap();
        ws.send(Message::Close(None)).await.unwrap();
        // Drain until the peer finishes the closing handshake.
        while ws.next().await.is_some() {}
    });

    let api = MockServer::start().await;
    mock_initialize(&api, &socket_uri).await;

    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("ready");

    let relay = connect_terminal(client_for(&api), &api.uri(), Some(&marker))
        .await
        .unwrap()
        .expect("terminal should connect");
    assert_eq!(relay.handle().id, "term-1");

    // Marker appears as soon as the socket is open, before the relay runs.
    let contents = std::fs::read_to_string(&marker).unwrap();
    let (millis, _) = contents.split_once(": ").unwrap();
    assert!(millis.parse::<i64>().unwrap() > 0);

    let mut output = Vec::new();
    let outcome = relay.run(tokio::io::empty(), &mut output).await.unwrap();
    assert_eq!(outcome, RelayOutcome::CleanClose);
    assert_eq!(output, b"hello from shell");
}

#[tokio::test]
async fn abrupt_disconnect_reports_an_error_close() {
    let (listener, socket_uri) = local_ws_listener().await;
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        ws.send(Message::Text("partial".to_string())).await.unwrap();
        // Drop the TCP stream without a close frame.
    });

    let api = MockServer::start().await;
    mock_initialize(&api, &socket_uri).await;

    let relay = connect_terminal(client_for(&api), &api.uri(), None)
        .await
        .unwrap()
        .expect("terminal should connect");

    let mut output = Vec::new();
    let outcome = relay.run(tokio::io::empty(), &mut output).await.unwrap();
    assert_eq!(outcome, RelayOutcome::ErrorClose);
    assert_eq!(output, b"partial");
}

#[tokio::test]
async fn local_input_is_forwarded_verbatim_as_binary_frames() {
    let (listener, socket_uri) = local_ws_listener().await;
    let (tx, rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        let received = match ws.next().await {
            Some(Ok(Message::Binary(data))) => data,
            other => panic!("expected binary frame, got {other:?}"),
        };
        tx.send(received).unwrap();
        ws.send(Message::Binary(b"ok".to_vec())).await.unwrap();
        ws.send(Message::Close(None)).await.unwrap();
        while ws.next().await.is_some() {}
    });

    let api = MockServer::start().await;
    mock_initialize(&api, &socket_uri).await;

    let relay = connect_terminal(client_for(&api), &api.uri(), None)
        .await
        .unwrap()
        .expect("terminal should connect");

    let mut output = Vec::new();
    let outcome = relay.run(&b"echo hi\n"[..], &mut output).await.unwrap();
    assert_eq!(outcome, RelayOutcome::CleanClose);
    assert_eq!(rx.await.unwrap(), b"echo hi\n");
    assert_eq!(output, b"ok");
}

#[tokio::test]
async fn terminal_failures_are_soft_and_leave_no_marker() {
    let api = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/terminals"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": { "message": "forbidden" }
        })))
        .expect(1)
        .mount(&api)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("ready");

    let relay = connect_terminal(client_for(&api), &api.uri(), Some(&marker))
        .await
        .unwrap();
    assert!(relay.is_none());
    assert!(!marker.exists());
}

#[tokio::test]
async fn transient_initialize_failures_are_retried_with_backoff() {
    let (listener, socket_uri) = local_ws_listener().await;
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        ws.send(Message::Close(None)).await.unwrap();
        while ws.next().await.is_some() {}
    });

    let api = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/terminals"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&api)
        .await;
    Mock::given(method("POST"))
        .and(path("/terminals"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "term-1",
            "socketUri": socket_uri
        })))
        .expect(1)
        .with_priority(2)
        .mount(&api)
        .await;

    let relay = connect_terminal(client_for(&api), &api.uri(), None)
        .await
        .unwrap();
    assert!(relay.is_some());
}
