mod common;

use std::time::Duration;

use common::{closed_address, inbox_message, raw_responder, FakeServer};
use dsu_core::{
    ClientConfig, CodecError, Credentials, SessionClient, SessionError, TcpTransport,
};

fn config() -> ClientConfig {
    ClientConfig {
        timeout: Duration::from_secs(2),
        ..ClientConfig::default()
    }
}

fn client_for(server: &str, username: &str, password: &str) -> SessionClient {
    SessionClient::connect_with(Credentials::new(server, username, password), &config()).unwrap()
}

#[test]
fn join_then_operations_succeed() {
    let server = FakeServer::dsu(vec![inbox_message("bob", "hi alice", "1603167689.3928561")]);
    let mut client = client_for(&server.address(), "alice", "pw1");

    let token = client.join().unwrap();
    assert_eq!(token.as_str(), "T1");

    let sent = client.send_message("hello", "bob").unwrap();
    assert_eq!(sent.recipient, "bob");

    let new = client.retrieve_new().unwrap();
    assert_eq!(new.len(), 1);
    assert_eq!(new[0].sender, "bob");

    let all = client.retrieve_all().unwrap();
    assert_eq!(all.len(), 1);

    // One connection per operation.
    assert_eq!(server.connections(), 4);
}

#[test]
fn sent_frame_carries_returned_timestamp() {
    let server = FakeServer::dsu(Vec::new());
    let mut client = client_for(&server.address(), "alice", "pw1");
    client.join().unwrap();
    let sent = client.send_message("hello", "bob").unwrap();

    let requests = server.requests();
    let frame = &requests[1];
    assert_eq!(frame["token"], "T1");
    assert_eq!(frame["directmessage"]["entry"], "hello");
    assert_eq!(frame["directmessage"]["timestamp"].as_f64(), Some(sent.timestamp.as_f64()));
}

#[test]
fn rejected_join_leaves_client_unauthenticated() {
    let server = FakeServer::dsu(Vec::new());
    let mut client = client_for(&server.address(), "alice", "wrong");

    match client.join() {
        Err(SessionError::Rejected(reason)) => assert!(reason.contains("Invalid password")),
        other => panic!("expected rejection, got {:?}", other),
    }
    assert!(!client.is_authenticated());

    assert!(matches!(client.send_message("hi", "bob"), Err(SessionError::NotAuthenticated)));
    assert!(matches!(client.retrieve_new(), Err(SessionError::NotAuthenticated)));
    assert_eq!(server.connections(), 1);
}

#[test]
fn retrieve_new_is_idempotent_when_nothing_arrives() {
    let server = FakeServer::dsu(Vec::new());
    let mut client = client_for(&server.address(), "alice", "pw1");
    client.join().unwrap();

    assert!(client.retrieve_new().unwrap().is_empty());
    assert!(client.retrieve_new().unwrap().is_empty());
}

#[test]
fn refused_connection_is_unreachable() {
    let mut client = client_for(&closed_address(), "alice", "pw1");
    assert!(matches!(client.join(), Err(SessionError::Unreachable(_))));
    assert!(!client.is_authenticated());
}

#[test]
fn silent_server_times_out_as_unreachable() {
    // Accepts but never answers.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let _keep = std::thread::spawn(move || {
        let held: Vec<_> = listener.incoming().take(1).collect();
        std::thread::sleep(Duration::from_secs(5));
        drop(held);
    });

    let creds = Credentials::new(addr, "alice", "pw1");
    let config = ClientConfig {
        timeout: Duration::from_millis(200),
        ..ClientConfig::default()
    };
    let mut client = SessionClient::connect_with(creds, &config).unwrap();
    assert!(matches!(client.join(), Err(SessionError::Unreachable(_))));
}

#[test]
fn malformed_response_is_decode_error() {
    let server = FakeServer::start(|_| serde_json::json!({"unexpected": true}));
    let mut client = client_for(&server.address(), "alice", "pw1");
    assert!(matches!(client.join(), Err(SessionError::Decode(_))));
}

#[test]
fn unresolvable_host_is_invalid_endpoint() {
    let mut client = client_for("no-such-host.invalid", "alice", "pw1");
    assert!(matches!(client.join(), Err(SessionError::InvalidEndpoint(_))));
    assert!(!client.is_authenticated());
}

#[test]
fn non_utf8_response_is_decode_error() {
    let address = raw_responder(b"{\"response\":\xff\xfe}\r\n".to_vec());
    let mut client = client_for(&address, "alice", "pw1");
    assert!(matches!(
        client.join(),
        Err(SessionError::Decode(CodecError::InvalidUtf8(_)))
    ));
}

#[test]
fn oversized_response_is_rejected() {
    let address = raw_responder(vec![b'x'; 4096]);
    let transport = TcpTransport::new(Duration::from_secs(2)).with_max_frame(256);
    let mut client =
        SessionClient::with_transport(Credentials::new(address, "alice", "pw1"), 3021, transport)
            .unwrap();
    assert!(matches!(
        client.join(),
        Err(SessionError::Decode(CodecError::FrameTooLarge(256)))
    ));
}
