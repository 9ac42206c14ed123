//! Loopback fake DSU server for integration tests.

#![allow(dead_code)]

use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use serde_json::{json, Value};

pub struct FakeServer {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<Value>>>,
    connections: Arc<AtomicUsize>,
}

impl FakeServer {
    /// Serve every connection with `handler`, one request line each.
    pub fn start<F>(handler: F) -> Self
    where
        F: FnMut(&Value) -> Value + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let connections = Arc::new(AtomicUsize::new(0));

        let seen = Arc::clone(&requests);
        let count = Arc::clone(&connections);
        let mut handler = handler;
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { continue };
                count.fetch_add(1, Ordering::SeqCst);
                let mut reader = BufReader::new(&stream);
                let mut line = String::new();
                if reader.read_line(&mut line).unwrap_or(0) == 0 {
                    continue;
                }
                assert!(line.ends_with("\r\n"), "frame not CRLF terminated: {:?}", line);
                let request: Value = serde_json::from_str(line.trim_end()).unwrap_or(Value::Null);
                let response = handler(&request);
                seen.lock().unwrap().push(request);
                let mut writer = &stream;
                let _ = writer.write_all(format!("{}\r\n", response).as_bytes());
            }
        });

        Self {
            addr,
            requests,
            connections,
        }
    }

    /// A stateful DSU server accepting `alice`/`pw1` with token `T1`.
    ///
    /// `inbox` is delivered once through "new" and always through "all".
    pub fn dsu(inbox: Vec<Value>) -> Self {
        let mut unread = inbox.clone();
        Self::start(move |request| {
            if let Some(join) = request.get("join") {
                if join["username"] == "alice" && join["password"] == "pw1" {
                    return json!({
                        "response": {"type": "ok", "message": "Welcome back, alice", "token": "T1"}
                    });
                }
                return json!({
                    "response": {
                        "type": "error",
                        "message": "Invalid password or username already taken"
                    }
                });
            }
            if request["token"] != "T1" {
                return json!({"response": {"type": "error", "message": "Invalid user token."}});
            }
            match &request["directmessage"] {
                Value::String(scope) if scope == "new" => {
                    let messages: Vec<Value> = unread.drain(..).collect();
                    json!({"response": {"type": "ok", "messages": messages}})
                }
                Value::String(scope) if scope == "all" => {
                    json!({"response": {"type": "ok", "messages": inbox}})
                }
                Value::Object(_) => {
                    json!({"response": {"type": "ok", "message": "Direct message sent"}})
                }
                _ => json!({"response": {"type": "error", "message": "Unknown command"}}),
            }
        })
    }

    /// Server address in `host:port` form.
    pub fn address(&self) -> String {
        self.addr.to_string()
    }

    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().unwrap().clone()
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

/// Answer every request with `reply`, written as-is, and return the address.
pub fn raw_responder(reply: Vec<u8>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(stream) = stream else { continue };
            let mut line = String::new();
            let _ = BufReader::new(&stream).read_line(&mut line);
            let mut writer = &stream;
            let _ = writer.write_all(&reply);
        }
    });
    addr.to_string()
}

/// Address of a port nothing is listening on.
pub fn closed_address() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr.to_string()
}

pub fn inbox_message(from: &str, message: &str, timestamp: &str) -> Value {
    json!({"from": from, "message": message, "timestamp": timestamp})
}
