use std::io::Read;
use std::sync::mpsc::{channel, Receiver};
use std::thread;
use std::time::Duration;

use tiny_http::{Response, Server};

/// One request as the mock backend saw it.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

pub struct MockBackend {
    pub base: String,
    requests: Receiver<CapturedRequest>,
}

impl MockBackend {
    /// Serve `count` requests, answering every one with `status` and `body`.
    pub fn start(status: u16, body: &str, count: usize) -> MockBackend {
        let server = Server::http("127.0.0.1:0").unwrap();
        let base = format!("http://{}", server.server_addr());
        let (tx, rx) = channel();
        let body = body.to_string();
        thread::spawn(move || {
            for _ in 0..count {
                let mut request = match server.recv() {
                    Ok(r) => r,
                    Err(_) => return,
                };
                let mut content = Vec::new();
                request.as_reader().read_to_end(&mut content).unwrap();
                let captured = CapturedRequest {
                    method: request.method().to_string(),
                    url: request.url().to_string(),
                    headers: request
                        .headers()
                        .iter()
                        .map(|h| (h.field.to_string(), h.value.to_string()))
                        .collect(),
                    body: content,
                };
                let _ = tx.send(captured);
                let _ = request.respond(Response::from_string(body.clone()).with_status_code(status));
            }
        });
        MockBackend { base, requests: rx }
    }

    pub fn next_request(&self) -> CapturedRequest {
        self.requests.recv_timeout(Duration::from_secs(5)).unwrap()
    }
}

/// An address nothing listens on.
pub fn closed_endpoint() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}
