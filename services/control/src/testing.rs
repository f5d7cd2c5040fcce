//! One-shot HTTP stub used by the client tests.

use crate::endpoint::ServiceEndpoint;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::{self, JoinHandle};

/// A request as the stub saw it
#[derive(Debug)]
pub(crate) struct Recorded {
    pub method: String,
    pub path: String,
    /// Header lines, lowercased
    pub headers: Vec<String>,
    pub body: String,
}

impl Recorded {
    pub fn has_header(&self, line: &str) -> bool {
        self.headers.iter().any(|h| h == line)
    }
}

/// Serve a single request with `status` and `body`, then hang up
pub(crate) fn serve_once(status: u16, body: &str) -> (ServiceEndpoint, JoinHandle<Recorded>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let body = body.to_string();

    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let request = read_request(&mut stream);
        let response = format!(
            "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        stream.write_all(response.as_bytes()).unwrap();
        stream.flush().unwrap();
        request
    });

    (ServiceEndpoint::local(port), handle)
}

/// A listening endpoint that never answers; `accept` on the returned
/// listener fails with `WouldBlock` while nobody has connected
pub(crate) fn idle_endpoint() -> (ServiceEndpoint, TcpListener) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.set_nonblocking(true).unwrap();
    let port = listener.local_addr().unwrap().port();
    (ServiceEndpoint::local(port), listener)
}

/// Nothing listens here
pub(crate) fn closed_endpoint() -> ServiceEndpoint {
    ServiceEndpoint::local(1)
}

fn read_request(stream: &mut TcpStream) -> Recorded {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 1024];

    let header_end = loop {
        let n = stream.read(&mut chunk).unwrap();
        assert!(n > 0, "connection closed before end of headers");
        buffer.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buffer.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buffer[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let path = request_line.next().unwrap_or_default().to_string();

    let headers: Vec<String> = lines
        .filter(|line| !line.is_empty())
        .map(|line| line.to_ascii_lowercase())
        .collect();

    let length = headers
        .iter()
        .find_map(|h| h.strip_prefix("content-length:"))
        .map(|v| v.trim().parse::<usize>().unwrap())
        .unwrap_or(0);

    while buffer.len() < header_end + length {
        let n = stream.read(&mut chunk).unwrap();
        assert!(n > 0, "connection closed before end of body");
        buffer.extend_from_slice(&chunk[..n]);
    }

    Recorded {
        method,
        path,
        headers,
        body: String::from_utf8_lossy(&buffer[header_end..header_end + length]).to_string(),
    }
}
