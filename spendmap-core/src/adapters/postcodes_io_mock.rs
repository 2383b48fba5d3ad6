//! Mock postcodes.io server for testing
//!
//! Implements the bulk lookup endpoint only:
//! - POST /postcodes with `{"postcodes": [...]}` returns
//!   `{"status": 200, "result": [{"query": "...", "result": {...} | null}]}`

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use serde::{Deserialize, Serialize};

/// Mock postcodes.io server
pub struct MockPostcodesServer {
    port: u16,
    running: Arc<AtomicBool>,
    requests: Arc<AtomicUsize>,
    batches: Arc<Mutex<Vec<Vec<String>>>>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

/// Configuration for the mock responses
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// Postcodes the mock resolves, with (latitude, longitude)
    pub known: HashMap<String, (f64, f64)>,
    /// Answer every request with this HTTP status instead
    pub fail_status: Option<u16>,
}

#[derive(Deserialize)]
struct BulkRequest {
    postcodes: Vec<String>,
}

#[derive(Serialize)]
struct BulkResponse {
    status: u16,
    result: Vec<BulkEntry>,
}

#[derive(Serialize)]
struct BulkEntry {
    query: String,
    result: Option<MockPostcode>,
}

#[derive(Serialize)]
struct MockPostcode {
    postcode: String,
    latitude: f64,
    longitude: f64,
    country: String,
}

impl MockPostcodesServer {
    /// Start a new mock server on a random available port
    pub fn start(config: MockConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        let running = Arc::new(AtomicBool::new(true));
        let requests = Arc::new(AtomicUsize::new(0));
        let batches = Arc::new(Mutex::new(Vec::new()));

        // Non-blocking so the accept loop can observe shutdown
        listener.set_nonblocking(true)?;

        let running_clone = Arc::clone(&running);
        let requests_clone = Arc::clone(&requests);
        let batches_clone = Arc::clone(&batches);
        let thread_handle = thread::spawn(move || {
            while running_clone.load(Ordering::SeqCst) {
                match listener.accept() {
                    Ok((stream, _)) => {
                        requests_clone.fetch_add(1, Ordering::SeqCst);
                        handle_connection(stream, &config, &batches_clone);
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(std::time::Duration::from_millis(10));
                    }
                    Err(_) => break,
                }
            }
        });

        Ok(Self {
            port,
            running,
            requests,
            batches,
            thread_handle: Some(thread_handle),
        })
    }

    /// Get the base URL for this mock server
    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Number of connections served so far
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Postcode batches received, in arrival order
    pub fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().map(|b| b.clone()).unwrap_or_default()
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MockPostcodesServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn handle_connection(
    mut stream: TcpStream,
    config: &MockConfig,
    batches: &Mutex<Vec<Vec<String>>>,
) {
    let _ = stream.set_nonblocking(false);
    let Some((head, body)) = read_request(&mut stream) else {
        send_response(&mut stream, 400, "Bad Request", r#"{"status":400,"error":"Invalid request"}"#);
        return;
    };

    if let Some(status) = config.fail_status {
        let body = format!(r#"{{"status":{status},"error":"Mock failure"}}"#);
        send_response(&mut stream, status, "Error", &body);
        return;
    }

    let first_line = head.lines().next().unwrap_or("");
    let parts: Vec<&str> = first_line.split_whitespace().collect();
    if parts.len() < 2 || parts[0] != "POST" || parts[1] != "/postcodes" {
        send_response(&mut stream, 404, "Not Found", r#"{"status":404,"error":"Resource not found"}"#);
        return;
    }

    let request: BulkRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(_) => {
            send_response(&mut stream, 400, "Bad Request", r#"{"status":400,"error":"Invalid JSON"}"#);
            return;
        }
    };

    if let Ok(mut b) = batches.lock() {
        b.push(request.postcodes.clone());
    }

    let result = request
        .postcodes
        .into_iter()
        .map(|query| {
            let result = config.known.get(&query).map(|&(latitude, longitude)| MockPostcode {
                postcode: query.to_uppercase(),
                latitude,
                longitude,
                country: "England".to_string(),
            });
            BulkEntry { query, result }
        })
        .collect();

    let json = serde_json::to_string(&BulkResponse { status: 200, result })
        .unwrap_or_else(|_| r#"{"status":500}"#.to_string());
    send_response(&mut stream, 200, "OK", &json);
}

/// Read the request head and a `Content-Length` body
fn read_request(stream: &mut TcpStream) -> Option<(String, Vec<u8>)> {
    let mut data = Vec::new();
    let mut buffer = [0; 4096];

    let header_end = loop {
        let n = stream.read(&mut buffer).ok()?;
        if n == 0 {
            return None;
        }
        data.extend_from_slice(&buffer[..n]);
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&data[..header_end]).to_string();
    let content_length = head
        .lines()
        .filter_map(|l| l.split_once(':'))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while data.len() < header_end + content_length {
        let n = stream.read(&mut buffer).ok()?;
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buffer[..n]);
    }

    let body = data[header_end..].to_vec();
    Some((head, body))
}

fn send_response(stream: &mut TcpStream, status: u16, status_text: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        status_text,
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}
