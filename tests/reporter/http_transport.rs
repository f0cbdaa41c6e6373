//! HttpTransport against a local socket server.
//!
//! The server answers every connection with a canned response and closes it,
//! so each attempt shows up as one hit.

use honeybadger_reporter::{
    Deliver, HttpTransport, NOTICES_PATH, ReportOutcome, Reporter, ReporterConfig,
};
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

#[derive(Debug)]
struct OrderFailed;

impl std::fmt::Display for OrderFailed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "order failed")
    }
}

impl std::error::Error for OrderFailed {}

struct Server {
    endpoint: String,
    hits: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl Server {
    /// Answers every request with `response` verbatim.
    fn start(response: &'static str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let endpoint = format!("http://{}", listener.local_addr().unwrap());
        let hits = Arc::new(AtomicUsize::new(0));
        let requests = Arc::new(Mutex::new(Vec::new()));

        let h = Arc::clone(&hits);
        let r = Arc::clone(&requests);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { break };
                let request = read_request(&mut stream);
                h.fetch_add(1, Ordering::SeqCst);
                r.lock().unwrap().push(request);
                let _ = stream.write_all(response.as_bytes());
                let _ = stream.flush();
            }
        });

        Self {
            endpoint,
            hits,
            requests,
        }
    }

    fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    fn config(&self, retries: i64) -> ReporterConfig {
        ReporterConfig::builder()
            .api_key("secret-key")
            .endpoint(self.endpoint.clone())
            .max_error_reporting_retries(retries)
            .build()
            .unwrap()
    }
}

/// Reads the request head and its `Content-Length` body.
fn read_request(stream: &mut TcpStream) -> String {
    let mut reader = BufReader::new(stream);
    let mut head = String::new();
    let mut content_length = 0;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).unwrap_or(0) == 0 || line == "\r\n" {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap_or(0);
            }
        }
        head.push_str(&line);
    }
    let mut body = vec![0; content_length];
    let _ = reader.read_exact(&mut body);
    head.push_str("\r\n");
    head.push_str(&String::from_utf8_lossy(&body));
    head
}

#[test]
fn accepted_notice_is_sent_once() {
    let server = Server::start(
        "HTTP/1.1 201 Created\r\nContent-Type: application/json\r\nContent-Length: 11\r\nConnection: close\r\n\r\n{\"id\":\"n1\"}",
    );
    let reporter = Reporter::new(server.config(3));

    let outcome = reporter.report_error(&OrderFailed).unwrap();

    assert_eq!(
        outcome,
        ReportOutcome::Delivered {
            attempts: 1,
            notice_id: Some("n1".to_string()),
        }
    );
    assert_eq!(server.hits(), 1);
}

#[test]
fn truncated_body_on_accepted_notice_is_not_resent() {
    let server = Server::start(
        "HTTP/1.1 201 Created\r\nContent-Type: application/json\r\nContent-Length: 100\r\nConnection: close\r\n\r\n{\"id\":",
    );
    let reporter = Reporter::new(server.config(3));

    let outcome = reporter.report_error(&OrderFailed).unwrap();

    assert_eq!(
        outcome,
        ReportOutcome::Delivered {
            attempts: 1,
            notice_id: None,
        }
    );
    assert_eq!(server.hits(), 1);
}

#[test]
fn server_error_is_retried_over_the_wire() {
    let server = Server::start(
        "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
    );
    let reporter = Reporter::new(server.config(3));

    let err = reporter.report_error(&OrderFailed).unwrap_err();

    assert_eq!(err.attempts(), 4);
    assert_eq!(server.hits(), 4);
}

#[test]
fn request_carries_headers_and_notice() {
    let server = Server::start(
        "HTTP/1.1 201 Created\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
    );
    let transport = HttpTransport::new(&server.config(0));

    let response = transport.send(r#"{"error":{"message":"order failed"}}"#).unwrap();

    assert_eq!(response.status, 201);
    let requests = server.requests.lock().unwrap();
    let request = requests[0].to_ascii_lowercase();
    assert!(request.starts_with(&format!("post {NOTICES_PATH} ")));
    assert!(request.contains("x-api-key: secret-key"));
    assert!(request.contains("content-type: application/json"));
    assert!(request.contains("user-agent: honeybadger-reporter/"));
    assert!(request.ends_with(r#"{"error":{"message":"order failed"}}"#));
}

#[test]
fn refused_connection_is_a_transport_failure() {
    let endpoint = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        format!("http://{}", listener.local_addr().unwrap())
    };
    let config = ReporterConfig::builder()
        .api_key("secret-key")
        .endpoint(endpoint)
        .max_error_reporting_retries(1)
        .build()
        .unwrap();

    let err = Reporter::new(config).report_error(&OrderFailed).unwrap_err();

    assert_eq!(err.attempts(), 2);
    assert!(matches!(
        err,
        honeybadger_reporter::ReportError::Exhausted { ref last, .. } if last.is_transport()
    ));
}
