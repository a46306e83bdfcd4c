//! One-shot HTTP server standing in for the Bot API in integration tests.
//!
//! It accepts a single connection, captures the request (headers and body),
//! answers with a canned status line and exits.

#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct FormPart {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl FormPart {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn boundary(&self) -> String {
        let content_type = self.header("content-type").expect("no content-type header");
        let idx = content_type.find("boundary=").expect("no boundary");
        content_type[idx + "boundary=".len()..]
            .trim_matches('"')
            .to_string()
    }

    /// Split a multipart/form-data body into its parts.
    pub fn parts(&self) -> Vec<FormPart> {
        let delimiter = format!("--{}", self.boundary()).into_bytes();
        let mut parts = Vec::new();
        let mut rest = &self.body[..];

        let first = find(rest, &delimiter).expect("body has no boundary");
        rest = &rest[first + delimiter.len()..];
        while !rest.starts_with(b"--") {
            let end = find(rest, &delimiter).expect("unterminated part");
            let segment = &rest[..end];
            let segment = segment.strip_prefix(b"\r\n").unwrap_or(segment);
            let segment = segment.strip_suffix(b"\r\n").unwrap_or(segment);
            parts.push(parse_part(segment));
            rest = &rest[end + delimiter.len()..];
        }
        parts
    }

    pub fn part(&self, name: &str) -> FormPart {
        self.parts()
            .into_iter()
            .find(|p| p.name == name)
            .unwrap_or_else(|| panic!("no part named {name}"))
    }
}

fn parse_part(segment: &[u8]) -> FormPart {
    let split = find(segment, b"\r\n\r\n").expect("part has no header terminator");
    let head = String::from_utf8_lossy(&segment[..split]).into_owned();
    let data = segment[split + 4..].to_vec();

    let mut name = String::new();
    let mut file_name = None;
    let mut content_type = None;
    for line in head.split("\r\n") {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        if key.eq_ignore_ascii_case("content-disposition") {
            for attr in value.split(';').map(str::trim) {
                if let Some(v) = attr.strip_prefix("name=") {
                    name = v.trim_matches('"').to_string();
                } else if let Some(v) = attr.strip_prefix("filename=") {
                    file_name = Some(v.trim_matches('"').to_string());
                }
            }
        } else if key.eq_ignore_ascii_case("content-type") {
            content_type = Some(value.to_string());
        }
    }

    FormPart {
        name,
        file_name,
        content_type,
        data,
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

pub struct FakeTelegram {
    base_url: String,
    handle: JoinHandle<CapturedRequest>,
}

impl FakeTelegram {
    /// Answer the first request with `status`, e.g. `"200 OK"`.
    pub fn respond_with(status: &'static str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let request = read_request(&mut stream);
            let body = if status.starts_with("200") {
                r#"{"ok":true}"#
            } else {
                r#"{"ok":false}"#
            };
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).unwrap();
            stream.flush().unwrap();
            request
        });
        FakeTelegram { base_url, handle }
    }

    /// Accept a connection, read the request and never answer within `hold`.
    pub fn silent(hold: Duration) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let request = read_request(&mut stream);
            thread::sleep(hold);
            request
        });
        FakeTelegram { base_url, handle }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Wait for the server thread and return what it received.
    pub fn request(self) -> CapturedRequest {
        self.handle.join().expect("fake server panicked")
    }
}

fn read_request(stream: &mut TcpStream) -> CapturedRequest {
    stream
        .set_read_timeout(Some(Duration::from_secs(10)))
        .unwrap();

    let mut raw = Vec::new();
    let mut chunk = [0u8; 8192];
    let header_end = loop {
        if let Some(pos) = find(&raw, b"\r\n\r\n") {
            break pos;
        }
        let n = stream.read(&mut chunk).unwrap();
        assert!(n > 0, "connection closed before headers were complete");
        raw.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&raw[..header_end]).into_owned();
    let mut lines = head.split("\r\n");
    let request_line = lines.next().unwrap_or_default();
    let mut request_parts = request_line.split_whitespace();
    let method = request_parts.next().unwrap_or_default().to_string();
    let path = request_parts.next().unwrap_or_default().to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();

    let mut body = raw[header_end + 4..].to_vec();
    let header = |name: &str| {
        headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone())
    };

    if let Some(len) = header("content-length") {
        let len: usize = len.parse().unwrap();
        while body.len() < len {
            let n = stream.read(&mut chunk).unwrap();
            if n == 0 {
                break;
            }
            body.extend_from_slice(&chunk[..n]);
        }
    } else if header("transfer-encoding").is_some_and(|v| v.eq_ignore_ascii_case("chunked")) {
        while find(&body, b"0\r\n\r\n").is_none() {
            let n = stream.read(&mut chunk).unwrap();
            if n == 0 {
                break;
            }
            body.extend_from_slice(&chunk[..n]);
        }
        body = decode_chunked(&body);
    }

    CapturedRequest {
        method,
        path,
        headers,
        body,
    }
}

fn decode_chunked(mut raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    loop {
        let Some(line_end) = find(raw, b"\r\n") else {
            break;
        };
        let size_line = String::from_utf8_lossy(&raw[..line_end]);
        let size_hex = size_line.split(';').next().unwrap_or("0").trim();
        let size = usize::from_str_radix(size_hex, 16).unwrap_or(0);
        raw = &raw[line_end + 2..];
        if size == 0 || raw.len() < size {
            break;
        }
        out.extend_from_slice(&raw[..size]);
        raw = raw.get(size + 2..).unwrap_or_default();
    }
    out
}

/// Deterministic, non-repeating-looking test payload.
pub fn payload(len: usize) -> Vec<u8> {
    let mut state: u32 = 0x9e37_79b9;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state >> 24) as u8
        })
        .collect()
}
