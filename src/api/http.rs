use std::io::{self, Read, Write};

use serde_json::Value;
use thiserror::Error;

/// Largest request body accepted; workout payloads are tiny.
pub const MAX_BODY_BYTES: usize = 64 * 1024;
/// Upper bound on the request line plus headers.
const MAX_HEAD_BYTES: usize = 8 * 1024;

/// The parts of an HTTP/1.1 request the handlers look at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    /// Path without the query string.
    pub path: String,
    /// Raw query string (after `?`), empty when absent.
    pub query: String,
    pub body: Vec<u8>,
}

impl Request {
    /// Build a request from a target such as `/workouts?date=2025-05-25`.
    pub fn new(method: &str, target: &str, body: impl Into<Vec<u8>>) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, query),
            None => (target, ""),
        };
        Self {
            method: method.to_ascii_uppercase(),
            path: path.to_string(),
            query: query.to_string(),
            body: body.into(),
        }
    }

    /// Decoded value of a query parameter. Empty values count as absent;
    /// values that fail percent-decoding come back raw.
    pub fn query_param(&self, key: &str) -> Option<String> {
        for pair in self.query.split('&') {
            let mut parts = pair.splitn(2, '=');
            let name = parts.next().unwrap_or("").trim();
            if name != key {
                continue;
            }
            let value = parts.next().unwrap_or("").trim();
            if value.is_empty() {
                return None;
            }
            return Some(decode_query_value(value).unwrap_or_else(|| value.to_string()));
        }
        None
    }
}

/// A JSON response (or an empty one for 204).
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub body: Option<Value>,
}

impl Response {
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            body: Some(body),
        }
    }

    pub fn empty(status: u16) -> Self {
        Self { status, body: None }
    }

    pub fn status_line(&self) -> &'static str {
        match self.status {
            200 => "200 OK",
            201 => "201 Created",
            204 => "204 No Content",
            400 => "400 Bad Request",
            404 => "404 Not Found",
            405 => "405 Method Not Allowed",
            413 => "413 Payload Too Large",
            _ => "500 Internal Server Error",
        }
    }
}

/// Ways reading a request can fail before a handler sees it.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("request body of {0} bytes exceeds the size limit")]
    BodyTooLarge(usize),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Read one request from the stream. Returns `Ok(None)` when the peer sent
/// nothing before closing or timing out. A declared body over
/// [`MAX_BODY_BYTES`] is refused before it is read.
pub fn read_request<R: Read>(stream: &mut R) -> Result<Option<Request>, ReadError> {
    let mut buf = [0u8; 4096];
    let mut data = Vec::<u8>::new();
    loop {
        let read = match read_chunk(stream, &mut buf)? {
            Some(read) => read,
            None => break,
        };
        data.extend_from_slice(&buf[..read]);
        if find_header_end(&data).is_some() || data.len() > MAX_HEAD_BYTES {
            break;
        }
    }
    if data.is_empty() {
        return Ok(None);
    }

    let header_end = find_header_end(&data).unwrap_or(data.len());
    let mut body = data[header_end..].to_vec();
    let header_text = String::from_utf8_lossy(&data[..header_end]);
    let mut lines = header_text.split("\r\n");
    let Some(request_line) = lines.next() else {
        return Ok(None);
    };
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or("");
    let target = parts.next().unwrap_or("/");

    let mut content_length: usize = 0;
    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        if name.trim().eq_ignore_ascii_case("content-length") {
            content_length = value.trim().parse::<usize>().unwrap_or(0);
        }
    }
    if content_length > MAX_BODY_BYTES {
        return Err(ReadError::BodyTooLarge(content_length));
    }

    while body.len() < content_length {
        let read = match read_chunk(stream, &mut buf)? {
            Some(read) => read,
            None => break,
        };
        let take = read.min(content_length - body.len());
        body.extend_from_slice(&buf[..take]);
    }
    body.truncate(content_length);

    Ok(Some(Request::new(method, target, body)))
}

/// Serialize a response with permissive CORS headers. Connections are not
/// reused, so every response closes the connection.
pub fn write_response<W: Write>(stream: &mut W, response: &Response) -> io::Result<()> {
    let body = match &response.body {
        Some(value) => value.to_string().into_bytes(),
        None => Vec::new(),
    };

    let mut headers = String::new();
    headers.push_str("HTTP/1.1 ");
    headers.push_str(response.status_line());
    headers.push_str("\r\n");
    if response.body.is_some() {
        headers.push_str("Content-Type: application/json; charset=utf-8\r\n");
    }
    headers.push_str("Cache-Control: no-store\r\n");
    headers.push_str("Access-Control-Allow-Origin: *\r\n");
    headers.push_str("Access-Control-Allow-Methods: GET, POST, PUT, DELETE, OPTIONS\r\n");
    headers.push_str("Access-Control-Allow-Headers: Content-Type\r\n");
    headers.push_str("Connection: close\r\n");
    headers.push_str("Content-Length: ");
    headers.push_str(&body.len().to_string());
    headers.push_str("\r\n\r\n");

    stream.write_all(headers.as_bytes())?;
    stream.write_all(&body)?;
    stream.flush()
}

/// One read that treats timeouts as end of input.
fn read_chunk<R: Read>(stream: &mut R, buf: &mut [u8]) -> io::Result<Option<usize>> {
    match stream.read(buf) {
        Ok(0) => Ok(None),
        Ok(read) => Ok(Some(read)),
        Err(err)
            if matches!(
                err.kind(),
                io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
            ) =>
        {
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

fn find_header_end(data: &[u8]) -> Option<usize> {
    data.windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|pos| pos + 4)
}

fn decode_query_value(value: &str) -> Option<String> {
    let mut out: Vec<u8> = Vec::with_capacity(value.len());
    let bytes = value.as_bytes();
    let mut idx = 0usize;
    while idx < bytes.len() {
        match bytes[idx] {
            b'+' => {
                out.push(b' ');
                idx += 1;
            }
            b'%' if idx + 2 < bytes.len() => {
                let hi = hex_digit(bytes[idx + 1])?;
                let lo = hex_digit(bytes[idx + 2])?;
                out.push((hi << 4) | lo);
                idx += 3;
            }
            byte => {
                out.push(byte);
                idx += 1;
            }
        }
    }

    String::from_utf8(out).ok()
}

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
