// Minimal HTTP/1.1 responder for exercising the client against canned replies.
//
// One request per connection; every reply closes the connection. A handler
// returning `None` drops the connection without answering.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub(crate) struct Request {
    pub method: String,
    /// Path including any query string.
    pub path: String,
    /// `HTTP/1.1` or `HTTP/1.0`, as sent on the request line.
    pub version: String,
    headers: Vec<(String, String)>,
    pub body: String,
}

impl Request {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

pub(crate) struct Reply {
    status: u16,
    content_type: &'static str,
    body: Vec<u8>,
    set_cookie: Option<String>,
    /// Bytes promised by `Content-Length` but never sent.
    missing: usize,
}

impl Reply {
    pub fn status(status: u16) -> Self {
        Self {
            status,
            content_type: "text/plain",
            body: Vec::new(),
            set_cookie: None,
            missing: 0,
        }
    }

    pub fn html(body: &str) -> Self {
        Self {
            content_type: "text/html; charset=utf-8",
            body: body.as_bytes().to_vec(),
            ..Self::status(200)
        }
    }

    pub fn json(body: &str) -> Self {
        Self {
            content_type: "application/json",
            body: body.as_bytes().to_vec(),
            ..Self::status(200)
        }
    }

    pub fn bytes(body: Vec<u8>) -> Self {
        Self {
            content_type: "application/octet-stream",
            body,
            ..Self::status(200)
        }
    }

    pub fn with_cookie(mut self, cookie: &str) -> Self {
        self.set_cookie = Some(cookie.to_string());
        self
    }

    /// Declare `missing` more body bytes than are sent, then close.
    pub fn truncated(mut self, missing: usize) -> Self {
        self.missing = missing;
        self
    }
}

pub(crate) struct TestServer {
    pub base_url: String,
    hits: Arc<AtomicUsize>,
}

impl TestServer {
    pub async fn start<F>(handler: F) -> Self
    where
        F: Fn(&Request) -> Option<Reply> + Send + Sync + 'static,
    {
        Self::start_counting(move |_, request| handler(request)).await
    }

    /// Like `start`, with the 1-based request number passed to the handler.
    pub async fn start_counting<F>(handler: F) -> Self
    where
        F: Fn(usize, &Request) -> Option<Reply> + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let handler = Arc::new(handler);

        let counter = hits.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let handler = handler.clone();
                let counter = counter.clone();
                tokio::spawn(async move {
                    let _ = serve(stream, counter, handler.as_ref()).await;
                });
            }
        });

        Self {
            base_url: format!("http://{addr}"),
            hits,
        }
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

async fn serve<F>(mut stream: TcpStream, hits: Arc<AtomicUsize>, handler: &F) -> std::io::Result<()>
where
    F: Fn(usize, &Request) -> Option<Reply>,
{
    let Some(request) = read_request(&mut stream).await? else {
        return Ok(());
    };
    let hit = hits.fetch_add(1, Ordering::SeqCst) + 1;

    let Some(reply) = handler(hit, &request) else {
        return Ok(());
    };

    let reason = reqwest::StatusCode::from_u16(reply.status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown");
    let mut head = format!(
        "HTTP/1.1 {} {reason}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n",
        reply.status,
        reply.content_type,
        reply.body.len() + reply.missing
    );
    if let Some(cookie) = &reply.set_cookie {
        head.push_str(&format!("Set-Cookie: {cookie}\r\n"));
    }
    head.push_str("\r\n");

    stream.write_all(head.as_bytes()).await?;
    stream.write_all(&reply.body).await?;
    stream.shutdown().await
}

async fn read_request(stream: &mut TcpStream) -> std::io::Result<Option<Request>> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(None);
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let path = request_line.next().unwrap_or_default().to_string();
    let version = request_line.next().unwrap_or_default().to_string();

    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body = String::from_utf8_lossy(&buf[header_end..]).into_owned();

    Ok(Some(Request {
        method,
        path,
        version,
        headers,
        body,
    }))
}
