#![allow(dead_code)]

pub mod multipart_body {
    /// Boundary used by [`MultipartBuilder`].
    pub const BOUNDARY: &str = "----bendfTestBoundary7MA4YWxkTrZu0gW";

    /// Builds a `multipart/form-data` body part by part.
    pub struct MultipartBuilder {
        boundary: String,
        body: Vec<u8>,
    }

    impl Default for MultipartBuilder {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MultipartBuilder {
        pub fn new() -> Self {
            Self::with_boundary(BOUNDARY)
        }

        pub fn with_boundary(boundary: &str) -> Self {
            Self {
                boundary: boundary.to_string(),
                body: Vec::new(),
            }
        }

        pub fn field(mut self, name: &str, value: &str) -> Self {
            self.body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n",
                    self.boundary
                )
                .as_bytes(),
            );
            self.body.extend_from_slice(value.as_bytes());
            self.body.extend_from_slice(b"\r\n");
            self
        }

        pub fn file(
            mut self,
            name: &str,
            filename: &str,
            content_type: Option<&str>,
            content: &[u8],
        ) -> Self {
            self.body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; \
                     name=\"{name}\"; filename=\"{filename}\"\r\n",
                    self.boundary
                )
                .as_bytes(),
            );
            if let Some(ct) = content_type {
                self.body
                    .extend_from_slice(format!("Content-Type: {ct}\r\n").as_bytes());
            }
            self.body.extend_from_slice(b"\r\n");
            self.body.extend_from_slice(content);
            self.body.extend_from_slice(b"\r\n");
            self
        }

        pub fn content_type(&self) -> String {
            format!("multipart/form-data; boundary={}", self.boundary)
        }

        /// Body with the closing delimiter appended.
        pub fn build(mut self) -> Vec<u8> {
            self.body
                .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
            self.body
        }
    }
}

pub mod raw_request {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
    use serde_json::Value;

    /// Unsigned JWT with the given claims; the signature segment is a placeholder.
    pub fn unsigned_jwt(claims: &Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
        format!("{header}.{payload}.c2lnbmF0dXJl")
    }

    /// Serialize a request with a `Content-Length` body.
    pub fn http_request(
        method: &str,
        target: &str,
        headers: &[(&str, &str)],
        body: &[u8],
    ) -> Vec<u8> {
        let mut out = format!("{method} {target} HTTP/1.1\r\nHost: localhost\r\n").into_bytes();
        for (name, value) in headers {
            out.extend_from_slice(format!("{name}: {value}\r\n").as_bytes());
        }
        if !body.is_empty() {
            out.extend_from_slice(format!("Content-Length: {}\r\n", body.len()).as_bytes());
        }
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(body);
        out
    }
}

pub mod test_server {
    use bendf::dispatcher::Dispatcher;
    use bendf::server::{AppService, HttpServer, ServerHandle};
    use std::net::{SocketAddr, TcpListener};
    use std::sync::{Arc, Once};

    /// Ensures May coroutines are configured only once
    static MAY_INIT: Once = Once::new();

    pub fn setup_may_runtime() {
        MAY_INIT.call_once(|| {
            may::config().set_stack_size(0x8000);
        });
    }

    /// Server on an ephemeral port, stopped on drop.
    pub struct TestServer {
        handle: Option<ServerHandle>,
        addr: SocketAddr,
    }

    impl TestServer {
        pub fn start(dispatcher: Dispatcher) -> Self {
            setup_may_runtime();
            // Reserve an ephemeral port, then hand it to the server.
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            let addr = listener.local_addr().unwrap();
            drop(listener);
            let handle = HttpServer(AppService::new(Arc::new(dispatcher)))
                .start(addr)
                .unwrap();
            handle.wait_ready().unwrap();
            Self {
                handle: Some(handle),
                addr,
            }
        }

        pub fn addr(&self) -> SocketAddr {
            self.addr
        }
    }

    impl Drop for TestServer {
        fn drop(&mut self) {
            if let Some(handle) = self.handle.take() {
                handle.stop();
            }
        }
    }
}

pub mod http {
    use serde_json::Value;
    use std::collections::HashMap;
    use std::io::{Read, Write};
    use std::net::{Shutdown, SocketAddr, TcpStream};
    use std::time::Duration;

    pub struct TestResponse {
        pub status: u16,
        pub headers: HashMap<String, String>,
        pub body: Vec<u8>,
    }

    impl TestResponse {
        pub fn json(&self) -> Value {
            serde_json::from_slice(&self.body).unwrap()
        }

        pub fn header(&self, name: &str) -> Option<&str> {
            self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
        }
    }

    pub fn connect(addr: SocketAddr) -> TcpStream {
        let stream = TcpStream::connect(addr).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        stream
    }

    /// Read exactly one `Content-Length` framed response.
    pub fn read_response(stream: &mut TcpStream) -> TestResponse {
        let mut buf = Vec::new();
        // Read the head one byte at a time so no bytes belonging to a
        // following (pipelined) response are consumed.
        let mut chunk = [0u8; 1];
        let head_end = loop {
            if buf.ends_with(b"\r\n\r\n") {
                break buf.len() - 4;
            }
            let n = stream.read(&mut chunk).unwrap();
            assert!(n > 0, "connection closed before response head");
            buf.extend_from_slice(&chunk[..n]);
        };

        let head = String::from_utf8(buf[..head_end].to_vec()).unwrap();
        let mut lines = head.split("\r\n");
        let status = lines
            .next()
            .and_then(|l| l.split(' ').nth(1))
            .and_then(|s| s.parse().ok())
            .unwrap();
        let headers: HashMap<String, String> = lines
            .filter_map(|l| l.split_once(':'))
            .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
            .collect();
        let len: usize = headers
            .get("content-length")
            .map(|v| v.parse().unwrap())
            .unwrap_or(0);

        let body_start = head_end + 4;
        let mut body_chunk = [0u8; 4096];
        while buf.len() < body_start + len {
            let want = (body_start + len - buf.len()).min(body_chunk.len());
            let n = stream.read(&mut body_chunk[..want]).unwrap();
            assert!(n > 0, "connection closed before response body");
            buf.extend_from_slice(&body_chunk[..n]);
        }
        TestResponse {
            status,
            headers,
            body: buf[body_start..body_start + len].to_vec(),
        }
    }

    /// Send raw bytes on a fresh connection and read one response.
    pub fn send_raw(addr: SocketAddr, raw: &[u8]) -> TestResponse {
        let mut stream = connect(addr);
        stream.write_all(raw).unwrap();
        let resp = read_response(&mut stream);
        let _ = stream.shutdown(Shutdown::Both);
        resp
    }

    /// `true` once the peer has closed (or reset) the connection.
    pub fn is_closed(stream: &mut TcpStream) -> bool {
        let mut byte = [0u8; 1];
        match stream.read(&mut byte) {
            Ok(n) => n == 0,
            Err(e) => !matches!(
                e.kind(),
                std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
            ),
        }
    }
}
