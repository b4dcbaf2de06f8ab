use std::time::Duration;

use reqwest::blocking::{Client, Response};

use crate::chunks::Utf8Chunks;
use crate::config::FetchConfig;
use crate::error::{LbqError, Result};

/// Sends a GET request and returns the response once headers have arrived.
///
/// The body is left unread so it can be consumed as a stream.
pub fn open(url: &str, config: &FetchConfig) -> Result<Response> {
    let client = Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(config.timeout_secs.map(Duration::from_secs))
        .build()?;
    let response = client.get(url).send()?;
    let status = response.status();
    if !status.is_success() {
        let detail = match response.text() {
            Ok(body) => body.trim().to_string(),
            Err(err) => format!("response body could not be read ({})", err),
        };
        return Err(LbqError::Message(format!(
            "{} returned {}: {}",
            url, status, detail
        )));
    }
    Ok(response)
}

/// Streams the response body as text fragments.
pub fn fragments(response: Response, capacity: usize) -> Utf8Chunks<Response> {
    Utf8Chunks::with_capacity(capacity, response)
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    use super::*;

    fn serve_once(status: &'static str, body: &'static str) -> String {
        serve_raw(format!(
            "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        ))
    }

    fn serve_raw(response: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept");
            let mut request = Vec::new();
            let mut buf = [0u8; 512];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let read = stream.read(&mut buf).expect("read request");
                if read == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..read]);
            }
            stream.write_all(response.as_bytes()).expect("write response");
        });
        format!("http://{addr}/")
    }

    #[test]
    fn streams_successful_body() {
        let url = serve_once("200 OK", "# Title\nbody text\n");
        let response = open(&url, &FetchConfig::default()).expect("open");
        let text: String = fragments(response, 4)
            .collect::<Result<Vec<_>>>()
            .expect("fragments")
            .concat();
        assert_eq!(text, "# Title\nbody text\n");
    }

    #[test]
    fn rejects_error_status_with_body() {
        let url = serve_once("404 Not Found", "no such page");
        let err = open(&url, &FetchConfig::default()).expect_err("404 should fail");
        let message = err.to_string();
        assert!(message.contains("404"));
        assert!(message.contains("no such page"));
    }

    #[test]
    fn reports_unreadable_error_body() {
        let url = serve_raw(
            "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 100\r\nConnection: close\r\n\r\ncut"
                .to_string(),
        );
        let err = open(&url, &FetchConfig::default()).expect_err("500 should fail");
        let message = err.to_string();
        assert!(message.contains("500"));
        assert!(message.contains("response body could not be read"));
    }
}
