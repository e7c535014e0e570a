//! Shared test infrastructure for integration tests.

use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::path::Path;
use std::process::{Command, Output};
use std::sync::{Arc, Mutex};
use std::thread;

type Responder = dyn Fn(&str) -> (u16, String) + Send + Sync + 'static;

/// Minimal HTTP/1.1 catalog stub bound to an ephemeral localhost port.
pub struct MockCatalog {
    pub base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl MockCatalog {
    /// Serve every request with `respond(request_target) -> (status, body)`.
    pub fn serve<F>(respond: F) -> Self
    where
        F: Fn(&str) -> (u16, String) + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock catalog");
        let addr = listener.local_addr().expect("mock catalog addr");
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&requests);
        let respond: Arc<Responder> = Arc::new(respond);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else {
                    continue;
                };
                let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));
                let mut request_line = String::new();
                if reader.read_line(&mut request_line).is_err() {
                    continue;
                }
                loop {
                    let mut header = String::new();
                    match reader.read_line(&mut header) {
                        Ok(0) => break,
                        Ok(_) if header == "\r\n" || header == "\n" => break,
                        Ok(_) => {}
                        Err(_) => break,
                    }
                }
                let target = request_line
                    .split_whitespace()
                    .nth(1)
                    .unwrap_or_default()
                    .to_string();
                seen.lock().expect("lock requests").push(target.clone());
                let (status, body) = respond(&target);
                let reason = if status == 200 { "OK" } else { "Error" };
                let response = format!(
                    "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes());
                let _ = stream.flush();
            }
        });
        Self {
            base_url: format!("http://{addr}/api/"),
            requests,
        }
    }

    /// Request targets (path and query) received so far.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().expect("lock requests").clone()
    }
}

/// Run the binary with a clean environment rooted at `root`.
pub fn run_snapshot(root: &Path, extra_args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_marketable-apps"))
        .arg("--data-dir")
        .arg(root.join("data"))
        .arg("--overrides-dir")
        .arg(root.join("overrides"))
        .args(extra_args)
        .env_remove("STEAM_API_KEY")
        .env_remove("GITHUB_OUTPUT")
        .env("MARKETABLE_APPS_LOG", "warn")
        .output()
        .expect("run marketable-apps")
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}
