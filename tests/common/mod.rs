//! Shared fixtures: wasm-pack style package directories and a registry double.

#![allow(dead_code)]

use serde_json::{Value, json};
use std::fs;
use std::io::Read;
use std::path::Path;
use std::sync::mpsc;
use std::thread;
use tiny_http::{Header, Response, Server, StatusCode};

pub const ORIGINAL_NAME: &str = "@swc/wasm";
pub const RENAMED: &str = "@swc/wasm-web";

pub fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("mkdir");
    }
    fs::write(path, content).expect("write");
}

/// Lay out the output of `wasm-pack build --target web`
pub fn create_package(root: &Path, name: &str) {
    write_file(
        &root.join("package.json"),
        &serde_json::to_string_pretty(&json!({
            "name": name,
            "collaborators": ["swc"],
            "version": "1.2.3",
            "files": ["wasm_bg.wasm", "wasm.js", "wasm.d.ts"],
            "module": "wasm.js",
            "types": "wasm.d.ts",
        }))
        .expect("json"),
    );
    write_file(&root.join("wasm_bg.wasm"), "\0asm");
    write_file(&root.join("wasm.js"), "export default function init() {}\n");
    write_file(&root.join("wasm.d.ts"), "export default function init(): void;\n");
    write_file(&root.join("wasm_bg.js"), "export {}\n");
    write_file(&root.join("wasm_bg.wasm.d.ts"), "export {}\n");
    write_file(&root.join("README.md"), "# wasm\n");
}

pub fn read_manifest(root: &Path) -> Value {
    let raw = fs::read_to_string(root.join("package.json")).expect("read");
    serde_json::from_str(&raw).expect("parse")
}

/// A request as seen by the registry double
#[derive(Debug)]
pub struct RecordedRequest {
    pub method: String,
    pub url: String,
    pub authorization: Option<String>,
    pub body: String,
}

impl RecordedRequest {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).expect("request body is json")
    }
}

pub struct TestRegistry {
    pub base_url: String,
    handle: thread::JoinHandle<()>,
    requests: mpsc::Receiver<RecordedRequest>,
}

impl TestRegistry {
    /// Wait for the server thread and return what it received
    pub fn finish(self) -> Vec<RecordedRequest> {
        self.handle.join().expect("join server");
        self.requests.try_iter().collect()
    }
}

/// Serve `responses` in order, one per request, then stop
pub fn spawn_registry(responses: Vec<(u16, &'static str)>) -> TestRegistry {
    let server = Server::http("127.0.0.1:0").expect("server");
    let base_url = format!("http://{}", server.server_addr());
    let (tx, rx) = mpsc::channel();
    let handle = thread::spawn(move || {
        for (status, body) in responses {
            let mut req = server.recv().expect("request");
            let mut content = String::new();
            req.as_reader()
                .read_to_string(&mut content)
                .expect("read body");
            let authorization = req
                .headers()
                .iter()
                .find(|h| h.field.equiv("Authorization"))
                .map(|h| h.value.as_str().to_string());
            tx.send(RecordedRequest {
                method: req.method().to_string(),
                url: req.url().to_string(),
                authorization,
                body: content,
            })
            .expect("record");

            let resp = Response::from_string(body)
                .with_status_code(StatusCode(status))
                .with_header(
                    Header::from_bytes("Content-Type", "application/json").expect("header"),
                );
            req.respond(resp).expect("respond");
        }
    });
    TestRegistry {
        base_url,
        handle,
        requests: rx,
    }
}
