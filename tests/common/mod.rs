#![allow(dead_code)]

use std::io::Write;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tracing::Dispatch;

/// JSON 로그 레코드를 메모리에 모으는 writer
#[derive(Clone, Default)]
pub struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

struct CaptureWriter(Arc<Mutex<Vec<u8>>>);

impl Write for CaptureWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl LogCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dispatch(&self) -> Dispatch {
        let buffer = self.buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .json()
            .flatten_event(true)
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(move || CaptureWriter(buffer.clone()))
            .finish();
        Dispatch::new(subscriber)
    }

    pub fn records(&self) -> Vec<Value> {
        let buffer = self.buffer.lock().unwrap();
        String::from_utf8_lossy(&buffer)
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    pub fn with_message(&self, message: &str) -> Vec<Value> {
        self.records()
            .into_iter()
            .filter(|record| record["message"] == message)
            .collect()
    }

    pub fn request_records(&self) -> Vec<Value> {
        self.with_message("HTTP request information")
    }

    pub fn response_records(&self) -> Vec<Value> {
        self.with_message("HTTP response information")
    }
}
