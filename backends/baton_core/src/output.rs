use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

/// `LineSink` receives the line of every print-section visit, in visit order.
pub trait LineSink: Send + Sync {
    fn emit(&self, line: &str);
}

/// `StdoutSink` writes each line through a locked stdout handle.
#[derive(Clone, Copy, Debug, Default)]
pub struct StdoutSink;

impl LineSink for StdoutSink {
    fn emit(&self, line: &str) {
        let mut out = io::stdout().lock();
        if let Err(err) = writeln!(out, "{line}").and_then(|()| out.flush()) {
            baton_logs::error!("failed to write line to stdout: {}", err);
        }
    }
}

/// `MemorySink` keeps every line in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl LineSink for MemorySink {
    fn emit(&self, line: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.to_string());
    }
}
