use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use baton_core::output::{LineSink, MemorySink};
use baton_core::relay::CancellationSignal;

/// expected output of `workers` workers doing `visits` visits each.
pub fn cyclic_lines(workers: usize, visits: u64, payloads: &[&str]) -> Vec<String> {
    (0..visits)
        .flat_map(|visit| {
            (0..workers).map(move |worker| {
                format!("{worker} {visit} {}", payloads[worker % payloads.len()])
            })
        })
        .collect()
}

/// asserts that the worker indices of `lines` rotate 0, 1, .., n-1, 0, ..
pub fn assert_cyclic(lines: &[String], workers: usize) {
    for (position, line) in lines.iter().enumerate() {
        let mut fields = line.split(' ');
        let worker: usize = fields
            .next()
            .and_then(|w| w.parse().ok())
            .expect("line starts with the worker index");
        let visit: usize = fields
            .next()
            .and_then(|v| v.parse().ok())
            .expect("line has the visit index");

        assert_eq!(worker, position % workers, "line {position}: {line}");
        assert_eq!(visit, position / workers, "line {position}: {line}");
    }
}

/// `CancelAfter` records lines and triggers cancellation once it saw `after`.
pub struct CancelAfter {
    pub lines: MemorySink,
    pub after: usize,
    pub cancel: CancellationSignal,
    seen: AtomicUsize,
}

impl CancelAfter {
    pub fn new(after: usize, cancel: CancellationSignal) -> Arc<Self> {
        Arc::new(Self {
            lines: MemorySink::new(),
            after,
            cancel,
            seen: AtomicUsize::new(0),
        })
    }
}

impl LineSink for CancelAfter {
    fn emit(&self, line: &str) {
        self.lines.emit(line);
        if self.seen.fetch_add(1, Ordering::SeqCst) + 1 == self.after {
            self.cancel.trigger();
        }
    }
}
