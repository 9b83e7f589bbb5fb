use crate::domains::logger::{DomainLogger, DynLogger};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

struct Entry {
    level: Level,
    msg: String,
}

/// Logger that never blocks the caller. Entries go through a bounded channel
/// to a background task; when the channel is full they are dropped and
/// counted.
pub struct BufferedLogger {
    sender: mpsc::Sender<Entry>,
    dropped: Arc<AtomicU64>,
}

impl BufferedLogger {
    /// Must be called from within a tokio runtime.
    pub fn spawn(sink: DynLogger, capacity: usize) -> Arc<Self> {
        let (sender, mut rx) = mpsc::channel::<Entry>(capacity.max(1));
        tokio::spawn(async move {
            while let Some(entry) = rx.recv().await {
                match entry.level {
                    Level::Debug => sink.debug(&entry.msg),
                    Level::Info => sink.info(&entry.msg),
                    Level::Warn => sink.warn(&entry.msg),
                    Level::Error => sink.error(&entry.msg),
                }
            }
        });
        Arc::new(Self { sender, dropped: Arc::new(AtomicU64::new(0)) })
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn enqueue(&self, level: Level, msg: &str) {
        if self.sender.try_send(Entry { level, msg: msg.to_string() }).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }
}

impl DomainLogger for BufferedLogger {
    fn info(&self, msg: &str) {
        self.enqueue(Level::Info, msg);
    }

    fn warn(&self, msg: &str) {
        self.enqueue(Level::Warn, msg);
    }

    fn error(&self, msg: &str) {
        self.enqueue(Level::Error, msg);
    }

    fn debug(&self, msg: &str) {
        self.enqueue(Level::Debug, msg);
    }
}

pub fn init_buffered_logger(sink: DynLogger, capacity: usize) -> DynLogger {
    BufferedLogger::spawn(sink, capacity)
}
