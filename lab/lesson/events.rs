use std::{
    collections::VecDeque,
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Result;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Lesson event encoded as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonEvent {
    /// Unique identifier (uuid).
    pub id: String,
    /// Module producing the event.
    pub source: String,
    /// Event type (e.g., `lesson.stage.advanced`).
    pub event_type: String,
    /// ISO timestamp.
    pub timestamp: String,
    /// Arbitrary JSON payload.
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Destination for lesson events. Publishing must not block the tick.
pub trait EventSink: Send + Sync {
    /// Publishes one event.
    fn publish(&self, event: LessonEvent) -> Result<()>;
}

/// In-memory broadcast bus with a bounded backlog.
#[derive(Debug, Clone)]
pub struct MemoryEventBus {
    sender: broadcast::Sender<LessonEvent>,
    backlog: Arc<Mutex<VecDeque<LessonEvent>>>,
    capacity: usize,
}

impl MemoryEventBus {
    /// Creates a bus retaining at most `capacity` events.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            backlog: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    /// Live receiver for events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<LessonEvent> {
        self.sender.subscribe()
    }

    /// Snapshot of recent events retained in memory.
    #[must_use]
    pub fn snapshot(&self) -> Vec<LessonEvent> {
        self.backlog.lock().iter().cloned().collect()
    }

    /// Recent events of one type.
    #[must_use]
    pub fn of_type(&self, event_type: &str) -> Vec<LessonEvent> {
        self.backlog
            .lock()
            .iter()
            .filter(|event| event.event_type == event_type)
            .cloned()
            .collect()
    }
}

impl EventSink for MemoryEventBus {
    fn publish(&self, event: LessonEvent) -> Result<()> {
        {
            let mut backlog = self.backlog.lock();
            backlog.push_back(event.clone());
            while backlog.len() > self.capacity {
                backlog.pop_front();
            }
        }
        // No subscribers is not an error.
        let _ = self.sender.send(event);
        Ok(())
    }
}

/// Appends events as JSON lines to a file.
#[derive(Debug, Clone)]
pub struct FileEventSink {
    path: PathBuf,
}

impl FileEventSink {
    /// Creates a sink writing to `path`, creating parent directories.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(Self { path })
    }

    /// Target file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EventSink for FileEventSink {
    fn publish(&self, event: LessonEvent) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut data = serde_json::to_vec(&event)?;
        data.push(b'\n');
        file.write_all(&data)?;
        file.flush()?;
        Ok(())
    }
}
