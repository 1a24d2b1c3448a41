//! Bounded, append-only mission log with independent read cursors.
//!
//! Every line gets a sequence number that keeps increasing across evictions
//! and clears, so a reader's cursor stays meaningful for its whole lifetime.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;

/// Default number of retained lines.
pub const DEFAULT_LOG_CAPACITY: usize = 1000;

#[derive(Debug)]
struct Lines {
    entries: VecDeque<String>,
    /// Sequence number of `entries[0]`.
    first_seq: u64,
}

impl Lines {
    fn end(&self) -> u64 {
        self.first_seq + self.entries.len() as u64
    }
}

/// Mission output shared between the running mission and log readers.
#[derive(Debug)]
pub struct MissionLog {
    lines: Mutex<Lines>,
    capacity: usize,
}

impl MissionLog {
    /// Create a log retaining at most `capacity` lines (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            lines: Mutex::new(Lines {
                entries: VecDeque::with_capacity(capacity.min(DEFAULT_LOG_CAPACITY)),
                first_seq: 0,
            }),
            capacity,
        }
    }

    /// Append a line, evicting the oldest past capacity.
    pub fn append(&self, line: impl Into<String>) {
        let line = line.into();
        info!(target: "boatlink::mission", "{line}");

        let mut lines = self.lines.lock();
        lines.entries.push_back(line);
        while lines.entries.len() > self.capacity {
            lines.entries.pop_front();
            lines.first_seq += 1;
        }
    }

    /// Drop all retained lines. Sequence numbers are not reused.
    pub fn clear(&self) {
        let mut lines = self.lines.lock();
        lines.first_seq = lines.end();
        lines.entries.clear();
    }

    /// Cursor just past the newest line.
    pub fn end_cursor(&self) -> u64 {
        self.lines.lock().end()
    }

    /// Sequence number of the oldest retained line.
    pub fn first_cursor(&self) -> u64 {
        self.lines.lock().first_seq
    }

    /// Number of retained lines.
    pub fn len(&self) -> usize {
        self.lines.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.lock().entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Line at `cursor`, skipping forward past evicted lines.
    ///
    /// Returns the sequence number actually read with the line.
    fn line_at(&self, cursor: u64, end: u64) -> Option<(u64, String)> {
        let lines = self.lines.lock();
        let seq = cursor.max(lines.first_seq);
        if seq >= end.min(lines.end()) {
            return None;
        }
        let index = usize::try_from(seq - lines.first_seq).ok()?;
        lines.entries.get(index).map(|line| (seq, line.clone()))
    }

    /// Lazily read from `cursor` up to the end as of this call.
    pub fn stream(self: &Arc<Self>, cursor: u64) -> MissionLogStream {
        MissionLogStream {
            log: Arc::clone(self),
            cursor,
            end: self.end_cursor(),
        }
    }
}

impl Default for MissionLog {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

/// Finite iterator over mission log lines.
///
/// Resume later with [`MissionLog::stream`] from [`MissionLogStream::cursor`].
#[derive(Debug)]
pub struct MissionLogStream {
    log: Arc<MissionLog>,
    cursor: u64,
    end: u64,
}

impl MissionLogStream {
    /// Cursor of the next unread line.
    pub fn cursor(&self) -> u64 {
        self.cursor
    }
}

impl Iterator for MissionLogStream {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        match self.log.line_at(self.cursor, self.end) {
            Some((seq, line)) => {
                self.cursor = seq + 1;
                Some(line)
            }
            None => {
                // Skip past anything evicted or cleared so the cursor resumes at live lines
                self.cursor = self.cursor.max(self.log.first_cursor().min(self.end));
                None
            }
        }
    }
}
