// src/merge.rs - Interleaving entries from several streams by timestamp

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use chrono::NaiveDateTime;

use crate::multiline::LogEntry;

/// All entries sharing one timestamp, one cell per input stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedRow {
    pub line_number: usize,
    pub timestamp: NaiveDateTime,
    pub cells: Vec<String>,
}

#[derive(Debug)]
struct Pending {
    timestamp: NaiveDateTime,
    stream: usize,
    seq: u64,
    text: String,
}

impl Pending {
    fn key(&self) -> (NaiveDateTime, usize, u64) {
        (self.timestamp, self.stream, self.seq)
    }
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pending {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

/// K-way merge of timestamp-ordered entry streams.
///
/// Equal timestamps are grouped into a single row. Within a group, entries
/// are taken in stream order, then arrival order; several entries from one
/// stream end up joined in that stream's cell.
pub struct Merger<I> {
    streams: Vec<I>,
    heap: BinaryHeap<Reverse<Pending>>,
    seq: u64,
    rows: usize,
    primed: bool,
    failed: bool,
}

impl<I, E> Merger<I>
where
    I: Iterator<Item = Result<LogEntry, E>>,
{
    pub fn new(streams: Vec<I>) -> Self {
        let capacity = streams.len();
        Merger {
            streams,
            heap: BinaryHeap::with_capacity(capacity),
            seq: 0,
            rows: 0,
            primed: false,
            failed: false,
        }
    }

    fn pull(&mut self, stream: usize) -> Result<(), E> {
        if let Some(entry) = self.streams[stream].next() {
            let entry = entry?;
            self.seq += 1;
            self.heap.push(Reverse(Pending {
                timestamp: entry.timestamp,
                stream,
                seq: self.seq,
                text: entry.text,
            }));
        }
        Ok(())
    }

    fn next_row(&mut self) -> Result<Option<MergedRow>, E> {
        if !self.primed {
            self.primed = true;
            for stream in 0..self.streams.len() {
                self.pull(stream)?;
            }
        }

        let Some(Reverse(first)) = self.heap.pop() else {
            return Ok(None);
        };
        let timestamp = first.timestamp;
        let mut cells = vec![String::new(); self.streams.len()];
        let mut item = first;
        loop {
            let cell = &mut cells[item.stream];
            if !cell.is_empty() {
                cell.push('\n');
            }
            cell.push_str(&item.text);
            self.pull(item.stream)?;

            match self.heap.peek() {
                Some(Reverse(next)) if next.timestamp == timestamp => {
                    if let Some(Reverse(next)) = self.heap.pop() {
                        item = next;
                    }
                }
                _ => break,
            }
        }

        self.rows += 1;
        Ok(Some(MergedRow {
            line_number: self.rows,
            timestamp,
            cells,
        }))
    }
}

impl<I, E> Iterator for Merger<I>
where
    I: Iterator<Item = Result<LogEntry, E>>,
{
    type Item = Result<MergedRow, E>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.next_row() {
            Ok(row) => row.map(Ok),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
