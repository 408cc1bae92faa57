// Append-only storage for completed rows
//
// Growth is fallible: the first reservation is a fixed block, and every later
// reservation doubles the capacity via `try_reserve_exact`. When a reservation
// fails the collector flags OOM and silently drops the failing row and every
// row after it; rows appended before the failure remain intact. Backing
// storage is released on drop.

/// One parsed row: fields in input order.
pub type Row = Vec<Vec<u8>>;

/// First reservation, in rows. Growth doubles from here.
const FIRST_BLOCK: usize = 4096;

/// Ordered container of materialized rows with fallible growth.
#[derive(Debug, Default)]
pub struct RowCollector {
    rows: Vec<Row>,
    oom: bool,
}

impl RowCollector {
    pub fn new() -> Self {
        RowCollector {
            rows: Vec::new(),
            oom: false,
        }
    }

    /// Append a row. Returns false when the row was dropped because a growth
    /// allocation failed, now or on an earlier push.
    pub fn push(&mut self, row: Row) -> bool {
        if self.oom {
            return false;
        }
        if self.rows.len() == self.rows.capacity() {
            let additional = if self.rows.capacity() == 0 {
                FIRST_BLOCK
            } else {
                self.rows.capacity()
            };
            if self.rows.try_reserve_exact(additional).is_err() {
                self.oom = true;
                return false;
            }
        }
        self.rows.push(row);
        true
    }

    /// True once any growth allocation has failed.
    pub fn oom_occurred(&self) -> bool {
        self.oom
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Hand back the collected rows in input order.
    pub fn finish(self) -> Vec<Row> {
        self.rows
    }
}
