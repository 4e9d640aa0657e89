//! Parallel decode supervisor
//!
//! Splits a byte source into one view per worker thread, runs a chunk
//! task on each, then concatenates the per-task record vectors. Chunk
//! boundaries can fall inside a message, so a record straddling a
//! boundary is decoded by the preceding task (which overruns its fence)
//! and shows up once more in the next task as a leading corruption
//! marker from the byte-by-byte resync. Reconciliation drops that ghost
//! when the fence bookkeeping proves the two sightings are the same
//! bytes.

use std::num::NonZeroUsize;
use std::sync::OnceLock;
use std::thread;

use crate::record::Record;
use crate::source::{ByteSource, OVERRUN_EOF};
use crate::task::Task;
use crate::types::{DltError, Result};

/// Single-slot error holder shared by the workers.
///
/// First writer wins; later errors are discarded. Workers poll it for
/// cooperative cancellation and the supervisor rethrows it after the
/// join.
pub(crate) struct ErrorSlot(OnceLock<DltError>);

impl ErrorSlot {
    pub(crate) fn new() -> Self {
        Self(OnceLock::new())
    }

    pub(crate) fn publish(&self, err: DltError) {
        let _ = self.0.set(err);
    }

    pub(crate) fn is_set(&self) -> bool {
        self.0.get().is_some()
    }

    fn take(&mut self) -> Option<DltError> {
        self.0.take()
    }
}

/// Worker fan-out used when the configuration does not override it:
/// hardware concurrency, minimum 1.
pub(crate) fn default_threads() -> usize {
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

pub(crate) struct Supervisor {
    tasks: Vec<Task>,
}

impl Supervisor {
    /// Split `source` into `threads` views and build one task per view.
    ///
    /// Fails with [`DltError::Eof`] for an empty source.
    pub(crate) fn new(source: &ByteSource, threads: usize) -> Result<Self> {
        let views = source.split(threads)?;
        log::debug!(
            "decoding {} bytes across {} chunks",
            source.len(),
            views.len()
        );
        Ok(Self {
            tasks: views.into_iter().map(Task::new).collect(),
        })
    }

    /// Run all tasks on parallel threads and return the reconciled,
    /// contiguous record vector.
    pub(crate) fn execute(mut self) -> Result<Vec<Record>> {
        let mut errors = ErrorSlot::new();

        thread::scope(|scope| {
            let errors = &errors;
            for task in &mut self.tasks {
                scope.spawn(move || task.execute(errors));
            }
        });

        let mut records = self.tasks[0].take_records();
        for i in 1..self.tasks.len() {
            let chunk_records = self.tasks[i].take_records();
            let skip_first = match chunk_records.first() {
                Some(first) if first.is_corrupted() => {
                    let prev_overrun = self.tasks[i - 1].overrun();
                    let cur_overrun = self.tasks[i].overrun();
                    let first_valid = self.tasks[i].first_valid_offset();
                    // the previous chunk's last record consumed exactly
                    // the bytes this chunk saw as a leading corruption,
                    // or both chunks ran off the end of a truncated tail
                    (prev_overrun > 0 && first_valid == Some(prev_overrun))
                        || (prev_overrun == OVERRUN_EOF
                            && cur_overrun == OVERRUN_EOF
                            && chunk_records.len() == 1)
                }
                _ => false,
            };
            records.extend(chunk_records.into_iter().skip(usize::from(skip_first)));
        }

        if let Some(err) = errors.take() {
            return Err(err);
        }
        Ok(records)
    }
}
