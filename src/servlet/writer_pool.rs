use parking_lot::Mutex;
use tracing::trace;

use crate::constants::WRITER_BUFFER_SIZE;

/// Bounded pool of output buffers shared by all requests.
///
/// Never blocks: an empty pool allocates a new buffer and a full pool drops
/// the returned one.
#[derive(Debug)]
pub struct WriterPool {
    writers: Mutex<Vec<String>>,
    capacity: usize,
}

impl WriterPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            writers: Mutex::new(Vec::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn get(&self) -> String {
        match self.writers.lock().pop() {
            Some(writer) => writer,
            None => {
                trace!("writer pool empty, allocating");
                String::with_capacity(WRITER_BUFFER_SIZE)
            }
        }
    }

    pub fn put(
        &self,
        mut writer: String,
    ) {
        writer.clear();
        let mut writers = self.writers.lock();
        if writers.len() < self.capacity {
            writers.push(writer);
        }
    }

    /// Buffers currently idle in the pool
    pub fn len(&self) -> usize {
        self.writers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.writers.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
