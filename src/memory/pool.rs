// Fri Aug 21 2026 - Alex

use std::cell::RefCell;
use std::rc::Rc;

/// Fixed-size chunk buffer pool for the memory-mapped scan path. One buffer
/// is live at a time per scan; the pool exists so multi-gigabyte inputs reuse
/// a single allocation across chunk iterations instead of reallocating per
/// window. The rent guard returns the buffer on every exit path, including
/// unwinds.
pub struct BufferPool {
    buffers: Rc<RefCell<Vec<Vec<u8>>>>,
    buffer_size: usize,
}

pub struct RentedBuffer {
    buffer: Option<Vec<u8>>,
    pool: Rc<RefCell<Vec<Vec<u8>>>>,
}

impl BufferPool {
    pub fn new(buffer_size: usize) -> Self {
        Self {
            buffers: Rc::new(RefCell::new(Vec::new())),
            buffer_size,
        }
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    pub fn rent(&self) -> RentedBuffer {
        let buffer = self
            .buffers
            .borrow_mut()
            .pop()
            .unwrap_or_else(|| vec![0u8; self.buffer_size]);
        RentedBuffer {
            buffer: Some(buffer),
            pool: Rc::clone(&self.buffers),
        }
    }

    pub fn pooled_count(&self) -> usize {
        self.buffers.borrow().len()
    }
}

impl RentedBuffer {
    pub fn as_slice(&self) -> &[u8] {
        self.buffer.as_ref().map(|b| b.as_slice()).unwrap_or(&[])
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        self.buffer.as_mut().map(|b| b.as_mut_slice()).unwrap_or(&mut [])
    }
}

impl Drop for RentedBuffer {
    fn drop(&mut self) {
        if let Some(buffer) = self.buffer.take() {
            self.pool.borrow_mut().push(buffer);
        }
    }
}
