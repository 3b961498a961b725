//! Reusable render buffers
//!
//! Rendering an error with all its stacks produces a large, short-lived
//! string. Buffers come from a bounded lock-free queue and go back on drop,
//! including when the holder unwinds.

use crate::Ferror;
use crossbeam_queue::ArrayQueue;
use std::ops::{Deref, DerefMut};
use std::sync::OnceLock;

/// Max buffers kept around between uses.
const POOL_CAPACITY: usize = 64;

/// Buffers grown past this are dropped instead of returned.
const MAX_RETAINED_BYTES: usize = 64 * 1024;

/// Initial capacity of a fresh buffer.
const INITIAL_BYTES: usize = 1024;

fn pool() -> &'static ArrayQueue<String> {
    static POOL: OnceLock<ArrayQueue<String>> = OnceLock::new();
    POOL.get_or_init(|| ArrayQueue::new(POOL_CAPACITY))
}

/// A `String` borrowed from the pool. Always empty when acquired.
pub struct PooledBuffer {
    buf: String,
}

/// Take a buffer from the pool, allocating one if the pool is empty.
pub fn acquire() -> PooledBuffer {
    let mut buf = pool()
        .pop()
        .unwrap_or_else(|| String::with_capacity(INITIAL_BYTES));
    buf.clear();
    PooledBuffer { buf }
}

impl Deref for PooledBuffer {
    type Target = String;

    fn deref(&self) -> &String {
        &self.buf
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut String {
        &mut self.buf
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        if self.buf.capacity() > MAX_RETAINED_BYTES {
            return;
        }
        let mut buf = std::mem::take(&mut self.buf);
        buf.clear();
        // a full pool just drops the buffer
        let _ = pool().push(buf);
    }
}

/// Render the verbose form of `err` into a pooled buffer and hand it to `f`.
pub fn render_verbose<R>(err: &dyn Ferror, f: impl FnOnce(&str) -> R) -> R {
    let mut buf = acquire();
    // writing into a String cannot fail
    let _ = err.write_verbose(&mut *buf);
    f(&buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_acquired_buffer_is_empty() {
        {
            let mut buf = acquire();
            buf.push_str("left over");
        }
        for _ in 0..POOL_CAPACITY {
            assert!(acquire().is_empty());
        }
    }

    #[test]
    fn test_render_verbose() {
        let err = Error::not_found("x").wrap("ctx");
        let rendered = render_verbose(&err, |s| s.to_string());
        assert_eq!(rendered, format!("{:?}", err));
        assert!(rendered.starts_with("ctx: (NotFound) x\n"));
    }

    #[test]
    fn test_buffer_returned_on_panic() {
        let result = std::panic::catch_unwind(|| {
            let mut buf = acquire();
            buf.push_str("partial");
            panic!("render failed");
        });
        assert!(result.is_err());
        assert!(acquire().is_empty());
    }

    #[test]
    fn test_oversized_buffer_is_not_retained() {
        let mut buf = acquire();
        buf.reserve(MAX_RETAINED_BYTES * 2);
        drop(buf);
        assert!(acquire().capacity() <= MAX_RETAINED_BYTES);
    }

    #[test]
    fn test_concurrent_use() {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                std::thread::spawn(move || {
                    for j in 0..100 {
                        let err = Error::internal(format!("{}-{}", i, j));
                        let len = render_verbose(&err, |s| s.len());
                        assert!(len > 0);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
    }
}
