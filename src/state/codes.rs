//! Unique session code allocation.

use std::collections::HashSet;

use thiserror::Error;
use tokio::sync::Mutex;

/// Failure returned when releasing a code that was never handed out.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("code `{0}` is not allocated")]
pub struct UnknownCode(pub String);

/// Mutex-guarded set of currently-allocated codes.
///
/// The lock is held across the whole generate-and-check retry loop, so two
/// concurrent [`CodeAllocator::allocate`] calls can never hand out the same
/// value.
pub struct CodeAllocator {
    allocated: Mutex<HashSet<String>>,
}

impl CodeAllocator {
    /// Create an allocator with no outstanding codes.
    pub fn new() -> Self {
        Self {
            allocated: Mutex::new(HashSet::new()),
        }
    }

    /// Draw candidates from `generator` until one is unused, register it and
    /// return it.
    pub async fn allocate<F>(&self, mut generator: F) -> String
    where
        F: FnMut() -> String,
    {
        let mut allocated = self.allocated.lock().await;
        let mut candidate = generator();
        while allocated.contains(&candidate) {
            candidate = generator();
        }
        allocated.insert(candidate.clone());
        candidate
    }

    /// Return `code` to the pool so it can be handed out again.
    pub async fn release(&self, code: &str) -> Result<(), UnknownCode> {
        let mut allocated = self.allocated.lock().await;
        if !allocated.remove(code) {
            return Err(UnknownCode(code.to_owned()));
        }
        Ok(())
    }
}

impl Default for CodeAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[tokio::test]
    async fn allocate_skips_taken_candidates() {
        let allocator = CodeAllocator::new();
        let first = allocator.allocate(|| "AAAAAA".to_string()).await;
        assert_eq!(first, "AAAAAA");

        // A generator that collides once before producing a fresh value.
        let calls = AtomicUsize::new(0);
        let second = allocator
            .allocate(|| {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    "AAAAAA".to_string()
                } else {
                    "BBBBBB".to_string()
                }
            })
            .await;
        assert_eq!(second, "BBBBBB");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn release_unknown_code_fails() {
        let allocator = CodeAllocator::new();
        assert_eq!(
            allocator.release("ZZZZZZ").await,
            Err(UnknownCode("ZZZZZZ".into()))
        );
    }

    #[tokio::test]
    async fn released_codes_are_reusable() {
        let allocator = CodeAllocator::new();
        allocator.allocate(|| "AAAAAA".to_string()).await;
        allocator.release("AAAAAA").await.unwrap();

        let again = allocator.allocate(|| "AAAAAA".to_string()).await;
        assert_eq!(again, "AAAAAA");
    }

    #[tokio::test]
    async fn thousand_concurrent_allocations_are_distinct() {
        let allocator = Arc::new(CodeAllocator::new());
        let counter = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..1000 {
            let allocator = allocator.clone();
            let counter = counter.clone();
            tasks.push(tokio::spawn(async move {
                // Deliberately collision-prone: each call may repeat a value
                // another task already produced, forcing the retry loop.
                allocator
                    .allocate(|| {
                        let n = counter.fetch_add(1, Ordering::SeqCst);
                        format!("CODE{:04}", n / 2)
                    })
                    .await
            }));
        }

        let mut codes = HashSet::new();
        for task in tasks {
            codes.insert(task.await.unwrap());
        }
        assert_eq!(codes.len(), 1000);
    }
}
