//! Atomically replaceable shared state.
//!
//! Key managers and provider registries are built once and never mutated.
//! Reconfiguration builds a complete replacement and swaps it in; readers
//! that already took a snapshot keep using the old value until they drop it.

use arc_swap::ArcSwap;
use std::sync::Arc;

/// A shared, immutable value that can be replaced wholesale.
#[derive(Debug)]
pub struct Published<T> {
    inner: Arc<ArcSwap<T>>,
}

impl<T> Clone for Published<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Published<T> {
    /// Publish an initial value.
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(value)),
        }
    }

    /// Take a consistent snapshot of the current value.
    #[must_use]
    pub fn snapshot(&self) -> Arc<T> {
        self.inner.load_full()
    }

    /// Replace the current value, returning the previous one.
    ///
    /// Reads started after this call observe `value`.
    pub fn replace(&self, value: T) -> Arc<T> {
        self.inner.swap(Arc::new(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_survives_replace() {
        let published = Published::new(vec![1, 2, 3]);
        let before = published.snapshot();

        let previous = published.replace(vec![4]);

        assert_eq!(*before, vec![1, 2, 3]);
        assert_eq!(*previous, vec![1, 2, 3]);
        assert_eq!(*published.snapshot(), vec![4]);
    }

    #[test]
    fn test_clones_share_state() {
        let a = Published::new("old".to_string());
        let b = a.clone();

        a.replace("new".to_string());

        assert_eq!(b.snapshot().as_str(), "new");
    }

    #[tokio::test]
    async fn test_concurrent_readers_see_whole_values() {
        let published = Published::new((0u32, 0u32));
        let writer = {
            let published = published.clone();
            tokio::spawn(async move {
                for i in 1..=200u32 {
                    published.replace((i, i));
                    tokio::task::yield_now().await;
                }
            })
        };

        let mut readers = Vec::new();
        for _ in 0..4 {
            let published = published.clone();
            readers.push(tokio::spawn(async move {
                for _ in 0..200 {
                    let snapshot = published.snapshot();
                    assert_eq!(snapshot.0, snapshot.1);
                    tokio::task::yield_now().await;
                }
            }));
        }

        writer.await.unwrap();
        for reader in readers {
            reader.await.unwrap();
        }
        assert_eq!(*published.snapshot(), (200, 200));
    }
}
