//! Priority-ordered copy-on-write list shared between readers and writers.

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::cmp::Ordering;
use std::sync::Arc;

/// Thread-safe ordered container. Readers load an immutable snapshot without
/// taking any lock; writers serialize among themselves, rebuild the backing
/// vector with the new element inserted at its sorted position, and publish
/// it atomically. An element inserted among equals lands after them, so the
/// first registration wins ties.
pub struct SortedCowList<T> {
    data: ArcSwap<Vec<T>>,
    comparator: fn(&T, &T) -> Ordering,
    write: Mutex<()>,
}

impl<T: Clone> SortedCowList<T> {
    /// Creates an empty list ordered by `comparator` (`Less` sorts first).
    pub fn new(comparator: fn(&T, &T) -> Ordering) -> Self {
        Self {
            data: ArcSwap::from_pointee(Vec::new()),
            comparator,
            write: Mutex::new(()),
        }
    }

    pub fn add(&self, item: T) {
        let _guard = self.write.lock();

        let current = self.data.load();
        let pos = current.partition_point(|existing| {
            (self.comparator)(existing, &item) != Ordering::Greater
        });

        let mut next = Vec::with_capacity(current.len() + 1);
        next.extend_from_slice(&current[..pos]);
        next.push(item);
        next.extend_from_slice(&current[pos..]);

        self.data.store(Arc::new(next));
    }

    /// Returns the current snapshot. The snapshot stays consistent for the
    /// duration of any iteration, regardless of concurrent writers.
    pub fn all(&self) -> Arc<Vec<T>> {
        self.data.load_full()
    }

    pub fn len(&self) -> usize {
        self.data.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.load().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn by_value(a: &i32, b: &i32) -> Ordering {
        a.cmp(b)
    }

    #[test]
    fn should_keep_elements_sorted() {
        let list = SortedCowList::new(by_value);
        for v in [5, 1, 4, 2, 3] {
            list.add(v);
        }
        assert_eq!(*list.all().as_slice(), [1, 2, 3, 4, 5]);
    }

    #[test]
    fn should_insert_after_equal_elements() {
        let list: SortedCowList<(i32, &str)> =
            SortedCowList::new(|a, b| a.0.cmp(&b.0));
        list.add((1, "first"));
        list.add((0, "zero"));
        list.add((1, "second"));
        assert_eq!(
            *list.all().as_slice(),
            [(0, "zero"), (1, "first"), (1, "second")]
        );
    }

    #[test]
    fn should_keep_snapshots_stable_under_writes() {
        let list = SortedCowList::new(by_value);
        list.add(1);
        list.add(2);

        let snapshot = list.all();
        list.add(3);

        assert_eq!(*snapshot.as_slice(), [1, 2]);
        assert_eq!(*list.all().as_slice(), [1, 2, 3]);
    }

    #[test]
    fn should_survive_concurrent_writers() {
        let list = Arc::new(SortedCowList::new(by_value));

        thread::scope(|scope| {
            for chunk in 0..4 {
                let list = Arc::clone(&list);
                scope.spawn(move || {
                    for v in 0..50 {
                        list.add(chunk * 50 + v);
                    }
                });
            }
        });

        let all = list.all();
        assert_eq!(all.len(), 200);
        assert!(all.windows(2).all(|w| w[0] <= w[1]));
    }
}
