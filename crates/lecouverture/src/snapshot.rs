// Configuration snapshot handle
//
// *L'Instantané* (The Snapshot) - Copy-and-swap publication of capability indexes

use crate::index::CapabilityIndex;
use crate::record::CapabilityRecord;
use std::sync::{Arc, RwLock};
use tracing::info;

/// Shared, swappable pointer to the current capability index.
///
/// Readers take a cheap `Arc` clone and keep using it for the whole request,
/// so a concurrent swap never exposes a partially built index. New indexes
/// are built before the write lock is taken.
#[derive(Debug)]
pub struct SnapshotHandle {
    current: RwLock<Arc<CapabilityIndex>>,
}

impl SnapshotHandle {
    /// Wrap an already built index
    pub fn new(index: CapabilityIndex) -> Self {
        Self {
            current: RwLock::new(Arc::new(index)),
        }
    }

    /// Handle holding an empty index
    pub fn empty() -> Self {
        Self::new(CapabilityIndex::default())
    }

    /// Build an index from records and wrap it
    pub fn from_records(records: &[CapabilityRecord]) -> Self {
        Self::new(CapabilityIndex::build(records))
    }

    /// The index requests should use right now
    pub fn current(&self) -> Arc<CapabilityIndex> {
        // The guarded value is a plain Arc, so a poisoned lock still holds a valid index
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Generation of the current index
    pub fn generation(&self) -> String {
        self.current().generation().to_string()
    }

    /// Rebuild from a new configuration snapshot.
    ///
    /// Returns `false` when the records produce the generation already
    /// published, in which case nothing is swapped.
    pub fn replace(&self, records: &[CapabilityRecord]) -> bool {
        self.publish(CapabilityIndex::build(records))
    }

    /// Publish a fully built index. Returns `false` if its generation is
    /// already current.
    pub fn publish(&self, index: CapabilityIndex) -> bool {
        let next = Arc::new(index);
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        if guard.generation() == next.generation() {
            return false;
        }

        let stats = next.stats();
        info!(
            "Publishing capability index {} ({} roles, {} capabilities)",
            &next.generation()[..12.min(next.generation().len())],
            stats.roles,
            stats.capabilities
        );
        *guard = next;
        true
    }
}

impl Default for SnapshotHandle {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn records(tag: u32) -> Vec<CapabilityRecord> {
        (0..10)
            .map(|i| CapabilityRecord::new(format!("R{}", i), format!("C{}", i), "Basic", tag))
            .collect()
    }

    #[test]
    fn test_replace_swaps_generation() {
        let handle = SnapshotHandle::from_records(&records(1));
        let before = handle.generation();

        assert!(handle.replace(&records(2)));
        assert_ne!(handle.generation(), before);
    }

    #[test]
    fn test_identical_snapshot_is_not_swapped() {
        let handle = SnapshotHandle::from_records(&records(1));
        let held = handle.current();

        assert!(!handle.replace(&records(1)));
        assert!(Arc::ptr_eq(&held, &handle.current()));
    }

    #[test]
    fn test_readers_keep_their_snapshot() {
        let handle = SnapshotHandle::from_records(&records(1));
        let held = handle.current();
        handle.replace(&[]);

        assert_eq!(held.stats().roles, 10);
        assert!(handle.current().is_empty());
    }

    #[test]
    fn test_concurrent_readers_see_complete_indexes() {
        let handle = Arc::new(SnapshotHandle::from_records(&records(1)));

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let handle = Arc::clone(&handle);
                thread::spawn(move || {
                    for _ in 0..200 {
                        let index = handle.current();
                        let roles = index.stats().roles;
                        assert!(roles == 10 || roles == 0, "partial index with {} roles", roles);
                    }
                })
            })
            .collect();

        for tag in 2..20 {
            if tag % 2 == 0 {
                handle.replace(&[]);
            } else {
                handle.replace(&records(tag));
            }
        }

        for reader in readers {
            reader.join().expect("reader panicked");
        }
    }
}
